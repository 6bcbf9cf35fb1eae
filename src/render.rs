pub mod text_card;

pub use text_card::CardRasterizer;

/// A rendered frame as RGBA8 pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// RGBA8 at pixel `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Pixels as straight-alpha RGBA8, the layout PNG expects.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        if !self.premultiplied {
            return self.data.clone();
        }
        let mut out = self.data.clone();
        for px in out.chunks_exact_mut(4) {
            let a = u32::from(px[3]);
            if a == 0 {
                px.copy_from_slice(&[0, 0, 0, 0]);
                continue;
            }
            if a == 255 {
                continue;
            }
            for c in &mut px[0..3] {
                *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(data: Vec<u8>, premultiplied: bool) -> FrameRGBA {
        FrameRGBA {
            width: (data.len() / 4) as u32,
            height: 1,
            data,
            premultiplied,
        }
    }

    #[test]
    fn straight_alpha_undoes_premultiplication() {
        let f = frame(vec![16, 24, 32, 128, 9, 9, 9, 0, 1, 2, 3, 255], true);
        assert_eq!(
            f.to_straight_rgba8(),
            vec![32, 48, 64, 128, 0, 0, 0, 0, 1, 2, 3, 255]
        );
    }

    #[test]
    fn straight_frames_are_returned_as_is() {
        let f = frame(vec![200, 100, 50, 10], false);
        assert_eq!(f.to_straight_rgba8(), vec![200, 100, 50, 10]);
    }
}
