use std::path::Path;

use crate::{
    card::Card,
    foundation::core::Fps,
    foundation::error::{ReelError, ReelResult},
    media::AudioPcm,
    timeline::Timeline,
};

/// One source placed in timeline sample space.
#[derive(Clone, Copy, Debug)]
pub(crate) struct AudioSegment<'a> {
    pub(crate) timeline_start_sample: u64,
    /// Exclusive; the source is cut here so neighbouring cards never overlap.
    pub(crate) timeline_end_sample: u64,
    pub(crate) source: &'a AudioPcm,
}

/// Audio rendering plan for a whole reel.
#[derive(Clone, Debug)]
pub(crate) struct AudioManifest<'a> {
    pub(crate) sample_rate: u32,
    pub(crate) channels: u16,
    pub(crate) total_samples: u64,
    pub(crate) segments: Vec<AudioSegment<'a>>,
}

impl<'a> AudioManifest<'a> {
    /// Start every card's speech at the first sample of its card.
    pub(crate) fn from_timeline(timeline: &Timeline, cards: &[&'a Card]) -> ReelResult<Self> {
        let mut segments = Vec::with_capacity(timeline.placements.len());
        for p in &timeline.placements {
            let card = cards.get(p.card).ok_or_else(|| {
                ReelError::validation(format!("timeline references missing card {}", p.card))
            })?;
            if card.audio.frames() == 0 {
                continue;
            }
            segments.push(AudioSegment {
                timeline_start_sample: p.start_sample,
                timeline_end_sample: p.end_sample,
                source: &card.audio,
            });
        }
        Ok(Self {
            sample_rate: timeline.sample_rate,
            channels: 2,
            total_samples: timeline.total_samples,
            segments,
        })
    }
}

/// Mix all manifest segments into interleaved output PCM.
pub(crate) fn mix_manifest(manifest: &AudioManifest<'_>) -> Vec<f32> {
    let frames = manifest.total_samples as usize;
    let mut out = vec![0.0f32; frames * usize::from(manifest.channels)];

    for seg in &manifest.segments {
        mix_segment(&mut out, manifest, seg);
    }

    for s in &mut out {
        *s = s.clamp(-1.0, 1.0);
    }
    out
}

fn mix_segment(out: &mut [f32], manifest: &AudioManifest<'_>, seg: &AudioSegment<'_>) {
    let src = seg.source;
    let src_channels = usize::from(src.channels);
    let src_frames = src.frames();
    if src_frames == 0 || src.sample_rate == 0 {
        return;
    }
    let end = seg.timeline_end_sample.min(manifest.total_samples);
    let out_channels = usize::from(manifest.channels);
    let step = f64::from(src.sample_rate) / f64::from(manifest.sample_rate);

    for dst_sample in seg.timeline_start_sample..end {
        let rel = (dst_sample - seg.timeline_start_sample) as f64;
        let src_pos = rel * step;
        let src_frame0 = src_pos.floor() as usize;
        if src_frame0 >= src_frames {
            break;
        }
        let src_frame1 = (src_frame0 + 1).min(src_frames - 1);
        let frac = (src_pos - src_frame0 as f64) as f32;

        let data = &src.interleaved_f32;
        let (l, r) = if src_channels == 1 {
            let v0 = data[src_frame0];
            let v1 = data[src_frame1];
            let v = v0 + ((v1 - v0) * frac);
            (v, v)
        } else {
            let i0 = src_frame0 * src_channels;
            let i1 = src_frame1 * src_channels;
            (
                data[i0] + ((data[i1] - data[i0]) * frac),
                data[i0 + 1] + ((data[i1 + 1] - data[i0 + 1]) * frac),
            )
        };

        let dst_idx = dst_sample as usize * out_channels;
        out[dst_idx] += l;
        if out_channels > 1 {
            out[dst_idx + 1] += r;
        }
    }
}

/// Write interleaved `f32` PCM samples to raw little-endian `.f32le` file.
pub(crate) fn write_mix_to_f32le_file(
    samples_interleaved: &[f32],
    out_path: &Path,
) -> ReelResult<()> {
    let mut bytes = Vec::<u8>::with_capacity(samples_interleaved.len() * 4);
    for &sample in samples_interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes).map_err(|e| {
        ReelError::media(format!(
            "failed to write mixed audio file '{}': {e}",
            out_path.display()
        ))
    })
}

/// Convert a frame delta to the nearest sample index at `sample_rate`.
pub(crate) fn frame_to_sample(frame_delta: u64, fps: Fps, sample_rate: u32) -> u64 {
    let num = u128::from(frame_delta) * u128::from(sample_rate) * u128::from(fps.den);
    let den = u128::from(fps.num);
    ((num + (den / 2)) / den) as u64
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
