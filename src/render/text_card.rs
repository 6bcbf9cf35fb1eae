//! Card rasterization.
//!
//! A card is a solid background with its text centered, wrapped to the canvas width. The card is
//! described as a small SVG document and rasterized with `resvg`, so text shaping and font
//! fallback come from `usvg`'s font database.

use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    card::{CardKind, CardStyle},
    foundation::core::Canvas,
    foundation::error::{ReelError, ReelResult},
    render::FrameRGBA,
};

/// Average advance of a bold sans-serif glyph relative to its font size.
const AVG_GLYPH_ADVANCE_EM: f32 = 0.6;
const LINE_HEIGHT_EM: f32 = 1.2;
/// Offset from a line's vertical center to its alphabetic baseline.
const BASELINE_DROP_EM: f32 = 0.35;

/// Rasterizes cards at a fixed canvas size and style.
///
/// Building the font database is the expensive part; construct one rasterizer per reel.
pub struct CardRasterizer {
    canvas: Canvas,
    style: CardStyle,
    options: usvg::Options<'static>,
}

impl CardRasterizer {
    pub fn new(canvas: Canvas, style: CardStyle) -> ReelResult<Self> {
        if canvas.width == 0 || canvas.height == 0 {
            return Err(ReelError::validation("card canvas must be non-zero"));
        }
        style.validate()?;
        let options = usvg::Options {
            fontdb: build_fontdb(&style.font_dirs),
            font_resolver: make_font_resolver(),
            ..Default::default()
        };
        Ok(Self {
            canvas,
            style,
            options,
        })
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn style(&self) -> &CardStyle {
        &self.style
    }

    /// Number of font faces available for text.
    pub fn font_faces(&self) -> usize {
        self.options.fontdb.faces().count()
    }

    /// SVG markup for one card.
    pub fn card_svg(&self, kind: CardKind, text: &str) -> String {
        card_svg(self.canvas, &self.style, kind, text)
    }

    /// Render one card to premultiplied RGBA8.
    pub fn rasterize(&self, kind: CardKind, text: &str) -> ReelResult<FrameRGBA> {
        let svg = self.card_svg(kind, text);
        let tree = usvg::Tree::from_str(&svg, &self.options)
            .map_err(|e| ReelError::render(format!("failed to build card '{text}': {e}")))?;

        let mut pixmap = resvg::tiny_skia::Pixmap::new(self.canvas.width, self.canvas.height)
            .ok_or_else(|| ReelError::render("failed to allocate card pixmap"))?;
        resvg::render(
            &tree,
            resvg::tiny_skia::Transform::default(),
            &mut pixmap.as_mut(),
        );

        Ok(FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data: pixmap.take(),
            premultiplied: true,
        })
    }
}

pub(crate) fn card_svg(canvas: Canvas, style: &CardStyle, kind: CardKind, text: &str) -> String {
    let font_size = style.font_size_for(kind);
    let max_width = canvas
        .width
        .saturating_sub(style.margin_px.saturating_mul(2))
        .max(1) as f32;
    let lines = wrap_lines(text, font_size, max_width);

    let cx = canvas.width as f32 / 2.0;
    let cy = canvas.height as f32 / 2.0;
    let line_height = font_size * LINE_HEIGHT_EM;
    let first_center = cy - (line_height * (lines.len() as f32 - 1.0)) / 2.0;

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = canvas.width,
        h = canvas.height,
    );
    let _ = write!(
        svg,
        r#"<rect x="0" y="0" width="{w}" height="{h}" fill="{fill}" fill-opacity="{op}"/>"#,
        w = canvas.width,
        h = canvas.height,
        fill = style.background.to_hex_rgb(),
        op = style.background.opacity(),
    );
    let _ = write!(
        svg,
        r#"<text text-anchor="middle" font-family="{family}" font-size="{size}" font-weight="{weight}" fill="{fill}" fill-opacity="{op}">"#,
        family = xml_escape(&style.font_family),
        size = font_size,
        weight = style.font_weight,
        fill = style.text_color.to_hex_rgb(),
        op = style.text_color.opacity(),
    );
    for (i, line) in lines.iter().enumerate() {
        let y = first_center + (i as f32) * line_height + font_size * BASELINE_DROP_EM;
        let _ = write!(
            svg,
            r#"<tspan x="{cx}" y="{y}">{}</tspan>"#,
            xml_escape(line)
        );
    }
    svg.push_str("</text></svg>");
    svg
}

/// Greedy word wrap using an average glyph width estimate.
///
/// A single word wider than the line keeps a line of its own. Whitespace-only text produces one
/// empty line.
pub(crate) fn wrap_lines(text: &str, font_size: f32, max_width_px: f32) -> Vec<String> {
    let per_char = (font_size * AVG_GLYPH_ADVANCE_EM).max(1.0);
    let max_chars = ((max_width_px / per_char).floor() as usize).max(1);

    let mut lines = Vec::<String>::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn build_fontdb(extra_dirs: &[PathBuf]) -> Arc<usvg::fontdb::Database> {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    for dir in extra_dirs {
        load_fonts_from_dir(&mut db, dir);
    }
    tracing::debug!(faces = db.faces().count(), "loaded font database");
    Arc::new(db)
}

fn load_fonts_from_dir(db: &mut usvg::fontdb::Database, dir: &Path) {
    let Ok(rd) = std::fs::read_dir(dir) else {
        tracing::warn!(dir = %dir.display(), "font directory is not readable");
        return;
    };

    for entry in rd.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if ext != "ttf" && ext != "otf" && ext != "ttc" {
            continue;
        }
        if let Err(e) = db.load_font_file(&path) {
            tracing::warn!(path = %path.display(), error = %e, "skipping unreadable font");
        }
    }
}

/// Family lookup that always lands on some face when any font is installed.
///
/// Requested families are tried first, then generic sans-serif/serif, then whatever face the
/// database lists first.
fn make_font_resolver() -> usvg::FontResolver<'static> {
    use usvg::FontResolver;

    FontResolver {
        select_font: Box::new(|font, fontdb| {
            let mut families = Vec::<usvg::fontdb::Family<'_>>::new();
            for family in font.families() {
                families.push(match family {
                    usvg::FontFamily::Serif => usvg::fontdb::Family::Serif,
                    usvg::FontFamily::SansSerif => usvg::fontdb::Family::SansSerif,
                    usvg::FontFamily::Cursive => usvg::fontdb::Family::Cursive,
                    usvg::FontFamily::Fantasy => usvg::fontdb::Family::Fantasy,
                    usvg::FontFamily::Monospace => usvg::fontdb::Family::Monospace,
                    usvg::FontFamily::Named(s) => usvg::fontdb::Family::Name(s),
                });
            }
            families.push(usvg::fontdb::Family::SansSerif);
            families.push(usvg::fontdb::Family::Serif);

            let style = match font.style() {
                usvg::FontStyle::Normal => usvg::fontdb::Style::Normal,
                usvg::FontStyle::Italic => usvg::fontdb::Style::Italic,
                usvg::FontStyle::Oblique => usvg::fontdb::Style::Oblique,
            };

            let query = usvg::fontdb::Query {
                families: &families,
                weight: usvg::fontdb::Weight(font.weight()),
                stretch: usvg::fontdb::Stretch::Normal,
                style,
            };

            if let Some(id) = fontdb.query(&query) {
                return Some(id);
            }
            fontdb.faces().next().map(|f| f.id)
        }),
        select_fallback: FontResolver::default_fallback_selector(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/text_card.rs"]
mod tests;
