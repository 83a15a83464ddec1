//! Text rasterization with ab_glyph outlines.
//!
//! Glyph outlines are converted into tiny-skia paths and filled under the
//! painter transform, so text scales and pans with everything else.

use crate::paint::skia_color;
use ab_glyph::{Font, FontArc, GlyphId, OutlineCurve, ScaleFont};
use kurbo::Point;
use scribble_core::element::Color;
use std::sync::Once;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};

static MISSING_FONT: Once = Once::new();

/// Log once per process that text is skipped for lack of a font.
pub(crate) fn warn_missing_font() {
    MISSING_FONT.call_once(|| log::warn!("No font configured; text elements are not rendered"));
}

/// Draw `content` with its top-left corner at `at` (world units), one line
/// per `\n`.
pub(crate) fn draw_text(
    pixmap: &mut Pixmap,
    font: &FontArc,
    content: &str,
    at: Point,
    size: f64,
    color: Color,
    transform: Transform,
) {
    let scaled = font.as_scaled(size as f32);
    let (hs, vs) = (scaled.h_scale_factor(), scaled.v_scale_factor());
    let line_height = scaled.height() + scaled.line_gap();

    let mut pb = PathBuilder::new();
    for (line_no, line) in content.lines().enumerate() {
        let baseline = at.y as f32 + scaled.ascent() + line_no as f32 * line_height;
        let mut pen_x = at.x as f32;
        let mut prev: Option<GlyphId> = None;
        for ch in line.chars() {
            let id = font.glyph_id(ch);
            if let Some(prev) = prev {
                pen_x += scaled.kern(prev, id);
            }
            if let Some(outline) = font.outline(id) {
                // Font units are y-up
                let map = |p: ab_glyph::Point| (pen_x + p.x * hs, baseline - p.y * vs);
                let mut last: Option<(f32, f32)> = None;
                for curve in &outline.curves {
                    let (start, end) = match curve {
                        OutlineCurve::Line(a, b) => (map(*a), map(*b)),
                        OutlineCurve::Quad(a, _, c) => (map(*a), map(*c)),
                        OutlineCurve::Cubic(a, _, _, d) => (map(*a), map(*d)),
                    };
                    if last != Some(start) {
                        if last.is_some() {
                            pb.close();
                        }
                        pb.move_to(start.0, start.1);
                    }
                    match curve {
                        OutlineCurve::Line(..) => pb.line_to(end.0, end.1),
                        OutlineCurve::Quad(_, b, _) => {
                            let b = map(*b);
                            pb.quad_to(b.0, b.1, end.0, end.1);
                        }
                        OutlineCurve::Cubic(_, b, c, _) => {
                            let (b, c) = (map(*b), map(*c));
                            pb.cubic_to(b.0, b.1, c.0, c.1, end.0, end.1);
                        }
                    }
                    last = Some(end);
                }
                if last.is_some() {
                    pb.close();
                }
            }
            pen_x += scaled.h_advance(id);
            prev = Some(id);
        }
    }

    let Some(path) = pb.finish() else { return };
    let mut paint = Paint::default();
    paint.set_color(skia_color(color));
    paint.anti_alias = true;
    pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
}

/// Strip markup tags and decode the common entities, keeping line breaks
/// for block-level tags.
pub fn plain_text(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut tag = String::new();
    let mut in_tag = false;
    for ch in markup.chars() {
        match (in_tag, ch) {
            (false, '<') => {
                in_tag = true;
                tag.clear();
            }
            (true, '>') => {
                in_tag = false;
                let closing = tag.starts_with('/');
                let name = tag
                    .trim_matches('/')
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_ascii_lowercase();
                let newline = match name.as_str() {
                    "br" => true,
                    "p" | "div" | "li" => closing,
                    _ => false,
                };
                if newline {
                    out.push('\n');
                }
            }
            (true, c) => tag.push(c),
            (false, c) => out.push(c),
        }
    }
    out.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_strips_tags() {
        assert_eq!(plain_text("<p>Hello <b>world</b></p><p>again</p>"), "Hello world\nagain");
        assert_eq!(plain_text("a<br>b"), "a\nb");
        assert_eq!(plain_text("1 &lt; 2 &amp;&amp; 3"), "1 < 2 && 3");
        assert_eq!(plain_text(""), "");
    }
}
