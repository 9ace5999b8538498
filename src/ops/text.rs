use std::collections::HashMap;
use std::ops::Range;

use ab_glyph::{point, Font, FontArc, FontVec, GlyphId, ScaleFont};

use crate::error::{Result, WatermarkError};
use crate::style::{FontFamily, FontStyle, FontWeight, GenericFamily, WatermarkStyle};

/// Horizontal shear applied to synthesized italics (x shift per pixel above the baseline).
const ITALIC_SHEAR: f32 = 0.2;

/// Measures and rasterizes single lines of text.
///
/// Lines are laid out with their left edge at `x = 0` and the top of the
/// line box at `y = 0`; `plot` receives integer pixel coordinates in that
/// frame together with a coverage value in `[0, 1]`. A pixel may be plotted
/// more than once; callers keep the maximum.
pub trait GlyphSource {
    /// Advance width of `line` in pixels.
    fn measure(&self, line: &str, font_size: f32) -> f32;

    /// Glyphs lying entirely outside `columns` (line-relative x) may be
    /// skipped.
    fn rasterize_line(
        &self,
        line: &str,
        font_size: f32,
        columns: Range<f32>,
        plot: &mut dyn FnMut(i32, i32, f32),
    );
}

/// A system font resolved for one family/weight/style combination.
///
/// When the installed face does not carry the requested weight or slant,
/// the missing variant is synthesized: bold by widening each coverage
/// sample by one pixel, italic by shearing.
#[derive(Clone)]
pub struct LoadedFont {
    font: FontArc,
    synthetic_bold: bool,
    synthetic_italic: bool,
}

impl LoadedFont {
    pub fn new(font: FontArc) -> Self {
        Self { font, synthetic_bold: false, synthetic_italic: false }
    }

    pub fn with_synthesis(mut self, bold: bool, italic: bool) -> Self {
        self.synthetic_bold = bold;
        self.synthetic_italic = italic;
        self
    }

    /// Glyph ids of `line` with their pen x positions (kerning applied).
    fn layout_line(&self, line: &str, font_size: f32) -> (Vec<(GlyphId, f32)>, f32) {
        let scaled = self.font.as_scaled(font_size);
        let mut glyphs = Vec::with_capacity(line.len());
        let mut cursor_x = 0.0f32;
        let mut last_glyph: Option<GlyphId> = None;

        for ch in line.chars() {
            let glyph_id = self.font.glyph_id(ch);
            if let Some(prev) = last_glyph {
                cursor_x += scaled.kern(prev, glyph_id);
            }
            glyphs.push((glyph_id, cursor_x));
            cursor_x += scaled.h_advance(glyph_id);
            last_glyph = Some(glyph_id);
        }

        (glyphs, cursor_x)
    }
}

impl GlyphSource for LoadedFont {
    fn measure(&self, line: &str, font_size: f32) -> f32 {
        if font_size <= 0.0 {
            return 0.0;
        }
        self.layout_line(line, font_size).1
    }

    fn rasterize_line(
        &self,
        line: &str,
        font_size: f32,
        columns: Range<f32>,
        plot: &mut dyn FnMut(i32, i32, f32),
    ) {
        if font_size <= 0.0 || line.is_empty() {
            return;
        }
        let baseline = self.font.as_scaled(font_size).ascent();
        let (glyphs, _) = self.layout_line(line, font_size);
        // Shear and bold widening can push coverage past the outline bounds
        let slack = 1.0 + if self.synthetic_italic { font_size * ITALIC_SHEAR * 2.0 } else { 0.0 };

        for (glyph_id, gx) in glyphs {
            let glyph = glyph_id.with_scale_and_position(font_size, point(gx, baseline));
            let Some(outlined) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            if bounds.max.x + slack < columns.start || bounds.min.x - slack > columns.end {
                continue;
            }
            let (bx, by) = (bounds.min.x as i32, bounds.min.y as i32);
            outlined.draw(|px, py, cov| {
                let y = by + py as i32;
                let mut x = bx + px as i32;
                if self.synthetic_italic {
                    x += ((baseline - y as f32) * ITALIC_SHEAR).round() as i32;
                }
                plot(x, y, cov);
                if self.synthetic_bold {
                    plot(x + 1, y, cov);
                }
            });
        }
    }
}

/// Font-free glyph source: every non-whitespace character is a solid box
/// `advance × font_size` wide, every whitespace character an empty advance.
/// Deterministic regardless of installed fonts.
#[derive(Clone, Copy, Debug)]
pub struct BoxGlyphs {
    /// Advance per character as a fraction of the font size.
    pub advance: f32,
}

impl Default for BoxGlyphs {
    fn default() -> Self {
        Self { advance: 0.5 }
    }
}

impl GlyphSource for BoxGlyphs {
    fn measure(&self, line: &str, font_size: f32) -> f32 {
        line.chars().count() as f32 * self.advance * font_size.max(0.0)
    }

    fn rasterize_line(
        &self,
        line: &str,
        font_size: f32,
        columns: Range<f32>,
        plot: &mut dyn FnMut(i32, i32, f32),
    ) {
        let step = self.advance * font_size.max(0.0);
        let height = font_size.max(0.0).round() as i32;
        for (i, ch) in line.chars().enumerate() {
            if ch.is_whitespace() {
                continue;
            }
            let x0 = (i as f32 * step).round() as i32;
            let x1 = ((i + 1) as f32 * step).round() as i32;
            if (x1 as f32) < columns.start || (x0 as f32) > columns.end {
                continue;
            }
            for y in 0..height {
                for x in x0..x1 {
                    plot(x, y, 1.0);
                }
            }
        }
    }
}

/// Load a font by family name, weight, and style from the system.
/// `weight` is a CSS-style weight value (100=Thin, 400=Regular, 700=Bold, etc.)
///
/// Tries the named family first, then its generic family, then any
/// sans-serif. Missing weight/slant variants are synthesized.
pub fn load_system_font(family: FontFamily, weight: u16, style: FontStyle) -> Result<LoadedFont> {
    use font_kit::family_name::FamilyName;
    use font_kit::handle::Handle;
    use font_kit::properties::{Properties, Style, Weight};
    use font_kit::source::SystemSource;

    let mut props = Properties::new();
    props.weight = Weight(weight as f32);
    props.style = match style {
        FontStyle::Normal => Style::Normal,
        FontStyle::Italic => Style::Italic,
        FontStyle::Oblique => Style::Oblique,
    };

    let generic = match family.generic() {
        GenericFamily::SansSerif => FamilyName::SansSerif,
        GenericFamily::Serif => FamilyName::Serif,
        GenericFamily::Monospace => FamilyName::Monospace,
    };

    let source = SystemSource::new();
    let handle = source
        .select_best_match(
            &[FamilyName::Title(family.name().to_string()), generic, FamilyName::SansSerif],
            &props,
        )
        .map_err(|_| WatermarkError::FontUnavailable(family.name().to_string()))?;

    let index = match &handle {
        Handle::Path { font_index, .. } | Handle::Memory { font_index, .. } => *font_index,
    };
    let unavailable = || WatermarkError::FontUnavailable(family.name().to_string());
    let loaded = handle.load().map_err(|_| unavailable())?;
    let found = loaded.properties();
    let bytes: Vec<u8> = (*loaded.copy_font_data().ok_or_else(unavailable)?).clone();

    let font = FontVec::try_from_vec_and_index(bytes, index)
        .map(FontArc::new)
        .map_err(|_| unavailable())?;

    let synthetic_bold = weight >= 600 && found.weight.0 < 600.0;
    let synthetic_italic = style.is_slanted() && found.style == Style::Normal;
    log::debug!(
        "font '{}' w{} {:?} -> {} (bold synth: {}, italic synth: {})",
        family.name(),
        weight,
        style,
        loaded.full_name(),
        synthetic_bold,
        synthetic_italic
    );

    Ok(LoadedFont::new(font).with_synthesis(synthetic_bold, synthetic_italic))
}

type FontKey = (FontFamily, FontWeight, FontStyle);

/// Resolved fonts keyed by family/weight/style. Failed lookups are
/// remembered too, so a missing font is only searched for once.
#[derive(Default)]
pub struct FontBook {
    fonts: HashMap<FontKey, Option<LoadedFont>>,
}

impl FontBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Font for `style`, loading it on first use.
    pub fn font_for(&mut self, style: &WatermarkStyle) -> Option<&LoadedFont> {
        let key = (style.font_family, style.font_weight, style.font_style);
        self.fonts
            .entry(key)
            .or_insert_with(|| {
                match load_system_font(key.0, key.1.css_weight(), key.2) {
                    Ok(font) => Some(font),
                    Err(e) => {
                        log::warn!("{e}; watermark text will not be drawn");
                        None
                    }
                }
            })
            .as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_glyphs_measure_by_char_count() {
        let g = BoxGlyphs { advance: 0.5 };
        assert_eq!(g.measure("abcd", 20.0), 40.0);
        assert_eq!(g.measure("", 20.0), 0.0);
        assert_eq!(g.measure("héllo", 10.0), 25.0);
    }

    #[test]
    fn box_glyphs_skip_whitespace() {
        let g = BoxGlyphs { advance: 1.0 };
        let mut plotted = Vec::new();
        g.rasterize_line("a b", 2.0, f32::NEG_INFINITY..f32::INFINITY, &mut |x, y, c| {
            plotted.push((x, y, c))
        });
        // 'a' covers x 0..2, the space 2..4 is empty, 'b' covers 4..6
        let xs: std::collections::BTreeSet<i32> = plotted.iter().map(|p| p.0).collect();
        assert_eq!(xs.into_iter().collect::<Vec<_>>(), vec![0, 1, 4, 5]);
        assert!(plotted.iter().all(|p| p.1 >= 0 && p.1 < 2 && p.2 == 1.0));
    }

    fn system_font() -> Option<LoadedFont> {
        match load_system_font(FontFamily::Arial, 400, FontStyle::Normal) {
            Ok(font) => Some(font),
            // Machines without any installed fonts
            Err(WatermarkError::FontUnavailable(_)) => None,
            Err(e) => panic!("unexpected font error: {e}"),
        }
    }

    fn plot_all(font: &LoadedFont, line: &str, size: f32) -> Vec<(i32, i32, f32)> {
        let mut plotted = Vec::new();
        font.rasterize_line(line, size, f32::NEG_INFINITY..f32::INFINITY, &mut |x, y, c| {
            plotted.push((x, y, c))
        });
        plotted
    }

    #[test]
    fn system_font_lays_out_inside_the_line_box() {
        let Some(font) = system_font() else {
            return;
        };
        let size = 40.0;
        let width = font.measure("Hxg", size);
        assert!(width > 0.0);
        // Kerning never widens a pair
        assert!(font.measure("AV", size) <= font.measure("A", size) + font.measure("V", size) + 0.01);

        let scaled = font.font.as_scaled(size);
        let line_box = (scaled.ascent() - scaled.descent()).ceil() as i32;
        let plotted = plot_all(&font, "Hxg", size);
        assert!(!plotted.is_empty());
        for &(x, y, cov) in &plotted {
            assert!((-1..=line_box + 1).contains(&y), "y = {y}");
            assert!(x >= -2 && (x as f32) <= width + 2.0, "x = {x}");
            assert!((0.0..=1.0).contains(&cov));
        }
    }

    #[test]
    fn synthetic_styles_widen_and_slant() {
        let Some(font) = system_font() else {
            return;
        };
        let size = 40.0;
        let max_x = |p: &[(i32, i32, f32)]| p.iter().map(|p| p.0).max().unwrap_or(0);
        let top_min_x = |p: &[(i32, i32, f32)]| {
            let top = p.iter().map(|p| p.1).min().unwrap_or(0);
            p.iter().filter(|p| p.1 == top).map(|p| p.0).min().unwrap_or(0)
        };

        let regular = plot_all(&font, "I", size);
        let bold = plot_all(&font.clone().with_synthesis(true, false), "I", size);
        let italic = plot_all(&font.clone().with_synthesis(false, true), "I", size);

        assert_eq!(max_x(&bold), max_x(&regular) + 1);
        // Shear moves the top of the stem to the right
        assert!(top_min_x(&italic) > top_min_x(&regular));
    }

    #[test]
    fn glyphs_outside_columns_are_skipped() {
        let g = BoxGlyphs { advance: 1.0 };
        let mut xs = std::collections::BTreeSet::new();
        g.rasterize_line("abcdef", 2.0, 5.0..7.0, &mut |x, _, _| {
            xs.insert(x);
        });
        // 'c' (4..6) and 'd' (6..8) touch the window, the rest do not
        assert_eq!(xs.into_iter().collect::<Vec<_>>(), vec![4, 5, 6, 7]);
    }
}
