// ============================================================================
// WATERMARK STYLE — the configuration snapshot a render is computed from
// ============================================================================

use std::fmt;
use std::ops::RangeInclusive;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WatermarkError};

pub const FONT_SIZE_RANGE: RangeInclusive<f32> = 10.0..=500.0;
pub const LINE_HEIGHT_RANGE: RangeInclusive<f32> = 1.0..=3.0;
pub const ROTATION_RANGE: RangeInclusive<f32> = 0.0..=360.0;
pub const OPACITY_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const SHADOW_BLUR_RANGE: RangeInclusive<f32> = 0.0..=20.0;
pub const SHADOW_OFFSET_RANGE: RangeInclusive<f32> = -20.0..=20.0;

/// 8-bit sRGB color. Serialized as `#rrggbb`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const WHITE: Rgb = Rgb([255, 255, 255]);
    pub const BLACK: Rgb = Rgb([0, 0, 0]);

    /// Parse `#rgb` or `#rrggbb` (the `#` is optional, hex is case-insensitive).
    pub fn from_hex(input: &str) -> Result<Self> {
        let hex = input.trim().trim_start_matches('#');
        let invalid = || WatermarkError::InvalidColor(input.to_string());
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return Err(invalid()),
        };
        let value = u32::from_str_radix(&expanded, 16).map_err(|_| invalid())?;
        Ok(Rgb([
            ((value >> 16) & 0xff) as u8,
            ((value >> 8) & 0xff) as u8,
            (value & 0xff) as u8,
        ]))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Rgb {
    type Error = WatermarkError;

    fn try_from(value: String) -> Result<Self> {
        Rgb::from_hex(&value)
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_hex()
    }
}

/// Font families offered by the editor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FontFamily {
    #[default]
    #[serde(rename = "Arial")]
    Arial,
    #[serde(rename = "Courier New")]
    CourierNew,
    #[serde(rename = "Georgia")]
    Georgia,
    #[serde(rename = "Times New Roman")]
    TimesNewRoman,
    #[serde(rename = "Verdana")]
    Verdana,
    #[serde(rename = "Tahoma")]
    Tahoma,
    #[serde(rename = "Trebuchet MS")]
    TrebuchetMs,
    #[serde(rename = "Impact")]
    Impact,
    #[serde(rename = "Comic Sans MS")]
    ComicSansMs,
    #[serde(rename = "Lucida Console")]
    LucidaConsole,
}

/// Generic family used when the named font is not installed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenericFamily {
    SansSerif,
    Serif,
    Monospace,
}

impl FontFamily {
    pub fn name(&self) -> &'static str {
        match self {
            FontFamily::Arial => "Arial",
            FontFamily::CourierNew => "Courier New",
            FontFamily::Georgia => "Georgia",
            FontFamily::TimesNewRoman => "Times New Roman",
            FontFamily::Verdana => "Verdana",
            FontFamily::Tahoma => "Tahoma",
            FontFamily::TrebuchetMs => "Trebuchet MS",
            FontFamily::Impact => "Impact",
            FontFamily::ComicSansMs => "Comic Sans MS",
            FontFamily::LucidaConsole => "Lucida Console",
        }
    }

    pub fn all() -> &'static [FontFamily] {
        &[
            FontFamily::Arial,
            FontFamily::CourierNew,
            FontFamily::Georgia,
            FontFamily::TimesNewRoman,
            FontFamily::Verdana,
            FontFamily::Tahoma,
            FontFamily::TrebuchetMs,
            FontFamily::Impact,
            FontFamily::ComicSansMs,
            FontFamily::LucidaConsole,
        ]
    }

    /// Case-insensitive lookup by display name.
    pub fn from_name(name: &str) -> Option<FontFamily> {
        Self::all()
            .iter()
            .copied()
            .find(|f| f.name().eq_ignore_ascii_case(name.trim()))
    }

    pub fn generic(&self) -> GenericFamily {
        match self {
            FontFamily::CourierNew | FontFamily::LucidaConsole => GenericFamily::Monospace,
            FontFamily::Georgia | FontFamily::TimesNewRoman => GenericFamily::Serif,
            _ => GenericFamily::SansSerif,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
    Bolder,
    Lighter,
}

impl FontWeight {
    pub fn label(&self) -> &'static str {
        match self {
            FontWeight::Normal => "normal",
            FontWeight::Bold => "bold",
            FontWeight::Bolder => "bolder",
            FontWeight::Lighter => "lighter",
        }
    }

    pub fn all() -> &'static [FontWeight] {
        &[FontWeight::Normal, FontWeight::Bold, FontWeight::Bolder, FontWeight::Lighter]
    }

    /// CSS numeric weight. `bolder`/`lighter` are resolved against a
    /// `normal` (400) parent.
    pub fn css_weight(&self) -> u16 {
        match self {
            FontWeight::Normal => 400,
            FontWeight::Bold => 700,
            FontWeight::Bolder => 700,
            FontWeight::Lighter => 100,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

impl FontStyle {
    pub fn label(&self) -> &'static str {
        match self {
            FontStyle::Normal => "normal",
            FontStyle::Italic => "italic",
            FontStyle::Oblique => "oblique",
        }
    }

    pub fn all() -> &'static [FontStyle] {
        &[FontStyle::Normal, FontStyle::Italic, FontStyle::Oblique]
    }

    pub fn is_slanted(&self) -> bool {
        !matches!(self, FontStyle::Normal)
    }
}

/// Text alignment options.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlignment {
    Left,
    #[default]
    Center,
    Right,
}

impl TextAlignment {
    pub fn label(&self) -> &'static str {
        match self {
            TextAlignment::Left => "Left",
            TextAlignment::Center => "Center",
            TextAlignment::Right => "Right",
        }
    }

    pub fn all() -> &'static [TextAlignment] {
        &[TextAlignment::Left, TextAlignment::Center, TextAlignment::Right]
    }

    /// Horizontal offset of the text block from the anchor for a block of
    /// width `width`.
    pub fn offset(&self, width: f32) -> f32 {
        match self {
            TextAlignment::Left => 0.0,
            TextAlignment::Center => -width * 0.5,
            TextAlignment::Right => -width,
        }
    }
}

/// Drop shadow applied to the background box and every glyph.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Shadow {
    pub color: Rgb,
    pub blur: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Default for Shadow {
    fn default() -> Self {
        Self { color: Rgb::BLACK, blur: 0.0, offset_x: 0.0, offset_y: 0.0 }
    }
}

impl Shadow {
    /// A shadow only shows when it is blurred or displaced.
    pub fn is_visible(&self) -> bool {
        self.blur > 0.0 || self.offset_x != 0.0 || self.offset_y != 0.0
    }
}

/// Translucent box drawn behind the text block.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Background {
    pub color: Rgb,
    pub opacity: f32,
}

impl Default for Background {
    fn default() -> Self {
        Self { color: Rgb::WHITE, opacity: 0.0 }
    }
}

/// Everything the compositor needs to know about the text overlay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkStyle {
    pub text: String,
    pub font_family: FontFamily,
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    /// Multiplier applied to `font_size` for the distance between lines.
    pub line_height: f32,
    pub text_align: TextAlignment,
    pub color: Rgb,
    pub opacity: f32,
    /// Clockwise, in degrees.
    pub rotation: f32,
    pub shadow: Shadow,
    pub background: Background,
}

impl Default for WatermarkStyle {
    fn default() -> Self {
        Self {
            text: "Sample Watermark".to_string(),
            font_family: FontFamily::Arial,
            font_size: 24.0,
            font_weight: FontWeight::Normal,
            font_style: FontStyle::Normal,
            line_height: 1.2,
            text_align: TextAlignment::Center,
            color: Rgb::WHITE,
            opacity: 0.5,
            rotation: 0.0,
            shadow: Shadow::default(),
            background: Background::default(),
        }
    }
}

impl WatermarkStyle {
    /// Copy with every numeric field pulled into the range its widget
    /// allows. Rotation is rounded to whole degrees.
    pub fn sanitized(&self) -> WatermarkStyle {
        let defaults = WatermarkStyle::default();
        WatermarkStyle {
            text: self.text.clone(),
            font_family: self.font_family,
            font_size: clamp_or(self.font_size, &FONT_SIZE_RANGE, defaults.font_size),
            font_weight: self.font_weight,
            font_style: self.font_style,
            line_height: clamp_or(
                (self.line_height * 10.0).round() / 10.0,
                &LINE_HEIGHT_RANGE,
                defaults.line_height,
            ),
            text_align: self.text_align,
            color: self.color,
            opacity: clamp_or(self.opacity, &OPACITY_RANGE, defaults.opacity),
            rotation: clamp_or(self.rotation.round(), &ROTATION_RANGE, 0.0),
            shadow: Shadow {
                color: self.shadow.color,
                blur: clamp_or(self.shadow.blur, &SHADOW_BLUR_RANGE, 0.0),
                offset_x: clamp_or(self.shadow.offset_x, &SHADOW_OFFSET_RANGE, 0.0),
                offset_y: clamp_or(self.shadow.offset_y, &SHADOW_OFFSET_RANGE, 0.0),
            },
            background: Background {
                color: self.background.color,
                opacity: clamp_or(self.background.opacity, &OPACITY_RANGE, 0.0),
            },
        }
    }

    /// Split on explicit newlines. Always yields at least one (possibly empty) line.
    pub fn lines(&self) -> Vec<&str> {
        self.text.split('\n').collect()
    }

    pub fn line_height_px(&self) -> f32 {
        self.font_size.max(0.0) * self.line_height
    }

    pub fn from_json_str(json: &str) -> Result<WatermarkStyle> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a style preset from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<WatermarkStyle> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

fn clamp_or(value: f32, range: &RangeInclusive<f32>, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(*range.start(), *range.end())
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_hex() {
        assert_eq!(Rgb::from_hex("#fff").unwrap(), Rgb::WHITE);
        assert_eq!(Rgb::from_hex("#1A2b3C").unwrap(), Rgb([0x1a, 0x2b, 0x3c]));
        assert_eq!(Rgb::from_hex("00ff00").unwrap(), Rgb([0, 255, 0]));
    }

    #[test]
    fn rejects_malformed_hex() {
        for bad in ["", "#", "#12", "#12345", "#gggggg", "#1234567", "#+12"] {
            assert!(
                matches!(Rgb::from_hex(bad), Err(WatermarkError::InvalidColor(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn alignment_offsets() {
        for w in [0.0, 1.0, 37.5, 812.0] {
            assert_eq!(TextAlignment::Left.offset(w), 0.0);
            assert_eq!(TextAlignment::Center.offset(w), -w / 2.0);
            assert_eq!(TextAlignment::Right.offset(w), -w);
        }
    }

    #[test]
    fn defaults_match_editor_start_state() {
        let s = WatermarkStyle::default();
        assert_eq!(s.text, "Sample Watermark");
        assert_eq!(s.font_size, 24.0);
        assert_eq!(s.line_height, 1.2);
        assert_eq!(s.text_align, TextAlignment::Center);
        assert_eq!(s.opacity, 0.5);
        assert_eq!(s.background.opacity, 0.0);
    }

    #[test]
    fn sanitized_clamps_to_widget_ranges() {
        let mut s = WatermarkStyle::default();
        s.font_size = 2.0;
        s.line_height = 7.0;
        s.rotation = 400.4;
        s.opacity = -0.2;
        s.shadow.blur = 99.0;
        s.shadow.offset_x = -50.0;
        s.background.opacity = f32::NAN;
        let c = s.sanitized();
        assert_eq!(c.font_size, 10.0);
        assert_eq!(c.line_height, 3.0);
        assert_eq!(c.rotation, 360.0);
        assert_eq!(c.opacity, 0.0);
        assert_eq!(c.shadow.blur, 20.0);
        assert_eq!(c.shadow.offset_x, -20.0);
        assert_eq!(c.background.opacity, 0.0);
    }

    #[test]
    fn preset_missing_fields_take_defaults() {
        let s = WatermarkStyle::from_json_str(
            r##"{ "text": "© ACME", "font_family": "Courier New", "color": "#f00",
                 "shadow": { "blur": 4 } }"##,
        )
        .unwrap();
        assert_eq!(s.text, "© ACME");
        assert_eq!(s.font_family, FontFamily::CourierNew);
        assert_eq!(s.color, Rgb([255, 0, 0]));
        assert_eq!(s.shadow.blur, 4.0);
        assert_eq!(s.shadow.color, Rgb::BLACK);
        assert_eq!(s.font_size, 24.0);
    }

    #[test]
    fn preset_with_bad_color_fails() {
        let err = WatermarkStyle::from_json_str(r#"{ "color": "red" }"#).unwrap_err();
        assert!(matches!(err, WatermarkError::Json(_)));
    }

    #[test]
    fn preset_json_keeps_style() {
        let mut s = WatermarkStyle::default();
        s.text = "two\nlines".into();
        s.font_weight = FontWeight::Bolder;
        s.background = Background { color: Rgb([1, 2, 3]), opacity: 0.25 };
        let back = WatermarkStyle::from_json_str(&s.to_json_string().unwrap()).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn family_lookup_is_case_insensitive() {
        assert_eq!(FontFamily::from_name("times new roman"), Some(FontFamily::TimesNewRoman));
        assert_eq!(FontFamily::from_name("Papyrus"), None);
        assert_eq!(FontFamily::all().len(), 10);
    }

    #[test]
    fn empty_text_is_one_empty_line() {
        let mut s = WatermarkStyle::default();
        s.text.clear();
        assert_eq!(s.lines(), vec![""]);
    }
}
