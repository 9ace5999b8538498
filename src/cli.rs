// ============================================================================
// WatermarkFE CLI — headless single-image watermarking
// ============================================================================
//
// Usage examples:
//   WatermarkFE --input photo.png --text "© 2024 ACME" --output out.png
//   WatermarkFE -i photo.jpg --style preset.json --rotation 30 --x 80 --y 90
//   WatermarkFE -i photo.png --crop 10,10,100,50 --background-opacity 0.4
//
// No GUI is opened in CLI mode. One input, one output.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::editor::Editor;
use crate::error::{Result, WatermarkError};
use crate::geometry::{CropRegion, ImagePoint, Position};
use crate::interaction::EditMode;
use crate::io::DEFAULT_EXPORT_NAME;
use crate::style::{FontFamily, FontStyle, FontWeight, Rgb, TextAlignment, WatermarkStyle};

/// WatermarkFE headless mode.
///
/// Draws a text watermark onto one image and writes the result as PNG.
#[derive(Parser, Debug)]
#[command(
    name = "WatermarkFE",
    about = "WatermarkFE headless watermarking",
    long_about = "Draw a text watermark onto an image without opening the GUI.\n\
                  Style values start from the defaults (or --style preset) and\n\
                  any flag given overrides them.\n\n\
                  Example:\n  \
                  WatermarkFE --input photo.png --text \"© ACME\" --output out.png"
)]
pub struct CliArgs {
    /// Input image (PNG, JPEG, GIF, WEBP, BMP).
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Output PNG path.
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_EXPORT_NAME)]
    pub output: PathBuf,

    /// JSON style preset; missing fields take the defaults.
    #[arg(short, long, value_name = "PRESET.json")]
    pub style: Option<PathBuf>,

    /// Write the final (sanitized) style to this JSON file.
    #[arg(long, value_name = "PRESET.json")]
    pub save_style: Option<PathBuf>,

    /// Watermark text. "\n" starts a new line.
    #[arg(short, long)]
    pub text: Option<String>,

    /// Font family, e.g. "Arial", "Courier New".
    #[arg(long, value_parser = parse_family)]
    pub font: Option<FontFamily>,

    /// Font size in pixels (10-500).
    #[arg(long)]
    pub font_size: Option<f32>,

    /// normal, bold, bolder, lighter.
    #[arg(long, value_parser = parse_weight)]
    pub font_weight: Option<FontWeight>,

    /// normal, italic, oblique.
    #[arg(long, value_parser = parse_font_style)]
    pub font_style: Option<FontStyle>,

    /// Line height multiplier (1.0-3.0).
    #[arg(long)]
    pub line_height: Option<f32>,

    /// left, center, right.
    #[arg(long, value_parser = parse_align)]
    pub align: Option<TextAlignment>,

    /// Text color, #rgb or #rrggbb.
    #[arg(long, value_parser = parse_color)]
    pub color: Option<Rgb>,

    /// Watermark opacity (0-1).
    #[arg(long)]
    pub opacity: Option<f32>,

    /// Clockwise rotation in degrees (0-360).
    #[arg(long)]
    pub rotation: Option<f32>,

    #[arg(long, value_parser = parse_color)]
    pub shadow_color: Option<Rgb>,

    /// Shadow blur (0-20).
    #[arg(long)]
    pub shadow_blur: Option<f32>,

    /// Shadow x offset (-20-20).
    #[arg(long, allow_hyphen_values = true)]
    pub shadow_offset_x: Option<f32>,

    /// Shadow y offset (-20-20).
    #[arg(long, allow_hyphen_values = true)]
    pub shadow_offset_y: Option<f32>,

    #[arg(long, value_parser = parse_color)]
    pub background_color: Option<Rgb>,

    /// Background box opacity (0-1). 0 disables the box.
    #[arg(long)]
    pub background_opacity: Option<f32>,

    /// Anchor x as a percentage of the width (0-100).
    #[arg(long, default_value_t = 50.0)]
    pub x: f32,

    /// Anchor y as a percentage of the height (0-100).
    #[arg(long, default_value_t = 50.0)]
    pub y: f32,

    /// Crop before watermarking: X,Y,WIDTH,HEIGHT in pixels.
    #[arg(long, value_parser = parse_crop, value_name = "X,Y,W,H")]
    pub crop: Option<CropRegion>,

    /// Debug-level logging and timing output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when `--input`/`-i` is present in the real process
    /// arguments. Used by `main()` to route before creating a window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--input" || a == "-i" || a.starts_with("--input="))
    }

    /// Defaults (or the preset) with every given flag applied on top.
    pub fn resolve_style(&self) -> Result<WatermarkStyle> {
        let mut style = match &self.style {
            Some(path) => WatermarkStyle::load(path)?,
            None => WatermarkStyle::default(),
        };
        if let Some(text) = &self.text {
            style.text = text.replace("\\n", "\n");
        }
        if let Some(v) = self.font {
            style.font_family = v;
        }
        if let Some(v) = self.font_size {
            style.font_size = v;
        }
        if let Some(v) = self.font_weight {
            style.font_weight = v;
        }
        if let Some(v) = self.font_style {
            style.font_style = v;
        }
        if let Some(v) = self.line_height {
            style.line_height = v;
        }
        if let Some(v) = self.align {
            style.text_align = v;
        }
        if let Some(v) = self.color {
            style.color = v;
        }
        if let Some(v) = self.opacity {
            style.opacity = v;
        }
        if let Some(v) = self.rotation {
            style.rotation = v;
        }
        if let Some(v) = self.shadow_color {
            style.shadow.color = v;
        }
        if let Some(v) = self.shadow_blur {
            style.shadow.blur = v;
        }
        if let Some(v) = self.shadow_offset_x {
            style.shadow.offset_x = v;
        }
        if let Some(v) = self.shadow_offset_y {
            style.shadow.offset_y = v;
        }
        if let Some(v) = self.background_color {
            style.background.color = v;
        }
        if let Some(v) = self.background_opacity {
            style.background.opacity = v;
        }
        Ok(style.sanitized())
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run headless processing and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    let start = Instant::now();
    match run_one(&args) {
        Ok(()) => {
            if args.verbose {
                println!(
                    "{} → {} ({:.0}ms)",
                    args.input.display(),
                    args.output.display(),
                    start.elapsed().as_secs_f64() * 1000.0
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}: {}", args.input.display(), e);
            ExitCode::FAILURE
        }
    }
}

fn run_one(args: &CliArgs) -> Result<()> {
    let style = args.resolve_style()?;

    let mut editor = Editor::new();
    editor.open(&args.input)?;

    if let Some(region) = args.crop {
        apply_crop(&mut editor, region)?;
    }

    editor.set_style(style);
    editor.set_position(Position::new(args.x, args.y));

    if let Some(path) = &args.save_style {
        editor.style().save(path)?;
    }

    write_output(&mut editor, &args.output)
}

/// Drive the crop gesture the same way a pointer drag would.
fn apply_crop(editor: &mut Editor, region: CropRegion) -> Result<()> {
    editor.set_mode(EditMode::Crop)?;
    editor.pointer_down(region.start);
    editor.pointer_move(region.end);
    editor.pointer_up();
    if !editor.confirm_crop()? {
        log::warn!("crop {:?} selects no pixels; image left uncropped", region.normalized());
        editor.set_mode(EditMode::Watermark)?;
    }
    Ok(())
}

fn write_output(editor: &mut Editor, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    editor.export_png(output)
}

// ============================================================================
// Value parsers
// ============================================================================

fn parse_family(s: &str) -> std::result::Result<FontFamily, String> {
    FontFamily::from_name(s).ok_or_else(|| {
        let names: Vec<&str> = FontFamily::all().iter().map(|f| f.name()).collect();
        format!("unknown font '{}'; expected one of: {}", s, names.join(", "))
    })
}

fn parse_weight(s: &str) -> std::result::Result<FontWeight, String> {
    FontWeight::all()
        .iter()
        .copied()
        .find(|w| w.label().eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown weight '{}'", s))
}

fn parse_font_style(s: &str) -> std::result::Result<FontStyle, String> {
    FontStyle::all()
        .iter()
        .copied()
        .find(|v| v.label().eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown font style '{}'", s))
}

fn parse_align(s: &str) -> std::result::Result<TextAlignment, String> {
    TextAlignment::all()
        .iter()
        .copied()
        .find(|a| a.label().eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown alignment '{}'", s))
}

fn parse_color(s: &str) -> std::result::Result<Rgb, String> {
    Rgb::from_hex(s).map_err(|e| e.to_string())
}

/// `X,Y,W,H` → crop corners `(X, Y)` and `(X + W, Y + H)`.
pub fn parse_crop(s: &str) -> std::result::Result<CropRegion, String> {
    let parts: Vec<f32> = s
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| WatermarkError::InvalidArgument(format!("crop '{}': {}", s, e)).to_string())?;
    let &[x, y, w, h] = parts.as_slice() else {
        return Err(WatermarkError::InvalidArgument(format!(
            "crop '{}': expected X,Y,WIDTH,HEIGHT",
            s
        ))
        .to_string());
    };
    Ok(CropRegion::new(ImagePoint::new(x, y), ImagePoint::new(x + w, y + h)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("WatermarkFE").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_override_defaults() {
        let args = parse(&[
            "-i", "in.png", "--text", "a\\nb", "--font", "georgia", "--align", "right",
            "--color", "#0f0", "--shadow-offset-x", "-4", "--rotation", "725",
        ]);
        let style = args.resolve_style().unwrap();
        assert_eq!(style.text, "a\nb");
        assert_eq!(style.font_family, FontFamily::Georgia);
        assert_eq!(style.text_align, TextAlignment::Right);
        assert_eq!(style.color, Rgb([0, 255, 0]));
        assert_eq!(style.shadow.offset_x, -4.0);
        // Sanitized into the widget range
        assert_eq!(style.rotation, 360.0);
        assert_eq!(args.output, PathBuf::from(DEFAULT_EXPORT_NAME));
    }

    #[test]
    fn crop_argument() {
        let r = parse_crop("10, 10, 100, 50").unwrap();
        assert_eq!(r.start, ImagePoint::new(10.0, 10.0));
        assert_eq!(r.end, ImagePoint::new(110.0, 60.0));
        assert!(parse_crop("1,2,3").is_err());
        assert!(parse_crop("a,b,c,d").is_err());
    }

    #[test]
    fn bad_values_are_rejected() {
        let base = ["WatermarkFE", "-i", "in.png"];
        for extra in [["--font", "Papyrus"], ["--color", "#12"], ["--font-weight", "heavy"]] {
            let argv = base.iter().chain(extra.iter()).copied();
            assert!(CliArgs::try_parse_from(argv).is_err());
        }
    }
}
