// ============================================================================
// EDITOR — owns the image and watermark configuration, drives re-renders
// ============================================================================

use std::path::Path;

use image::RgbaImage;

use crate::error::{Result, WatermarkError};
use crate::geometry::{client_to_image, CropRegion, DisplayBox, ImagePoint, Position};
use crate::interaction::{EditMode, Interaction, InteractionState, MoveOutcome};
use crate::io;
use crate::ops::compositor;
use crate::ops::crop::crop_image;
use crate::ops::text::{FontBook, GlyphSource};
use crate::style::WatermarkStyle;

/// The single owner of editor state. Every mutation of the image, style
/// or position marks the composite dirty; [`Editor::composite`] re-renders
/// on the next call.
pub struct Editor {
    image: Option<RgbaImage>,
    style: WatermarkStyle,
    position: Position,
    interaction: Interaction,
    fonts: FontBook,
    /// Replaces system font lookup when set.
    glyph_source: Option<Box<dyn GlyphSource>>,
    composite: Option<RgbaImage>,
    dirty: bool,
    /// Bumped on every re-render so views know when to re-upload.
    generation: u64,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    pub fn new() -> Self {
        Self {
            image: None,
            style: WatermarkStyle::default(),
            position: Position::default(),
            interaction: Interaction::new(),
            fonts: FontBook::new(),
            glyph_source: None,
            composite: None,
            dirty: true,
            generation: 0,
        }
    }

    /// Editor that measures and draws text with `glyphs` instead of system fonts.
    pub fn with_glyph_source(glyphs: Box<dyn GlyphSource>) -> Self {
        Self { glyph_source: Some(glyphs), ..Self::new() }
    }

    // -- Image lifecycle --------------------------------------------------

    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.image.as_ref().map(|i| i.dimensions())
    }

    /// Replace the image. The watermark goes back to the center and any
    /// gesture or pending crop is dropped.
    pub fn load_image(&mut self, image: RgbaImage) {
        log::info!("image loaded: {}x{}", image.width(), image.height());
        self.image = Some(image);
        self.position = Position::default();
        self.interaction.reset();
        self.mark_dirty();
    }

    /// Decode and load a file. On failure the editor is left untouched.
    pub fn open(&mut self, path: &Path) -> Result<()> {
        let image = io::load_image_sync(path).inspect_err(|e| {
            log::warn!("could not open {}: {}", path.display(), e);
        })?;
        self.load_image(image);
        Ok(())
    }

    /// Decode and load in-memory file contents. On failure the editor is
    /// left untouched.
    pub fn open_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let image = io::decode_bytes(bytes)?;
        self.load_image(image);
        Ok(())
    }

    // -- Configuration ------------------------------------------------------

    pub fn style(&self) -> &WatermarkStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: WatermarkStyle) {
        if style != self.style {
            self.style = style;
            self.mark_dirty();
        }
    }

    pub fn update_style(&mut self, f: impl FnOnce(&mut WatermarkStyle)) {
        let mut style = self.style.clone();
        f(&mut style);
        self.set_style(style);
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn set_position(&mut self, position: Position) {
        if position != self.position {
            self.position = position;
            self.mark_dirty();
        }
    }

    // -- Pointer input (image pixel space) ------------------------------------

    pub fn mode(&self) -> EditMode {
        self.interaction.mode()
    }

    pub fn interaction_state(&self) -> InteractionState {
        self.interaction.state()
    }

    /// True while a drag or crop gesture is in progress.
    pub fn is_busy(&self) -> bool {
        !self.interaction.is_idle()
    }

    /// Switch edit mode; refused while a gesture is in progress.
    pub fn set_mode(&mut self, mode: EditMode) -> Result<()> {
        self.interaction.set_mode(mode)
    }

    pub fn pointer_down(&mut self, point: ImagePoint) {
        if self.image.is_none() {
            return;
        }
        self.interaction.pointer_down(point, self.position);
    }

    pub fn pointer_move(&mut self, point: ImagePoint) {
        let Some((w, h)) = self.dimensions() else {
            return;
        };
        if let MoveOutcome::Moved(position) = self.interaction.pointer_move(point, w, h) {
            self.set_position(position);
        }
    }

    pub fn pointer_up(&mut self) {
        self.interaction.pointer_up();
    }

    // -- Pointer input (screen space) -------------------------------------

    /// Map client coordinates into image pixels through the display box.
    pub fn client_to_image(&self, client_x: f32, client_y: f32, display: &DisplayBox) -> Option<ImagePoint> {
        let (w, h) = self.dimensions()?;
        Some(client_to_image(client_x, client_y, display, w, h))
    }

    pub fn pointer_down_client(&mut self, client_x: f32, client_y: f32, display: &DisplayBox) {
        if let Some(p) = self.client_to_image(client_x, client_y, display) {
            self.pointer_down(p);
        }
    }

    pub fn pointer_move_client(&mut self, client_x: f32, client_y: f32, display: &DisplayBox) {
        if let Some(p) = self.client_to_image(client_x, client_y, display) {
            self.pointer_move(p);
        }
    }

    // -- Crop ------------------------------------------------------------------

    pub fn crop_region(&self) -> Option<CropRegion> {
        self.interaction.crop_region()
    }

    /// Whether [`Editor::confirm_crop`] would produce a new image.
    pub fn can_confirm_crop(&self) -> bool {
        match (self.crop_region(), self.dimensions()) {
            (Some(region), Some((w, h))) => {
                !region.is_degenerate() && region.normalized().clamp_to(w, h).is_some()
            }
            _ => false,
        }
    }

    /// Replace the image with the selected region and return to watermark
    /// mode. Returns `Ok(false)` (and changes nothing) for a missing or
    /// zero-area selection.
    pub fn confirm_crop(&mut self) -> Result<bool> {
        let image = self.image.as_ref().ok_or(WatermarkError::NoImage)?;
        let Some(region) = self.crop_region() else {
            return Ok(false);
        };
        let Some(cropped) = crop_image(image, &region) else {
            log::debug!("crop rejected: {:?}", region.normalized());
            return Ok(false);
        };

        log::info!(
            "cropped {}x{} -> {}x{}",
            image.width(),
            image.height(),
            cropped.width(),
            cropped.height()
        );
        self.image = Some(cropped);
        self.interaction.clear_crop();
        self.interaction.set_mode(EditMode::Watermark)?;
        self.mark_dirty();
        Ok(true)
    }

    /// Discard the pending selection, staying in crop mode.
    pub fn cancel_crop(&mut self) {
        self.interaction.clear_crop();
    }

    // -- Rendering / export ------------------------------------------------------

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Base image with the watermark drawn on it, re-rendered if anything
    /// changed since the last call.
    pub fn composite(&mut self) -> Option<&RgbaImage> {
        let image = self.image.as_ref()?;
        if self.dirty || self.composite.is_none() {
            let glyphs: Option<&dyn GlyphSource> = match &self.glyph_source {
                Some(g) => Some(&**g),
                None => self.fonts.font_for(&self.style).map(|f| f as &dyn GlyphSource),
            };
            self.composite = Some(compositor::render(image, &self.style, self.position, glyphs));
            self.dirty = false;
            self.generation += 1;
        }
        self.composite.as_ref()
    }

    /// The composited image as PNG bytes.
    pub fn encode_png(&mut self) -> Result<Vec<u8>> {
        let image = self.composite().ok_or(WatermarkError::NoImage)?;
        io::encode_png_bytes(image)
    }

    pub fn export_png(&mut self, path: &Path) -> Result<()> {
        let image = self.composite().ok_or(WatermarkError::NoImage)?;
        io::write_png(image, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::text::BoxGlyphs;

    fn editor_with(w: u32, h: u32) -> Editor {
        let mut ed = Editor::with_glyph_source(Box::new(BoxGlyphs::default()));
        ed.load_image(RgbaImage::new(w, h));
        ed
    }

    #[test]
    fn rerenders_only_when_dirty() {
        let mut ed = editor_with(20, 20);
        ed.composite();
        let g = ed.generation();
        ed.composite();
        assert_eq!(ed.generation(), g);

        ed.update_style(|s| s.rotation = 45.0);
        ed.composite();
        assert_eq!(ed.generation(), g + 1);

        // Setting the same value is not a change
        ed.update_style(|s| s.rotation = 45.0);
        ed.composite();
        assert_eq!(ed.generation(), g + 1);
    }

    #[test]
    fn no_image_means_no_composite() {
        let mut ed = Editor::new();
        assert!(ed.composite().is_none());
        assert!(matches!(ed.encode_png(), Err(WatermarkError::NoImage)));
        assert!(matches!(ed.confirm_crop(), Err(WatermarkError::NoImage)));
    }

    #[test]
    fn pointer_input_without_image_is_ignored() {
        let mut ed = Editor::new();
        ed.pointer_down(ImagePoint::new(1.0, 1.0));
        assert!(!ed.is_busy());
        ed.pointer_move(ImagePoint::new(9.0, 9.0));
        assert_eq!(ed.position(), Position::default());
    }

    #[test]
    fn loading_resets_position_and_gesture() {
        let mut ed = editor_with(100, 100);
        ed.set_position(Position::new(5.0, 5.0));
        ed.pointer_down(ImagePoint::new(1.0, 1.0));
        ed.load_image(RgbaImage::new(10, 10));
        assert_eq!(ed.position(), Position::default());
        assert!(!ed.is_busy());
    }
}
