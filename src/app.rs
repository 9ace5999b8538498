use std::path::PathBuf;
use std::sync::mpsc;

use eframe::egui;
use image::RgbaImage;

use crate::editor::Editor;
use crate::geometry::{DisplayBox, ImagePoint, Position};
use crate::interaction::EditMode;
use crate::io::{self, DEFAULT_EXPORT_NAME, IMAGE_EXTENSIONS};
use crate::style::{
    FontFamily, FontStyle, FontWeight, Rgb, TextAlignment, WatermarkStyle, FONT_SIZE_RANGE,
    LINE_HEIGHT_RANGE, OPACITY_RANGE, ROTATION_RANGE, SHADOW_BLUR_RANGE, SHADOW_OFFSET_RANGE,
};

// ============================================================================
// ASYNC IO PIPELINE — background image decoding
// ============================================================================

/// Result delivered from the background decode thread.
pub enum IoResult {
    /// An image file was decoded, ready to replace the current one.
    ImageLoaded { image: RgbaImage, path: PathBuf },
    /// Image decoding failed; the editor keeps its current image.
    LoadFailed(String),
}

/// Text buffers behind the hex color fields, so partial input can be typed
/// without clobbering the last valid color.
#[derive(Default)]
struct HexInputs {
    text: String,
    shadow: String,
    background: String,
}

pub struct WatermarkApp {
    editor: Editor,
    texture: Option<egui::TextureHandle>,
    texture_generation: u64,
    /// Present while a decode is in flight; at most one at a time.
    io_rx: Option<mpsc::Receiver<IoResult>>,
    status: Option<String>,
    hex: HexInputs,
}

impl WatermarkApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self {
            editor: Editor::new(),
            texture: None,
            texture_generation: u64::MAX,
            io_rx: None,
            status: None,
            hex: HexInputs::default(),
        }
    }

    fn is_loading(&self) -> bool {
        self.io_rx.is_some()
    }

    /// Decode `path` on a worker thread; the result arrives through `io_rx`.
    fn start_load(&mut self, ctx: &egui::Context, path: PathBuf) {
        if self.is_loading() {
            return;
        }
        let (tx, rx) = mpsc::channel();
        let ctx = ctx.clone();
        rayon::spawn(move || {
            let result = match io::load_image_sync(&path) {
                Ok(image) => IoResult::ImageLoaded { image, path },
                Err(e) => IoResult::LoadFailed(format!("{}: {}", path.display(), e)),
            };
            let _ = tx.send(result);
            ctx.request_repaint();
        });
        self.io_rx = Some(rx);
        self.status = Some("Loading…".to_string());
    }

    fn poll_io(&mut self) {
        let Some(rx) = &self.io_rx else {
            return;
        };
        match rx.try_recv() {
            Ok(IoResult::ImageLoaded { image, path }) => {
                self.editor.load_image(image);
                self.status = Some(format!("Opened {}", path.display()));
                self.io_rx = None;
            }
            Ok(IoResult::LoadFailed(msg)) => {
                log::warn!("load failed: {msg}");
                self.status = Some(format!("Could not open image: {msg}"));
                self.io_rx = None;
            }
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => {
                self.io_rx = None;
            }
        }
    }

    fn pick_image(&mut self, ctx: &egui::Context) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_file()
        {
            self.start_load(ctx, path);
        }
    }

    fn download(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(DEFAULT_EXPORT_NAME)
            .add_filter("PNG", &["png"])
            .save_file()
        else {
            return;
        };
        self.status = Some(match self.editor.export_png(&path) {
            Ok(()) => format!("Saved {}", path.display()),
            Err(e) => {
                log::error!("export failed: {e}");
                format!("Save failed: {e}")
            }
        });
    }

    fn load_preset(&mut self) {
        let Some(path) = rfd::FileDialog::new().add_filter("Style preset", &["json"]).pick_file() else {
            return;
        };
        match WatermarkStyle::load(&path) {
            Ok(style) => {
                self.editor.set_style(style.sanitized());
                self.hex = HexInputs::default();
                self.status = Some(format!("Loaded preset {}", path.display()));
            }
            Err(e) => self.status = Some(format!("Preset not loaded: {e}")),
        }
    }

    fn save_preset(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .set_file_name("watermark-style.json")
            .add_filter("Style preset", &["json"])
            .save_file()
        else {
            return;
        };
        self.status = Some(match self.editor.style().save(&path) {
            Ok(()) => format!("Saved preset {}", path.display()),
            Err(e) => format!("Preset not saved: {e}"),
        });
    }

    // -- Panels -------------------------------------------------------------

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Image Watermark Tool");
            ui.separator();
            if ui.add_enabled(!self.is_loading(), egui::Button::new("Upload Image…")).clicked() {
                self.pick_image(ui.ctx());
            }
            if ui
                .add_enabled(self.editor.has_image(), egui::Button::new("Download"))
                .clicked()
            {
                self.download();
            }
            if let Some(status) = &self.status {
                ui.separator();
                ui.label(status);
            }
        });
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        // Mode switch is only legal between gestures
        ui.add_enabled_ui(!self.editor.is_busy(), |ui| {
            ui.horizontal(|ui| {
                ui.label("Mode:");
                for mode in [EditMode::Watermark, EditMode::Crop] {
                    let selected = self.editor.mode() == mode;
                    if ui.selectable_label(selected, mode.label()).clicked() && !selected {
                        if let Err(e) = self.editor.set_mode(mode) {
                            log::warn!("{e}");
                        }
                    }
                }
            });
        });

        if self.editor.mode() == EditMode::Crop {
            ui.label("Drag on the image to select the area to keep.");
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(self.editor.can_confirm_crop(), egui::Button::new("Apply Crop"))
                    .clicked()
                {
                    match self.editor.confirm_crop() {
                        Ok(true) => self.status = Some("Cropped".to_string()),
                        Ok(false) => {}
                        Err(e) => self.status = Some(format!("Crop failed: {e}")),
                    }
                }
                if ui
                    .add_enabled(self.editor.crop_region().is_some(), egui::Button::new("Clear"))
                    .clicked()
                {
                    self.editor.cancel_crop();
                }
            });
        }
        ui.separator();

        let mut style = self.editor.style().clone();

        ui.label("Watermark Text");
        ui.add(egui::TextEdit::multiline(&mut style.text).desired_rows(3));

        egui::ComboBox::from_label("Font Family")
            .selected_text(style.font_family.name())
            .show_ui(ui, |ui| {
                for family in FontFamily::all() {
                    ui.selectable_value(&mut style.font_family, *family, family.name());
                }
            });
        ui.add(egui::Slider::new(&mut style.font_size, FONT_SIZE_RANGE).step_by(1.0).text("Font Size"));
        egui::ComboBox::from_label("Font Weight")
            .selected_text(style.font_weight.label())
            .show_ui(ui, |ui| {
                for weight in FontWeight::all() {
                    ui.selectable_value(&mut style.font_weight, *weight, weight.label());
                }
            });
        egui::ComboBox::from_label("Font Style")
            .selected_text(style.font_style.label())
            .show_ui(ui, |ui| {
                for fs in FontStyle::all() {
                    ui.selectable_value(&mut style.font_style, *fs, fs.label());
                }
            });
        ui.add(egui::Slider::new(&mut style.line_height, LINE_HEIGHT_RANGE).step_by(0.1).text("Line Height"));
        ui.horizontal(|ui| {
            ui.label("Align:");
            for align in TextAlignment::all() {
                ui.radio_value(&mut style.text_align, *align, align.label());
            }
        });

        ui.separator();
        color_row(ui, "Font Color", &mut style.color, &mut self.hex.text);
        ui.add(egui::Slider::new(&mut style.opacity, OPACITY_RANGE).step_by(0.01).text("Opacity"));
        ui.add(egui::Slider::new(&mut style.rotation, ROTATION_RANGE).step_by(1.0).text("Rotation (°)"));

        ui.separator();
        ui.label("Shadow");
        color_row(ui, "Shadow Color", &mut style.shadow.color, &mut self.hex.shadow);
        ui.add(egui::Slider::new(&mut style.shadow.blur, SHADOW_BLUR_RANGE).step_by(1.0).text("Blur"));
        ui.add(egui::Slider::new(&mut style.shadow.offset_x, SHADOW_OFFSET_RANGE).step_by(1.0).text("Offset X"));
        ui.add(egui::Slider::new(&mut style.shadow.offset_y, SHADOW_OFFSET_RANGE).step_by(1.0).text("Offset Y"));

        ui.separator();
        ui.label("Background");
        color_row(ui, "Background Color", &mut style.background.color, &mut self.hex.background);
        ui.add(
            egui::Slider::new(&mut style.background.opacity, OPACITY_RANGE)
                .step_by(0.01)
                .text("Background Opacity"),
        );

        self.editor.set_style(style);

        ui.separator();
        ui.add_enabled_ui(!self.editor.is_busy(), |ui| {
            let pos = self.editor.position();
            let (mut x, mut y) = (pos.x(), pos.y());
            let changed_x = ui.add(egui::Slider::new(&mut x, 0.0..=100.0).text("Position X %")).changed();
            let changed_y = ui.add(egui::Slider::new(&mut y, 0.0..=100.0).text("Position Y %")).changed();
            if changed_x || changed_y {
                self.editor.set_position(Position::new(x, y));
            }
        });

        ui.separator();
        ui.horizontal(|ui| {
            if ui.button("Load Preset…").clicked() {
                self.load_preset();
            }
            if ui.button("Save Preset…").clicked() {
                self.save_preset();
            }
        });
    }

    fn canvas(&mut self, ui: &mut egui::Ui) {
        if self.editor.composite().is_none() {
            ui.centered_and_justified(|ui| {
                ui.label(if self.is_loading() { "Loading…" } else { "Upload an image to start" });
            });
            return;
        }

        let generation = self.editor.generation();
        if self.texture.is_none() || self.texture_generation != generation {
            if let Some(composite) = self.editor.composite() {
                let size = [composite.width() as usize, composite.height() as usize];
                let color_image = egui::ColorImage::from_rgba_unmultiplied(size, composite.as_raw());
                match &mut self.texture {
                    Some(tex) => tex.set(color_image, egui::TextureOptions::LINEAR),
                    None => {
                        self.texture = Some(ui.ctx().load_texture(
                            "watermark_composite",
                            color_image,
                            egui::TextureOptions::LINEAR,
                        ))
                    }
                }
            }
            self.texture_generation = generation;
        }
        let (Some(texture), Some((w, h))) = (&self.texture, self.editor.dimensions()) else {
            return;
        };

        // Fit the bitmap into the panel without upscaling
        let avail = ui.available_size();
        let scale = (avail.x / w as f32).min(avail.y / h as f32).min(1.0).max(0.01);
        let size = egui::vec2(w as f32 * scale, h as f32 * scale);
        let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click_and_drag());
        let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
        ui.painter().image(texture.id(), rect, uv, egui::Color32::WHITE);

        let display = DisplayBox::new(rect.min.x, rect.min.y, rect.width(), rect.height());
        self.handle_pointer(ui, &response, &display);
        self.paint_crop_overlay(ui, &display, w, h);

        if self.editor.is_busy() {
            ui.ctx().set_cursor_icon(match self.editor.mode() {
                EditMode::Watermark => egui::CursorIcon::Grabbing,
                EditMode::Crop => egui::CursorIcon::Crosshair,
            });
        } else if response.hovered() {
            ui.ctx().set_cursor_icon(match self.editor.mode() {
                EditMode::Watermark => egui::CursorIcon::Grab,
                EditMode::Crop => egui::CursorIcon::Crosshair,
            });
        }
    }

    /// Press starts a gesture only on the canvas; moves and the release are
    /// observed anywhere in the window so a gesture cannot get stuck.
    fn handle_pointer(&mut self, ui: &egui::Ui, response: &egui::Response, display: &DisplayBox) {
        let (pressed, released, primary_down, pos) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.primary_down(),
                i.pointer.latest_pos(),
            )
        });

        if pressed && response.hovered() && !self.editor.is_busy() {
            if let Some(p) = pos {
                self.editor.pointer_down_client(p.x, p.y, display);
            }
            return;
        }

        if self.editor.is_busy() {
            if let Some(p) = pos {
                self.editor.pointer_move_client(p.x, p.y, display);
            }
            if released || !primary_down {
                self.editor.pointer_up();
            }
        }
    }

    fn paint_crop_overlay(&self, ui: &egui::Ui, display: &DisplayBox, w: u32, h: u32) {
        let Some(region) = self.editor.crop_region() else {
            return;
        };
        let r = region.normalized();
        let (x0, y0) = display.image_to_client(ImagePoint::new(r.x, r.y), w, h);
        let (x1, y1) = display.image_to_client(ImagePoint::new(r.x + r.width, r.y + r.height), w, h);
        let screen = egui::Rect::from_min_max(egui::pos2(x0, y0), egui::pos2(x1, y1));
        let painter = ui.painter();
        painter.rect_filled(screen, 0.0, egui::Color32::from_rgba_unmultiplied(255, 255, 0, 32));
        painter.rect_stroke(screen, 0.0, egui::Stroke::new(1.5, egui::Color32::YELLOW));
    }
}

/// Color picker button plus a hex text field. Invalid hex keeps the last
/// valid color.
fn color_row(ui: &mut egui::Ui, label: &str, color: &mut Rgb, hex: &mut String) {
    ui.horizontal(|ui| {
        ui.label(label);
        let mut rgb = color.0;
        if ui.color_edit_button_srgb(&mut rgb).changed() {
            *color = Rgb(rgb);
        }
        let resp = ui.add(egui::TextEdit::singleline(hex).desired_width(70.0));
        if resp.changed() {
            if let Ok(parsed) = Rgb::from_hex(hex) {
                *color = parsed;
            }
        }
        if !resp.has_focus() {
            *hex = color.to_hex();
        }
    });
}

impl eframe::App for WatermarkApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_io();
        if self.is_loading() {
            ctx.request_repaint();
        }

        // Files dropped onto the window load like an upload
        let dropped: Option<PathBuf> =
            ctx.input(|i| i.raw.dropped_files.iter().find_map(|f| f.path.clone()));
        if let Some(path) = dropped {
            self.start_load(ctx, path);
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.toolbar(ui));

        // The watermark panel only exists once an image has loaded
        if self.editor.has_image() {
            egui::SidePanel::right("controls")
                .resizable(true)
                .default_width(320.0)
                .show(ctx, |ui| {
                    egui::ScrollArea::vertical().show(ui, |ui| self.controls(ui));
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| self.canvas(ui));
    }
}
