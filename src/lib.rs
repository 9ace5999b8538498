//! WatermarkFE: draw a styled, rotatable text watermark onto a raster
//! image, drag it into place, crop, and export the result as PNG.
//!
//! [`editor::Editor`] is the headless core used by both the egui front end
//! ([`app`]) and the command line ([`cli`]).

pub mod app;
pub mod cli;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod interaction;
pub mod io;
pub mod logger;
pub mod ops;
pub mod style;

pub use editor::Editor;
pub use error::{Result, WatermarkError};
pub use geometry::{CropRegion, DisplayBox, ImagePoint, Position};
pub use interaction::{EditMode, InteractionState};
pub use style::WatermarkStyle;
