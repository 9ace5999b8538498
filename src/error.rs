//! Error type shared by the editor, the IO helpers and the headless mode.

use thiserror::Error;

/// Errors surfaced by editor operations.
///
/// Rendering never fails; everything here comes from IO, decoding, user
/// input parsing, or an operation that is not legal in the current state.
#[derive(Error, Debug)]
pub enum WatermarkError {
    /// I/O error while reading or writing a file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The image bytes could not be decoded or encoded
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Style preset could not be parsed or written
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A hex color string that is neither `#rgb` nor `#rrggbb`
    #[error("invalid color '{0}'")]
    InvalidColor(String),

    /// No installed font matched the requested family or any fallback
    #[error("no usable font for '{0}'")]
    FontUnavailable(String),

    /// An operation needs a loaded image
    #[error("no image loaded")]
    NoImage,

    /// Mode switch attempted while a drag or crop gesture is in progress
    #[error("cannot switch mode while {0}")]
    Busy(&'static str),

    /// Malformed command-line value
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, WatermarkError>;
