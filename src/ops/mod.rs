pub mod compositor;
pub mod crop;
pub mod filters;
pub mod text;
