/// UI module
///
/// Canvas programs for the three render surfaces plus the grid and detail
/// view builders. Canvas programs only borrow viewer state and raise
/// messages; they never mutate shared state themselves.

pub mod annotation_canvas;
pub mod crop_canvas;
pub mod detail;
pub mod gesture;
pub mod grid;
pub mod image_canvas;
