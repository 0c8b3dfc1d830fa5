/// Shared data structures for the viewer state
///
/// These structs represent the metadata handed to the viewer by the
/// surrounding application: image records, grid entries, annotation points,
/// and the configuration knobs. The viewer never mutates an ImageRecord.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Immutable handle to a single diagnostic image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Stable identifier assigned by the instrument
    pub uuid: String,
    /// Full-resolution image on disk
    pub path: PathBuf,
    /// Optional pre-rendered thumbnail; the full image is used when absent
    #[serde(default)]
    pub thumbnail: Option<PathBuf>,
}

impl ImageRecord {
    /// Path the grid tile should render.
    pub fn thumbnail_path(&self) -> &PathBuf {
        self.thumbnail.as_ref().unwrap_or(&self.path)
    }
}

/// One slot in the paged grid. Replaced wholesale when metadata is refetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerEntry {
    pub index: usize,
    pub record: ImageRecord,
    /// Number of annotation tags the instrument attached to this image
    #[serde(default)]
    pub tag_count: usize,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub reference_id: Option<String>,
}

/// Where an annotation sits, in native image coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnnotationShape {
    /// A point label attached to a single pixel position
    Point { x: f32, y: f32 },
    /// An object label attached to the center of a detected object
    Object { center_x: f32, center_y: f32 },
}

/// A single cell/object label supplied by the instrument for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Assay identity used for visibility filtering (e.g. "wbc", "bacteria")
    pub identity: String,
    /// Text drawn on the overlay
    pub label: String,
    #[serde(flatten)]
    pub shape: AnnotationShape,
}

impl Annotation {
    /// Anchor position in native coordinates.
    pub fn position(&self) -> (f32, f32) {
        match self.shape {
            AnnotationShape::Point { x, y } => (x, y),
            AnnotationShape::Object { center_x, center_y } => (center_x, center_y),
        }
    }
}

/// Which optional toolbar affordances the surrounding application enables.
/// Each boolean gates one button and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolbarOptions {
    pub show_add_to_record_mark: bool,
    pub show_cell_labels_button: bool,
    pub show_area_of_interest_button: bool,
    pub show_invert_colors_button: bool,
    pub show_additional_info_button: bool,
}

impl Default for ToolbarOptions {
    fn default() -> Self {
        Self {
            show_add_to_record_mark: true,
            show_cell_labels_button: true,
            show_area_of_interest_button: true,
            show_invert_colors_button: true,
            show_additional_info_button: true,
        }
    }
}

/// What the image surface shows when a bitmap fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFailurePolicy {
    /// Leave the surface blank (the source behavior)
    Blank,
    /// Substitute a generated placeholder raster
    Placeholder,
}

/// Viewer configuration. Zoom bounds and the crop aspect ratio are policy
/// supplied by the surrounding application, not constants of the viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerConfig {
    /// Height of the detail surface; displayed width follows the image aspect
    pub surface_height: f32,
    /// Zoom ceiling; the floor is always 1.0
    pub max_zoom: f32,
    /// Signed step applied by the zoom buttons and wheel
    pub zoom_step: f32,
    /// Crop bar height as a fraction of surface width (height : width)
    pub crop_aspect: f32,
    /// Distance from the surface bottom at which the crop toolbar relocates
    pub crop_toolbar_threshold: f32,
    pub load_failure: LoadFailurePolicy,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            surface_height: 600.0,
            max_zoom: 2.5,
            zoom_step: 0.5,
            crop_aspect: 145.0 / 430.0,
            crop_toolbar_threshold: 75.0,
            load_failure: LoadFailurePolicy::Placeholder,
        }
    }
}
