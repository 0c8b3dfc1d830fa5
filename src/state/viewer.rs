/// Viewer state machine
///
/// Owns every piece of shared view state: the grid ⇄ detail ⇄ crop mode,
/// pagination, the pan/zoom transform, the crop bar offset, record marks,
/// and the export round-trip status. The canvas programs receive read-only
/// borrows of this state and raise messages; only the state machine mutates
/// it (single-writer, unidirectional data flow).

use cgmath::Vector2;
use std::collections::HashSet;

use crate::geometry::{
    self, CropSelection, DisplaySize, NativeSize,
};
use super::data::{Annotation, ToolbarOptions, ViewerConfig, ViewerEntry};
use super::marking::{MarkOutcome, RecordMarking};
use super::metadata::Study;

/// Thumbnails per grid page.
pub const PAGE_SIZE: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Grid,
    Detail,
    Crop,
}

/// Zoom factor plus pan offset, in displayed-space pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub zoom: f32,
    pub pan: Vector2<f32>,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            zoom: 1.0,
            pan: Vector2::new(0.0, 0.0),
        }
    }
}

/// The successfully loaded bitmap behind the detail view. The two sizes are
/// deliberately distinct types; see the geometry module.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentImage {
    pub uuid: String,
    pub native: NativeSize,
    pub display: DisplaySize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Print,
    Share,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStatus {
    Idle,
    /// A composite/export round trip is in flight; duplicate submissions are
    /// prevented by disabling the triggering controls, not by cancellation.
    Busy(ExportKind),
    /// The last round trip failed; recoverable by retry
    Failed(ExportKind),
}

#[derive(Debug)]
pub struct ViewerState {
    pub config: ViewerConfig,
    pub toolbar: ToolbarOptions,
    study: Study,
    pub marking: RecordMarking,
    /// Assay identities whose annotations are drawn
    pub visible_identities: HashSet<String>,
    pub labels_visible: bool,
    pub invert: bool,
    pub show_info: bool,
    mode: ViewMode,
    page: usize,
    current: usize,
    pub transform: Transform,
    current_image: Option<CurrentImage>,
    crop_offset: f32,
    export: ExportStatus,
}

impl ViewerState {
    pub fn new(config: ViewerConfig, toolbar: ToolbarOptions) -> Self {
        Self {
            config,
            toolbar,
            study: Study::default(),
            marking: RecordMarking::default(),
            visible_identities: HashSet::new(),
            labels_visible: true,
            invert: false,
            show_info: false,
            mode: ViewMode::Grid,
            page: 0,
            current: 0,
            transform: Transform::identity(),
            current_image: None,
            crop_offset: 0.0,
            export: ExportStatus::Idle,
        }
    }

    /// Replace the study wholesale (metadata arrived or was refetched).
    pub fn set_study(&mut self, study: Study) {
        self.marking = RecordMarking::new(study.instrument_marks.clone());
        self.visible_identities = study.identities();
        self.study = study;
        self.mode = ViewMode::Grid;
        self.page = 0;
        self.current = 0;
        self.transform = Transform::identity();
        self.current_image = None;
        self.export = ExportStatus::Idle;
    }

    pub fn entries(&self) -> &[ViewerEntry] {
        &self.study.entries
    }

    pub fn is_empty(&self) -> bool {
        self.study.entries.is_empty()
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_entry(&self) -> Option<&ViewerEntry> {
        self.study.entries.get(self.current)
    }

    pub fn current_image(&self) -> Option<&CurrentImage> {
        self.current_image.as_ref()
    }

    pub fn annotations_for_current(&self) -> &[Annotation] {
        match self.current_entry() {
            Some(entry) => self.study.annotations_for(&entry.record.uuid),
            None => &[],
        }
    }

    // ---- Grid pagination ----

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        self.study.entries.len().div_ceil(PAGE_SIZE).max(1)
    }

    pub fn page_entries(&self) -> &[ViewerEntry] {
        let start = (self.page * PAGE_SIZE).min(self.study.entries.len());
        let end = (start + PAGE_SIZE).min(self.study.entries.len());
        &self.study.entries[start..end]
    }

    pub fn can_next_page(&self) -> bool {
        self.page + 1 < self.page_count()
    }

    pub fn can_prev_page(&self) -> bool {
        self.page > 0
    }

    pub fn next_page(&mut self) {
        if self.can_next_page() {
            self.page += 1;
        }
    }

    pub fn prev_page(&mut self) {
        if self.can_prev_page() {
            self.page -= 1;
        }
    }

    // ---- Grid ⇄ Detail ----

    /// Open the detail view on a global index. Returns the entry whose
    /// bitmap the caller must start loading.
    pub fn open_detail(&mut self, index: usize) -> Option<&ViewerEntry> {
        if index >= self.study.entries.len() {
            return None;
        }
        self.mode = ViewMode::Detail;
        self.current = index;
        self.reset_view();
        self.study.entries.get(index)
    }

    /// Leave detail view; the grid lands on the page holding the image the
    /// user was just looking at.
    pub fn back_to_grid(&mut self) {
        self.mode = ViewMode::Grid;
        self.page = self.current / PAGE_SIZE;
        self.export = ExportStatus::Idle;
    }

    /// Detail arrows are bounded by the global index, not the page: paging
    /// through detail view crosses page boundaries transparently.
    pub fn can_step_back(&self) -> bool {
        self.current > 0
    }

    pub fn can_step_forward(&self) -> bool {
        self.current + 1 < self.study.entries.len()
    }

    /// Move to the previous/next image in detail view. Returns the entry to
    /// load, or None when the move is out of bounds.
    pub fn step_detail(&mut self, forward: bool) -> Option<&ViewerEntry> {
        let next = if forward {
            if !self.can_step_forward() {
                return None;
            }
            self.current + 1
        } else {
            if !self.can_step_back() {
                return None;
            }
            self.current - 1
        };
        self.current = next;
        self.mode = ViewMode::Detail;
        self.reset_view();
        self.study.entries.get(next)
    }

    fn reset_view(&mut self) {
        self.transform = Transform::identity();
        self.current_image = None;
        self.crop_offset = 0.0;
        self.export = ExportStatus::Idle;
    }

    // ---- Bitmap lifecycle ----

    /// Accept a finished bitmap load if it is still for the active image.
    /// A load that resolves after the user switched images is stale and must
    /// be discarded, never painted over the newer image.
    pub fn image_loaded(&mut self, uuid: &str, native: NativeSize) -> bool {
        let matches = self
            .current_entry()
            .map(|entry| entry.record.uuid == uuid)
            .unwrap_or(false);
        if !matches || self.mode == ViewMode::Grid {
            return false;
        }
        let display = geometry::fit_to_height(self.config.surface_height, native);
        self.current_image = Some(CurrentImage {
            uuid: uuid.to_string(),
            native,
            display,
        });
        true
    }

    // ---- Pan / zoom ----

    /// Apply a signed zoom step, clamped to `[1, max_zoom]`, then re-clamp
    /// the pan on both axes so the image does not jump off-bounds.
    pub fn zoom_by(&mut self, step: f32) {
        let Some(image) = &self.current_image else {
            return;
        };
        let display = image.display;
        let zoom = (self.transform.zoom + step).clamp(1.0, self.config.max_zoom);
        self.transform.zoom = zoom;
        self.transform.pan.x =
            geometry::clamp_pan(0.0, self.transform.pan.x, display.width, zoom);
        self.transform.pan.y =
            geometry::clamp_pan(0.0, self.transform.pan.y, display.height, zoom);
    }

    /// Apply a pan increment (already divided by zoom by the gesture
    /// tracker), rubber-banding against the surface edges.
    pub fn pan_by(&mut self, delta: Vector2<f32>) {
        let Some(image) = &self.current_image else {
            return;
        };
        let display = image.display;
        let zoom = self.transform.zoom;
        self.transform.pan.x =
            geometry::clamp_pan(delta.x, self.transform.pan.x, display.width, zoom);
        self.transform.pan.y =
            geometry::clamp_pan(delta.y, self.transform.pan.y, display.height, zoom);
    }

    // ---- Crop mode ----

    pub fn enter_crop(&mut self) {
        if self.mode == ViewMode::Detail && self.current_image.is_some() {
            self.mode = ViewMode::Crop;
            self.crop_offset = 0.0;
            self.export = ExportStatus::Idle;
        }
    }

    pub fn cancel_crop(&mut self) {
        if self.mode == ViewMode::Crop {
            self.mode = ViewMode::Detail;
            self.crop_offset = 0.0;
            self.export = ExportStatus::Idle;
        }
    }

    pub fn crop_offset(&self) -> f32 {
        self.crop_offset
    }

    /// Vertical-only pan of the crop bar; horizontal increments are wired to
    /// a no-op by the crop surface.
    pub fn crop_pan_by(&mut self, dy: f32) {
        let Some(image) = &self.current_image else {
            return;
        };
        let display = image.display;
        let bar = geometry::crop_height(display.width, self.config.crop_aspect);
        let limit = geometry::crop_offset_limit(display.height, bar);
        self.crop_offset = (self.crop_offset + dy).clamp(-limit, limit);
    }

    /// The active selection rectangle, in displayed coordinates. Exists only
    /// while crop mode is active.
    pub fn crop_selection(&self) -> Option<CropSelection> {
        if self.mode != ViewMode::Crop {
            return None;
        }
        let image = self.current_image.as_ref()?;
        let display = image.display;
        let height = geometry::crop_height(display.width, self.config.crop_aspect);
        Some(CropSelection {
            x: 0.0,
            y: (display.height - height) / 2.0 + self.crop_offset,
            width: display.width,
            height,
        })
    }

    /// True while the bar's bottom edge crowds the surface bottom; the crop
    /// toolbar moves to the top of the screen in that case.
    pub fn crop_toolbar_at_top(&self) -> bool {
        let Some(image) = &self.current_image else {
            return false;
        };
        let display = image.display;
        let bar = geometry::crop_height(display.width, self.config.crop_aspect);
        geometry::crop_near_bottom(
            display.height,
            bar,
            self.crop_offset,
            self.config.crop_toolbar_threshold,
        )
    }

    // ---- Export round trip ----

    pub fn export_status(&self) -> ExportStatus {
        self.export
    }

    pub fn export_busy(&self) -> bool {
        matches!(self.export, ExportStatus::Busy(_))
    }

    /// Start a print/share export. Returns the selection to composite, or
    /// None when no selection exists or a round trip is already in flight.
    pub fn begin_export(&mut self, kind: ExportKind) -> Option<CropSelection> {
        if self.export_busy() {
            return None;
        }
        let selection = self.crop_selection()?;
        self.export = ExportStatus::Busy(kind);
        Some(selection)
    }

    /// Resolve the in-flight export. Success discards the selection and
    /// returns to detail view; failure raises the retryable error flag.
    pub fn finish_export(&mut self, kind: ExportKind, ok: bool) {
        if self.export != ExportStatus::Busy(kind) {
            return;
        }
        if ok {
            self.export = ExportStatus::Idle;
            if self.mode == ViewMode::Crop {
                self.mode = ViewMode::Detail;
                self.crop_offset = 0.0;
            }
        } else {
            self.export = ExportStatus::Failed(kind);
        }
    }

    // ---- Record marking ----

    /// Toggle the record mark of the active image. The caller fires the
    /// collaborator callback on `Added`/`Removed`.
    pub fn toggle_mark_current(&mut self) -> Option<(String, MarkOutcome)> {
        let uuid = self.current_entry()?.record.uuid.clone();
        let outcome = self.marking.toggle(&uuid);
        Some((uuid, outcome))
    }

    // ---- Overlay toggles ----

    pub fn toggle_labels(&mut self) {
        self.labels_visible = !self.labels_visible;
    }

    pub fn toggle_invert(&mut self) {
        self.invert = !self.invert;
    }

    pub fn toggle_info(&mut self) {
        self.show_info = !self.show_info;
    }

    pub fn set_identity_visible(&mut self, identity: &str, visible: bool) {
        if visible {
            self.visible_identities.insert(identity.to_string());
        } else {
            self.visible_identities.remove(identity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::ImageRecord;
    use std::path::PathBuf;

    fn study(count: usize) -> Study {
        Study {
            entries: (0..count)
                .map(|index| ViewerEntry {
                    index,
                    record: ImageRecord {
                        uuid: format!("img-{}", index),
                        path: PathBuf::from(format!("/data/img-{}.png", index)),
                        thumbnail: None,
                    },
                    tag_count: 0,
                    title: None,
                    reference_id: None,
                })
                .collect(),
            ..Study::default()
        }
    }

    fn viewer(count: usize) -> ViewerState {
        let mut state = ViewerState::new(ViewerConfig::default(), ToolbarOptions::default());
        state.set_study(study(count));
        state
    }

    fn native() -> NativeSize {
        // 4:3 image; fit_to_height(600) gives an 800x600 surface.
        NativeSize::new(1600.0, 1200.0)
    }

    fn open_and_load(state: &mut ViewerState, index: usize) {
        let uuid = state.open_detail(index).unwrap().record.uuid.clone();
        assert!(state.image_loaded(&uuid, native()));
    }

    #[test]
    fn pagination_slices_by_six() {
        let mut state = viewer(8);
        assert_eq!(state.page_count(), 2);
        assert_eq!(state.page_entries().len(), 6);
        assert!(!state.can_prev_page());

        state.next_page();
        assert_eq!(state.page_entries().len(), 2);
        assert!(!state.can_next_page());
        state.next_page();
        assert_eq!(state.page(), 1);
    }

    #[test]
    fn detail_steps_cross_page_boundaries() {
        let mut state = viewer(8);
        open_and_load(&mut state, 5);

        let entry = state.step_detail(true).unwrap();
        assert_eq!(entry.record.uuid, "img-6");
        assert_eq!(state.mode(), ViewMode::Detail);

        // Returning to the grid lands on the page holding the current image.
        state.back_to_grid();
        assert_eq!(state.page(), 1);
    }

    #[test]
    fn detail_steps_stop_at_global_bounds() {
        let mut state = viewer(2);
        open_and_load(&mut state, 0);
        assert!(!state.can_step_back());
        assert!(state.step_detail(false).is_none());

        state.step_detail(true).unwrap();
        assert!(!state.can_step_forward());
        assert!(state.step_detail(true).is_none());
    }

    #[test]
    fn opening_detail_resets_the_transform() {
        let mut state = viewer(3);
        open_and_load(&mut state, 0);
        state.zoom_by(1.0);
        state.pan_by(Vector2::new(30.0, 0.0));
        assert!(state.transform.pan.x != 0.0);

        state.open_detail(1);
        assert_eq!(state.transform, Transform::identity());
        assert!(state.current_image().is_none());
    }

    #[test]
    fn stale_load_is_discarded() {
        let mut state = viewer(3);
        state.open_detail(0);
        // The user switches images before the first load resolves.
        state.step_detail(true);

        assert!(!state.image_loaded("img-0", native()));
        assert!(state.current_image().is_none());

        assert!(state.image_loaded("img-1", native()));
        assert_eq!(state.current_image().unwrap().uuid, "img-1");
    }

    #[test]
    fn zoom_clamps_to_configured_ceiling() {
        let mut state = viewer(1);
        open_and_load(&mut state, 0);
        for _ in 0..10 {
            state.zoom_by(0.5);
        }
        assert_eq!(state.transform.zoom, state.config.max_zoom);
        state.zoom_by(-10.0);
        assert_eq!(state.transform.zoom, 1.0);
    }

    #[test]
    fn zoom_out_forces_pan_home() {
        let mut state = viewer(1);
        open_and_load(&mut state, 0);

        state.zoom_by(0.5);
        state.zoom_by(0.5);
        assert_eq!(state.transform.zoom, 2.0);
        assert_eq!(state.transform.pan, Vector2::new(0.0, 0.0));

        state.pan_by(Vector2::new(50.0, 0.0));
        assert_eq!(state.transform.pan.x, 50.0);

        state.zoom_by(-0.5);
        state.zoom_by(-0.5);
        assert_eq!(state.transform.zoom, 1.0);
        assert_eq!(state.transform.pan, Vector2::new(0.0, 0.0));
    }

    #[test]
    fn crop_selection_is_aspect_locked_and_bounded() {
        let mut state = viewer(1);
        open_and_load(&mut state, 0);
        assert!(state.crop_selection().is_none());

        state.enter_crop();
        let selection = state.crop_selection().unwrap();
        let display = state.current_image().unwrap().display;
        assert_eq!(selection.width, display.width);
        assert_eq!(
            selection.height,
            display.width * state.config.crop_aspect
        );

        // Vertical increments clamp against the surface bounds.
        state.crop_pan_by(10_000.0);
        let bar = selection.height;
        let limit = (display.height - bar) / 2.0;
        assert_eq!(state.crop_offset(), limit);
        let bottom = state.crop_selection().unwrap();
        assert!((bottom.y + bottom.height - display.height).abs() < 1e-3);
        assert!(state.crop_toolbar_at_top());
    }

    #[test]
    fn export_rejects_duplicate_submission() {
        let mut state = viewer(1);
        open_and_load(&mut state, 0);
        state.enter_crop();

        assert!(state.begin_export(ExportKind::Print).is_some());
        assert!(state.export_busy());
        assert!(state.begin_export(ExportKind::Print).is_none());
        assert!(state.begin_export(ExportKind::Share).is_none());
    }

    #[test]
    fn export_success_returns_to_detail() {
        let mut state = viewer(1);
        open_and_load(&mut state, 0);
        state.enter_crop();
        state.begin_export(ExportKind::Share).unwrap();

        state.finish_export(ExportKind::Share, true);
        assert_eq!(state.mode(), ViewMode::Detail);
        assert_eq!(state.export_status(), ExportStatus::Idle);
        assert!(state.crop_selection().is_none());
    }

    #[test]
    fn export_failure_is_retryable() {
        let mut state = viewer(1);
        open_and_load(&mut state, 0);
        state.enter_crop();
        state.begin_export(ExportKind::Print).unwrap();

        state.finish_export(ExportKind::Print, false);
        assert_eq!(state.mode(), ViewMode::Crop);
        assert_eq!(state.export_status(), ExportStatus::Failed(ExportKind::Print));

        // Retry goes straight back to busy.
        assert!(state.begin_export(ExportKind::Print).is_some());
    }

    #[test]
    fn export_without_selection_is_rejected() {
        let mut state = viewer(1);
        open_and_load(&mut state, 0);
        assert!(state.begin_export(ExportKind::Print).is_none());
    }
}
