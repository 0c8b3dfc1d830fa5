use cgmath::Vector2;
use iced::widget::{button, column, container, text};
use iced::{Alignment, Element, Length, Task, Theme};
use rfd::FileDialog;
use std::path::PathBuf;
use std::sync::Arc;

pub mod geometry;
pub mod raster;
pub mod state;
pub mod ui;

use geometry::NativeSize;
use raster::compositor::{self, ExportJob};
use raster::loader::{self, LoadedBitmap};
use state::data::{LoadFailurePolicy, ToolbarOptions, ViewerConfig};
use state::marking::MarkOutcome;
use state::metadata::{self, Study};
use state::viewer::{ExportKind, ViewMode, ViewerState};

/// Handler the surrounding application supplies for print/share: takes the
/// exported PNG bytes, returns a navigable resource or an error.
pub type ExportHandler = Arc<dyn Fn(Vec<u8>) -> Result<String, String> + Send + Sync>;
pub type MarkHandler = Arc<dyn Fn(&str, bool) + Send + Sync>;
pub type CloseHandler = Arc<dyn Fn() + Send + Sync>;

/// Callbacks into the surrounding application. The viewer fires these and
/// never awaits persistence.
pub struct Collaborators {
    pub on_marked_for_record_changed: MarkHandler,
    pub print: ExportHandler,
    pub share: ExportHandler,
    pub on_close: CloseHandler,
}

impl Collaborators {
    /// Standalone-binary wiring: exports land as timestamped PNG files in
    /// the user's download directory and mark changes are logged.
    fn desktop_defaults() -> Self {
        Self {
            on_marked_for_record_changed: Arc::new(|uuid, marked| {
                log::info!("record mark changed: {} -> {}", uuid, marked);
            }),
            print: Arc::new(|bytes| write_export(bytes, "print")),
            share: Arc::new(|bytes| write_export(bytes, "share")),
            on_close: Arc::new(|| log::info!("viewer closed")),
        }
    }
}

/// Write an export buffer to disk and hand back its path as the navigable
/// resource.
fn write_export(bytes: Vec<u8>, kind: &str) -> Result<String, String> {
    let dir = dirs::download_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| "could not determine an export directory".to_string())?
        .join("labscope");
    std::fs::create_dir_all(&dir)
        .map_err(|e| format!("failed to create {}: {}", dir.display(), e))?;

    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let path = dir.join(format!("{}-{}.png", kind, stamp));
    std::fs::write(&path, bytes)
        .map_err(|e| format!("failed to write {}: {}", path.display(), e))?;
    Ok(path.to_string_lossy().to_string())
}

/// The loaded bitmap behind the detail view, with a pre-inverted variant
/// for the color-inversion toggle.
pub struct DisplayBitmap {
    pub uuid: String,
    pub pixels: image::RgbaImage,
    pub handle: iced::widget::image::Handle,
    pub inverted: iced::widget::image::Handle,
}

impl DisplayBitmap {
    fn new(uuid: String, pixels: image::RgbaImage) -> Self {
        let (width, height) = pixels.dimensions();
        let handle = iced::widget::image::Handle::from_rgba(width, height, pixels.as_raw().clone());
        let inverted_pixels = loader::inverted_copy(&pixels);
        let inverted =
            iced::widget::image::Handle::from_rgba(width, height, inverted_pixels.into_raw());
        Self {
            uuid,
            pixels,
            handle,
            inverted,
        }
    }
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    /// User picked the "open manifest" action
    OpenManifest,
    /// User picked the "open folder" action
    OpenFolder,
    /// Metadata ingestion finished
    StudyLoaded(Result<Study, String>),
    /// Grid tile pressed; payload is the global entry index
    ThumbnailPressed(usize),
    NextPage,
    PrevPage,
    ShowGrid,
    PrevImage,
    NextImage,
    /// Bitmap load resolved; `uuid` tags the image it was issued for so
    /// stale results can be discarded
    BitmapLoaded {
        uuid: String,
        result: Result<LoadedBitmap, String>,
    },
    /// Signed zoom step count (multiplied by the configured step size)
    Zoom(f32),
    /// Pan delta, already divided by the zoom factor
    Pan(Vector2<f32>),
    ToggleInvert,
    ToggleLabels,
    ToggleInfo,
    ToggleMark,
    /// Show or hide one assay identity on the annotation overlay
    SetIdentityVisible(String, bool),
    EnterCrop,
    CancelCrop,
    /// Vertical crop-bar delta
    CropPan(f32),
    ConfirmExport(ExportKind),
    ExportFinished {
        kind: ExportKind,
        result: Result<String, String>,
    },
    CloseViewer,
}

/// Main application state
struct LabScope {
    state: ViewerState,
    bitmap: Option<DisplayBitmap>,
    collaborators: Collaborators,
    /// Status line shown under the active view
    status: String,
}

impl LabScope {
    fn new() -> (Self, Task<Message>) {
        let app = LabScope {
            state: ViewerState::new(ViewerConfig::default(), ToolbarOptions::default()),
            bitmap: None,
            collaborators: Collaborators::desktop_defaults(),
            status: String::from("Open a study manifest or an image folder to begin."),
        };

        // A study path on the command line skips the open dialog.
        let task = match std::env::args().nth(1) {
            Some(arg) => {
                Task::perform(metadata::load_study(PathBuf::from(arg)), Message::StudyLoaded)
            }
            None => Task::none(),
        };
        (app, task)
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::OpenManifest => {
                let picked = FileDialog::new()
                    .set_title("Select Study Manifest")
                    .add_filter("study manifest", &["json"])
                    .pick_file();
                match picked {
                    Some(path) => {
                        self.status = format!("Loading {}...", path.display());
                        Task::perform(metadata::load_study(path), Message::StudyLoaded)
                    }
                    None => Task::none(),
                }
            }
            Message::OpenFolder => {
                let picked = FileDialog::new()
                    .set_title("Select Image Folder")
                    .pick_folder();
                match picked {
                    Some(path) => {
                        self.status = format!("Scanning {}...", path.display());
                        Task::perform(metadata::load_study(path), Message::StudyLoaded)
                    }
                    None => Task::none(),
                }
            }
            Message::StudyLoaded(Ok(study)) => {
                let count = study.entries.len();
                self.state.set_study(study);
                self.bitmap = None;
                self.status = format!("Study loaded: {} images.", count);
                log::info!("study loaded with {} images", count);
                Task::none()
            }
            Message::StudyLoaded(Err(error)) => {
                log::warn!("study load failed: {}", error);
                self.status = format!("Could not load study: {}", error);
                Task::none()
            }
            Message::ThumbnailPressed(index) => match self.state.open_detail(index) {
                Some(entry) => {
                    let (uuid, path) = (entry.record.uuid.clone(), entry.record.path.clone());
                    self.spawn_bitmap_load(uuid, path)
                }
                None => Task::none(),
            },
            Message::NextPage => {
                self.state.next_page();
                Task::none()
            }
            Message::PrevPage => {
                self.state.prev_page();
                Task::none()
            }
            Message::ShowGrid => {
                self.state.back_to_grid();
                Task::none()
            }
            Message::PrevImage => match self.state.step_detail(false) {
                Some(entry) => {
                    let (uuid, path) = (entry.record.uuid.clone(), entry.record.path.clone());
                    self.spawn_bitmap_load(uuid, path)
                }
                None => Task::none(),
            },
            Message::NextImage => match self.state.step_detail(true) {
                Some(entry) => {
                    let (uuid, path) = (entry.record.uuid.clone(), entry.record.path.clone());
                    self.spawn_bitmap_load(uuid, path)
                }
                None => Task::none(),
            },
            Message::BitmapLoaded { uuid, result } => {
                self.bitmap_loaded(uuid, result);
                Task::none()
            }
            Message::Zoom(steps) => {
                self.state.zoom_by(steps * self.state.config.zoom_step);
                Task::none()
            }
            Message::Pan(delta) => {
                self.state.pan_by(delta);
                Task::none()
            }
            Message::ToggleInvert => {
                self.state.toggle_invert();
                Task::none()
            }
            Message::ToggleLabels => {
                self.state.toggle_labels();
                Task::none()
            }
            Message::ToggleInfo => {
                self.state.toggle_info();
                Task::none()
            }
            Message::ToggleMark => {
                if let Some((uuid, outcome)) = self.state.toggle_mark_current() {
                    match outcome {
                        MarkOutcome::Added => {
                            (self.collaborators.on_marked_for_record_changed)(&uuid, true);
                        }
                        MarkOutcome::Removed => {
                            (self.collaborators.on_marked_for_record_changed)(&uuid, false);
                        }
                        // Policy rejections are silent by contract.
                        MarkOutcome::CapReached => {
                            log::debug!("record mark for {} rejected: cap reached", uuid);
                        }
                        MarkOutcome::InstrumentOwned => {
                            log::debug!("record mark for {} rejected: instrument-owned", uuid);
                        }
                    }
                }
                Task::none()
            }
            Message::SetIdentityVisible(identity, visible) => {
                self.state.set_identity_visible(&identity, visible);
                Task::none()
            }
            Message::EnterCrop => {
                self.state.enter_crop();
                Task::none()
            }
            Message::CancelCrop => {
                self.state.cancel_crop();
                Task::none()
            }
            Message::CropPan(dy) => {
                self.state.crop_pan_by(dy);
                Task::none()
            }
            Message::ConfirmExport(kind) => self.spawn_export(kind),
            Message::ExportFinished { kind, result } => {
                match result {
                    Ok(resource) => {
                        self.state.finish_export(kind, true);
                        self.status = format!("Export ready: {}", resource);
                        log::info!("export finished: {}", resource);
                    }
                    Err(error) => {
                        self.state.finish_export(kind, false);
                        log::warn!("export failed: {}", error);
                    }
                }
                Task::none()
            }
            Message::CloseViewer => {
                (self.collaborators.on_close)();
                iced::exit()
            }
        }
    }

    /// Start an async bitmap load tagged with the image identity it was
    /// issued for.
    fn spawn_bitmap_load(&mut self, uuid: String, path: PathBuf) -> Task<Message> {
        self.status = String::new();
        Task::perform(loader::load_bitmap(path), move |result| {
            Message::BitmapLoaded {
                uuid: uuid.clone(),
                result,
            }
        })
    }

    fn bitmap_loaded(&mut self, uuid: String, result: Result<LoadedBitmap, String>) {
        match result {
            Ok(bitmap) => {
                let native = NativeSize::of_raster(&bitmap.pixels);
                if self.state.image_loaded(&uuid, native) {
                    self.bitmap = Some(DisplayBitmap::new(uuid, bitmap.pixels));
                } else {
                    log::debug!("discarding stale bitmap for {}", uuid);
                }
            }
            Err(error) => {
                // Recoverable: the surface stays blank (or shows the
                // placeholder), nothing propagates to the user as a modal.
                log::warn!("bitmap load for {} failed: {}", uuid, error);
                if self.state.config.load_failure == LoadFailurePolicy::Placeholder {
                    let placeholder = loader::placeholder();
                    let native = NativeSize::of_raster(&placeholder.pixels);
                    if self.state.image_loaded(&uuid, native) {
                        self.bitmap = Some(DisplayBitmap::new(uuid, placeholder.pixels));
                    }
                }
            }
        }
    }

    /// Kick off the composite + print/share round trip. The busy flag set
    /// by `begin_export` keeps the confirm buttons disabled until the
    /// result message lands; in-flight work is never cancelled.
    fn spawn_export(&mut self, kind: ExportKind) -> Task<Message> {
        let Some(selection) = self.state.begin_export(kind) else {
            return Task::none();
        };
        let Some(bitmap) = &self.bitmap else {
            self.state.finish_export(kind, false);
            return Task::none();
        };
        let Some(image) = self.state.current_image() else {
            self.state.finish_export(kind, false);
            return Task::none();
        };

        let job = ExportJob {
            pixels: bitmap.pixels.clone(),
            annotations: self.state.annotations_for_current().to_vec(),
            visible_identities: self.state.visible_identities.clone(),
            display: image.display,
            transform: self.state.transform,
            invert: self.state.invert,
            labels_visible: self.state.labels_visible,
            selection,
        };
        let handler = match kind {
            ExportKind::Print => self.collaborators.print.clone(),
            ExportKind::Share => self.collaborators.share.clone(),
        };

        Task::perform(
            async move {
                let bytes = compositor::export_selection(job).await?;
                tokio::task::spawn_blocking(move || handler(bytes))
                    .await
                    .map_err(|e| format!("task join error: {}", e))?
            },
            move |result| Message::ExportFinished { kind, result },
        )
    }

    /// Build the user interface
    fn view(&self) -> Element<'_, Message> {
        if self.state.is_empty() {
            return self.landing();
        }
        match self.state.mode() {
            ViewMode::Grid => ui::grid::view(&self.state, &self.status),
            ViewMode::Detail | ViewMode::Crop => {
                ui::detail::view(&self.state, self.bitmap.as_ref(), &self.status)
            }
        }
    }

    fn landing(&self) -> Element<'_, Message> {
        let content = column![
            text("LabScope").size(42),
            text("Diagnostic image viewer").size(16),
            button(text("Open Study Manifest"))
                .on_press(Message::OpenManifest)
                .padding(10),
            button(text("Open Image Folder"))
                .on_press(Message::OpenFolder)
                .padding(10),
            text(&self.status).size(14),
        ]
        .spacing(20)
        .padding(40)
        .align_x(Alignment::Center);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn main() -> iced::Result {
    env_logger::init();

    iced::application("LabScope", LabScope::update, LabScope::view)
        .theme(LabScope::theme)
        .centered()
        .run_with(LabScope::new)
}
