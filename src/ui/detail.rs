/// Detail view: single image with the pan/zoom/crop tool stack
///
/// Builds the canvas stack (image surface, annotation overlay, crop bar)
/// and the mode-dependent toolbar. In crop mode the toolbar flips to the
/// top of the screen while the selection crowds the surface bottom.

use iced::widget::{button, container, text, Canvas, Column, Row, Stack};
use iced::{Alignment, Color, Element, Length};

use crate::state::data::ViewerEntry;
use crate::state::viewer::{ExportKind, ExportStatus, ViewMode, ViewerState};
use crate::{DisplayBitmap, Message};
use super::annotation_canvas::AnnotationCanvas;
use super::crop_canvas::CropCanvas;
use super::image_canvas::ImageCanvas;

pub fn view<'a>(
    state: &'a ViewerState,
    bitmap: Option<&'a DisplayBitmap>,
    status: &'a str,
) -> Element<'a, Message> {
    let cropping = state.mode() == ViewMode::Crop;

    let surface: Element<'a, Message> = match (state.current_image(), bitmap) {
        (Some(image), Some(bitmap)) if bitmap.uuid == image.uuid => {
            let display = image.display;
            let handle = if state.invert {
                &bitmap.inverted
            } else {
                &bitmap.handle
            };

            let mut stack = Stack::new().push(
                Canvas::new(ImageCanvas {
                    handle,
                    display,
                    transform: &state.transform,
                    interactive: !cropping,
                })
                .width(Length::Fixed(display.width))
                .height(Length::Fixed(display.height)),
            );

            if state.labels_visible {
                stack = stack.push(
                    Canvas::new(AnnotationCanvas {
                        annotations: state.annotations_for_current(),
                        visible: &state.visible_identities,
                        native: image.native,
                        display,
                        transform: &state.transform,
                    })
                    .width(Length::Fixed(display.width))
                    .height(Length::Fixed(display.height)),
                );
            }

            if cropping {
                stack = stack.push(
                    Canvas::new(CropCanvas {
                        display,
                        offset: state.crop_offset(),
                        aspect: state.config.crop_aspect,
                        instruction: "Drag up or down to position the export area",
                    })
                    .width(Length::Fixed(display.width))
                    .height(Length::Fixed(display.height)),
                );
            }

            stack.into()
        }
        // Blank while loading, or after a load failure under the blank
        // policy; nothing here is an error surface.
        _ => container(text("Loading image...").size(15))
            .width(Length::Fill)
            .height(Length::Fixed(state.config.surface_height))
            .center_x(Length::Fill)
            .center_y(Length::Fixed(state.config.surface_height))
            .into(),
    };
    let surface = container(surface).width(Length::Fill).center_x(Length::Fill);

    let mut content = Column::new().spacing(12).padding(16);
    if cropping {
        if state.crop_toolbar_at_top() {
            content = content.push(crop_toolbar(state)).push(surface);
        } else {
            content = content.push(surface).push(crop_toolbar(state));
        }
    } else {
        content = content.push(detail_toolbar(state)).push(surface);
        if state.show_info {
            if let Some(entry) = state.current_entry() {
                content = content.push(info_panel(state, entry));
            }
        }
    }
    content = content.push(text(status).size(13));

    container(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

fn detail_toolbar(state: &ViewerState) -> Element<'_, Message> {
    let has_image = state.current_image().is_some();
    let zoom = state.transform.zoom;
    let options = &state.toolbar;

    let mut bar = Row::new()
        .spacing(8)
        .align_y(Alignment::Center)
        .push(button(text("Grid view")).on_press(Message::ShowGrid))
        .push(
            button(text("Prev"))
                .on_press_maybe(state.can_step_back().then_some(Message::PrevImage)),
        )
        .push(
            button(text("Next"))
                .on_press_maybe(state.can_step_forward().then_some(Message::NextImage)),
        )
        .push(
            text(format!(
                "{} / {}",
                state.current_index() + 1,
                state.entries().len()
            ))
            .size(14),
        )
        .push(
            button(text("Zoom -"))
                .on_press_maybe((has_image && zoom > 1.0).then_some(Message::Zoom(-1.0))),
        )
        .push(button(text("Zoom +")).on_press_maybe(
            (has_image && zoom < state.config.max_zoom).then_some(Message::Zoom(1.0)),
        ));

    if options.show_invert_colors_button {
        let label = if state.invert { "Invert: on" } else { "Invert: off" };
        bar = bar.push(button(text(label)).on_press_maybe(has_image.then_some(Message::ToggleInvert)));
    }
    if options.show_cell_labels_button {
        let label = if state.labels_visible {
            "Labels: on"
        } else {
            "Labels: off"
        };
        bar = bar.push(button(text(label)).on_press(Message::ToggleLabels));
    }
    if options.show_area_of_interest_button {
        bar = bar.push(button(text("Crop")).on_press_maybe(has_image.then_some(Message::EnterCrop)));
    }
    if options.show_add_to_record_mark {
        if let Some(entry) = state.current_entry() {
            let uuid = &entry.record.uuid;
            let (label, enabled) = if state.marking.is_instrument_mark(uuid) {
                ("On record (instrument)", false)
            } else if state.marking.is_marked(uuid) {
                ("Remove from record", true)
            } else {
                ("Add to record", true)
            };
            bar = bar.push(button(text(label)).on_press_maybe(enabled.then_some(Message::ToggleMark)));
        }
    }
    if options.show_additional_info_button {
        bar = bar.push(button(text("Info")).on_press(Message::ToggleInfo));
    }
    bar = bar.push(button(text("Close")).on_press(Message::CloseViewer));

    bar.into()
}

fn crop_toolbar(state: &ViewerState) -> Element<'_, Message> {
    let busy = state.export_busy();
    let can_export = !busy && state.crop_selection().is_some();

    let mut bar = Row::new()
        .spacing(8)
        .align_y(Alignment::Center)
        .push(button(text("Cancel")).on_press_maybe((!busy).then_some(Message::CancelCrop)))
        .push(
            button(text("Print")).on_press_maybe(
                can_export.then_some(Message::ConfirmExport(ExportKind::Print)),
            ),
        )
        .push(
            button(text("Share")).on_press_maybe(
                can_export.then_some(Message::ConfirmExport(ExportKind::Share)),
            ),
        );

    if busy {
        bar = bar.push(text("Preparing export...").size(14));
    }
    if let ExportStatus::Failed(kind) = state.export_status() {
        let message = match kind {
            ExportKind::Print => "Print failed. Try again.",
            ExportKind::Share => "Share failed. Try again.",
        };
        bar = bar.push(text(message).size(14).color(Color::from_rgb(0.9, 0.45, 0.45)));
    }

    bar.into()
}

fn info_panel<'a>(state: &'a ViewerState, entry: &'a ViewerEntry) -> Element<'a, Message> {
    let mut details = Column::new().spacing(4).push(
        text(
            entry
                .title
                .clone()
                .unwrap_or_else(|| format!("Image {}", entry.index + 1)),
        )
        .size(16),
    );
    if let Some(reference) = &entry.reference_id {
        details = details.push(text(format!("Reference: {}", reference)).size(13));
    }
    details = details
        .push(text(format!("UUID: {}", entry.record.uuid)).size(13))
        .push(text(format!("Tags: {}", entry.tag_count)).size(13));

    // Per-assay visibility toggles for the annotation overlay.
    let mut identities: Vec<&str> = state
        .annotations_for_current()
        .iter()
        .map(|annotation| annotation.identity.as_str())
        .collect();
    identities.sort_unstable();
    identities.dedup();
    if !identities.is_empty() {
        let mut toggles = Row::new().spacing(6);
        for identity in identities {
            let visible = state.visible_identities.contains(identity);
            let label = if visible {
                format!("{}: shown", identity)
            } else {
                format!("{}: hidden", identity)
            };
            toggles = toggles.push(
                button(text(label).size(12))
                    .on_press(Message::SetIdentityVisible(identity.to_string(), !visible)),
            );
        }
        details = details.push(toggles);
    }

    container(details)
        .padding(12)
        .style(container::rounded_box)
        .into()
}
