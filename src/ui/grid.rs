/// Paginated thumbnail grid
///
/// Six tiles per page; clicking a tile opens the detail view on that
/// global index. Pagination here only slices the entry list — the heavy
/// lifting stays in the state machine.

use iced::widget::{button, column, container, horizontal_space, image, row, scrollable, text};
use iced::{Alignment, Element, Length};
use iced_aw::Wrap;

use crate::state::marking::MAX_RECORD_MARKS;
use crate::state::viewer::ViewerState;
use crate::Message;

pub fn view<'a>(state: &'a ViewerState, status: &'a str) -> Element<'a, Message> {
    let mut tiles: Vec<Element<'a, Message>> = Vec::new();
    for entry in state.page_entries() {
        let handle = image::Handle::from_path(entry.record.thumbnail_path());
        let marked = state.marking.is_marked(&entry.record.uuid);

        let mut caption = entry
            .title
            .clone()
            .unwrap_or_else(|| format!("Image {}", entry.index + 1));
        if entry.tag_count > 0 {
            caption = format!("{} ({} tags)", caption, entry.tag_count);
        }
        if marked {
            caption = format!("* {}", caption);
        }

        tiles.push(
            button(
                column![
                    image(handle).width(210).height(150),
                    text(caption).size(13),
                ]
                .spacing(6)
                .align_x(Alignment::Center),
            )
            .on_press(Message::ThumbnailPressed(entry.index))
            .padding(8)
            .into(),
        );
    }

    let header = row![
        text("Diagnostic images").size(24),
        horizontal_space(),
        text(format!(
            "Marked for record: {}/{}",
            state.marking.total(),
            MAX_RECORD_MARKS
        ))
        .size(14),
        button(text("Close")).on_press(Message::CloseViewer),
    ]
    .spacing(16)
    .align_y(Alignment::Center);

    let grid = Wrap::with_elements(tiles).spacing(12.0).line_spacing(12.0);

    let pagination = row![
        button(text("Previous")).on_press_maybe(state.can_prev_page().then_some(Message::PrevPage)),
        text(format!("Page {} of {}", state.page() + 1, state.page_count())).size(14),
        button(text("Next")).on_press_maybe(state.can_next_page().then_some(Message::NextPage)),
    ]
    .spacing(16)
    .align_y(Alignment::Center);

    column![
        header,
        scrollable(container(grid).padding(4)).height(Length::Fill),
        container(pagination).center_x(Length::Fill),
        text(status).size(13),
    ]
    .spacing(16)
    .padding(20)
    .into()
}
