/// Crop tool surface
///
/// Third canvas layer presenting the fixed-aspect selection bar. The bar
/// spans the full surface width and pans vertically only: the gesture
/// tracker's horizontal increment is discarded. The surrounding area dims
/// so the selection reads as the export region.

use iced::mouse::{self, Cursor};
use iced::widget::canvas::{self, LineDash, Path, Program, Stroke};
use iced::{touch, Color, Point, Rectangle, Renderer, Size, Theme};

use crate::geometry::{self, DisplaySize};
use crate::Message;
use super::gesture::DragTracker;

pub struct CropCanvas<'a> {
    pub display: DisplaySize,
    /// Vertical offset of the bar from the surface center
    pub offset: f32,
    /// Bar height as a fraction of surface width
    pub aspect: f32,
    pub instruction: &'a str,
}

impl CropCanvas<'_> {
    fn bar_top(&self) -> f32 {
        let bar = geometry::crop_height(self.display.width, self.aspect);
        (self.display.height - bar) / 2.0 + self.offset
    }
}

impl Program<Message> for CropCanvas<'_> {
    type State = DragTracker;

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());
        if self.display.is_empty() {
            return vec![frame.into_geometry()];
        }

        let width = self.display.width;
        let height = self.display.height;
        let bar = geometry::crop_height(width, self.aspect);
        let top = self.bar_top();
        let dim = Color::from_rgba(0.0, 0.0, 0.0, 0.55);

        // Dim everything outside the selection.
        if top > 0.0 {
            frame.fill_rectangle(Point::ORIGIN, Size::new(width, top), dim);
        }
        let below = height - (top + bar);
        if below > 0.0 {
            frame.fill_rectangle(
                Point::new(0.0, top + bar),
                Size::new(width, below),
                dim,
            );
        }

        let outline = Path::rectangle(Point::new(1.0, top), Size::new(width - 2.0, bar));
        frame.stroke(
            &outline,
            Stroke {
                line_dash: LineDash {
                    segments: &[8.0, 5.0],
                    offset: 0,
                },
                ..Stroke::default()
                    .with_width(2.0)
                    .with_color(Color::WHITE)
            },
        );

        frame.fill_text(canvas::Text {
            content: self.instruction.to_string(),
            position: Point::new(width / 2.0, top + bar / 2.0),
            color: Color::from_rgba(1.0, 1.0, 1.0, 0.6),
            size: 15.0.into(),
            horizontal_alignment: iced::alignment::Horizontal::Center,
            vertical_alignment: iced::alignment::Vertical::Center,
            ..canvas::Text::default()
        });

        vec![frame.into_geometry()]
    }

    fn update(
        &self,
        state: &mut Self::State,
        event: canvas::Event,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> (canvas::event::Status, Option<Message>) {
        use canvas::event::Status;

        match event {
            canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                if cursor.position_in(bounds).is_some() {
                    state.press();
                    return (Status::Captured, None);
                }
            }
            canvas::Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
                if state.is_panning() {
                    state.release();
                    return (Status::Captured, None);
                }
            }
            canvas::Event::Mouse(mouse::Event::CursorMoved { .. }) => {
                if state.is_panning() {
                    if let Some(position) = cursor.position() {
                        // The bar moves at screen speed regardless of image
                        // zoom, and only vertically: the X increment is
                        // dropped here on purpose.
                        let message = state
                            .motion(position, 1.0)
                            .map(|delta| Message::CropPan(delta.y));
                        return (Status::Captured, message);
                    }
                }
            }
            canvas::Event::Touch(touch::Event::FingerPressed { position, .. }) => {
                if bounds.contains(position) {
                    state.press();
                    return (Status::Captured, None);
                }
            }
            canvas::Event::Touch(touch::Event::FingerMoved { position, .. }) => {
                if state.is_panning() {
                    let message = state
                        .motion(position, 1.0)
                        .map(|delta| Message::CropPan(delta.y));
                    return (Status::Captured, message);
                }
            }
            canvas::Event::Touch(touch::Event::FingerLifted { .. })
            | canvas::Event::Touch(touch::Event::FingerLost { .. }) => {
                if state.is_panning() {
                    state.release();
                    return (Status::Captured, None);
                }
            }
            _ => {}
        }

        (Status::Ignored, None)
    }

    fn mouse_interaction(
        &self,
        state: &Self::State,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> mouse::Interaction {
        if state.is_panning() {
            mouse::Interaction::Grabbing
        } else if cursor.is_over(bounds) {
            mouse::Interaction::ResizingVertically
        } else {
            mouse::Interaction::default()
        }
    }
}
