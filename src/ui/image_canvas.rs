/// Image render surface
///
/// Canvas program that paints the loaded bitmap through the viewer
/// transform: a uniform zoom scale plus the recentering draw offset from
/// the geometry module. The same program handles the pan drag and wheel
/// zoom while it is the interactive surface; in crop mode it is mounted
/// non-interactive and the crop bar owns the gesture.

use iced::mouse::{self, Cursor};
use iced::widget::canvas::{self, Program};
use iced::{touch, Color, Point, Rectangle, Renderer, Size, Theme};

use crate::geometry::{self, DisplaySize};
use crate::state::viewer::Transform;
use crate::Message;
use super::gesture::DragTracker;

pub struct ImageCanvas<'a> {
    pub handle: &'a iced::widget::image::Handle,
    pub display: DisplaySize,
    pub transform: &'a Transform,
    /// False while another surface owns the gesture (crop mode)
    pub interactive: bool,
}

impl Program<Message> for ImageCanvas<'_> {
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
        frame.fill_rectangle(Point::ORIGIN, bounds.size(), Color::BLACK);

        if !self.display.is_empty() {
            let offset = geometry::zoom_draw_offset(
                self.display,
                self.transform.pan,
                self.transform.zoom,
            );
            // The zoomed image extends past the surface; clip to bounds.
            let clip = Rectangle::new(Point::ORIGIN, bounds.size());
            frame.with_clip(clip, |frame| {
                frame.scale(self.transform.zoom);
                frame.draw_image(
                    Rectangle::new(
                        Point::new(offset.x, offset.y),
                        Size::new(self.display.width, self.display.height),
                    ),
                    self.handle,
                );
            });
        }

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

        if !self.interactive {
            return (Status::Ignored, None);
        }

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
                        let message = state
                            .motion(position, self.transform.zoom)
                            .map(Message::Pan);
                        return (Status::Captured, message);
                    }
                }
            }
            canvas::Event::Mouse(mouse::Event::WheelScrolled { delta }) => {
                if cursor.position_in(bounds).is_some() {
                    let y = match delta {
                        mouse::ScrollDelta::Lines { y, .. } => y,
                        mouse::ScrollDelta::Pixels { y, .. } => y,
                    };
                    if y != 0.0 {
                        return (Status::Captured, Some(Message::Zoom(y.signum())));
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
                        .motion(position, self.transform.zoom)
                        .map(Message::Pan);
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
        if !self.interactive {
            mouse::Interaction::default()
        } else if state.is_panning() {
            mouse::Interaction::Grabbing
        } else if cursor.is_over(bounds) {
            mouse::Interaction::Grab
        } else {
            mouse::Interaction::default()
        }
    }
}
