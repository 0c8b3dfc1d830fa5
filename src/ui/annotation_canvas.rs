/// Annotation overlay surface
///
/// Second canvas layer stacked over the image surface. Label positions
/// arrive in native image coordinates; the displayed pan is converted into
/// native units per axis, the point is projected through the shared zoom
/// transform, and the result maps back to the displayed surface. Label
/// size tracks the surface height so labels keep a constant relative size
/// across images of differing resolution.

use iced::alignment::{Horizontal, Vertical};
use iced::mouse::Cursor;
use iced::widget::canvas::{self, Program};
use iced::{Color, Point, Rectangle, Renderer, Theme};
use std::collections::HashSet;

use crate::geometry::{self, DisplaySize, NativeSize};
use crate::raster::labels::LABEL_HEIGHT_RATIO;
use crate::state::data::Annotation;
use crate::state::viewer::Transform;
use crate::Message;

pub struct AnnotationCanvas<'a> {
    pub annotations: &'a [Annotation],
    pub visible: &'a HashSet<String>,
    pub native: NativeSize,
    pub display: DisplaySize,
    pub transform: &'a Transform,
}

impl Program<Message> for AnnotationCanvas<'_> {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());
        if self.native.is_empty() || self.display.is_empty() {
            return vec![frame.into_geometry()];
        }

        // Presentation scale between the native coordinate system the
        // labels live in and the displayed surface.
        let scale_x = self.display.width / self.native.width;
        let scale_y = self.display.height / self.native.height;
        let pan_native_x = self.transform.pan.x / scale_x;
        let pan_native_y = self.transform.pan.y / scale_y;

        let font_size = self.display.height * LABEL_HEIGHT_RATIO;
        let shadow = (font_size * 0.1).max(1.0);

        // Projected labels can leave the surface under zoom/pan; clip.
        let clip = Rectangle::new(Point::ORIGIN, bounds.size());
        frame.with_clip(clip, |frame| {
            for annotation in self.annotations {
                if !self.visible.contains(&annotation.identity) {
                    continue;
                }
                let (x, y) = annotation.position();
                let projected = geometry::project_annotation(
                    self.native,
                    x + pan_native_x,
                    y + pan_native_y,
                    self.transform.zoom,
                );
                let position = Point::new(projected.x * scale_x, projected.y * scale_y);

                // Drop shadow first, for legibility against any background.
                frame.fill_text(canvas::Text {
                    content: annotation.label.clone(),
                    position: Point::new(position.x + shadow, position.y + shadow),
                    color: Color::from_rgba(0.0, 0.0, 0.0, 0.8),
                    size: font_size.into(),
                    horizontal_alignment: Horizontal::Center,
                    vertical_alignment: Vertical::Center,
                    ..canvas::Text::default()
                });
                frame.fill_text(canvas::Text {
                    content: annotation.label.clone(),
                    position,
                    color: Color::WHITE,
                    size: font_size.into(),
                    horizontal_alignment: Horizontal::Center,
                    vertical_alignment: Vertical::Center,
                    ..canvas::Text::default()
                });
            }
        });

        vec![frame.into_geometry()]
    }

    fn update(
        &self,
        _state: &mut Self::State,
        _event: canvas::Event,
        _bounds: Rectangle,
        _cursor: Cursor,
    ) -> (canvas::event::Status, Option<Message>) {
        // Purely presentational; events fall through to the surface below.
        (canvas::event::Status::Ignored, None)
    }
}
