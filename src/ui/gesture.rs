/// Drag gesture tracker
///
/// Converts raw pointer/touch down-move-up sequences into normalized drag
/// deltas. Lives as the canvas `Program::State` of whichever surface
/// currently owns the gesture; the widget tree mounts at most one
/// interactive surface at a time, so attachment is exclusive by
/// construction and switching tools swaps the live tracker.

use cgmath::Vector2;
use iced::Point;

#[derive(Debug, Clone, Default)]
pub struct DragTracker {
    panning: bool,
    last_position: Option<Point>,
}

impl DragTracker {
    /// Pointer went down: the drag session starts, but no position is
    /// recorded yet.
    pub fn press(&mut self) {
        self.panning = true;
    }

    /// Pointer went up: end the session and forget the anchor.
    pub fn release(&mut self) {
        self.panning = false;
        self.last_position = None;
    }

    pub fn is_panning(&self) -> bool {
        self.panning
    }

    /// Feed a pointer position. The first motion after a press establishes
    /// the anchor without emitting a delta (none is computable yet); later
    /// motions emit the position difference divided by the zoom factor.
    pub fn motion(&mut self, position: Point, zoom: f32) -> Option<Vector2<f32>> {
        if !self.panning {
            return None;
        }
        let zoom = zoom.max(1.0);
        let delta = self.last_position.map(|last| {
            Vector2::new((position.x - last.x) / zoom, (position.y - last.y) / zoom)
        });
        self.last_position = Some(position);
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motion_before_press_is_ignored() {
        let mut tracker = DragTracker::default();
        assert!(tracker.motion(Point::new(10.0, 10.0), 1.0).is_none());
        assert!(!tracker.is_panning());
    }

    #[test]
    fn first_motion_sets_anchor_without_delta() {
        let mut tracker = DragTracker::default();
        tracker.press();
        assert!(tracker.motion(Point::new(10.0, 10.0), 1.0).is_none());

        let delta = tracker.motion(Point::new(13.0, 6.0), 1.0).unwrap();
        assert_eq!(delta, Vector2::new(3.0, -4.0));
    }

    #[test]
    fn deltas_divide_by_zoom() {
        let mut tracker = DragTracker::default();
        tracker.press();
        tracker.motion(Point::new(0.0, 0.0), 2.0);
        let delta = tracker.motion(Point::new(10.0, 20.0), 2.0).unwrap();
        assert_eq!(delta, Vector2::new(5.0, 10.0));
    }

    #[test]
    fn release_clears_the_session() {
        let mut tracker = DragTracker::default();
        tracker.press();
        tracker.motion(Point::new(5.0, 5.0), 1.0);
        tracker.release();

        assert!(!tracker.is_panning());
        assert!(tracker.motion(Point::new(9.0, 9.0), 1.0).is_none());

        // A fresh press starts over: the old anchor is gone.
        tracker.press();
        assert!(tracker.motion(Point::new(50.0, 50.0), 1.0).is_none());
    }
}
