//! Coarse spatial classification of a detection relative to the viewer.
//!
//! Direction comes from the horizontal centre of the box, split into thirds of
//! the frame. Proximity uses box height as a stand-in for distance: an object
//! taller than half the frame is near. There is no depth sensing.

use std::fmt;

use crate::detect::BoundingBox;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Left,
    Ahead,
    Right,
}

impl Direction {
    /// Spoken form used in announcements.
    pub fn phrase(self) -> &'static str {
        match self {
            Direction::Left => "to your left",
            Direction::Ahead => "ahead",
            Direction::Right => "to your right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.phrase())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Proximity {
    Near,
    Far,
}

impl Proximity {
    pub fn phrase(self) -> &'static str {
        match self {
            Proximity::Near => "near",
            Proximity::Far => "far",
        }
    }
}

impl fmt::Display for Proximity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.phrase())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpatialDescription {
    pub direction: Direction,
    pub proximity: Proximity,
}

/// Classify a box inside a `frame_width` x `frame_height` frame.
///
/// The caller must reject degenerate boxes first (see
/// [`BoundingBox::is_well_formed`]). A centre exactly on either third line
/// counts as ahead.
pub fn classify(bbox: &BoundingBox, frame_width: u32, frame_height: u32) -> SpatialDescription {
    let width = f64::from(frame_width);
    let height = f64::from(frame_height);

    let cx = (f64::from(bbox.x1) + f64::from(bbox.x2)) / 2.0;
    let direction = if cx < width / 3.0 {
        Direction::Left
    } else if cx > 2.0 * width / 3.0 {
        Direction::Right
    } else {
        Direction::Ahead
    };

    let box_height = f64::from(bbox.y2) - f64::from(bbox.y1);
    let proximity = if box_height > height / 2.0 {
        Proximity::Near
    } else {
        Proximity::Far
    };

    SpatialDescription {
        direction,
        proximity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x1: f32, y1: f32, x2: f32, y2: f32) -> BoundingBox {
        BoundingBox::new(x1, y1, x2, y2)
    }

    #[test]
    fn tall_box_on_the_left_is_near_left() {
        let desc = classify(&bbox(0.0, 0.0, 200.0, 400.0), 640, 480);
        assert_eq!(desc.direction, Direction::Left);
        assert_eq!(desc.proximity, Proximity::Near);
    }

    #[test]
    fn small_centred_box_is_far_ahead() {
        let desc = classify(&bbox(300.0, 0.0, 340.0, 100.0), 640, 480);
        assert_eq!(desc.direction, Direction::Ahead);
        assert_eq!(desc.proximity, Proximity::Far);
    }

    #[test]
    fn right_third() {
        let desc = classify(&bbox(500.0, 0.0, 600.0, 10.0), 640, 480);
        assert_eq!(desc.direction, Direction::Right);
    }

    #[test]
    fn third_lines_resolve_to_ahead() {
        // width 600: thirds at exactly 200 and 400
        assert_eq!(classify(&bbox(150.0, 0.0, 250.0, 10.0), 600, 480).direction, Direction::Ahead);
        assert_eq!(classify(&bbox(350.0, 0.0, 450.0, 10.0), 600, 480).direction, Direction::Ahead);
        // just past either line
        assert_eq!(classify(&bbox(150.0, 0.0, 249.0, 10.0), 600, 480).direction, Direction::Left);
        assert_eq!(classify(&bbox(351.0, 0.0, 450.0, 10.0), 600, 480).direction, Direction::Right);
    }

    #[test]
    fn odd_width_uses_real_division() {
        // width 641: 641/3 = 213.67; cx = 213.5 must be left, integer division would say ahead.
        assert_eq!(classify(&bbox(213.0, 0.0, 214.0, 10.0), 641, 480).direction, Direction::Left);
        // 2*641/3 = 427.33; cx = 427.5 is right.
        assert_eq!(classify(&bbox(427.0, 0.0, 428.0, 10.0), 641, 480).direction, Direction::Right);
    }

    #[test]
    fn half_height_is_far() {
        assert_eq!(classify(&bbox(0.0, 0.0, 10.0, 240.0), 640, 480).proximity, Proximity::Far);
        assert_eq!(classify(&bbox(0.0, 0.0, 10.0, 241.0), 640, 480).proximity, Proximity::Near);
        // odd height 481: half is 240.5
        assert_eq!(classify(&bbox(0.0, 0.0, 10.0, 240.75), 640, 481).proximity, Proximity::Near);
    }

    #[test]
    fn classify_is_deterministic() {
        let b = bbox(123.0, 45.0, 321.0, 400.0);
        let first = classify(&b, 640, 480);
        for _ in 0..100 {
            assert_eq!(classify(&b, 640, 480), first);
        }
    }

    #[test]
    fn spoken_forms() {
        assert_eq!(Direction::Left.to_string(), "to your left");
        assert_eq!(Direction::Right.to_string(), "to your right");
        assert_eq!(Direction::Ahead.to_string(), "ahead");
        assert_eq!(Proximity::Near.to_string(), "near");
    }
}
