use crate::segmentation::types::{LandmarkSnapshot, Point};

/// Midpoint of two points
pub fn midpoint(a: Point, b: Point) -> Point {
    Point {
        x: (a.x + b.x) / 2.0,
        y: (a.y + b.y) / 2.0,
    }
}

/// Euclidean distance in normalized image space
pub fn distance(a: Point, b: Point) -> f32 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Averaged wrist position. Used as the calibration sample.
pub fn wrist_midpoint(snapshot: &LandmarkSnapshot) -> Option<Point> {
    snapshot.wrists.map(|w| midpoint(w.left, w.right))
}

/// Distance of the averaged wrist position from the neutral point.
/// `None` when the snapshot carries no landmarks.
pub fn displacement(snapshot: &LandmarkSnapshot, neutral: Point) -> Option<f32> {
    wrist_midpoint(snapshot).map(|p| distance(p, neutral))
}
