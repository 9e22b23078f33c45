use super::point::Point;
use serde::{Deserialize, Serialize};

/// A circular keep-out area (a drilled hole, a reference point) used by the
/// height map to steer probe points clear of it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CircularArea {
    pub center: Point,
    pub radius: f64,
}

impl CircularArea {
    pub fn new(center: Point, radius: f64) -> Self {
        CircularArea { center, radius }
    }

    /// 0 if `pt` is inside or on the circle, else the distance to its edge.
    pub fn distance_to(&self, pt: &Point) -> f64 {
        (self.center.distance_to(pt) - self.radius).max(0.0)
    }
}
