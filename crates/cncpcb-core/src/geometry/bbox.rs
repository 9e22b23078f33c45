use super::point::Point;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in XY; Z is always 0. Starts empty (min/max
/// undefined) and grows via [`BoundingBox::extend`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundingBox {
    min: Point,
    max: Point,
}

impl Default for BoundingBox {
    fn default() -> Self {
        BoundingBox {
            min: Point::undefined(),
            max: Point::undefined(),
        }
    }
}

impl BoundingBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, pt: Point) {
        self.min.x = nan_min(self.min.x, pt.x);
        self.min.y = nan_min(self.min.y, pt.y);
        self.max.x = nan_max(self.max.x, pt.x);
        self.max.y = nan_max(self.max.y, pt.y);
    }

    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Self {
        let mut bbox = Self::new();
        for p in points {
            bbox.extend(p);
        }
        bbox
    }

    pub fn is_defined(&self) -> bool {
        self.min.x.is_finite() && self.min.y.is_finite() && self.max.x.is_finite() && self.max.y.is_finite()
    }

    pub fn bottom_left(&self) -> Point {
        Point::new(self.min.x, self.min.y, 0.0)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.max.x, self.min.y, 0.0)
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.min.x, self.max.y, 0.0)
    }

    pub fn top_right(&self) -> Point {
        Point::new(self.max.x, self.max.y, 0.0)
    }

    pub fn center(&self) -> Point {
        Point::new((self.min.x + self.max.x) / 2.0, (self.min.y + self.max.y) / 2.0, 0.0)
    }

    /// (width, height).
    pub fn size(&self) -> (f64, f64) {
        (self.max.x - self.min.x, self.max.y - self.min.y)
    }

    pub fn contains_point(&self, pt: &Point) -> bool {
        pt.x >= self.min.x && pt.x <= self.max.x && pt.y >= self.min.y && pt.y <= self.max.y
    }

    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        self.contains_point(&other.bottom_left()) && self.contains_point(&other.top_right())
    }
}

fn nan_min(a: f64, b: f64) -> f64 {
    if a.is_nan() {
        b
    } else if b.is_nan() {
        a
    } else {
        a.min(b)
    }
}

fn nan_max(a: f64, b: f64) -> f64 {
    if a.is_nan() {
        b
    } else if b.is_nan() {
        a
    } else {
        a.max(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_grows_box() {
        let mut bbox = BoundingBox::new();
        bbox.extend(Point::new(0.0, 0.0, 0.0));
        bbox.extend(Point::new(10.0, 5.0, 0.0));
        assert_eq!(bbox.size(), (10.0, 5.0));
        assert!(bbox.contains_point(&Point::new(5.0, 2.0, 0.0)));
        assert!(!bbox.contains_point(&Point::new(11.0, 2.0, 0.0)));
    }

    #[test]
    fn corners() {
        let bbox = BoundingBox::from_points([Point::new(0.0, 0.0, 0.0), Point::new(4.0, 2.0, 0.0)]);
        assert_eq!(bbox.bottom_left().x, 0.0);
        assert_eq!(bbox.top_right().x, 4.0);
        assert_eq!(bbox.top_right().y, 2.0);
    }

    #[test]
    fn contains_box() {
        let outer = BoundingBox::from_points([Point::new(0.0, 0.0, 0.0), Point::new(10.0, 10.0, 0.0)]);
        let inner = BoundingBox::from_points([Point::new(1.0, 1.0, 0.0), Point::new(9.0, 9.0, 0.0)]);
        assert!(outer.contains_box(&inner));
        assert!(!inner.contains_box(&outer));
    }
}
