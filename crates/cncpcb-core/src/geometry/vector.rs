use serde::{Deserialize, Serialize};
use std::fmt;

/// A displacement in 3-D, sharing storage with [`super::point::Point`] but
/// used wherever "vector algebra" rather than "position" semantics apply.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Vector { x, y, z }
    }

    pub fn axis_x() -> Self {
        Vector::new(1.0, 0.0, 0.0)
    }

    pub fn axis_y() -> Self {
        Vector::new(0.0, 1.0, 0.0)
    }

    pub fn axis_z() -> Self {
        Vector::new(0.0, 0.0, 1.0)
    }

    pub fn is_defined(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn unit(&self) -> Vector {
        let len = self.length();
        if len == 0.0 {
            *self
        } else {
            Vector::new(self.x / len, self.y / len, self.z / len)
        }
    }

    pub fn scale(&self, s: f64) -> Vector {
        Vector::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn add(&self, other: Vector) -> Vector {
        Vector::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(&self, other: Vector) -> Vector {
        Vector::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn dot_xy(&self, other: Vector) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn project_xy(&self) -> Vector {
        Vector::new(self.x, self.y, 0.0)
    }

    pub fn mirror_x(&self) -> Vector {
        Vector::new(-self.x, self.y, self.z)
    }

    pub fn mirror_y(&self) -> Vector {
        Vector::new(self.x, -self.y, self.z)
    }

    /// Rotate about the Z axis by `angle` radians.
    pub fn rotate(&self, angle: f64) -> Vector {
        self.rotate_by(Vector::new(angle.cos(), angle.sin(), 0.0))
    }

    /// Rotate treating `angle` as a (cos, sin) pair rather than a radian
    /// value — the composition rule [`super::orientation::Orientation`]
    /// uses to apply its stored unit rotation vector directly, without
    /// round-tripping through `atan2`.
    pub fn rotate_by(&self, angle: Vector) -> Vector {
        Vector::new(
            self.x * angle.x - self.y * angle.y,
            self.y * angle.x + self.x * angle.y,
            self.z,
        )
    }

    /// Signed angle (radians) from `self` to `other`, both projected to XY.
    pub fn angle_to(&self, other: Vector) -> f64 {
        let a = self.unit();
        let b = other.unit();
        let perp = a.rotate(std::f64::consts::FRAC_PI_2).unit();
        b.dot_xy(perp).atan2(b.dot_xy(a))
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{:.3}, {:.3}, {:.3}>", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn rotate_quarter_turn() {
        let v = Vector::axis_x();
        let r = v.rotate(PI / 2.0);
        assert!((r.x).abs() < 1e-9);
        assert!((r.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn angle_to_quarter_turn() {
        let a = Vector::axis_x();
        let b = Vector::axis_y();
        let angle = a.angle_to(b);
        assert!((angle - PI / 2.0).abs() < 1e-9);
    }

    #[test]
    fn unit_preserves_direction() {
        let v = Vector::new(3.0, 4.0, 0.0);
        let u = v.unit();
        assert!((u.length() - 1.0).abs() < 1e-9);
    }
}
