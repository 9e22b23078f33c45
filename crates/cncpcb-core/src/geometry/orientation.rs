use super::point::Point;
use super::vector::Vector;
use crate::error::GeometryError;
use serde::{Deserialize, Serialize};

/// A rigid 2-D transform mapping CAM-frame points to machine-frame points:
/// translation, rotation, and an optional horizontal mirror.
///
/// A default-constructed orientation has no defined origins — it is
/// [`Orientation::is_defined`] only once built via [`Orientation::new`],
/// [`Orientation::identity`], or [`Orientation::reconstruct`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Orientation {
    gcode_zero: Point,
    cnc_zero: Point,
    rotation: Vector,
    hmirror: Option<f64>,
}

impl Orientation {
    pub fn new(gcode_zero: Point, cnc_zero: Point, rotation: Vector) -> Self {
        Orientation {
            gcode_zero,
            cnc_zero,
            rotation: rotation.project_xy().unit(),
            hmirror: None,
        }
    }

    /// Origins at zero, no rotation, no mirror.
    pub fn identity() -> Self {
        Orientation::new(
            Point::new(0.0, 0.0, 0.0),
            Point::new(0.0, 0.0, 0.0),
            Vector::axis_x(),
        )
    }

    pub fn is_defined(&self) -> bool {
        self.gcode_zero.is_defined() && self.cnc_zero.is_defined() && self.rotation.is_defined()
    }

    pub fn gcode_zero(&self) -> Point {
        self.gcode_zero
    }

    pub fn cnc_zero(&self) -> Point {
        self.cnc_zero
    }

    pub fn rotation(&self) -> Vector {
        self.rotation
    }

    pub fn hmirror(&self) -> Option<f64> {
        self.hmirror
    }

    /// Activate the horizontal mirror plane at CAM-frame X coordinate `x`.
    pub fn set_hmirror(&mut self, x: f64) {
        self.hmirror = Some(x);
    }

    /// Apply the forward transform: CAM-frame point to machine-frame point.
    pub fn apply(&self, pt: Point) -> Point {
        let mirrored = match self.hmirror {
            Some(x) => Point::new(2.0 * x - pt.x, pt.y, pt.z),
            None => pt,
        };
        let relative = mirrored - self.gcode_zero;
        let rotated = relative.rotate_by(self.rotation);
        Point::new(
            rotated.x + self.cnc_zero.x,
            rotated.y + self.cnc_zero.y,
            rotated.z + self.cnc_zero.z,
        )
    }

    /// The inverse transform. Per the source behaviour, the mirror is not
    /// carried into the inverse — only origins and rotation invert.
    pub fn inverse(&self) -> Orientation {
        Orientation::new(self.cnc_zero, self.gcode_zero, self.rotation.mirror_y())
    }

    /// Least-squares-flavoured rigid fit: centroids of `orig` and `xformed`
    /// become the two origins; rotation is the mean of per-point signed
    /// angles from `orig_i - centroid_orig` to `xformed_i - centroid_xformed`.
    pub fn reconstruct(orig: &[Point], xformed: &[Point]) -> Result<Orientation, GeometryError> {
        if orig.is_empty() {
            return Err(GeometryError::EmptyPointSet(0));
        }
        if orig.len() != xformed.len() {
            return Err(GeometryError::MismatchedPointCounts {
                orig: orig.len(),
                xformed: xformed.len(),
            });
        }

        let centroid = |pts: &[Point]| -> Point {
            let n = pts.len() as f64;
            let sum = pts.iter().fold(Vector::new(0.0, 0.0, 0.0), |acc, p| acc.add(p.to_vector()));
            Point::new(sum.x / n, sum.y / n, sum.z / n)
        };

        let gcode_zero = centroid(orig);
        let cnc_zero = centroid(xformed);

        let n = orig.len() as f64;
        let angle_sum: f64 = orig
            .iter()
            .zip(xformed.iter())
            .map(|(o, x)| (*o - gcode_zero).angle_to(*x - cnc_zero))
            .sum();
        let angle = angle_sum / n;

        Ok(Orientation::new(gcode_zero, cnc_zero, Vector::axis_x().rotate(angle)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn identity_roundtrip() {
        let o = Orientation::identity();
        let p = Point::new(3.0, 4.0, 0.0);
        let q = o.apply(p);
        assert!((q.x - p.x).abs() < 1e-9);
        assert!((q.y - p.y).abs() < 1e-9);
    }

    #[test]
    fn inverse_roundtrip() {
        let o = Orientation::new(
            Point::new(1.0, 2.0, 0.0),
            Point::new(10.0, 20.0, 0.0),
            Vector::axis_x().rotate(PI / 6.0),
        );
        let p = Point::new(5.0, -3.0, 0.0);
        let forward = o.apply(p);
        let back = o.inverse().apply(forward);
        assert!((back.x - p.x).abs() < 1e-6);
        assert!((back.y - p.y).abs() < 1e-6);
    }

    #[test]
    fn reconstruct_recovers_quarter_turn() {
        let orig = vec![Point::new(0.0, 0.0, 0.0), Point::new(10.0, 0.0, 0.0)];
        let xformed = vec![Point::new(0.0, 0.0, 0.0), Point::new(0.0, 10.0, 0.0)];
        let o = Orientation::reconstruct(&orig, &xformed).unwrap();
        let p = o.apply(Point::new(5.0, 0.0, 0.0));
        assert!((p.x - 0.0).abs() < 1e-6);
        assert!((p.y - 5.0).abs() < 1e-6);
    }

    #[test]
    fn reconstruct_rejects_empty() {
        assert!(Orientation::reconstruct(&[], &[]).is_err());
    }

    #[test]
    fn reconstruct_rejects_mismatched_lengths() {
        let orig = vec![Point::new(0.0, 0.0, 0.0)];
        let xformed = vec![Point::new(0.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0)];
        assert!(Orientation::reconstruct(&orig, &xformed).is_err());
    }

    #[test]
    fn mirror_reflects_x() {
        let mut o = Orientation::identity();
        o.set_hmirror(5.0);
        let p = o.apply(Point::new(2.0, 0.0, 0.0));
        assert!((p.x - 8.0).abs() < 1e-9);
    }

    #[test]
    fn inverse_does_not_carry_mirror() {
        let mut o = Orientation::identity();
        o.set_hmirror(5.0);
        assert_eq!(o.inverse().hmirror(), None);
    }
}
