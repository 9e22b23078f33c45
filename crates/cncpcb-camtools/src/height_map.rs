//! Probed-Z surface interpolator: grid construction with keep-out
//! avoidance, bilinear warp, and flat-file persistence.

use cncpcb_core::constants::{
    HEIGHT_MAP_CELL_SIZE, HEIGHT_MAP_PERTURB_OFFSET, HEIGHT_MAP_PERTURB_SEED,
    HEIGHT_MAP_SAFETY_MARGIN, HEIGHT_MAP_SIZE_TOLERANCE,
};
use cncpcb_core::error::HeightMapError;
use cncpcb_core::{BoundingBox, CircularArea, Point, Result, Vector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::fmt::Write as _;
use tracing::debug;

/// A probed height-map grid over `bbox`, `(nx+1) x (ny+1)` samples in
/// row-major order. Each sample's XY may be perturbed away from its
/// nominal lattice position to clear a keep-out area; its Z is NaN until
/// [`HeightMap::set_measurement`] (normally driven by a probing scan).
#[derive(Debug, Clone)]
pub struct HeightMap {
    bbox: BoundingBox,
    nx: usize,
    ny: usize,
    points: Vec<Point>,
}

impl HeightMap {
    /// Build a grid over `bbox`, perturbing any lattice point that falls
    /// within `radius + 0.2mm` of a keep-out area until it clears all of
    /// them, using a seed fixed at 1 for reproducible grids.
    pub fn new(bbox: BoundingBox, avoid: &[CircularArea]) -> Self {
        let (size_x, size_y) = bbox.size();
        let nx = (size_x / HEIGHT_MAP_CELL_SIZE).ceil().max(1.0) as usize;
        let ny = (size_y / HEIGHT_MAP_CELL_SIZE).ceil().max(1.0) as usize;
        let cell_x = size_x / nx as f64;
        let cell_y = size_y / ny as f64;

        let mut rng = StdRng::seed_from_u64(HEIGHT_MAP_PERTURB_SEED);
        let mut points = Vec::with_capacity((nx + 1) * (ny + 1));

        for y in 0..=ny {
            for x in 0..=nx {
                let nominal = bbox.bottom_left() + Vector::new(x as f64 * cell_x, y as f64 * cell_y, 0.0);
                let mut pt = nominal;
                loop {
                    let closest = avoid
                        .iter()
                        .map(|a| (a, a.distance_to(&pt)))
                        .min_by(|a, b| a.1.total_cmp(&b.1));
                    match closest {
                        Some((area, dist)) if dist <= HEIGHT_MAP_SAFETY_MARGIN => {
                            let angle = rng.gen_range(0.0..2.0 * PI);
                            let offset = Vector::axis_x()
                                .scale(area.radius + HEIGHT_MAP_PERTURB_OFFSET)
                                .rotate(angle);
                            pt = area.center + offset;
                        }
                        _ => break,
                    }
                }
                if (pt.x, pt.y) != (nominal.x, nominal.y) {
                    debug!(x = nominal.x, y = nominal.y, new_x = pt.x, new_y = pt.y, "lattice point perturbed clear of keep-out");
                }
                points.push(Point::new(pt.x, pt.y, f64::NAN));
            }
        }

        HeightMap { bbox, nx, ny, points }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    pub fn cell_counts(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    fn index(&self, x: usize, y: usize) -> usize {
        y * (self.nx + 1) + x
    }

    pub fn measurement(&self, x: usize, y: usize) -> Point {
        self.points[self.index(x, y)]
    }

    /// Record a probed Z at lattice cell `(x, y)` (XY is left untouched).
    pub fn set_measurement(&mut self, x: usize, y: usize, z: f64) {
        let idx = self.index(x, y);
        self.points[idx].z = z;
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn defined(&self) -> bool {
        self.points.iter().all(|p| p.z.is_finite())
    }

    fn cell_size(&self) -> (f64, f64) {
        let (size_x, size_y) = self.bbox.size();
        (size_x / self.nx as f64, size_y / self.ny as f64)
    }

    /// Bilinearly warp `pt`: find its nominal-lattice cell, interpolate
    /// the actual (possibly perturbed) corner Z values, and return `pt`
    /// with the interpolated surface Z added.
    pub fn apply(&self, pt: Point) -> Result<Point> {
        if !self.defined() {
            return Err(HeightMapError::Undefined.into());
        }
        let origin = self.bbox.bottom_left();
        let (cell_x, cell_y) = self.cell_size();

        let mut x = ((pt.x - origin.x) / cell_x).floor() as isize;
        let mut y = ((pt.y - origin.y) / cell_y).floor() as isize;
        x = x.clamp(0, self.nx as isize - 1);
        y = y.clamp(0, self.ny as isize - 1);
        let (x, y) = (x as usize, y as usize);

        let lb = self.measurement(x, y);
        let lt = self.measurement(x, y + 1);
        let rb = self.measurement(x + 1, y);
        let rt = self.measurement(x + 1, y + 1);

        let ty = if (lt.y - lb.y).abs() > f64::EPSILON { (pt.y - lb.y) / (lt.y - lb.y) } else { 0.0 };
        let l = lb + (lt - lb).scale(ty);
        let ty_r = if (rt.y - rb.y).abs() > f64::EPSILON { (pt.y - rb.y) / (rt.y - rb.y) } else { 0.0 };
        let r = rb + (rt - rb).scale(ty_r);

        let tx = if (r.x - l.x).abs() > f64::EPSILON { (pt.x - l.x) / (r.x - l.x) } else { 0.0 };
        let m = l + (r - l).scale(tx);

        Ok(Point::new(pt.x, pt.y, pt.z + m.z))
    }

    /// Serialise as `nx ny\n` followed by one `x y z` line per sample.
    pub fn save(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} {}", self.nx, self.ny);
        for p in &self.points {
            let _ = writeln!(out, "{} {} {}", p.x, p.y, p.z);
        }
        out
    }

    /// Load a map previously written by [`HeightMap::save`]. `bbox` is the
    /// current border bounding box; the stored size must match it within
    /// [`HEIGHT_MAP_SIZE_TOLERANCE`].
    pub fn load(text: &str, bbox: BoundingBox) -> Result<Self> {
        let mut lines = text.lines();
        let header = lines.next().ok_or(HeightMapError::ParseError {
            line: 0,
            reason: "empty file".into(),
        })?;
        let mut header_parts = header.split_whitespace();
        let nx: usize = header_parts
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or(HeightMapError::ParseError {
                line: 1,
                reason: "missing nx".into(),
            })?;
        let ny: usize = header_parts
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or(HeightMapError::ParseError {
                line: 1,
                reason: "missing ny".into(),
            })?;

        let expected = (nx + 1) * (ny + 1);
        let mut points = Vec::with_capacity(expected);
        for (i, line) in lines.enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let parse_next = |parts: &mut std::str::SplitWhitespace| -> Option<f64> {
                parts.next()?.parse().ok()
            };
            let (x, y, z) = (parse_next(&mut parts), parse_next(&mut parts), parse_next(&mut parts));
            match (x, y, z) {
                (Some(x), Some(y), Some(z)) => points.push(Point::new(x, y, z)),
                _ => {
                    return Err(HeightMapError::ParseError {
                        line: i + 2,
                        reason: format!("malformed sample line {line:?}"),
                    }
                    .into())
                }
            }
        }

        if points.len() != expected {
            return Err(HeightMapError::PointCountMismatch {
                expected,
                actual: points.len(),
            }
            .into());
        }

        let stored_bbox = BoundingBox::from_points(points.iter().copied());
        let stored_size = stored_bbox.size();
        let current_size = bbox.size();
        if (stored_size.0 - current_size.0).abs() > HEIGHT_MAP_SIZE_TOLERANCE
            || (stored_size.1 - current_size.1).abs() > HEIGHT_MAP_SIZE_TOLERANCE
        {
            return Err(HeightMapError::SizeMismatch {
                stored: stored_size,
                current: current_size,
                tolerance_um: HEIGHT_MAP_SIZE_TOLERANCE,
            }
            .into());
        }

        Ok(HeightMap { bbox, nx, ny, points })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_surface_warp_adds_constant_z() {
        let bbox = BoundingBox::from_points([Point::new(0.0, 0.0, 0.0), Point::new(10.0, 10.0, 0.0)]);
        let mut map = HeightMap::new(bbox, &[]);
        let (nx, ny) = map.cell_counts();
        for y in 0..=ny {
            for x in 0..=nx {
                map.set_measurement(x, y, 1.0);
            }
        }
        let warped = map.apply(Point::new(5.0, 5.0, 0.0)).unwrap();
        assert!((warped.z - 1.0).abs() < 1e-9);
    }

    #[test]
    fn linear_surface_bilinearity_holds_with_perturbation() {
        let bbox = BoundingBox::from_points([Point::new(0.0, 0.0, 0.0), Point::new(20.0, 20.0, 0.0)]);
        let avoid = vec![CircularArea::new(Point::new(10.0, 10.0, 0.0), 1.0)];
        let mut map = HeightMap::new(bbox, &avoid);
        let (nx, ny) = map.cell_counts();
        let a = 0.02;
        let b = -0.01;
        for y in 0..=ny {
            for x in 0..=nx {
                let p = map.measurement(x, y);
                map.set_measurement(x, y, a * p.x + b * p.y);
            }
        }
        for &(qx, qy) in &[(3.0, 4.0), (15.0, 17.0), (9.5, 10.5)] {
            let warped = map.apply(Point::new(qx, qy, 0.0)).unwrap();
            let expected = a * qx + b * qy;
            assert!((warped.z - expected).abs() < 1e-6, "at ({qx},{qy}): {} vs {}", warped.z, expected);
        }
    }

    #[test]
    fn undefined_map_rejects_apply() {
        let bbox = BoundingBox::from_points([Point::new(0.0, 0.0, 0.0), Point::new(10.0, 10.0, 0.0)]);
        let map = HeightMap::new(bbox, &[]);
        assert!(map.apply(Point::new(1.0, 1.0, 0.0)).is_err());
    }

    #[test]
    fn save_load_round_trip() {
        let bbox = BoundingBox::from_points([Point::new(0.0, 0.0, 0.0), Point::new(10.0, 10.0, 0.0)]);
        let mut map = HeightMap::new(bbox, &[]);
        let (nx, ny) = map.cell_counts();
        for y in 0..=ny {
            for x in 0..=nx {
                map.set_measurement(x, y, 0.5);
            }
        }
        let text = map.save();
        let loaded = HeightMap::load(&text, bbox).unwrap();
        assert_eq!(loaded.cell_counts(), (nx, ny));
        assert!(loaded.defined());
    }

    #[test]
    fn load_rejects_size_mismatch() {
        let bbox = BoundingBox::from_points([Point::new(0.0, 0.0, 0.0), Point::new(10.0, 10.0, 0.0)]);
        let map = HeightMap::new(bbox, &[]);
        let text = map.save();
        let other_bbox = BoundingBox::from_points([Point::new(0.0, 0.0, 0.0), Point::new(20.0, 20.0, 0.0)]);
        assert!(HeightMap::load(&text, other_bbox).is_err());
    }
}
