//! Parametric polyline generators and the multi-pass depth schedule.
//!
//! Generators return ordered 3-D point sequences at `z = 0`; the job
//! runner is responsible for transforming and sending them.

use cncpcb_core::constants::ARC_CHORD_PRECISION;
use cncpcb_core::Point;
use std::f64::consts::PI;

fn arc_points(radius: f64, start_angle: f64, end_angle: f64) -> Vec<Point> {
    let sweep = end_angle - start_angle;
    let steps = ((radius * sweep.abs()) / ARC_CHORD_PRECISION).ceil().max(1.0) as usize;
    (0..=steps)
        .map(|i| {
            let a = start_angle + sweep * (i as f64 / steps as f64);
            Point::new(radius * a.cos(), radius * a.sin(), 0.0)
        })
        .collect()
}

/// A full circle of radius `r`, discretised at [`ARC_CHORD_PRECISION`]
/// chord length.
pub fn circle(r: f64) -> Vec<Point> {
    arc_points(r, 0.0, 2.0 * PI)
}

/// A concentric spiral from `r1` down to `r2` (or up, if `r2 > r1`) at
/// `tool_w` radial pitch, for filling a circular pad.
pub fn filled_circle(r1: f64, r2: f64, tool_w: f64) -> Vec<Point> {
    let mut points = Vec::new();
    let step = if r2 >= r1 { tool_w } else { -tool_w };
    let mut r = r1;
    loop {
        points.extend(arc_points(r, 0.0, 2.0 * PI));
        let next = r + step;
        let overshot = if step > 0.0 { next >= r2 } else { next <= r2 };
        if overshot {
            if (r - r2).abs() > 1e-9 {
                points.extend(arc_points(r2, 0.0, 2.0 * PI));
            }
            break;
        }
        r = next;
    }
    points
}

/// A rectangular outline, `w` x `h`, centred on the origin.
pub fn rect_box(w: f64, h: f64) -> Vec<Point> {
    let (hw, hh) = (w / 2.0, h / 2.0);
    vec![
        Point::new(-hw, -hh, 0.0),
        Point::new(hw, -hh, 0.0),
        Point::new(hw, hh, 0.0),
        Point::new(-hw, hh, 0.0),
        Point::new(-hw, -hh, 0.0),
    ]
}

/// A rectangular outline with `corner_r` rounded corners.
pub fn rounded_box(w: f64, h: f64, corner_r: f64) -> Vec<Point> {
    let (hw, hh) = (w / 2.0, h / 2.0);
    let r = corner_r;
    let mut points = Vec::new();
    let corners = [
        (hw - r, hh - r, 0.0),
        (-hw + r, hh - r, PI / 2.0),
        (-hw + r, -hh + r, PI),
        (hw - r, -hh + r, 3.0 * PI / 2.0),
    ];
    for &(cx, cy, start) in &corners {
        for p in arc_points(r, start, start + PI / 2.0) {
            points.push(Point::new(p.x + cx, p.y + cy, 0.0));
        }
    }
    if let Some(first) = points.first().copied() {
        points.push(first);
    }
    points
}

/// A raster fill of a `w` x `h` rectangle at `tool_w` row pitch, with
/// half-tool-radius reversing arcs joining alternating rows.
pub fn filled_box(w: f64, h: f64, tool_w: f64) -> Vec<Point> {
    let (hw, hh) = (w / 2.0, h / 2.0);
    let mut points = Vec::new();
    let mut y = -hh + tool_w / 2.0;
    let mut left_to_right = true;
    let mut first = true;
    while y <= hh - tool_w / 2.0 + 1e-9 {
        let (x0, x1) = if left_to_right { (-hw, hw) } else { (hw, -hw) };
        if !first {
            let turn_centre_y = y - tool_w / 2.0;
            let start = if left_to_right { PI } else { 0.0 };
            let sweep = if left_to_right { -PI } else { PI };
            for p in arc_points(tool_w / 2.0, start, start + sweep) {
                points.push(Point::new(p.x + x0, p.y + turn_centre_y, 0.0));
            }
        }
        points.push(Point::new(x0, y, 0.0));
        points.push(Point::new(x1, y, 0.0));
        y += tool_w;
        left_to_right = !left_to_right;
        first = false;
    }
    points
}

/// A monotonically-increasing sequence of pass depths, the last equal to
/// `end` exactly, with every gap `<= step`.
#[derive(Debug, Clone)]
pub struct DepthSchedule {
    pub depths: Vec<f64>,
}

impl DepthSchedule {
    pub fn single(depth: f64) -> Self {
        DepthSchedule { depths: vec![depth] }
    }

    pub fn stepped(start: f64, end: f64, step: f64) -> Self {
        let step = step.abs();
        let mut depths = Vec::new();
        let mut d = start;
        if start <= end {
            while d < end {
                depths.push(d);
                d += step;
            }
        } else {
            while d > end {
                depths.push(d);
                d -= step;
            }
        }
        depths.push(end);
        DepthSchedule { depths }
    }

    /// Traverse `path` once per depth, alternating direction each pass and
    /// setting `z` to that pass's depth.
    pub fn apply(&self, path: &[Point]) -> Vec<Point> {
        let mut out = Vec::with_capacity(path.len() * self.depths.len());
        for (i, &depth) in self.depths.iter().enumerate() {
            let reversed = i % 2 == 1;
            let iter: Box<dyn Iterator<Item = &Point>> = if reversed {
                Box::new(path.iter().rev())
            } else {
                Box::new(path.iter())
            };
            out.extend(iter.map(|p| Point::new(p.x, p.y, depth)));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_is_closed_and_chord_bounded() {
        let pts = circle(10.0);
        let first = pts.first().unwrap();
        let last = pts.last().unwrap();
        assert!(first.distance_to(last) < 1e-6);
        for w in pts.windows(2) {
            assert!(w[0].distance_to(&w[1]) <= ARC_CHORD_PRECISION + 1e-6);
        }
    }

    #[test]
    fn rect_box_has_four_distinct_corners() {
        let pts = rect_box(10.0, 4.0);
        assert_eq!(pts.len(), 5);
        assert_eq!(pts[0], pts[4]);
    }

    #[test]
    fn depth_schedule_single() {
        let s = DepthSchedule::single(-2.0);
        assert_eq!(s.depths, vec![-2.0]);
    }

    #[test]
    fn depth_schedule_stepped_monotone_and_bounded_gaps() {
        let s = DepthSchedule::stepped(0.0, -5.0, 2.0);
        assert_eq!(*s.depths.first().unwrap(), 0.0);
        assert_eq!(*s.depths.last().unwrap(), -5.0);
        for w in s.depths.windows(2) {
            assert!(w[0] > w[1]);
            assert!((w[0] - w[1]).abs() <= 2.0 + 1e-9);
        }
    }

    #[test]
    fn depth_schedule_apply_alternates_direction() {
        let path = vec![Point::new(0.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0)];
        let schedule = DepthSchedule::stepped(0.0, -2.0, 1.0);
        let out = schedule.apply(&path);
        assert_eq!(out[0].x, 0.0);
        assert_eq!(out[1].x, 1.0);
        assert_eq!(out[2].x, 1.0);
        assert_eq!(out[3].x, 0.0);
    }

    #[test]
    fn filled_box_rows_span_width() {
        let pts = filled_box(10.0, 4.0, 2.0);
        assert!(!pts.is_empty());
        for p in &pts {
            assert!(p.x.abs() <= 5.0 + 1e-6);
            assert!(p.y.abs() <= 2.0 + 1e-6);
        }
    }
}
