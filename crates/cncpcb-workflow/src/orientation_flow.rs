//! Acquiring and refining the CAM-to-machine [`Orientation`]: the
//! no-fiducial `orient` jog flow, drilling the four reference holes, and
//! recovering the transform from previously-drilled fiducials (`userefs`).

use crate::interactive::{Interactive, PointList};
use cncpcb_controller::transport::LineTransport;
use cncpcb_controller::session::{MoveMode, Session};
use cncpcb_core::constants::REFERENCE_POINT_MARGIN;
use cncpcb_core::error::WorkflowError;
use cncpcb_core::{BoundingBox, Orientation, Point, Result, Vector};

const DRILL_SPINDLE_SPEED: f64 = 1000.0;
const DRILL_FEED_RATE: f64 = 50.0;
const DRILL_TRAVEL_Z: f64 = 1.0;
const DRILL_WORK_Z: f64 = -1.7;

/// The four CAM-frame reference points, placed at an asymmetric margin
/// just outside each corner of `border_bbox` so every fiducial sits clear
/// of the panel itself.
pub fn reference_points(border_bbox: BoundingBox) -> [Point; 4] {
    let min = border_bbox.bottom_left();
    let max = border_bbox.top_right();
    let m = REFERENCE_POINT_MARGIN;
    [
        Point::new(min.x - m, min.y, 0.0),
        Point::new(min.x, max.y + m, 0.0),
        Point::new(max.x, max.y + m, 0.0),
        Point::new(max.x + m, min.y, 0.0),
    ]
}

/// Interactively acquire an orientation with no pre-drilled fiducials: jog
/// to the CAM-frame lower-left corner, then rotate a vector onto the
/// top-right direction. Loops on the reference-point preview until the
/// user accepts it or cancels (`Ok(None)`).
pub fn orient(border_bbox: BoundingBox, ui: &mut impl Interactive) -> Result<Option<Orientation>> {
    let refs = reference_points(border_bbox);
    let size_vec = {
        let (w, h) = border_bbox.size();
        Vector::new(w, h, 0.0)
    };

    loop {
        let Some(origin) = ui.position("jog to the CAM-frame lower-left corner", None) else {
            return Ok(None);
        };
        let Some(jogged) = ui.angle("rotate onto the top-right direction", origin, Vector::axis_x()) else {
            return Ok(None);
        };

        let rotation = Vector::axis_x().rotate(size_vec.angle_to(jogged));
        let orientation = Orientation::new(border_bbox.bottom_left(), origin, rotation);

        let predicted: Vec<Point> = refs.iter().map(|&p| orientation.apply(p)).collect();
        let list = PointList::new(predicted, "reference point predictions".into());
        if ui.point_list("accept these reference point locations?", &list) >= 0 {
            return Ok(Some(orientation));
        }
    }
}

/// Drill the four reference holes at the standard reference-drilling
/// settings. Requires `orientation` to already be defined.
pub fn drillrefs<T: LineTransport>(
    session: &mut Session<T>,
    border_bbox: BoundingBox,
    orientation: &Orientation,
) -> Result<()> {
    if !orientation.is_defined() {
        return Err(WorkflowError::OrientationUndefined.into());
    }

    session.set_spindle_speed(DRILL_SPINDLE_SPEED)?;
    session.set_spindle_on()?;
    session.set_feed_rate(DRILL_FEED_RATE)?;

    for cam_pt in reference_points(border_bbox) {
        let machine_pt = orientation.apply(cam_pt);
        session.move_point(Point::new(machine_pt.x, machine_pt.y, DRILL_TRAVEL_Z), MoveMode::Safe)?;
        session.feed_z(DRILL_WORK_Z)?;
        session.feed_z(0.0)?;
        session.move_z(DRILL_TRAVEL_Z, MoveMode::Unsafe)?;
    }

    session.set_spindle_off()?;
    Ok(())
}

/// Recover the orientation from fiducials already drilled on a previous
/// run of the same panel: jog to each of the four reference points, fit an
/// [`Orientation::reconstruct`], then iteratively refine by showing the
/// reconstructed predictions and letting the user re-jog any of them.
pub fn userefs(border_bbox: BoundingBox, ui: &mut impl Interactive) -> Result<Option<Orientation>> {
    let refs = reference_points(border_bbox);

    let mut jogged = Vec::with_capacity(refs.len());
    for (i, _) in refs.iter().enumerate() {
        let Some(p) = ui.position(&format!("jog to fiducial {}", i + 1), None) else {
            return Ok(None);
        };
        jogged.push(p);
    }

    loop {
        let orientation = Orientation::reconstruct(&refs, &jogged)?;
        let predicted: Vec<Point> = refs.iter().map(|&p| orientation.apply(p)).collect();
        let list = PointList::new(predicted, "reconstructed fiducial predictions".into());
        let choice = ui.point_list("accept this orientation?", &list);
        if choice < 0 {
            let Some(p) = ui.position("re-jog the rejected fiducial", None) else {
                return Ok(None);
            };
            // No index was rejected explicitly (a plain reject re-acquires
            // all four); re-prompt the full set.
            jogged[0] = p;
            for (i, slot) in jogged.iter_mut().enumerate().skip(1) {
                let Some(p) = ui.position(&format!("jog to fiducial {}", i + 1), None) else {
                    return Ok(None);
                };
                *slot = p;
            }
            continue;
        }
        return Ok(Some(orientation));
    }
}
