//! Named tolerances and limits.
//!
//! Per the design notes, these are deliberate design parameters, not
//! accidents of the original implementation — they are named here instead
//! of appearing as inline literals.

/// Minimum safe travel height (mm) for a `move(.., Safe)` before descending.
pub const MIN_SAFE_HEIGHT: f64 = 0.6;

/// Floor applied to any `move_z`/`feed_z` target in `Safe` mode (mm).
pub const SAFE_Z_FLOOR: f64 = 0.1;

/// Maximum straight-line leg length before `break_long_legs` subdivides it (mm).
pub const MAX_LEG_LENGTH: f64 = 2.0;

/// Chord precision used when discretising arcs in the shape library (mm).
pub const ARC_CHORD_PRECISION: f64 = 0.05;

/// Tolerance used when comparing a loaded height map's stored bounding box
/// size against the current border (mm). 1 micron.
pub const HEIGHT_MAP_SIZE_TOLERANCE: f64 = 1e-3;

/// Suggested lattice cell size for height map grid construction (mm).
pub const HEIGHT_MAP_CELL_SIZE: f64 = 10.0;

/// Safety margin kept clear of a keep-out area before a lattice point needs
/// perturbation (mm).
pub const HEIGHT_MAP_SAFETY_MARGIN: f64 = 0.2;

/// Distance from a keep-out centre a perturbed lattice point is relocated to
/// (radius + this, mm).
pub const HEIGHT_MAP_PERTURB_OFFSET: f64 = 0.25;

/// Deterministic seed used for height-map lattice perturbation.
pub const HEIGHT_MAP_PERTURB_SEED: u64 = 1;

/// Delay observed after an `ALARM:N` before the error propagates, letting
/// the controller's own alarm latch settle (milliseconds).
pub const ALARM_SETTLE_DELAY_MS: u64 = 500;

/// Poll interval used by `wait_until_idle` (milliseconds).
pub const STATUS_POLL_INTERVAL_MS: u64 = 50;

/// Asymmetric margin used to place the four CAM-frame reference points
/// outside the border bounding box (mm).
pub const REFERENCE_POINT_MARGIN: f64 = 3.0;

/// Tolerance for "in position" checks when confirming tool-change completion
/// at XY origin (mm).
pub const TOOL_CHANGE_POSITION_TOLERANCE: f64 = 2.0;
