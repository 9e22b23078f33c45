//! # cncpcb
//!
//! A host-side driver that operates a GRBL-compatible motion controller to
//! fabricate printed circuit boards: probing, orientation, and toolpath
//! delivery over a blocking serial protocol.
//!
//! This crate carries no logic of its own — it re-exports the four
//! workspace members for downstream consumers (a REPL, a GUI, a test
//! harness) that want the whole stack behind one dependency.

pub use cncpcb_camtools::{circle, dispatch, filled_box, filled_circle, rect_box, rounded_box, Command, DepthSchedule, HeightMap};
pub use cncpcb_controller::{
    decode_alarm, decode_error, Axis, LineTransport, MockTransport, MoveMode, SerialTransport, Session,
    StatusMirror,
};
pub use cncpcb_core::{
    BoundingBox, CamError, CamInstruction, CamStream, CancelToken, CircularArea, ControllerError, DispatchError,
    Error, GeometryError, HeightMapError, Letter, Orientation, Point, ProtocolError, Result, Vector, WorkflowError,
};
pub use cncpcb_workflow::{drillrefs, orient, reference_points, userefs, CoreConfig, Interactive, JobRunner, PointList};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install a `tracing-subscriber` formatter honoring `RUST_LOG`, matching
/// every trace/debug/info/warn emitted across the workspace.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let fmt_layer = fmt::layer().with_writer(std::io::stdout).with_target(true).with_level(true);

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();
    Ok(())
}
