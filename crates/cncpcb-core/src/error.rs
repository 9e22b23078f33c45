//! Layered error taxonomy for the CNC control core.
//!
//! Each subsystem owns a leaf error enum; [`Error`] composes them into one
//! type so callers at any boundary can propagate with `?` regardless of
//! which subsystem raised the failure.

use thiserror::Error as ThisError;

/// Errors raised while building or applying geometry (orientation fit,
/// degenerate bounding boxes, and the like).
#[derive(Debug, ThisError, Clone, PartialEq)]
pub enum GeometryError {
    #[error("reconstruct requires at least one point pair, got {0}")]
    EmptyPointSet(usize),

    #[error("reconstruct requires equal-length point sets, got {orig} and {xformed}")]
    MismatchedPointCounts { orig: usize, xformed: usize },

    #[error("orientation is undefined")]
    UndefinedOrientation,
}

/// Errors raised while parsing or manipulating a CAM instruction stream.
#[derive(Debug, ThisError, Clone, PartialEq)]
pub enum CamError {
    #[error("line {line}: could not parse instruction: {text:?}")]
    InvalidSyntax { line: usize, text: String },

    #[error("line {line}: instruction {letter}{arg} is not in the accepted set")]
    Rejected { line: usize, letter: char, arg: i64 },

    #[error("line {line}: malformed numeric field {field:?}")]
    InvalidNumber { line: usize, field: String },
}

/// Errors surfaced by the GRBL wire protocol.
#[derive(Debug, ThisError, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("protocol violation: {reason}")]
    Violation { reason: String },

    #[error("unsolicited controller reset")]
    UnsolicitedReset,

    #[error("cancelled by user interrupt")]
    Cancelled,
}

/// Errors reported by the controller itself (as opposed to the transport).
#[derive(Debug, ThisError, Clone, PartialEq)]
pub enum ControllerError {
    #[error("controller error {code}: {message}")]
    Error { code: u32, message: String },

    #[error("controller alarm {code}: {message}")]
    Alarm { code: u32, message: String },
}

/// Errors raised by the height-map subsystem.
#[derive(Debug, ThisError, Clone, PartialEq)]
pub enum HeightMapError {
    #[error("height map is not fully probed")]
    Undefined,

    #[error("stored bounding box size {stored:?} does not match current border {current:?} (tolerance {tolerance_um} um)")]
    SizeMismatch {
        stored: (f64, f64),
        current: (f64, f64),
        tolerance_um: f64,
    },

    #[error("malformed height map file at line {line}: {reason}")]
    ParseError { line: usize, reason: String },

    #[error("point count mismatch: header declares {expected}, file has {actual}")]
    PointCountMismatch { expected: usize, actual: usize },
}

/// Errors raised by workflow-level preconditions ("logic constraint" in the
/// error-handling design).
#[derive(Debug, ThisError, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("border not loaded")]
    BorderNotLoaded,

    #[error("orientation undefined")]
    OrientationUndefined,

    #[error("layer bounding box is not contained in the border bounding box")]
    LayerExceedsBorder,

    #[error("tool width {width} exceeds shape width {shape_width}")]
    ToolWidthExceedsShape { width: f64, shape_width: f64 },

    #[error("mirror can only be set before any component is loaded")]
    MirrorAfterLoad,
}

/// Errors raised by the command dispatch table.
#[derive(Debug, ThisError, Clone, PartialEq)]
pub enum DispatchError {
    #[error("no command matches prefix {prefix:?}")]
    NoMatch { prefix: String },

    #[error("{handler}: {reason}")]
    ArgumentParse { handler: String, reason: String },
}

/// The crate-wide error type. Every leaf error composes into this via
/// `#[from]` so call sites can use `?` uniformly.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Cam(#[from] CamError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error(transparent)]
    HeightMap(#[from] HeightMapError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn other(message: impl Into<String>) -> Self {
        Error::Other(message.into())
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Protocol(ProtocolError::Cancelled))
    }

    pub fn is_unsolicited_reset(&self) -> bool {
        matches!(self, Error::Protocol(ProtocolError::UnsolicitedReset))
    }

    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Error::Protocol(ProtocolError::Violation { .. }))
    }

    pub fn is_controller_error(&self) -> bool {
        matches!(self, Error::Controller(_))
    }

    pub fn is_fatal(&self) -> bool {
        self.is_protocol_violation() || self.is_unsolicited_reset()
    }
}

/// The crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_error_carries_code() {
        let e: Error = ControllerError::Error {
            code: 9,
            message: "G-code locked out during alarm or jog state.".into(),
        }
        .into();
        assert!(e.is_controller_error());
        assert!(!e.is_fatal());
    }

    #[test]
    fn protocol_violation_is_fatal() {
        let e: Error = ProtocolError::Violation {
            reason: "stream closed".into(),
        }
        .into();
        assert!(e.is_fatal());
    }

    #[test]
    fn cancellation_is_not_fatal_but_is_cancellation() {
        let e: Error = ProtocolError::Cancelled.into();
        assert!(e.is_cancellation());
        assert!(!e.is_fatal());
    }
}
