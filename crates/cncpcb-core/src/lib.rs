//! # cncpcb-core
//!
//! Geometry, the CAM instruction/stream model, the shared error taxonomy,
//! the cancellation token, and named constants for the CNC control core.

pub mod cam;
pub mod cancel;
pub mod constants;
pub mod error;
pub mod geometry;

pub use cam::{break_long_legs_default, CamInstruction, CamStream, Letter};
pub use cancel::CancelToken;
pub use error::{
    CamError, ControllerError, DispatchError, Error, GeometryError, HeightMapError, ProtocolError,
    Result, WorkflowError,
};
pub use geometry::{BoundingBox, CircularArea, Orientation, Point, Vector};
