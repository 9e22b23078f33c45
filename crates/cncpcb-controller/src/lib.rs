//! # cncpcb-controller
//!
//! The GRBL wire protocol: line classification, status/parser-state
//! parsing, error/alarm decoding, the blocking transport abstraction, and
//! the [`Session`] that drives a controller through it.

pub mod error_codes;
pub mod session;
pub mod status;
pub mod transport;

pub use error_codes::{decode_alarm, decode_error};
pub use session::{Axis, MoveMode, Session, StatusMirror};
pub use status::{parse_gc_line, parse_status_line, ParserState, StatusFields};
pub use transport::{LineTransport, MockTransport, SerialTransport};
