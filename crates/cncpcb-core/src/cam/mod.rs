//! The parsed CAM instruction model: a single-instruction record and the
//! stream operations (bounding box, leg-splitting, affine remap) built on it.

mod instruction;
mod parse;
mod stream;

pub use instruction::{CamInstruction, Letter};
pub use parse::parse_line;
pub use stream::{break_long_legs_default, CamStream};
