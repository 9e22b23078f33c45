//! # cncpcb-camtools
//!
//! The height-map probe/warp subsystem, the parametric shape library, and
//! the overload-by-prefix command dispatch table.

pub mod dispatch;
pub mod height_map;
pub mod shapes;

pub use dispatch::{dispatch, Command};
pub use height_map::HeightMap;
pub use shapes::{circle, filled_box, filled_circle, rect_box, rounded_box, DepthSchedule};
