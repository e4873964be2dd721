//! Scalar lookup and interpolation math. No registers or masks here; the
//! built-ins call these once per computed lane.

mod interpolate;
mod lookup;

pub use interpolate::{interpolate_cubic_1d, interpolate_linear_1d};
pub use lookup::{axis_position, lookup_1d, lookup_3d, GridShape};
