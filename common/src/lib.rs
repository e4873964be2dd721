pub mod bit_buffer;
pub mod float_ext;
pub mod log_setup;

pub use bit_buffer::BitBuffer;
pub use float_ext::FloatExt;

pub const EPSILON: f64 = 1e-6;
