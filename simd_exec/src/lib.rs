pub mod batch;
pub mod context;
pub mod data;
pub mod dispatch;
pub mod elements;
pub mod frame;
pub mod function;
pub mod kernels;
pub mod mask;
pub mod register;

#[cfg(test)]
mod tests;

pub use context::{SimdContext, DEFAULT_LANE_COUNT};
pub use data::{DataType, Direction, FuncParam, Signature};
pub use elements::lookup_table_funclib::{declare_lookup_table, LookupTableFuncLib};
pub use function::{Builtin, BuiltinLib, LinkError, LinkedBuiltin, RegistryError};
pub use mask::LaneMask;
pub use register::{Element, Lanes, Register, RegisterType};
