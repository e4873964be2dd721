//! Uniform/varying register storage.
//!
//! A register holds either one value shared by every lane (`Uniform`) or one
//! value per lane (`Varying`). Reads through [`Lanes::get`] broadcast a
//! uniform value to any lane, so kernels never need to know which shape an
//! argument has unless they want to take a faster path.

use std::sync::Arc;

use glam::Vec3;
use half::f16;
use strum_macros::{Display, EnumIter};

#[derive(Clone, Debug, PartialEq)]
pub enum Lanes<T> {
    Uniform(T),
    Varying(Vec<T>),
}

/// Element types a register can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum RegisterType {
    Bool,
    Int,
    Half,
    Float,
    Vec3,
    FloatArray,
    Float2Array,
    Vec3Array,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Register {
    Bool(Lanes<bool>),
    Int(Lanes<i32>),
    Half(Lanes<f16>),
    Float(Lanes<f32>),
    Vec3(Lanes<Vec3>),
    FloatArray(Lanes<Arc<[f32]>>),
    Float2Array(Lanes<Arc<[[f32; 2]]>>),
    Vec3Array(Lanes<Arc<[Vec3]>>),
}

/// Rust types that map onto exactly one [`Register`] variant.
pub trait Element: Clone + Send + Sync + 'static {
    const REGISTER_TYPE: RegisterType;

    fn lanes(reg: &Register) -> Option<&Lanes<Self>>;
    fn lanes_mut(reg: &mut Register) -> Option<&mut Lanes<Self>>;
    fn into_register(lanes: Lanes<Self>) -> Register;
}

macro_rules! register_element {
    ($ty:ty, $variant:ident) => {
        impl Element for $ty {
            const REGISTER_TYPE: RegisterType = RegisterType::$variant;

            #[inline]
            fn lanes(reg: &Register) -> Option<&Lanes<Self>> {
                match reg {
                    Register::$variant(lanes) => Some(lanes),
                    _ => None,
                }
            }

            #[inline]
            fn lanes_mut(reg: &mut Register) -> Option<&mut Lanes<Self>> {
                match reg {
                    Register::$variant(lanes) => Some(lanes),
                    _ => None,
                }
            }

            fn into_register(lanes: Lanes<Self>) -> Register {
                Register::$variant(lanes)
            }
        }
    };
}

register_element!(bool, Bool);
register_element!(i32, Int);
register_element!(f16, Half);
register_element!(f32, Float);
register_element!(Vec3, Vec3);
register_element!(Arc<[f32]>, FloatArray);
register_element!(Arc<[[f32; 2]]>, Float2Array);
register_element!(Arc<[Vec3]>, Vec3Array);

impl<T: Clone> Lanes<T> {
    #[inline]
    pub fn is_varying(&self) -> bool {
        matches!(self, Lanes::Varying(_))
    }

    /// Broadcast read: lane `lane` of a varying register, or the single value
    /// of a uniform one.
    #[inline]
    pub fn get(&self, lane: usize) -> &T {
        match self {
            Lanes::Uniform(value) => value,
            Lanes::Varying(values) => &values[lane],
        }
    }

    /// The shared value of a uniform register.
    #[inline]
    pub fn uniform(&self) -> &T {
        debug_assert!(!self.is_varying(), "uniform read of a varying register");
        self.get(0)
    }

    #[inline]
    pub fn set(&mut self, lane: usize, value: T) {
        match self {
            Lanes::Uniform(slot) => {
                debug_assert_eq!(lane, 0, "lane write into a uniform register");
                *slot = value;
            }
            Lanes::Varying(values) => values[lane] = value,
        }
    }

    /// Switches the storage shape for the rest of the call.
    ///
    /// Going uniform -> varying broadcasts the current value into every lane.
    /// A register that already has the requested shape is left untouched, so
    /// lanes a masked call does not write keep their previous contents.
    pub fn set_varying(&mut self, varying: bool, lane_count: usize) {
        match (&*self, varying) {
            (Lanes::Uniform(value), true) => {
                *self = Lanes::Varying(vec![value.clone(); lane_count]);
            }
            (Lanes::Varying(values), false) => {
                let first = values
                    .first()
                    .cloned()
                    .expect("varying register without lanes");
                *self = Lanes::Uniform(first);
            }
            (Lanes::Varying(values), true) => {
                assert_eq!(
                    values.len(),
                    lane_count,
                    "varying register has {} lanes, context has {}",
                    values.len(),
                    lane_count
                );
            }
            (Lanes::Uniform(_), false) => {}
        }
    }

    /// Number of stored elements: 1 when uniform, the lane count when varying.
    pub fn len(&self) -> usize {
        match self {
            Lanes::Uniform(_) => 1,
            Lanes::Varying(values) => values.len(),
        }
    }

    pub fn as_slice(&self) -> &[T] {
        match self {
            Lanes::Uniform(value) => std::slice::from_ref(value),
            Lanes::Varying(values) => values,
        }
    }

    /// Materializes one value per lane.
    pub fn to_vec(&self, lane_count: usize) -> Vec<T> {
        (0..lane_count).map(|lane| self.get(lane).clone()).collect()
    }
}

impl<T: Clone + Default> Lanes<T> {
    /// A varying register holding `values` in the leading lanes; the
    /// remaining lanes are filled with `T::default()`.
    pub fn from_partial(values: &[T], lane_count: usize) -> Self {
        assert!(
            values.len() <= lane_count,
            "{} values do not fit into {} lanes",
            values.len(),
            lane_count
        );

        let mut lanes = Vec::with_capacity(lane_count);
        lanes.extend_from_slice(values);
        lanes.resize(lane_count, T::default());
        Lanes::Varying(lanes)
    }
}

impl Register {
    pub fn uniform<T: Element>(value: T) -> Register {
        T::into_register(Lanes::Uniform(value))
    }

    pub fn varying<T: Element>(values: Vec<T>) -> Register {
        T::into_register(Lanes::Varying(values))
    }

    /// A uniform register of the given type holding a zero value.
    pub fn zeroed(register_type: RegisterType) -> Register {
        match register_type {
            RegisterType::Bool => Register::uniform(false),
            RegisterType::Int => Register::uniform(0i32),
            RegisterType::Half => Register::uniform(f16::ZERO),
            RegisterType::Float => Register::uniform(0.0f32),
            RegisterType::Vec3 => Register::uniform(Vec3::ZERO),
            RegisterType::FloatArray => Register::uniform(Arc::<[f32]>::from([])),
            RegisterType::Float2Array => Register::uniform(Arc::<[[f32; 2]]>::from([])),
            RegisterType::Vec3Array => Register::uniform(Arc::<[Vec3]>::from([])),
        }
    }

    pub fn register_type(&self) -> RegisterType {
        match self {
            Register::Bool(_) => RegisterType::Bool,
            Register::Int(_) => RegisterType::Int,
            Register::Half(_) => RegisterType::Half,
            Register::Float(_) => RegisterType::Float,
            Register::Vec3(_) => RegisterType::Vec3,
            Register::FloatArray(_) => RegisterType::FloatArray,
            Register::Float2Array(_) => RegisterType::Float2Array,
            Register::Vec3Array(_) => RegisterType::Vec3Array,
        }
    }

    /// Typed view; a type mismatch is a broken call site and panics.
    pub fn lanes<T: Element>(&self) -> &Lanes<T> {
        let actual = self.register_type();
        T::lanes(self).unwrap_or_else(|| {
            panic!(
                "register holds {}, expected {}",
                actual,
                T::REGISTER_TYPE
            )
        })
    }

    pub fn lanes_mut<T: Element>(&mut self) -> &mut Lanes<T> {
        let actual = self.register_type();
        T::lanes_mut(self).unwrap_or_else(|| {
            panic!(
                "register holds {}, expected {}",
                actual,
                T::REGISTER_TYPE
            )
        })
    }

    pub fn is_varying(&self) -> bool {
        match self {
            Register::Bool(lanes) => lanes.is_varying(),
            Register::Int(lanes) => lanes.is_varying(),
            Register::Half(lanes) => lanes.is_varying(),
            Register::Float(lanes) => lanes.is_varying(),
            Register::Vec3(lanes) => lanes.is_varying(),
            Register::FloatArray(lanes) => lanes.is_varying(),
            Register::Float2Array(lanes) => lanes.is_varying(),
            Register::Vec3Array(lanes) => lanes.is_varying(),
        }
    }

    /// Stored element count: 1 when uniform, the lane count when varying.
    pub fn len(&self) -> usize {
        match self {
            Register::Bool(lanes) => lanes.len(),
            Register::Int(lanes) => lanes.len(),
            Register::Half(lanes) => lanes.len(),
            Register::Float(lanes) => lanes.len(),
            Register::Vec3(lanes) => lanes.len(),
            Register::FloatArray(lanes) => lanes.len(),
            Register::Float2Array(lanes) => lanes.len(),
            Register::Vec3Array(lanes) => lanes.len(),
        }
    }

    pub fn set_varying(&mut self, varying: bool, lane_count: usize) {
        match self {
            Register::Bool(lanes) => lanes.set_varying(varying, lane_count),
            Register::Int(lanes) => lanes.set_varying(varying, lane_count),
            Register::Half(lanes) => lanes.set_varying(varying, lane_count),
            Register::Float(lanes) => lanes.set_varying(varying, lane_count),
            Register::Vec3(lanes) => lanes.set_varying(varying, lane_count),
            Register::FloatArray(lanes) => lanes.set_varying(varying, lane_count),
            Register::Float2Array(lanes) => lanes.set_varying(varying, lane_count),
            Register::Vec3Array(lanes) => lanes.set_varying(varying, lane_count),
        }
    }
}

impl Default for Register {
    fn default() -> Self {
        Register::zeroed(RegisterType::Float)
    }
}

impl<T: Element> From<Lanes<T>> for Register {
    fn from(lanes: Lanes<T>) -> Self {
        T::into_register(lanes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn broadcast_read() {
        let uniform = Lanes::Uniform(3.5f32);
        assert_eq!(*uniform.get(0), 3.5);
        assert_eq!(*uniform.get(17), 3.5);
        assert_eq!(uniform.len(), 1);

        let varying = Lanes::Varying(vec![1, 2, 3]);
        assert_eq!(*varying.get(2), 3);
        assert_eq!(varying.len(), 3);
        assert_eq!(varying.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn set_varying_broadcasts_uniform_value() {
        let mut lanes = Lanes::Uniform(7i32);
        lanes.set_varying(true, 4);
        assert_eq!(lanes, Lanes::Varying(vec![7; 4]));

        lanes.set(1, 9);
        lanes.set_varying(true, 4);
        assert_eq!(lanes, Lanes::Varying(vec![7, 9, 7, 7]));

        lanes.set_varying(false, 4);
        assert_eq!(lanes, Lanes::Uniform(7));
    }

    #[test]
    #[should_panic(expected = "context has 8")]
    fn set_varying_rejects_wrong_lane_count() {
        let mut lanes = Lanes::Varying(vec![0.0f32; 4]);
        lanes.set_varying(true, 8);
    }

    #[test]
    fn from_partial_pads_with_default() {
        let lanes = Lanes::from_partial(&[1.0f32, 2.0], 4);
        assert_eq!(lanes, Lanes::Varying(vec![1.0, 2.0, 0.0, 0.0]));
    }

    #[test]
    fn typed_access() {
        let mut reg = Register::varying(vec![Vec3::X, Vec3::Y]);
        assert!(reg.is_varying());
        assert_eq!(reg.register_type(), RegisterType::Vec3);
        assert_eq!(*reg.lanes::<Vec3>().get(1), Vec3::Y);

        reg.lanes_mut::<Vec3>().set(0, Vec3::Z);
        assert_eq!(reg.lanes::<Vec3>().to_vec(2), vec![Vec3::Z, Vec3::Y]);

        let table: Arc<[f32]> = Arc::from(vec![0.0, 1.0]);
        let reg = Register::uniform(table.clone());
        assert!(Arc::ptr_eq(reg.lanes::<Arc<[f32]>>().uniform(), &table));
    }

    #[test]
    #[should_panic(expected = "register holds Float, expected Half")]
    fn typed_access_mismatch_panics() {
        let reg = Register::uniform(1.0f32);
        reg.lanes::<f16>();
    }

    #[test]
    fn zeroed_matches_type() {
        for register_type in RegisterType::iter() {
            let reg = Register::zeroed(register_type);
            assert_eq!(reg.register_type(), register_type);
            assert!(!reg.is_varying());
            assert_eq!(reg.len(), 1);
        }
    }
}
