//! Strategy selection shared by every built-in.
//!
//! Arguments of a built-in are split into two groups: the *shared* ones
//! (tables, ranges) that are usually uniform, and the *position* ones that
//! usually vary per lane. [`map_lanes`] picks one of three strategies from
//! their shapes and the lane mask, runs the kernel once or per lane, and sets
//! the varying flag of the output before writing it.

use glam::Vec3;
use half::f16;
use strum_macros::{Display, EnumIter};
use tracing::trace;

use crate::mask::LaneMask;
use crate::register::Lanes;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter)]
pub enum Strategy {
    /// Every input is uniform: compute once, write a uniform output.
    Uniform,
    /// Only positions vary and no lane is masked off: compute every lane
    /// without testing the mask, reading the shared arguments once.
    FastPath,
    /// Compute active lanes only, reading every argument per lane.
    Masked,
}

/// One argument group: whether any register in it varies, and a per-lane
/// reader (broadcasting for uniform registers).
pub struct Operand<F> {
    pub varying: bool,
    pub read: F,
}

/// Output destination of a dispatched kernel.
pub trait LaneSink<O> {
    fn set_varying(&mut self, varying: bool, lane_count: usize);
    fn write(&mut self, lane: usize, value: O);
}

/// A 3-vector result split over three scalar registers.
pub struct Components<'a, T>(pub [&'a mut Lanes<T>; 3]);

impl Strategy {
    pub fn select(mask: &LaneMask, shared_varying: bool, position_varying: bool) -> Strategy {
        if !shared_varying && !position_varying {
            Strategy::Uniform
        } else if !shared_varying && !mask.is_varying() {
            Strategy::FastPath
        } else {
            Strategy::Masked
        }
    }

    /// Whether the output of a call run with this strategy is varying.
    pub fn is_varying(self) -> bool {
        self != Strategy::Uniform
    }
}

impl<F> Operand<F> {
    pub fn new<S>(varying: bool, read: F) -> Self
    where
        F: Fn(usize) -> S,
    {
        Operand { varying, read }
    }
}

impl<T: Clone> LaneSink<T> for Lanes<T> {
    fn set_varying(&mut self, varying: bool, lane_count: usize) {
        Lanes::set_varying(self, varying, lane_count);
    }

    #[inline]
    fn write(&mut self, lane: usize, value: T) {
        self.set(lane, value);
    }
}

impl LaneSink<Vec3> for Components<'_, f32> {
    fn set_varying(&mut self, varying: bool, lane_count: usize) {
        for component in self.0.iter_mut() {
            component.set_varying(varying, lane_count);
        }
    }

    #[inline]
    fn write(&mut self, lane: usize, value: Vec3) {
        let [x, y, z] = &mut self.0;
        x.set(lane, value.x);
        y.set(lane, value.y);
        z.set(lane, value.z);
    }
}

impl LaneSink<Vec3> for Components<'_, f16> {
    fn set_varying(&mut self, varying: bool, lane_count: usize) {
        for component in self.0.iter_mut() {
            component.set_varying(varying, lane_count);
        }
    }

    #[inline]
    fn write(&mut self, lane: usize, value: Vec3) {
        let [x, y, z] = &mut self.0;
        x.set(lane, f16::from_f32(value.x));
        y.set(lane, f16::from_f32(value.y));
        z.set(lane, f16::from_f32(value.z));
    }
}

/// Runs `kernel` over the lanes selected by the strategy and writes the
/// results to `out`. Lanes are visited from the highest index down.
pub fn map_lanes<S, P, O, FS, FP, K>(
    mask: &LaneMask,
    lane_count: usize,
    shared: Operand<FS>,
    position: Operand<FP>,
    kernel: K,
    out: &mut impl LaneSink<O>,
) -> Strategy
where
    FS: Fn(usize) -> S,
    FP: Fn(usize) -> P,
    K: Fn(&S, P) -> O,
{
    let strategy = Strategy::select(mask, shared.varying, position.varying);
    trace!(%strategy, lane_count, "dispatch");

    out.set_varying(strategy.is_varying(), lane_count);

    match strategy {
        Strategy::Uniform => {
            let shared = (shared.read)(0);
            out.write(0, kernel(&shared, (position.read)(0)));
        }
        Strategy::FastPath => {
            let shared = (shared.read)(0);
            for lane in (0..lane_count).rev() {
                out.write(lane, kernel(&shared, (position.read)(lane)));
            }
        }
        Strategy::Masked => {
            for lane in (0..lane_count).rev() {
                if mask.is_active(lane) {
                    let shared = (shared.read)(lane);
                    out.write(lane, kernel(&shared, (position.read)(lane)));
                }
            }
        }
    }

    strategy
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn strategy_selection() {
        let all = LaneMask::AllActive;
        let some = LaneMask::prefix(4, 2);

        assert_eq!(Strategy::select(&all, false, false), Strategy::Uniform);
        assert_eq!(Strategy::select(&some, false, false), Strategy::Uniform);
        assert_eq!(Strategy::select(&all, false, true), Strategy::FastPath);
        assert_eq!(Strategy::select(&some, false, true), Strategy::Masked);
        assert_eq!(Strategy::select(&all, true, false), Strategy::Masked);
        assert_eq!(Strategy::select(&all, true, true), Strategy::Masked);

        let varying: Vec<Strategy> = Strategy::iter().filter(|s| s.is_varying()).collect();
        assert_eq!(varying, vec![Strategy::FastPath, Strategy::Masked]);
    }

    #[test]
    fn masked_lanes_visited_in_reverse() {
        let visited = RefCell::new(Vec::new());
        let mask = LaneMask::from_bools(&[true, false, true, true]);
        let mut out = Lanes::Uniform(-1.0f32);

        let strategy = map_lanes(
            &mask,
            4,
            Operand::new(false, |_| 10.0f32),
            Operand::new(true, |lane| lane as f32),
            |shared, p| {
                visited.borrow_mut().push(p as usize);
                shared + p
            },
            &mut out,
        );

        assert_eq!(strategy, Strategy::Masked);
        assert_eq!(visited.into_inner(), vec![3, 2, 0]);
        assert_eq!(out, Lanes::Varying(vec![10.0, -1.0, 12.0, 13.0]));
    }

    #[test]
    fn fast_path_ignores_mask_tests() {
        let mut out = Lanes::Uniform(0i32);
        let strategy = map_lanes(
            &LaneMask::AllActive,
            3,
            Operand::new(false, |_| 100i32),
            Operand::new(true, |lane| lane as i32),
            |shared, p| shared + p,
            &mut out,
        );

        assert_eq!(strategy, Strategy::FastPath);
        assert_eq!(out, Lanes::Varying(vec![100, 101, 102]));
    }

    #[test]
    fn uniform_output_for_uniform_inputs() {
        let mut out = Lanes::Varying(vec![0.0f32; 4]);
        let strategy = map_lanes(
            &LaneMask::prefix(4, 1),
            4,
            Operand::new(false, |_| 2.0f32),
            Operand::new(false, |_| 3.0f32),
            |shared, p| shared * p,
            &mut out,
        );

        assert_eq!(strategy, Strategy::Uniform);
        assert_eq!(out, Lanes::Uniform(6.0));
    }

    #[test]
    fn components_share_varying_flag() {
        let mut x = Lanes::Uniform(f16::ZERO);
        let mut y = Lanes::Varying(vec![f16::ZERO; 2]);
        let mut z = Lanes::Uniform(f16::ZERO);

        let mut sink = Components([&mut x, &mut y, &mut z]);
        map_lanes(
            &LaneMask::AllActive,
            2,
            Operand::new(false, |_| ()),
            Operand::new(true, |lane| lane as f32),
            |_, p| Vec3::new(p, p + 0.5, p + 1.0),
            &mut sink,
        );

        assert!(x.is_varying() && y.is_varying() && z.is_varying());
        assert_eq!(*x.get(1), f16::from_f32(1.0));
        assert_eq!(*y.get(0), f16::from_f32(0.5));
        assert_eq!(*z.get(1), f16::from_f32(2.0));
    }
}
