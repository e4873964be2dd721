use common::BitBuffer;

use crate::register::Lanes;

/// Active-lane mask produced by divergent control flow.
///
/// `AllActive` is the no-divergence sentinel: every lane is live and callers
/// may skip per-lane tests entirely.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LaneMask {
    #[default]
    AllActive,
    Varying(BitBuffer),
}

impl LaneMask {
    pub fn from_bools(lanes: &[bool]) -> Self {
        LaneMask::Varying(BitBuffer::from_slice(lanes))
    }

    /// Mask with only the first `active` of `lane_count` lanes live.
    pub fn prefix(lane_count: usize, active: usize) -> Self {
        if active == lane_count {
            LaneMask::AllActive
        } else {
            LaneMask::Varying(BitBuffer::with_prefix(lane_count, active))
        }
    }

    #[inline]
    pub fn is_varying(&self) -> bool {
        matches!(self, LaneMask::Varying(_))
    }

    #[inline]
    pub fn is_active(&self, lane: usize) -> bool {
        match self {
            LaneMask::AllActive => true,
            LaneMask::Varying(bits) => bits.get(lane),
        }
    }

    /// Lane count of a varying mask; `None` for the sentinel.
    pub fn lane_count(&self) -> Option<usize> {
        match self {
            LaneMask::AllActive => None,
            LaneMask::Varying(bits) => Some(bits.len()),
        }
    }

    /// Number of live lanes out of `lane_count`.
    pub fn active_count(&self, lane_count: usize) -> usize {
        match self {
            LaneMask::AllActive => lane_count,
            LaneMask::Varying(bits) => bits.count_ones(),
        }
    }

    /// False when a branch has no live lane and its body can be skipped.
    pub fn any_active(&self) -> bool {
        match self {
            LaneMask::AllActive => true,
            LaneMask::Varying(bits) => bits.any(),
        }
    }

    /// Lanes that are live here and where `condition` holds (the taken branch).
    pub fn narrow(&self, condition: &Lanes<bool>, lane_count: usize) -> LaneMask {
        self.refine(condition, lane_count, true)
    }

    /// Lanes that are live here and where `condition` fails (the other branch).
    pub fn narrow_not(&self, condition: &Lanes<bool>, lane_count: usize) -> LaneMask {
        self.refine(condition, lane_count, false)
    }

    fn refine(&self, condition: &Lanes<bool>, lane_count: usize, taken: bool) -> LaneMask {
        match condition {
            Lanes::Uniform(value) if *value == taken => self.clone(),
            Lanes::Uniform(_) => LaneMask::Varying(BitBuffer::new_filled(lane_count, false)),
            Lanes::Varying(values) => {
                assert_eq!(
                    values.len(),
                    lane_count,
                    "condition has {} lanes, context has {}",
                    values.len(),
                    lane_count
                );

                let condition = BitBuffer::from_slice(values);
                let mut bits = match self {
                    LaneMask::AllActive => BitBuffer::new_filled(lane_count, true),
                    LaneMask::Varying(parent) => parent.clone(),
                };
                if taken {
                    bits.and_assign(&condition);
                } else {
                    bits.and_not_assign(&condition);
                }
                LaneMask::Varying(bits)
            }
        }
    }
}
