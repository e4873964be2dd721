use tracing::trace;

use crate::frame::{ArgStack, Frame, FrameBuilder, FrameResults};
use crate::function::LinkedBuiltin;
use crate::mask::LaneMask;

pub const DEFAULT_LANE_COUNT: usize = 256;

/// One execution context: a fixed lane count and the argument stack every
/// register of every call in this context lives on.
///
/// Contexts are independent; run one per worker thread.
#[derive(Debug)]
pub struct SimdContext {
    lane_count: usize,
    stack: ArgStack,
}

impl SimdContext {
    pub fn new(lane_count: usize) -> Self {
        assert!(lane_count > 0, "lane count must be positive");
        SimdContext {
            lane_count,
            stack: ArgStack::default(),
        }
    }

    pub fn lane_count(&self) -> usize {
        self.lane_count
    }

    pub fn stack(&self) -> &ArgStack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut ArgStack {
        &mut self.stack
    }

    /// Calls `builtin` on the frame on top of the stack.
    ///
    /// The frame pointer is moved to the stack top for the duration of the
    /// call and restored afterwards; the frame itself stays on the stack.
    pub fn call(&mut self, builtin: &LinkedBuiltin, mask: &LaneMask) {
        if let Some(mask_lanes) = mask.lane_count() {
            assert_eq!(
                mask_lanes, self.lane_count,
                "mask has {} lanes, context has {}",
                mask_lanes, self.lane_count
            );
        }

        let depth = builtin.layout().depth();
        assert!(
            self.stack.len() >= depth,
            "'{}' needs a frame of {} registers, stack holds {}",
            builtin.name(),
            depth,
            self.stack.len()
        );

        trace!(
            builtin = builtin.name(),
            lanes = self.lane_count,
            masked = mask.is_varying(),
            "call"
        );

        let saved_fp = self.stack.fp();
        self.stack.set_fp(self.stack.len());
        self.check_lane_counts(builtin);
        {
            let mut frame = Frame::new(&mut self.stack, builtin.layout(), self.lane_count);
            builtin.run(mask, &mut frame);
        }
        self.stack.set_fp(saved_fp);
    }

    // every varying register of the frame must hold exactly one value per lane
    fn check_lane_counts(&self, builtin: &LinkedBuiltin) {
        let layout = builtin.layout();
        let slots = layout
            .params()
            .iter()
            .map(|param| (param.name.as_str(), param.offset))
            .chain(layout.ret().map(|(offset, _)| ("return", offset)));

        for (name, offset) in slots {
            let reg = self.stack.reg_fp_relative(offset);
            if reg.is_varying() {
                assert_eq!(
                    reg.len(),
                    self.lane_count,
                    "'{}' argument '{}' has {} lanes, context has {}",
                    builtin.name(),
                    name,
                    reg.len(),
                    self.lane_count
                );
            }
        }
    }

    /// Pushes a frame built by `args`, calls `builtin` and pops the frame.
    pub fn invoke<'b>(
        &mut self,
        builtin: &'b LinkedBuiltin,
        mask: &LaneMask,
        args: impl FnOnce(FrameBuilder<'b>) -> FrameBuilder<'b>,
    ) -> FrameResults<'b> {
        args(FrameBuilder::new(builtin.layout(), self.lane_count)).push(&mut self.stack);
        self.call(builtin, mask);
        FrameResults::pop(&mut self.stack, builtin.layout())
    }
}

impl Default for SimdContext {
    fn default() -> Self {
        SimdContext::new(DEFAULT_LANE_COUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataType, Signature};
    use crate::function::BuiltinLib;
    use crate::register::Register;

    fn negate_lib() -> BuiltinLib {
        let mut lib = BuiltinLib::default();
        lib.declare(
            "negate",
            Signature::new(DataType::Int).input("x", DataType::Int),
            |_, frame| {
                frame.with_return(|frame, ret| {
                    let x = *frame.input::<i32>(0).uniform();
                    ret.lanes_mut::<i32>().set(0, -x);
                });
            },
        );
        lib
    }

    #[test]
    fn call_restores_frame_pointer() -> anyhow::Result<()> {
        let lib = negate_lib();
        let negate = lib.link(
            "negate",
            &Signature::new(DataType::Int).input("x", DataType::Int),
        )?;

        let mut ctx = SimdContext::new(8);
        // an enclosing frame of the caller
        ctx.stack_mut().push(Register::uniform(1i32));
        ctx.stack_mut().set_fp(1);

        let results = ctx.invoke(&negate, &LaneMask::AllActive, |args| {
            args.arg("x", Register::uniform(5i32))
        });
        assert_eq!(*results.ret().lanes::<i32>().uniform(), -5);
        assert_eq!(ctx.stack().fp(), 1);
        assert_eq!(ctx.stack().len(), 1);

        Ok(())
    }

    #[test]
    #[should_panic(expected = "mask has 4 lanes, context has 8")]
    fn mask_lane_count_checked() {
        let lib = negate_lib();
        let negate = lib
            .link(
                "negate",
                &Signature::new(DataType::Int).input("x", DataType::Int),
            )
            .expect("negate is declared");

        let mut ctx = SimdContext::new(8);
        ctx.invoke(&negate, &LaneMask::prefix(4, 2), |args| {
            args.arg("x", Register::uniform(5i32))
        });
    }

    #[test]
    #[should_panic(expected = "'negate' argument 'x' has 8 lanes, context has 4")]
    fn call_checks_lane_counts_of_pushed_frame() {
        let lib = negate_lib();
        let negate = lib
            .link(
                "negate",
                &Signature::new(DataType::Int).input("x", DataType::Int),
            )
            .expect("negate is declared");

        let mut ctx = SimdContext::new(4);
        // pushed by hand, bypassing FrameBuilder: return slot first, then x
        ctx.stack_mut().push(Register::uniform(0i32));
        ctx.stack_mut().push(Register::varying(vec![1i32; 8]));
        ctx.call(&negate, &LaneMask::AllActive);
    }

    #[test]
    #[should_panic(expected = "'negate' argument 'return' has 2 lanes, context has 4")]
    fn call_checks_lane_count_of_return_slot() {
        let lib = negate_lib();
        let negate = lib
            .link(
                "negate",
                &Signature::new(DataType::Int).input("x", DataType::Int),
            )
            .expect("negate is declared");

        let mut ctx = SimdContext::new(4);
        ctx.stack_mut().push(Register::varying(vec![0i32; 2]));
        ctx.stack_mut().push(Register::uniform(1i32));
        ctx.call(&negate, &LaneMask::AllActive);
    }

    #[test]
    fn default_lane_count() {
        assert_eq!(SimdContext::default().lane_count(), DEFAULT_LANE_COUNT);
    }
}
