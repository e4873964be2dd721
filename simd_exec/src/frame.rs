//! Argument stack and call frames.
//!
//! The caller pushes one register per slot, deepest slot first; during the
//! call every slot is addressed relative to the frame pointer, which sits
//! just above the last pushed slot (offset -1).
//!
//! Offsets are generated from a [`Signature`] by [`FrameLayout`]. Walking the
//! declared parameters in order starting at -1, each array parameter is
//! preceded by its hidden `int` size arguments (innermost dimension nearest
//! the frame pointer), then comes the parameter itself. The return slot, if
//! any, is the deepest one.

use std::sync::Arc;

use crate::data::{Direction, Signature};
use crate::register::{Element, Lanes, Register, RegisterType};

#[derive(Debug, Default)]
pub struct ArgStack {
    regs: Vec<Register>,
    fp: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamSlot {
    pub name: String,
    pub offset: isize,
    /// Offsets of the hidden size arguments, outermost dimension first.
    pub size_offsets: Vec<isize>,
    pub direction: Direction,
    pub register_type: RegisterType,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameLayout {
    params: Vec<ParamSlot>,
    ret: Option<(isize, RegisterType)>,
    depth: usize,
}

/// The registers of one in-flight built-in call.
pub struct Frame<'a> {
    stack: &'a mut ArgStack,
    layout: &'a FrameLayout,
    lane_count: usize,
}

/// Caller-side frame construction: named arguments in, pushed slots out.
pub struct FrameBuilder<'a> {
    layout: &'a FrameLayout,
    lane_count: usize,
    params: Vec<Option<Register>>,
    sizes: Vec<Option<Vec<usize>>>,
    ret: Option<Register>,
}

/// A popped frame; gives access to outputs by name.
#[derive(Debug)]
pub struct FrameResults<'a> {
    layout: &'a FrameLayout,
    slots: Vec<Register>,
}

impl ArgStack {
    pub fn len(&self) -> usize {
        self.regs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regs.is_empty()
    }

    pub fn fp(&self) -> usize {
        self.fp
    }

    pub fn set_fp(&mut self, fp: usize) {
        assert!(
            fp <= self.regs.len(),
            "frame pointer {} above stack top {}",
            fp,
            self.regs.len()
        );
        self.fp = fp;
    }

    pub fn push(&mut self, reg: Register) {
        self.regs.push(reg);
    }

    /// Removes the top `count` registers, returned in push order.
    pub fn pop(&mut self, count: usize) -> Vec<Register> {
        assert!(
            count <= self.regs.len(),
            "cannot pop {} registers from a stack of {}",
            count,
            self.regs.len()
        );
        let regs = self.regs.split_off(self.regs.len() - count);
        self.fp = self.fp.min(self.regs.len());
        regs
    }

    pub fn reg_fp_relative(&self, offset: isize) -> &Register {
        let idx = self.fp_index(offset);
        &self.regs[idx]
    }

    pub fn reg_fp_relative_mut(&mut self, offset: isize) -> &mut Register {
        let idx = self.fp_index(offset);
        &mut self.regs[idx]
    }

    fn fp_index(&self, offset: isize) -> usize {
        let idx = self.fp as isize + offset;
        assert!(
            idx >= 0 && (idx as usize) < self.regs.len(),
            "frame offset {} out of range (fp {}, stack {})",
            offset,
            self.fp,
            self.regs.len()
        );
        idx as usize
    }
}

impl FrameLayout {
    pub fn new(signature: &Signature) -> Self {
        let mut offset = -1isize;

        let params = signature
            .params
            .iter()
            .map(|param| {
                let register_type = param.data_type.register_type().unwrap_or_else(|| {
                    panic!(
                        "parameter '{}' of type {} has no register representation",
                        param.name, param.data_type
                    )
                });

                let dims = param.data_type.unsized_dims();
                let mut size_offsets = vec![0; dims];
                for dim in (0..dims).rev() {
                    size_offsets[dim] = offset;
                    offset -= 1;
                }

                let slot = ParamSlot {
                    name: param.name.clone(),
                    offset,
                    size_offsets,
                    direction: param.direction,
                    register_type,
                };
                offset -= 1;
                slot
            })
            .collect();

        let ret = if signature.ret.is_void() {
            None
        } else {
            let register_type = signature.ret.register_type().unwrap_or_else(|| {
                panic!(
                    "return type {} has no register representation",
                    signature.ret
                )
            });
            let ret = (offset, register_type);
            offset -= 1;
            Some(ret)
        };

        FrameLayout {
            params,
            ret,
            depth: (-1 - offset) as usize,
        }
    }

    /// Number of stack slots the frame occupies.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn params(&self) -> &[ParamSlot] {
        &self.params
    }

    pub fn param(&self, index: usize) -> &ParamSlot {
        &self.params[index]
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|param| param.name == name)
    }

    pub fn ret(&self) -> Option<(isize, RegisterType)> {
        self.ret
    }

    // 0 is the deepest slot, i.e. the first one the caller pushes
    fn slot(&self, offset: isize) -> usize {
        (self.depth as isize + offset) as usize
    }

    fn expect_param(&self, name: &str) -> usize {
        self.param_index(name)
            .unwrap_or_else(|| panic!("no parameter named '{}'", name))
    }
}

impl<'a> Frame<'a> {
    pub(crate) fn new(stack: &'a mut ArgStack, layout: &'a FrameLayout, lane_count: usize) -> Self {
        Frame {
            stack,
            layout,
            lane_count,
        }
    }

    pub fn lane_count(&self) -> usize {
        self.lane_count
    }

    pub fn layout(&self) -> &FrameLayout {
        self.layout
    }

    pub fn reg_fp_relative(&self, offset: isize) -> &Register {
        self.stack.reg_fp_relative(offset)
    }

    /// Register of the parameter declared at `index`.
    pub fn param(&self, index: usize) -> &Register {
        self.stack.reg_fp_relative(self.layout.params[index].offset)
    }

    pub fn input<T: Element>(&self, index: usize) -> &Lanes<T> {
        self.param(index).lanes::<T>()
    }

    /// Hidden size argument `dim` of the array parameter at `index`.
    pub fn array_size(&self, index: usize, dim: usize) -> usize {
        let param = &self.layout.params[index];
        let size = self
            .stack
            .reg_fp_relative(param.size_offsets[dim])
            .lanes::<i32>();

        assert!(
            !size.is_varying(),
            "size of array '{}' must be uniform",
            param.name
        );
        usize::try_from(*size.uniform())
            .unwrap_or_else(|_| panic!("negative size for array '{}'", param.name))
    }

    /// Runs `f` with mutable access to the return slot while inputs stay readable.
    pub fn with_return<R>(&mut self, f: impl FnOnce(&Self, &mut Register) -> R) -> R {
        let (offset, _) = self.layout.ret.expect("built-in has no return value");
        self.with_slots([offset], |frame, [ret]| f(frame, ret))
    }

    /// Like [`Frame::with_return`] for output parameters, by declared index.
    pub fn with_outputs<const N: usize, R>(
        &mut self,
        indices: [usize; N],
        f: impl FnOnce(&Self, &mut [Register; N]) -> R,
    ) -> R {
        let offsets = indices.map(|index| {
            let param = &self.layout.params[index];
            assert_eq!(
                param.direction,
                Direction::Out,
                "parameter '{}' is not an output",
                param.name
            );
            param.offset
        });
        self.with_slots(offsets, f)
    }

    fn with_slots<const N: usize, R>(
        &mut self,
        offsets: [isize; N],
        f: impl FnOnce(&Self, &mut [Register; N]) -> R,
    ) -> R {
        let mut regs =
            offsets.map(|offset| std::mem::take(self.stack.reg_fp_relative_mut(offset)));
        let result = f(self, &mut regs);
        for (offset, reg) in offsets.into_iter().zip(regs) {
            *self.stack.reg_fp_relative_mut(offset) = reg;
        }
        result
    }
}

impl<'a> FrameBuilder<'a> {
    pub fn new(layout: &'a FrameLayout, lane_count: usize) -> Self {
        let count = layout.params.len();
        FrameBuilder {
            layout,
            lane_count,
            params: vec![None; count],
            sizes: vec![None; count],
            ret: None,
        }
    }

    /// Supplies an input. Sizes of one-dimensional arrays come from the array length.
    pub fn arg(self, name: &str, reg: Register) -> Self {
        let index = self.layout.expect_param(name);
        let dims = match self.layout.params[index].size_offsets.len() {
            0 => vec![],
            1 => vec![array_len(&reg)],
            n => panic!(
                "array '{}' has {} unsized dimensions, pass them with FrameBuilder::array",
                name, n
            ),
        };
        self.array(name, reg, &dims)
    }

    /// Supplies an input array with explicit dimension sizes, outermost first.
    pub fn array(mut self, name: &str, reg: Register, dims: &[usize]) -> Self {
        let index = self.layout.expect_param(name);
        let param = &self.layout.params[index];

        assert_eq!(
            param.direction,
            Direction::In,
            "'{}' is an output parameter",
            name
        );
        assert_eq!(
            dims.len(),
            param.size_offsets.len(),
            "array '{}' expects {} dimensions",
            name,
            param.size_offsets.len()
        );
        if !dims.is_empty() {
            let elements: usize = dims.iter().product();
            assert!(
                elements <= array_len(&reg),
                "array '{}' is shorter than its dimensions {:?}",
                name,
                dims
            );
        }
        self.check(name, param.register_type, &reg);

        self.params[index] = Some(reg);
        self.sizes[index] = Some(dims.to_vec());
        self
    }

    /// Seeds an output parameter with caller-defined previous contents.
    pub fn output(mut self, name: &str, reg: Register) -> Self {
        let index = self.layout.expect_param(name);
        let param = &self.layout.params[index];

        assert_eq!(
            param.direction,
            Direction::Out,
            "'{}' is an input parameter",
            name
        );
        self.check(name, param.register_type, &reg);

        self.params[index] = Some(reg);
        self
    }

    /// Seeds the return slot with caller-defined previous contents.
    pub fn ret(mut self, reg: Register) -> Self {
        let (_, register_type) = self.layout.ret.expect("built-in has no return value");
        self.check("return", register_type, &reg);
        self.ret = Some(reg);
        self
    }

    pub fn push(mut self, stack: &mut ArgStack) {
        let layout = self.layout;
        let mut slots: Vec<Option<Register>> = vec![None; layout.depth];

        for (index, param) in layout.params.iter().enumerate() {
            let reg = match (self.params[index].take(), param.direction) {
                (Some(reg), _) => reg,
                (None, Direction::Out) => Register::zeroed(param.register_type),
                (None, Direction::In) => panic!("missing argument '{}'", param.name),
            };
            slots[layout.slot(param.offset)] = Some(reg);

            if let Some(dims) = &self.sizes[index] {
                for (&offset, &size) in param.size_offsets.iter().zip(dims) {
                    let size = i32::try_from(size).expect("array size exceeds int range");
                    slots[layout.slot(offset)] = Some(Register::uniform(size));
                }
            }
        }

        if let Some((offset, register_type)) = layout.ret {
            let reg = self
                .ret
                .take()
                .unwrap_or_else(|| Register::zeroed(register_type));
            slots[layout.slot(offset)] = Some(reg);
        }

        for reg in slots {
            stack.push(reg.expect("frame slot left empty"));
        }
    }

    fn check(&self, name: &str, expected: RegisterType, reg: &Register) {
        assert_eq!(
            reg.register_type(),
            expected,
            "argument '{}' has the wrong register type",
            name
        );
        if reg.is_varying() {
            assert_eq!(
                reg.len(),
                self.lane_count,
                "argument '{}' has {} lanes, context has {}",
                name,
                reg.len(),
                self.lane_count
            );
        }
    }
}

impl<'a> FrameResults<'a> {
    pub fn pop(stack: &mut ArgStack, layout: &'a FrameLayout) -> Self {
        FrameResults {
            layout,
            slots: stack.pop(layout.depth),
        }
    }

    pub fn ret(&self) -> &Register {
        let (offset, _) = self.layout.ret.expect("built-in has no return value");
        &self.slots[self.layout.slot(offset)]
    }

    /// Any parameter slot by name; normally used for outputs.
    pub fn output(&self, name: &str) -> &Register {
        let index = self.layout.expect_param(name);
        &self.slots[self.layout.slot(self.layout.params[index].offset)]
    }

    pub fn take_ret(&mut self) -> Register {
        let (offset, _) = self.layout.ret.expect("built-in has no return value");
        let slot = self.layout.slot(offset);
        std::mem::take(&mut self.slots[slot])
    }

    pub fn take_output(&mut self, name: &str) -> Register {
        let index = self.layout.expect_param(name);
        let slot = self.layout.slot(self.layout.params[index].offset);
        std::mem::take(&mut self.slots[slot])
    }
}

// Arrays carry their own length; every lane must agree since sizes are uniform.
fn array_len(reg: &Register) -> usize {
    fn common_len<T>(lanes: &Lanes<Arc<[T]>>) -> usize {
        let arrays = lanes.as_slice();
        let len = arrays[0].len();
        assert!(
            arrays.iter().all(|array| array.len() == len),
            "varying array lanes differ in length"
        );
        len
    }

    match reg {
        Register::FloatArray(lanes) => common_len(lanes),
        Register::Float2Array(lanes) => common_len(lanes),
        Register::Vec3Array(lanes) => common_len(lanes),
        other => panic!("{} register is not an array", other.register_type()),
    }
}
