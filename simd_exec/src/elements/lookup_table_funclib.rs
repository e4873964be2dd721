//! Table lookup and interpolation built-ins.
//!
//! | name | signature |
//! |---|---|
//! | `lookup1D` | `float (float table[], float pMin, float pMax, float p)` |
//! | `lookup3D_f3` | `float[3] (float table[][][][3], float pMin[3], float pMax[3], float p[3])` |
//! | `lookup3D_f` | `void (float table[][][][3], float pMin[3], float pMax[3], float p0, float p1, float p2, output float q0, output float q1, output float q2)` |
//! | `lookup3D_h` | `lookup3D_f` with `half` positions and outputs |
//! | `interpolateLinear1D` | `float (float table[][2], float p)` |
//! | `interpolateCubic1D` | `float (float table[][2], float p)` |

use std::sync::Arc;

use glam::Vec3;
use half::f16;
use tracing::debug;

use crate::data::{DataType, Signature};
use crate::dispatch::{map_lanes, Components, Operand};
use crate::frame::Frame;
use crate::function::BuiltinLib;
use crate::kernels::{self, GridShape};
use crate::mask::LaneMask;

// declared parameter indices shared by the dense lookups
const TABLE: usize = 0;
const P_MIN: usize = 1;
const P_MAX: usize = 2;
const P: usize = 3;
const P_SPLIT: [usize; 3] = [3, 4, 5];
const Q_SPLIT: [usize; 3] = [6, 7, 8];

// control-point interpolation
const KNOTS: usize = 0;
const KNOT_P: usize = 1;

#[derive(Debug)]
pub struct LookupTableFuncLib {
    builtin_lib: BuiltinLib,
}

impl LookupTableFuncLib {
    pub fn builtin_lib(&self) -> &BuiltinLib {
        &self.builtin_lib
    }

    pub fn into_builtin_lib(self) -> BuiltinLib {
        self.builtin_lib
    }
}

impl From<LookupTableFuncLib> for BuiltinLib {
    fn from(lookup: LookupTableFuncLib) -> Self {
        lookup.builtin_lib
    }
}

impl Default for LookupTableFuncLib {
    fn default() -> Self {
        let mut builtin_lib = BuiltinLib::default();
        declare_lookup_table(&mut builtin_lib);

        LookupTableFuncLib { builtin_lib }
    }
}

/// Declares the lookup and interpolation built-ins into `lib`.
pub fn declare_lookup_table(lib: &mut BuiltinLib) {
    lib.declare("lookup1D", lookup_1d_signature(), simd_lookup_1d);
    lib.declare("lookup3D_f3", lookup_3d_f3_signature(), simd_lookup_3d_f3);
    lib.declare(
        "lookup3D_f",
        lookup_3d_split_signature(DataType::Float),
        simd_lookup_3d_f,
    );
    lib.declare(
        "lookup3D_h",
        lookup_3d_split_signature(DataType::Half),
        simd_lookup_3d_h,
    );
    lib.declare(
        "interpolateLinear1D",
        interpolate_1d_signature(),
        simd_interpolate_linear_1d,
    );
    lib.declare(
        "interpolateCubic1D",
        interpolate_1d_signature(),
        simd_interpolate_cubic_1d,
    );

    debug!(builtins = lib.len(), "declared lookup table library");
}

fn table_3d() -> DataType {
    DataType::unsized_array(DataType::unsized_array(DataType::unsized_array(
        DataType::float3(),
    )))
}

pub fn lookup_1d_signature() -> Signature {
    Signature::new(DataType::Float)
        .input("table", DataType::unsized_array(DataType::Float))
        .input("pMin", DataType::Float)
        .input("pMax", DataType::Float)
        .input("p", DataType::Float)
}

pub fn lookup_3d_f3_signature() -> Signature {
    Signature::new(DataType::float3())
        .input("table", table_3d())
        .input("pMin", DataType::float3())
        .input("pMax", DataType::float3())
        .input("p", DataType::float3())
}

/// Signature of the variants taking the position as three scalars and
/// returning the result through three output parameters.
pub fn lookup_3d_split_signature(component: DataType) -> Signature {
    Signature::new(DataType::Void)
        .input("table", table_3d())
        .input("pMin", DataType::float3())
        .input("pMax", DataType::float3())
        .input("p0", component.clone())
        .input("p1", component.clone())
        .input("p2", component.clone())
        .output("q0", component.clone())
        .output("q1", component.clone())
        .output("q2", component)
}

pub fn interpolate_1d_signature() -> Signature {
    Signature::new(DataType::Float)
        .input(
            "table",
            DataType::unsized_array(DataType::array(DataType::Float, 2)),
        )
        .input("p", DataType::Float)
}

fn simd_lookup_1d(mask: &LaneMask, frame: &mut Frame<'_>) {
    let size = frame.array_size(TABLE, 0);
    let lane_count = frame.lane_count();

    frame.with_return(|frame, ret| {
        let table = frame.input::<Arc<[f32]>>(TABLE);
        let p_min = frame.input::<f32>(P_MIN);
        let p_max = frame.input::<f32>(P_MAX);
        let p = frame.input::<f32>(P);

        map_lanes(
            mask,
            lane_count,
            Operand::new(
                table.is_varying() || p_min.is_varying() || p_max.is_varying(),
                move |lane| (&table.get(lane)[..size], *p_min.get(lane), *p_max.get(lane)),
            ),
            Operand::new(p.is_varying(), move |lane| *p.get(lane)),
            |&(table, p_min, p_max), p| kernels::lookup_1d(table, p_min, p_max, p),
            ret.lanes_mut::<f32>(),
        );
    });
}

fn grid_shape(frame: &Frame<'_>) -> GridShape {
    GridShape::new(
        frame.array_size(TABLE, 0),
        frame.array_size(TABLE, 1),
        frame.array_size(TABLE, 2),
    )
}

// table and ranges of the 3D lookups
fn dense_3d<'f>(
    frame: &'f Frame<'_>,
    shape: GridShape,
) -> Operand<impl Fn(usize) -> (&'f [Vec3], Vec3, Vec3) + 'f> {
    let table = frame.input::<Arc<[Vec3]>>(TABLE);
    let p_min = frame.input::<Vec3>(P_MIN);
    let p_max = frame.input::<Vec3>(P_MAX);
    let len = shape.len();

    Operand::new(
        table.is_varying() || p_min.is_varying() || p_max.is_varying(),
        move |lane| (&table.get(lane)[..len], *p_min.get(lane), *p_max.get(lane)),
    )
}

fn simd_lookup_3d_f3(mask: &LaneMask, frame: &mut Frame<'_>) {
    let shape = grid_shape(frame);
    let lane_count = frame.lane_count();

    frame.with_return(|frame, ret| {
        let p = frame.input::<Vec3>(P);

        map_lanes(
            mask,
            lane_count,
            dense_3d(frame, shape),
            Operand::new(p.is_varying(), move |lane| *p.get(lane)),
            |&(table, p_min, p_max), p| kernels::lookup_3d(table, shape, p_min, p_max, p),
            ret.lanes_mut::<Vec3>(),
        );
    });
}

fn simd_lookup_3d_f(mask: &LaneMask, frame: &mut Frame<'_>) {
    let shape = grid_shape(frame);
    let lane_count = frame.lane_count();

    frame.with_outputs(Q_SPLIT, |frame, [q0, q1, q2]| {
        let [p0, p1, p2] = P_SPLIT.map(|index| frame.input::<f32>(index));
        let mut out = Components([
            q0.lanes_mut::<f32>(),
            q1.lanes_mut::<f32>(),
            q2.lanes_mut::<f32>(),
        ]);

        map_lanes(
            mask,
            lane_count,
            dense_3d(frame, shape),
            Operand::new(
                p0.is_varying() || p1.is_varying() || p2.is_varying(),
                move |lane| Vec3::new(*p0.get(lane), *p1.get(lane), *p2.get(lane)),
            ),
            |&(table, p_min, p_max), p| kernels::lookup_3d(table, shape, p_min, p_max, p),
            &mut out,
        );
    });
}

// half positions in, half results out; the lookup itself runs in f32
fn simd_lookup_3d_h(mask: &LaneMask, frame: &mut Frame<'_>) {
    let shape = grid_shape(frame);
    let lane_count = frame.lane_count();

    frame.with_outputs(Q_SPLIT, |frame, [q0, q1, q2]| {
        let [p0, p1, p2] = P_SPLIT.map(|index| frame.input::<f16>(index));
        let mut out = Components([
            q0.lanes_mut::<f16>(),
            q1.lanes_mut::<f16>(),
            q2.lanes_mut::<f16>(),
        ]);

        map_lanes(
            mask,
            lane_count,
            dense_3d(frame, shape),
            Operand::new(
                p0.is_varying() || p1.is_varying() || p2.is_varying(),
                move |lane| {
                    Vec3::new(
                        p0.get(lane).to_f32(),
                        p1.get(lane).to_f32(),
                        p2.get(lane).to_f32(),
                    )
                },
            ),
            |&(table, p_min, p_max), p| kernels::lookup_3d(table, shape, p_min, p_max, p),
            &mut out,
        );
    });
}

fn simd_interpolate_1d(
    mask: &LaneMask,
    frame: &mut Frame<'_>,
    kernel: fn(&[[f32; 2]], f32) -> f32,
) {
    let size = frame.array_size(KNOTS, 0);
    let lane_count = frame.lane_count();

    frame.with_return(|frame, ret| {
        let table = frame.input::<Arc<[[f32; 2]]>>(KNOTS);
        let p = frame.input::<f32>(KNOT_P);

        map_lanes(
            mask,
            lane_count,
            Operand::new(table.is_varying(), move |lane| &table.get(lane)[..size]),
            Operand::new(p.is_varying(), move |lane| *p.get(lane)),
            |table, p| kernel(table, p),
            ret.lanes_mut::<f32>(),
        );
    });
}

fn simd_interpolate_linear_1d(mask: &LaneMask, frame: &mut Frame<'_>) {
    simd_interpolate_1d(mask, frame, kernels::interpolate_linear_1d);
}

fn simd_interpolate_cubic_1d(mask: &LaneMask, frame: &mut Frame<'_>) {
    simd_interpolate_1d(mask, frame, kernels::interpolate_cubic_1d);
}
