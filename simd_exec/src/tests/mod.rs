use std::sync::Arc;

use glam::Vec3;
use rand::rngs::StdRng;
use rand::Rng;

use crate::elements::lookup_table_funclib::LookupTableFuncLib;
use crate::function::BuiltinLib;
use crate::kernels::GridShape;


pub(crate) fn lookup_lib() -> BuiltinLib {
    LookupTableFuncLib::default().into()
}

/// Grid whose every point holds its own normalized coordinate.
pub(crate) fn identity_grid(shape: GridShape) -> Arc<[Vec3]> {
    let [s0, s1, s2] = shape.sizes;
    let norm = |i: usize, size: usize| {
        if size > 1 {
            i as f32 / (size - 1) as f32
        } else {
            0.0
        }
    };

    let mut table = vec![Vec3::ZERO; shape.len()];
    for ix in 0..s0 {
        for iy in 0..s1 {
            for iz in 0..s2 {
                table[shape.index(ix, iy, iz)] =
                    Vec3::new(norm(ix, s0), norm(iy, s1), norm(iz, s2));
            }
        }
    }
    table.into()
}

pub(crate) fn random_table(rng: &mut StdRng, len: usize) -> Arc<[f32]> {
    (0..len).map(|_| rng.random_range(-10.0..10.0)).collect()
}

/// Control points with strictly increasing x.
pub(crate) fn random_knots(rng: &mut StdRng, len: usize) -> Arc<[[f32; 2]]> {
    let mut x = rng.random_range(-5.0..5.0);
    (0..len)
        .map(|_| {
            x += rng.random_range(0.1..2.0);
            [x, rng.random_range(-10.0..10.0)]
        })
        .collect()
}
