use common::FloatExt;
use glam::Vec3;

/// Dimensions of a dense 3D table, outermost axis first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridShape {
    pub sizes: [usize; 3],
}

impl GridShape {
    pub fn new(size0: usize, size1: usize, size2: usize) -> Self {
        GridShape {
            sizes: [size0, size1, size2],
        }
    }

    /// Number of grid points.
    pub fn len(&self) -> usize {
        self.sizes.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flattened position of grid point `(ix, iy, iz)`.
    ///
    /// Row-major in declared order: `x` (size0) is the outermost axis and `z`
    /// (size2) varies fastest, the way a `table[size0][size1][size2]` literal
    /// is laid out.
    #[inline]
    pub fn index(&self, ix: usize, iy: usize, iz: usize) -> usize {
        let [s0, s1, s2] = self.sizes;
        debug_assert!(ix < s0 && iy < s1 && iz < s2, "grid index out of range");
        (ix * s1 + iy) * s2 + iz
    }
}

/// Maps `p` onto the index space of an axis with `size` samples spread over
/// `[p_min, p_max]`.
///
/// Returns the lower sample index, clamped to `size - 2`, and the fraction
/// toward the next sample. Positions outside the range clamp to its ends and
/// NaN clamps to `p_min`, so `p_max` yields `(size - 2, 1.0)`. An axis with
/// fewer than two samples or an empty range always yields `(0, 0.0)`.
#[inline]
pub fn axis_position(size: usize, p_min: f32, p_max: f32, p: f32) -> (usize, f32) {
    if size < 2 || p_max == p_min {
        return (0, 0.0);
    }

    // f32::max/min discard a NaN operand
    let t = ((p - p_min) / (p_max - p_min)).max(0.0).min(1.0);
    let x = t * (size - 1) as f32;
    let i = (x.floor() as usize).min(size - 2);
    (i, x - i as f32)
}

/// Linear lookup in a dense table sampled uniformly over `[p_min, p_max]`.
pub fn lookup_1d(table: &[f32], p_min: f32, p_max: f32, p: f32) -> f32 {
    match table {
        [] => 0.0,
        [only] => *only,
        _ if p_max == p_min => table[0],
        _ => {
            let (i, f) = axis_position(table.len(), p_min, p_max, p);
            blend(table[i], table[i + 1], f)
        }
    }
}

/// Trilinear lookup in a dense 3D table with independent per-axis ranges.
pub fn lookup_3d(table: &[Vec3], shape: GridShape, p_min: Vec3, p_max: Vec3, p: Vec3) -> Vec3 {
    if shape.is_empty() {
        return Vec3::ZERO;
    }
    debug_assert!(table.len() >= shape.len(), "table smaller than its grid");

    let [s0, s1, s2] = shape.sizes;
    let (ix, fx) = axis_position(s0, p_min.x, p_max.x, p.x);
    let (iy, fy) = axis_position(s1, p_min.y, p_max.y, p.y);
    let (iz, fz) = axis_position(s2, p_min.z, p_max.z, p.z);

    let ix1 = (ix + 1).min(s0 - 1);
    let iy1 = (iy + 1).min(s1 - 1);
    let iz1 = (iz + 1).min(s2 - 1);

    let at = |x, y, z| table[shape.index(x, y, z)];

    let c00 = mix(at(ix, iy, iz), at(ix, iy, iz1), fz);
    let c01 = mix(at(ix, iy1, iz), at(ix, iy1, iz1), fz);
    let c10 = mix(at(ix1, iy, iz), at(ix1, iy, iz1), fz);
    let c11 = mix(at(ix1, iy1, iz), at(ix1, iy1, iz1), fz);

    let c0 = mix(c00, c01, fy);
    let c1 = mix(c10, c11, fy);

    mix(c0, c1, fx)
}

// A fraction of exactly 0 or 1 returns that sample without reading the other.
#[inline]
fn blend(a: f32, b: f32, t: f32) -> f32 {
    if t == 0.0 {
        a
    } else if t == 1.0 {
        b
    } else {
        FloatExt::lerp(a, b, t)
    }
}

#[inline]
fn mix(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    if t == 0.0 {
        a
    } else if t == 1.0 {
        b
    } else {
        a * (1.0 - t) + b * t
    }
}
