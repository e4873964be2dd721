//! Interpolation between explicit `(x, y)` knots sorted by ascending `x`.

use common::FloatExt;

enum Bracket {
    /// `p` is outside the knot range, or the table has a single knot.
    Clamped(f32),
    /// `p` lies in `[table[k].x, table[k + 1].x)` at parameter `t`.
    Segment { k: usize, t: f32 },
}

fn bracket(table: &[[f32; 2]], p: f32) -> Bracket {
    let (Some(first), Some(last)) = (table.first(), table.last()) else {
        return Bracket::Clamped(0.0);
    };

    // written so that NaN clamps to the first knot
    if table.len() == 1 || !(p > first[0]) {
        return Bracket::Clamped(first[1]);
    }
    if p >= last[0] {
        return Bracket::Clamped(last[1]);
    }

    // first.x < p < last.x, so 1 <= partition point <= len - 1
    let k = table.partition_point(|knot| knot[0] <= p) - 1;
    let [x0, _] = table[k];
    let [x1, _] = table[k + 1];

    Bracket::Segment {
        k,
        t: (p - x0) / (x1 - x0),
    }
}

pub fn interpolate_linear_1d(table: &[[f32; 2]], p: f32) -> f32 {
    match bracket(table, p) {
        Bracket::Clamped(y) => y,
        Bracket::Segment { k, t } => FloatExt::lerp(table[k][1], table[k + 1][1], t),
    }
}

/// Cubic Hermite interpolation with Catmull-Rom style tangents.
///
/// The tangent at knot `j` is the slope between its neighbours `j - 1` and
/// `j + 1`, scaled to the width of the current segment. Neighbours past either
/// end of the table repeat the boundary knot. Two-knot tables fall back to the
/// linear formula.
pub fn interpolate_cubic_1d(table: &[[f32; 2]], p: f32) -> f32 {
    if table.len() == 2 {
        return interpolate_linear_1d(table, p);
    }

    match bracket(table, p) {
        Bracket::Clamped(y) => y,
        Bracket::Segment { k, t } => {
            let last = table.len() - 1;
            let dx = table[k + 1][0] - table[k][0];

            let tangent = |j: usize| {
                let [x_prev, y_prev] = table[j.saturating_sub(1)];
                let [x_next, y_next] = table[(j + 1).min(last)];
                dx * (y_next - y_prev) / (x_next - x_prev)
            };
            let m0 = tangent(k);
            let m1 = tangent(k + 1);

            let t2 = t * t;
            let t3 = t2 * t;
            let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
            let h10 = t3 - 2.0 * t2 + t;
            let h01 = -2.0 * t3 + 3.0 * t2;
            let h11 = t3 - t2;

            h00 * table[k][1] + h10 * m0 + h01 * table[k + 1][1] + h11 * m1
        }
    }
}
