//! Runs a split tone map over a buffer of samples: dark samples go through a
//! gamma table, bright ones through a cubic tone curve.
//!
//! Each batch branches on `p < 0.5`, so both built-ins run under narrowed
//! lane masks and write into one shared output register.
//! `RUST_LOG=simd_exec=trace` shows the per-call dispatch decisions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use common::log_setup::setup_logging;
use simd_exec::batch::for_each_batch;
use simd_exec::elements::lookup_table_funclib::{interpolate_1d_signature, lookup_1d_signature};
use simd_exec::{BuiltinLib, Lanes, LookupTableFuncLib, Register, DEFAULT_LANE_COUNT};
use tracing::info;

const SPLIT: f32 = 0.5;

fn main() -> anyhow::Result<()> {
    setup_logging("info");

    let lib: BuiltinLib = LookupTableFuncLib::default().into();
    info!("declared built-ins:\n{}", lib.to_yaml()?);

    let gamma = lib
        .link("lookup1D", &lookup_1d_signature())
        .context("linking gamma lookup")?;
    let tone = lib
        .link("interpolateCubic1D", &interpolate_1d_signature())
        .context("linking tone curve")?;

    let gamma_table: Arc<[f32]> = (0..1024)
        .map(|i| (i as f32 / 1023.0 * SPLIT).powf(1.0 / 2.2))
        .collect();
    let tone_curve: Arc<[[f32; 2]]> = Arc::from([
        [0.5f32, 0.73],
        [0.625, 0.8],
        [0.75, 0.87],
        [0.875, 0.94],
        [1.0, 1.0],
    ]);

    let mut samples: Vec<f32> = (0..100_000).map(|i| (i % 1000) as f32 / 999.0).collect();
    let dark_lanes = AtomicUsize::new(0);
    let skipped_branches = AtomicUsize::new(0);

    let start = Instant::now();
    for_each_batch(&mut samples, DEFAULT_LANE_COUNT, |ctx, batch| {
        let lane_count = ctx.lane_count();
        let p = Lanes::from_partial(batch.samples, lane_count);
        let is_dark = Lanes::Varying(p.as_slice().iter().map(|&x| x < SPLIT).collect());

        let dark = batch.mask.narrow(&is_dark, lane_count);
        let bright = batch.mask.narrow_not(&is_dark, lane_count);
        dark_lanes.fetch_add(dark.active_count(lane_count), Ordering::Relaxed);

        let mut out = Register::varying(vec![0.0f32; lane_count]);
        if dark.any_active() {
            out = ctx
                .invoke(&gamma, &dark, |args| {
                    args.arg("table", Register::uniform(gamma_table.clone()))
                        .arg("pMin", Register::uniform(0.0f32))
                        .arg("pMax", Register::uniform(SPLIT))
                        .arg("p", p.clone().into())
                        .ret(out)
                })
                .take_ret();
        } else {
            skipped_branches.fetch_add(1, Ordering::Relaxed);
        }
        if bright.any_active() {
            out = ctx
                .invoke(&tone, &bright, |args| {
                    args.arg("table", Register::uniform(tone_curve.clone()))
                        .arg("p", p.into())
                        .ret(out)
                })
                .take_ret();
        } else {
            skipped_branches.fetch_add(1, Ordering::Relaxed);
        }

        let lanes = out.lanes::<f32>();
        for (lane, sample) in batch.samples.iter_mut().enumerate() {
            *sample = *lanes.get(lane);
        }
    });

    info!(
        samples = samples.len(),
        dark = dark_lanes.load(Ordering::Relaxed),
        skipped = skipped_branches.load(Ordering::Relaxed),
        elapsed = ?start.elapsed(),
        "processed"
    );
    info!(
        first = samples[0],
        middle = samples[500],
        last = samples[999],
        "results"
    );

    Ok(())
}
