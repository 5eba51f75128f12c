/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use edge_sched::config::ScenarioConfig;
use edge_sched::datacenter::EdgeDatacenter;
use edge_sched::mobility::{MovingPolicy, SimpleMovingPolicy};
use edge_sched::placement::WeightedPlacementPolicy;
use edge_sched::vm::VmUid;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Runs one edge scenario: places its VMs, submits its work units at t=0 and
/// ticks every VM until all work is done.
///
/// Example:
///   edge-sched --config demos/scenario.yaml --warmup-steps 5
#[derive(Debug, Parser)]
#[command(
    name = "edge-sched",
    about = "Sensor-weighted edge placement and scheduling simulator",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML scenario file.
    #[arg(short = 'c', long = "config")]
    config: PathBuf,

    /// Move every device this many steps before computing the placement
    /// reference point.
    #[arg(short = 'w', long = "warmup-steps", default_value_t = 0)]
    warmup_steps: u32,

    /// Override the scenario's `max_steps` run limit.
    #[arg(long = "max-steps")]
    max_steps: Option<usize>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!(
        config       = %cli.config.display(),
        warmup_steps = cli.warmup_steps,
        max_steps    = ?cli.max_steps,
        "Configuration"
    );

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut scenario = ScenarioConfig::load_from_file(&cli.config)?;

    // ── Device warm-up ────────────────────────────────────────────────────────
    let policy = SimpleMovingPolicy;
    for _ in 0..cli.warmup_steps {
        for device in &mut scenario.devices {
            policy.update_location(&mut device.mobility);
        }
    }
    for device in &scenario.devices {
        info!(
            "  [{name}]  at ({x:.2}, {y:.2}, {z:.2})  moved={dist:.2}",
            name = device.name,
            x = device.mobility.location.x,
            y = device.mobility.location.y,
            z = device.mobility.location.z,
            dist = device.mobility.total_moving_distance,
        );
    }

    // ── Placement ─────────────────────────────────────────────────────────────
    let reference = scenario.reference_location();
    info!(x = reference.x, y = reference.y, z = reference.z, "Placement reference point");

    let placement = WeightedPlacementPolicy::new(
        scenario.edge_nodes(),
        scenario.placement.pe_weight,
        scenario.placement.dist_weight,
        reference,
    );
    let mut datacenter = EdgeDatacenter::new(
        placement,
        Arc::new(scenario.sensor_weights.clone()),
        scenario.simulation.min_time_between_events,
        scenario.simulation.storage_rate_mb_per_s,
    );

    for spec in &scenario.vms {
        match datacenter.create_vm(*spec, 0.0) {
            Ok(index) => {
                let node = datacenter.policy().node(index).map_or("?", |n| n.name.as_str());
                info!(vm = %spec.uid, node = %node, "VM placed");
            }
            Err(e) => warn!(vm = %spec.uid, "VM not placed: {}", e),
        }
    }

    // ── Submission ────────────────────────────────────────────────────────────
    let mut submitted = 0usize;
    for unit in scenario.work_units.drain(..) {
        let id = unit.id;
        match datacenter.submit(unit, 0.0) {
            Ok(_) => submitted += 1,
            Err(e) => warn!(unit = id, "work unit rejected: {}", e),
        }
    }

    // ── Run ───────────────────────────────────────────────────────────────────
    let max_steps = cli.max_steps.unwrap_or(scenario.simulation.max_steps);
    let finished = datacenter
        .run_until_idle(0.0, max_steps)
        .context("simulation did not complete")?;

    info!("Finished {} of {} submitted work unit(s):", finished.len(), submitted);
    for rec in &finished {
        info!(
            "  [unit {id}]  vm={vm}  category={cat}  length={len:.1}  cpu={cpu:.3}  finish={fin:.3}",
            id = rec.id(),
            vm = VmUid::new(rec.unit().user_id, rec.unit().vm_id),
            cat = rec.category(),
            len = rec.unit().length,
            cpu = rec.cpu_time(),
            fin = rec.finish_time().unwrap_or(f64::NAN),
        );
    }
    let makespan = finished
        .iter()
        .filter_map(|r| r.finish_time())
        .fold(0.0, f64::max);
    info!(makespan = makespan, "Simulation complete");

    Ok(())
}
