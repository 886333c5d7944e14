use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};

use super::bootstrap::{HostError, HostWiring};
use super::demo_world::DemoWorld;

pub(crate) fn run(wiring: HostWiring) -> ExitCode {
    if let Err(err) = run_scan(wiring) {
        error!(error = %err, "scan_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run_scan(wiring: HostWiring) -> Result<(), HostError> {
    let HostWiring {
        harvester,
        settings,
        scenario,
        cycle_limit,
    } = wiring;

    let report = harvester.report();
    info!(
        conflicts = report.conflicts,
        unnamed_skipped = report.unnamed_skipped,
        unmatched_verbs = report.unmatched_verbs.len(),
        "taxonomy_report"
    );

    let world = Arc::new(DemoWorld::new(harvester.clone(), scenario));
    harvester.sync_done(true);
    harvester.allow_search();

    let worker = harvester.spawn_worker(
        world.clone(),
        Arc::new(settings),
        world.clone(),
        Some(cycle_limit),
    )?;
    let summary = worker.join()?;
    harvester.disallow_search();
    harvester.prepare_for_reload();

    for (event, count) in world.emitted() {
        info!(event, count, "demo_actions_total");
    }
    info!(
        cycles = summary.cycles,
        completed = summary.completed,
        failed = summary.failed,
        "host_finished"
    );
    Ok(())
}
