use harvest::catalog::LocationId;
use harvest::{
    resolve_data_paths, DataPaths, Harvester, HarvesterError, SettingsError, SettingsTable,
    SharedSettings, StartupError, WorkerError,
};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::demo_world::{DemoScenario, ScenarioError};

const EXCLUDED_LOCATIONS_ENV_VAR: &str = "HARVEST_EXCLUDED_LOCATIONS";
const CYCLES_ENV_VAR: &str = "HARVEST_CYCLES";
const SCENARIO_FILE: &str = "scenario.json";

#[derive(Debug, Error)]
pub(crate) enum HostError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Harvester(#[from] HarvesterError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error(transparent)]
    Worker(#[from] WorkerError),
}

pub(crate) struct HostWiring {
    pub(crate) harvester: Harvester,
    pub(crate) settings: SharedSettings,
    pub(crate) scenario: DemoScenario,
    pub(crate) cycle_limit: u64,
}

pub(crate) fn build_host() -> Result<HostWiring, HostError> {
    init_tracing();
    info!("=== Harvest Host Startup ===");

    let paths = resolve_data_paths()?;
    info!(root = %paths.root.display(), "data_root_resolved");
    build_from_paths(&paths)
}

fn build_from_paths(paths: &DataPaths) -> Result<HostWiring, HostError> {
    let harvester = Harvester::load(paths)?;
    let settings = SharedSettings::new(SettingsTable::load(&paths.settings_file)?);
    let scenario = DemoScenario::load(&paths.demo_dir.join(SCENARIO_FILE))?;

    for location in parse_excluded_locations_from_env() {
        harvester.exclude_location(location);
    }
    let cycle_limit = parse_cycle_limit_from_env().unwrap_or(scenario.frame_count() as u64);

    Ok(HostWiring {
        harvester,
        settings,
        scenario,
        cycle_limit,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn parse_excluded_locations_from_env() -> Vec<LocationId> {
    std::env::var(EXCLUDED_LOCATIONS_ENV_VAR)
        .ok()
        .map(|raw| parse_location_list(&raw))
        .unwrap_or_default()
}

fn parse_location_list(raw: &str) -> Vec<LocationId> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| match parse_id(entry) {
            Some(id) => Some(LocationId(id)),
            None => {
                warn!(entry, var = EXCLUDED_LOCATIONS_ENV_VAR, "ignored_invalid_location");
                None
            }
        })
        .collect()
}

fn parse_cycle_limit_from_env() -> Option<u64> {
    let raw = std::env::var(CYCLES_ENV_VAR).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(limit) => Some(limit),
        Err(_) => {
            warn!(value = %raw, var = CYCLES_ENV_VAR, "ignored_invalid_cycle_limit");
            None
        }
    }
}

fn parse_id(raw: &str) -> Option<u32> {
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}
