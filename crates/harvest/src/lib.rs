use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod catalog;
pub mod config;
pub mod lootability;
pub mod scan;
pub mod taxonomy;
pub mod text;
pub mod world;

mod harvester;
mod sync;

pub use catalog::{
    load_catalog, Catalog, CatalogErrorCode, CatalogLoadError, Definition, DefinitionKind,
    FormId, Instance, LocationId, Position, RefId,
};
pub use config::{SettingDomain, Settings, SettingsError, SettingsTable, SharedSettings};
pub use harvester::{Harvester, HarvesterError};
pub use lootability::{Identity, LootabilityReason, StateStore};
pub use scan::{
    CycleOutcome, CycleReport, CycleStats, GlowReason, ScanError, ScanPipeline, ScanWorker,
    SkipReason, WorkerError, WorkerSummary,
};
pub use taxonomy::{ObjectType, ResourceType, RuleTables, Taxonomy};
pub use text::{TranslationTable, Translator};
pub use world::{ActionSink, LootItem, ObserverContext, OutboundEvent, WorldError, WorldQuery};

pub const ROOT_ENV_VAR: &str = "HARVEST_ROOT";

#[derive(Debug, Clone)]
pub struct DataPaths {
    pub root: PathBuf,
    pub catalog_dir: PathBuf,
    /// `None` when no override file is shipped; the built-in tables apply.
    pub rules_file: Option<PathBuf>,
    pub settings_file: PathBuf,
    pub translations_file: PathBuf,
    pub demo_dir: PathBuf,
}

impl DataPaths {
    pub fn under(root: PathBuf) -> Self {
        let assets = root.join("assets");
        let rules = assets.join("rules.json");
        Self {
            catalog_dir: assets.join("catalog"),
            rules_file: rules.is_file().then_some(rules),
            settings_file: assets.join("settings.json"),
            translations_file: assets.join("translations").join("english.txt"),
            demo_dir: assets.join("demo"),
            root,
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "HARVEST_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and an assets/ directory."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and assets/.\n\
Set {env_var} explicitly, for example:\n\
export {env_var}=\"/path/to/harvest\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_data_paths() -> Result<DataPaths, StartupError> {
    resolve_root().map(DataPaths::under)
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            exe_dir
                .ancestors()
                .find(|candidate| is_repo_marker(candidate))
                .map(normalize_path)
                .ok_or_else(|| StartupError::RootNotFound {
                    start_dir: normalize_path(&exe_dir),
                    env_var: ROOT_ENV_VAR,
                })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    path.join("Cargo.toml").is_file() && path.join("assets").is_dir()
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
