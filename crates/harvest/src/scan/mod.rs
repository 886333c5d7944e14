mod deferred;
mod pipeline;
mod policy;
mod services;
mod session;
mod worker;

#[cfg(test)]
mod scenarios;

pub use deferred::{DeferredQueue, DEAD_BODY_COOLDOWN};
pub use pipeline::{
    CycleOutcome, CycleReport, CycleStats, ScanError, ScanPipeline, SkipReason,
    MANUAL_LOOT_MESSAGE_KEY,
};
pub use policy::{
    is_value_weight_exempt, ContainerAnimation, CrimeCheck, CycleSettings, DeadBodyLooting,
    GlowReason, LootingType, SpecialObjectHandling, AUTO_HARVEST_SPAM_LIMIT,
    LOOTED_GLOW_DURATION, MIN_SCAN_INTERVAL, PENDING_ACTION_TIMEOUT, SPECIAL_GLOW_DURATION,
};
pub use services::ScanServices;
pub use session::ScanGate;
pub use worker::{ScanWorker, WorkerError, WorkerSummary};
