pub mod claim;
pub mod config;
pub mod contract;
pub mod council;
pub mod profile;
pub mod reputation;
pub mod verdict;

pub use claim::{SelfReportedStatus, WorkerClaim};
pub use config::{
    Config, DatabaseConfig, LedgerConfig, LogFormat, LoggingConfig, RotationPolicy,
    VerificationConfig,
};
pub use contract::{
    generate_task_id, CouncilSettings, TaskContract, TaskContractBuilder, VerificationMode,
    DEFAULT_COUNCIL_SIZE, DEFAULT_PASS_THRESHOLD,
};
pub use council::{CouncilVerdict, ParsedReview, ReviewDecision};
pub use profile::{GroundingCheck, StructuralCheck, TaskProfile, TaskType};
pub use reputation::{
    ema_update, OutcomeEntry, OutcomeScore, RecordedOutcome, ReputationRecord, SupervisionLevel,
    WorkerStats, EMA_ALPHA, NEUTRAL_REPUTATION,
};
pub use verdict::{CouncilTally, GateId, GateResult, LayerReport, VerificationVerdict};
