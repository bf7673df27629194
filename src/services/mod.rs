//! Verification and reputation services.

pub mod council;
pub mod gate_engine;
pub mod grounding_gate;
pub mod reputation_ledger;
pub mod scoring;
pub mod source_check;
pub mod structural_gate;
pub mod text;
pub mod verification_orchestrator;

pub use council::{build_review_prompt, Council, CouncilAggregator};
pub use gate_engine::GateEngine;
pub use grounding_gate::{GroundingGate, GroundingLimits};
pub use reputation_ledger::{ReputationLedger, StatsReport};
pub use scoring::{score_outcome, RetryState, ScoringPolicy, VerdictOutcome};
pub use source_check::SourceKind;
pub use structural_gate::StructuralGate;
pub use verification_orchestrator::{VerificationOrchestrator, VerificationReport};
