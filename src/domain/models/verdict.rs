//! Verification verdict domain model.

use serde::{Deserialize, Serialize};

use super::profile::{GroundingCheck, StructuralCheck};

/// Identifier of a single check in either verification mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "layer", content = "check")]
pub enum GateId {
    Files,
    Tests,
    Lint,
    Parse,
    Structural(StructuralCheck),
    Grounding(GroundingCheck),
    Council,
}

impl GateId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Files => "files",
            Self::Tests => "tests",
            Self::Lint => "lint",
            Self::Parse => "parse",
            Self::Structural(check) => check.as_str(),
            Self::Grounding(check) => check.as_str(),
            Self::Council => "council",
        }
    }

    /// The four deterministic gates in evaluation order.
    pub const DETERMINISTIC_ORDER: [GateId; 4] = [Self::Files, Self::Tests, Self::Lint, Self::Parse];
}

impl std::fmt::Display for GateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one evaluated gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateResult {
    pub gate: GateId,
    pub passed: bool,
    pub reason: String,
}

impl GateResult {
    pub fn pass(gate: GateId, reason: impl Into<String>) -> Self {
        Self {
            gate,
            passed: true,
            reason: reason.into(),
        }
    }

    pub fn fail(gate: GateId, reason: impl Into<String>) -> Self {
        Self {
            gate,
            passed: false,
            reason: reason.into(),
        }
    }
}

/// Result of a council-mode layer (structural or grounding).
///
/// Failures are hard; warnings are surfaced but never flip the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerReport<C> {
    pub passed: bool,
    /// First check that failed, if any.
    pub failed_check: Option<C>,
    pub failures: Vec<String>,
    pub warnings: Vec<String>,
}

impl<C: Copy> LayerReport<C> {
    pub fn new() -> Self {
        Self {
            passed: true,
            failed_check: None,
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn fail(&mut self, check: C, message: impl Into<String>) {
        self.passed = false;
        if self.failed_check.is_none() {
            self.failed_check = Some(check);
        }
        self.failures.push(message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Collapse into `(pass, messages)`: failures first, then warnings.
    pub fn into_parts(self) -> (bool, Vec<String>) {
        let mut messages = self.failures;
        messages.extend(self.warnings);
        (self.passed, messages)
    }
}

impl<C: Copy> Default for LayerReport<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Vote tally of a council run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouncilTally {
    pub approvals: usize,
    pub total: usize,
    /// Raw approval ratio `approvals / total`; 0.0 for an empty council.
    pub score: f64,
    /// Mean reviewer confidence, for reporting only.
    pub mean_confidence: f64,
    /// Reviewer outputs that could not be parsed and counted as rejects.
    pub malformed: usize,
    /// Union of weaknesses across all reviewers, in order of first appearance.
    pub weaknesses: Vec<String>,
}

impl CouncilTally {
    pub fn has_strict_majority(&self) -> bool {
        self.approvals * 2 > self.total
    }
}

/// Single pass/fail outcome of one verification run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationVerdict {
    pub passed: bool,
    pub failed_gate: Option<GateId>,
    pub summary: String,
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Gates that were actually evaluated, in order.
    #[serde(default)]
    pub gates: Vec<GateResult>,
    #[serde(default)]
    pub council: Option<CouncilTally>,
    /// Set when the worker's blocker was acknowledged instead of verified.
    #[serde(default)]
    pub blocker_confirmed: bool,
}

impl VerificationVerdict {
    /// Build a verdict from evaluated gates: passes iff every gate passed.
    pub fn from_gates(gates: Vec<GateResult>, warnings: Vec<String>) -> Self {
        let failed = gates.iter().find(|g| !g.passed);
        let (passed, failed_gate, summary) = match failed {
            Some(gate) => (
                false,
                Some(gate.gate),
                format!("{} gate failed: {}", gate.gate, gate.reason),
            ),
            None => (true, None, format!("All {} gate(s) passed", gates.len())),
        };

        Self {
            passed,
            failed_gate,
            summary,
            warnings,
            gates,
            council: None,
            blocker_confirmed: false,
        }
    }

    /// Verdict for an acknowledged blocker. No gates run and it never passes.
    pub fn blocker_acknowledged(details: &str) -> Self {
        let summary = if details.trim().is_empty() {
            "Blocker acknowledged".to_string()
        } else {
            format!("Blocker acknowledged: {}", details.trim())
        };

        Self {
            passed: false,
            failed_gate: None,
            summary,
            warnings: Vec::new(),
            gates: Vec::new(),
            council: None,
            blocker_confirmed: true,
        }
    }

    pub fn with_council(mut self, tally: CouncilTally) -> Self {
        self.council = Some(tally);
        self
    }

    pub fn was_evaluated(&self, gate: GateId) -> bool {
        self.gates.iter().any(|g| g.gate == gate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_reports_first_failing_gate() {
        let verdict = VerificationVerdict::from_gates(
            vec![
                GateResult::pass(GateId::Files, "ok"),
                GateResult::fail(GateId::Tests, "exit status 1"),
            ],
            Vec::new(),
        );
        assert!(!verdict.passed);
        assert_eq!(verdict.failed_gate, Some(GateId::Tests));
        assert_eq!(verdict.summary, "tests gate failed: exit status 1");
        assert!(!verdict.was_evaluated(GateId::Lint));
    }

    #[test]
    fn verdict_passes_when_all_gates_pass() {
        let verdict = VerificationVerdict::from_gates(
            GateId::DETERMINISTIC_ORDER
                .iter()
                .map(|g| GateResult::pass(*g, "ok"))
                .collect(),
            Vec::new(),
        );
        assert!(verdict.passed);
        assert_eq!(verdict.failed_gate, None);
    }

    #[test]
    fn layer_report_keeps_first_failed_check() {
        let mut report = LayerReport::new();
        report.warn("advisory");
        report.fail(StructuralCheck::WordCount, "too short");
        report.fail(StructuralCheck::HasSteps, "no steps");
        assert!(!report.passed);
        assert_eq!(report.failed_check, Some(StructuralCheck::WordCount));

        let (passed, messages) = report.into_parts();
        assert!(!passed);
        assert_eq!(messages, vec!["too short", "no steps", "advisory"]);
    }

    #[test]
    fn blocker_verdict_never_passes() {
        let verdict = VerificationVerdict::blocker_acknowledged("Permission denied");
        assert!(!verdict.passed);
        assert!(verdict.blocker_confirmed);
        assert!(verdict.summary.contains("Permission denied"));
    }

    #[test]
    fn gate_ids_serialize_with_layer_tag() {
        let json = serde_json::to_value(GateId::Structural(StructuralCheck::WordCount)).unwrap();
        assert_eq!(json["layer"], "structural");
        assert_eq!(json["check"], "word_count");
        assert_eq!(GateId::Grounding(GroundingCheck::UrlReachable).as_str(), "url_reachable");
    }
}
