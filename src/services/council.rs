//! Layer 3 of council verification: independent reviewers and vote counting.
//!
//! Reviewer output is decoded pessimistically. Anything malformed, any
//! transport error, and any timeout counts as a reject with zero confidence,
//! and is still part of the council size N.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::domain::models::{
    CouncilSettings, CouncilTally, CouncilVerdict, GateId, GateResult, ParsedReview, TaskContract,
    VerificationVerdict,
};
use crate::domain::ports::{ReviewRequest, Reviewer};

// ---------------------------------------------------------------------------
// CouncilAggregator
// ---------------------------------------------------------------------------

/// Combines raw reviewer outputs into one verdict.
///
/// Passes iff approvals form a strict majority of N and the approval ratio
/// reaches the threshold θ. Confidence is reported but never decides.
#[derive(Debug, Clone, Copy)]
pub struct CouncilAggregator {
    pass_threshold: f64,
}

impl CouncilAggregator {
    pub fn new(pass_threshold: f64) -> Self {
        Self { pass_threshold }
    }

    pub fn from_settings(settings: &CouncilSettings) -> Self {
        Self::new(settings.pass_threshold)
    }

    pub fn aggregate<S: AsRef<str>>(&self, raw_outputs: &[S]) -> VerificationVerdict {
        let reviews: Vec<ParsedReview> = raw_outputs
            .iter()
            .map(|raw| CouncilVerdict::parse(raw.as_ref()))
            .collect();
        self.aggregate_parsed(reviews)
    }

    pub fn aggregate_parsed(&self, reviews: Vec<ParsedReview>) -> VerificationVerdict {
        let total = reviews.len();
        let malformed = reviews.iter().filter(|r| r.is_malformed()).count();
        for (seat, review) in reviews.iter().enumerate() {
            if let ParsedReview::Malformed { reason } = review {
                warn!(seat, reason = %reason, "malformed reviewer output counted as reject");
            }
        }

        let verdicts: Vec<CouncilVerdict> =
            reviews.into_iter().map(ParsedReview::into_verdict).collect();
        let approvals = verdicts.iter().filter(|v| v.is_approval()).count();

        let mut weaknesses: Vec<String> = Vec::new();
        for weakness in verdicts.iter().flat_map(|v| v.weaknesses.iter()) {
            if !weaknesses.contains(weakness) {
                weaknesses.push(weakness.clone());
            }
        }

        let (score, mean_confidence) = if total == 0 {
            (0.0, 0.0)
        } else {
            let n = total as f64;
            (
                approvals as f64 / n,
                verdicts.iter().map(|v| v.confidence).sum::<f64>() / n,
            )
        };

        let tally = CouncilTally {
            approvals,
            total,
            score,
            mean_confidence,
            malformed,
            weaknesses,
        };
        let passed = total > 0 && tally.has_strict_majority() && score >= self.pass_threshold;
        let summary = summarize(&tally, passed);

        info!(
            approvals,
            total,
            malformed,
            score,
            threshold = self.pass_threshold,
            passed,
            "council votes tallied"
        );

        let gate = if passed {
            GateResult::pass(GateId::Council, summary.clone())
        } else {
            GateResult::fail(GateId::Council, summary.clone())
        };

        VerificationVerdict {
            passed,
            failed_gate: (!passed).then_some(GateId::Council),
            summary,
            warnings: Vec::new(),
            gates: vec![gate],
            council: Some(tally),
            blocker_confirmed: false,
        }
    }
}

fn summarize(tally: &CouncilTally, passed: bool) -> String {
    let glyph = if passed { "✅" } else { "❌" };
    let verdict = if passed { "PASS" } else { "FAIL" };
    let mut summary = format!(
        "{glyph} Council {verdict}: {}/{} approved (score {:.2}, mean confidence {:.2})",
        tally.approvals, tally.total, tally.score, tally.mean_confidence
    );
    if tally.malformed > 0 {
        summary.push_str(&format!("; {} malformed review(s)", tally.malformed));
    }
    if !tally.weaknesses.is_empty() {
        summary.push_str(&format!("; weaknesses: {}", tally.weaknesses.join("; ")));
    }
    summary
}

// ---------------------------------------------------------------------------
// Council dispatch
// ---------------------------------------------------------------------------

/// Fans one prompt out to N reviewer seats and collects raw replies.
pub struct Council {
    reviewer: Arc<dyn Reviewer>,
    timeout: Duration,
}

impl Council {
    pub fn new(reviewer: Arc<dyn Reviewer>, timeout: Duration) -> Self {
        Self { reviewer, timeout }
    }

    /// Ask `council_size` reviewers concurrently and aggregate their votes.
    pub async fn review(
        &self,
        contract: &TaskContract,
        settings: &CouncilSettings,
        output: &str,
    ) -> VerificationVerdict {
        let prompt = build_review_prompt(contract, output);
        let reviews = self.collect(&prompt, settings.council_size).await;
        CouncilAggregator::from_settings(settings).aggregate_parsed(reviews)
    }

    async fn collect(&self, prompt: &str, council_size: usize) -> Vec<ParsedReview> {
        info!(
            reviewer = self.reviewer.name(),
            council_size,
            "dispatching council reviews"
        );

        let calls = (0..council_size).map(|seat| {
            let request = ReviewRequest {
                seat,
                prompt: prompt.to_string(),
            };
            async move {
                match tokio::time::timeout(self.timeout, self.reviewer.review(&request)).await {
                    Ok(Ok(raw)) => {
                        debug!(seat, bytes = raw.len(), "reviewer replied");
                        CouncilVerdict::parse(&raw)
                    }
                    Ok(Err(e)) => ParsedReview::Malformed {
                        reason: format!("reviewer error: {e}"),
                    },
                    Err(_) => ParsedReview::Malformed {
                        reason: format!("reviewer timed out after {:?}", self.timeout),
                    },
                }
            }
        });

        join_all(calls).await
    }
}

/// Prompt asking a reviewer for a JSON verdict on the worker output.
pub fn build_review_prompt(contract: &TaskContract, output: &str) -> String {
    let criteria = if contract.acceptance_criteria.is_empty() {
        "(none stated)".to_string()
    } else {
        contract
            .acceptance_criteria
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}. {c}", i + 1))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You are an independent reviewer. Judge whether the output below satisfies the task.

## Objective
{objective}

## Acceptance criteria
{criteria}

## Output under review
{output}

Respond with exactly one JSON object and nothing else:
{{"verdict": "approve" | "reject", "confidence": <number between 0 and 1>, "strengths": [<string>...], "weaknesses": [<string>...]}}"#,
        objective = contract.objective,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::reviewers::{MockReview, MockReviewer};
    use crate::domain::models::TaskType;

    fn approve() -> String {
        r#"{"verdict": "approve", "confidence": 0.9}"#.to_string()
    }

    fn reject(weakness: &str) -> String {
        format!(r#"{{"verdict": "reject", "confidence": 0.8, "weaknesses": ["{weakness}"]}}"#)
    }

    #[test]
    fn two_of_three_passes_with_threshold_point_six() {
        let verdict = CouncilAggregator::new(0.6).aggregate(&[approve(), approve(), reject("thin")]);
        assert!(verdict.passed);
        let tally = verdict.council.unwrap();
        assert_eq!((tally.approvals, tally.total), (2, 3));
        assert!((tally.score - 2.0 / 3.0).abs() < 1e-12);
        assert!(verdict.summary.starts_with('✅'));
    }

    #[test]
    fn ties_fail_even_when_threshold_is_met() {
        let verdict = CouncilAggregator::new(0.5).aggregate(&[
            approve(),
            approve(),
            reject("a"),
            reject("b"),
        ]);
        assert!(!verdict.passed);
        assert_eq!(verdict.failed_gate, Some(GateId::Council));
        assert!(verdict.summary.starts_with('❌'));
    }

    #[test]
    fn one_of_two_fails() {
        let verdict = CouncilAggregator::new(0.5).aggregate(&[approve(), reject("x")]);
        assert!(!verdict.passed);
    }

    #[test]
    fn majority_below_threshold_fails() {
        let verdict = CouncilAggregator::new(0.8).aggregate(&[approve(), approve(), reject("x")]);
        assert!(!verdict.passed);
    }

    #[test]
    fn malformed_outputs_count_in_n() {
        let verdict = CouncilAggregator::new(0.5).aggregate(&[approve(), "not json".to_string(), String::new()]);
        assert!(!verdict.passed);
        let tally = verdict.council.unwrap();
        assert_eq!(tally.total, 3);
        assert_eq!(tally.malformed, 2);
        assert!(verdict.summary.contains("2 malformed"));
    }

    #[test]
    fn empty_council_fails() {
        let verdict = CouncilAggregator::new(0.0).aggregate::<&str>(&[]);
        assert!(!verdict.passed);
        assert_eq!(verdict.council.unwrap().score, 0.0);
    }

    #[test]
    fn weaknesses_are_deduplicated_in_first_seen_order() {
        let verdict = CouncilAggregator::new(0.5).aggregate(&[
            reject("no sources"),
            reject("too short"),
            reject("no sources"),
        ]);
        let tally = verdict.council.unwrap();
        assert_eq!(tally.weaknesses, vec!["no sources", "too short"]);
        assert!(verdict.summary.contains("no sources; too short"));
    }

    #[test]
    fn confidence_does_not_decide() {
        let low = r#"{"verdict": "approve", "confidence": 0.01}"#;
        let verdict = CouncilAggregator::new(0.5).aggregate(&[low, low, low]);
        assert!(verdict.passed);
    }

    #[test]
    fn prompt_numbers_criteria() {
        let contract = TaskContract::builder("Summarize the paper")
            .criteria(["Mentions the method", "Under 300 words"])
            .build()
            .unwrap();
        let prompt = build_review_prompt(&contract, "the output");
        assert!(prompt.contains("Summarize the paper"));
        assert!(prompt.contains("1. Mentions the method\n2. Under 300 words"));
        assert!(prompt.contains("the output"));
        assert!(prompt.contains(r#""verdict""#));
    }

    #[tokio::test]
    async fn dispatch_folds_errors_and_timeouts_into_rejects() {
        let reviewer = Arc::new(MockReviewer::new(vec![
            MockReview::approve(0.9),
            MockReview::Fail("connection reset".to_string()),
            MockReview::Delayed(Duration::from_secs(5), approve()),
        ]));
        let council = Council::new(reviewer.clone(), Duration::from_millis(100));

        let mut settings = CouncilSettings::new(TaskType::Writing);
        settings.council_size = 3;
        let contract = TaskContract::builder("obj").council(settings.clone()).build().unwrap();

        let verdict = council.review(&contract, &settings, "text").await;
        assert!(!verdict.passed);
        assert_eq!(reviewer.call_count(), 3);
        let tally = verdict.council.unwrap();
        assert_eq!((tally.approvals, tally.total, tally.malformed), (1, 3, 2));
    }
}
