//! Reviewer-level council verdicts.
//!
//! Reviewer output is untrusted text. Decoding never fails loudly: anything
//! that is not a well-formed verdict object becomes [`ParsedReview::Malformed`],
//! which counts as a reject with zero confidence.

use serde::{Deserialize, Serialize};

/// A reviewer's decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "approve" => Some(Self::Approve),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

/// One reviewer's structured opinion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouncilVerdict {
    pub decision: ReviewDecision,
    /// Always within [0.0, 1.0].
    pub confidence: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

impl CouncilVerdict {
    pub fn new(decision: ReviewDecision, confidence: f64) -> Self {
        Self {
            decision,
            confidence: clamp_confidence(confidence),
            strengths: Vec::new(),
            weaknesses: Vec::new(),
        }
    }

    /// The pessimistic stand-in for unparseable output.
    pub fn pessimistic_reject() -> Self {
        Self::new(ReviewDecision::Reject, 0.0)
    }

    pub fn is_approval(&self) -> bool {
        self.decision == ReviewDecision::Approve
    }

    /// Decode raw reviewer text.
    ///
    /// Only the first balanced `{...}` span is considered, fenced or not.
    /// Later objects never rescue an invalid first one.
    pub fn parse(raw: &str) -> ParsedReview {
        if raw.trim().is_empty() {
            return malformed("empty reviewer output");
        }
        let Some(candidate) = first_json_object(raw) else {
            return malformed("no JSON object found");
        };
        let Ok(serde_json::Value::Object(object)) = serde_json::from_str(candidate) else {
            return malformed("first JSON object does not parse");
        };

        let Some(decision) = object
            .get("verdict")
            .and_then(|v| v.as_str())
            .and_then(ReviewDecision::from_str)
        else {
            return malformed("verdict must be \"approve\" or \"reject\"");
        };

        let confidence = match object.get("confidence") {
            None | Some(serde_json::Value::Null) => 0.0,
            Some(value) => match value.as_f64() {
                Some(c) => c,
                None => return malformed("confidence is not a number"),
            },
        };

        let mut verdict = Self::new(decision, confidence);
        verdict.strengths = string_list(object.get("strengths"));
        verdict.weaknesses = string_list(object.get("weaknesses"));
        ParsedReview::Parsed(verdict)
    }
}

fn malformed(reason: &str) -> ParsedReview {
    ParsedReview::Malformed {
        reason: reason.to_string(),
    }
}

/// Typed result of decoding one reviewer output.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedReview {
    Parsed(CouncilVerdict),
    Malformed { reason: String },
}

impl ParsedReview {
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }

    /// Fold into a verdict, resolving malformed output as a reject.
    pub fn into_verdict(self) -> CouncilVerdict {
        match self {
            Self::Parsed(verdict) => verdict,
            Self::Malformed { .. } => CouncilVerdict::pessimistic_reject(),
        }
    }
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

fn string_list(value: Option<&serde_json::Value>) -> Vec<String> {
    match value {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

/// The first balanced `{...}` span in `text`.
///
/// Braces inside JSON string literals are ignored. An unbalanced `{` is
/// skipped and the search resumes after it.
fn first_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut start = 0;

    while let Some(offset) = text[start..].find('{') {
        let open = start + offset;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        for (i, &b) in bytes.iter().enumerate().skip(open) {
            if in_string {
                if escaped {
                    escaped = false;
                } else if b == b'\\' {
                    escaped = true;
                } else if b == b'"' {
                    in_string = false;
                }
                continue;
            }
            match b {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&text[open..=i]);
                    }
                }
                _ => {}
            }
        }

        start = open + 1;
    }

    None
}
