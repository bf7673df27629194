//! Task-type profiles.
//!
//! A profile is a fixed bundle of Layer 1 (structural) and Layer 2
//! (grounding) checks plus a default minimum word count, selected by the
//! task type tag of a council-mode contract.

use serde::{Deserialize, Serialize};

use crate::domain::errors::ContractError;

/// Layer 1 checks. Deterministic, no external calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralCheck {
    WordCount,
    RequiredSections,
    NoEmptySections,
    SourcesList,
    HasSteps,
}

impl StructuralCheck {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WordCount => "word_count",
            Self::RequiredSections => "required_sections",
            Self::NoEmptySections => "no_empty_sections",
            Self::SourcesList => "sources_list",
            Self::HasSteps => "has_steps",
        }
    }
}

/// Layer 2 checks. Some probe external resources under a bounded timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundingCheck {
    UrlReachable,
    CitationsPresent,
    NumbersConsistent,
    CrossRefsResolve,
    DatesValid,
}

impl GroundingCheck {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UrlReachable => "url_reachable",
            Self::CitationsPresent => "citations_present",
            Self::NumbersConsistent => "numbers_consistent",
            Self::CrossRefsResolve => "cross_refs_resolve",
            Self::DatesValid => "dates_valid",
        }
    }

    /// Advisory checks surface warnings and never fail the layer.
    pub fn is_advisory(&self) -> bool {
        matches!(self, Self::NumbersConsistent | Self::DatesValid)
    }
}

/// Immutable check bundle for one task type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskProfile {
    pub structural: &'static [StructuralCheck],
    pub grounding: &'static [GroundingCheck],
    pub min_words: usize,
}

impl TaskProfile {
    pub fn checks_structural(&self, check: StructuralCheck) -> bool {
        self.structural.contains(&check)
    }

    pub fn checks_grounding(&self, check: GroundingCheck) -> bool {
        self.grounding.contains(&check)
    }
}

const RESEARCH: TaskProfile = TaskProfile {
    structural: &[
        StructuralCheck::WordCount,
        StructuralCheck::SourcesList,
        StructuralCheck::NoEmptySections,
    ],
    grounding: &[GroundingCheck::UrlReachable, GroundingCheck::CitationsPresent],
    min_words: 200,
};

const ANALYSIS: TaskProfile = TaskProfile {
    structural: &[
        StructuralCheck::WordCount,
        StructuralCheck::RequiredSections,
        StructuralCheck::NoEmptySections,
    ],
    grounding: &[GroundingCheck::NumbersConsistent],
    min_words: 150,
};

const STRATEGY: TaskProfile = TaskProfile {
    structural: &[
        StructuralCheck::RequiredSections,
        StructuralCheck::NoEmptySections,
        StructuralCheck::WordCount,
    ],
    grounding: &[GroundingCheck::CrossRefsResolve],
    min_words: 100,
};

const WRITING: TaskProfile = TaskProfile {
    structural: &[StructuralCheck::WordCount, StructuralCheck::NoEmptySections],
    grounding: &[],
    min_words: 50,
};

const PLANNING: TaskProfile = TaskProfile {
    structural: &[
        StructuralCheck::RequiredSections,
        StructuralCheck::HasSteps,
        StructuralCheck::NoEmptySections,
    ],
    grounding: &[GroundingCheck::DatesValid],
    min_words: 50,
};

const CUSTOM: TaskProfile = TaskProfile {
    structural: &[],
    grounding: &[],
    min_words: 0,
};

/// Category of an open-ended deliverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Research,
    Analysis,
    Strategy,
    Writing,
    Planning,
    #[default]
    Custom,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Analysis => "analysis",
            Self::Strategy => "strategy",
            Self::Writing => "writing",
            Self::Planning => "planning",
            Self::Custom => "custom",
        }
    }

    pub fn profile(&self) -> &'static TaskProfile {
        match self {
            Self::Research => &RESEARCH,
            Self::Analysis => &ANALYSIS,
            Self::Strategy => &STRATEGY,
            Self::Writing => &WRITING,
            Self::Planning => &PLANNING,
            Self::Custom => &CUSTOM,
        }
    }
}

impl std::str::FromStr for TaskType {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "research" => Ok(Self::Research),
            "analysis" => Ok(Self::Analysis),
            "strategy" => Ok(Self::Strategy),
            "writing" => Ok(Self::Writing),
            "planning" => Ok(Self::Planning),
            "custom" => Ok(Self::Custom),
            other => Err(ContractError::UnknownTaskType(other.to_string())),
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
