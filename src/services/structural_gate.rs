//! Layer 1 of council verification: deterministic checks on produced text.
//!
//! No external calls are made here. A failure in this layer means the
//! grounding and council layers are never invoked.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use super::text::{self, normalize_heading};
use crate::domain::models::{
    CouncilSettings, LayerReport, StructuralCheck, TaskContract, TaskType,
};

/// Minimum non-whitespace characters a section body must contain.
pub const DEFAULT_MIN_SECTION_CHARS: usize = 20;

static NUMBERED_STEP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*1[.)]\s+\S").expect("step regex is valid"));

pub struct StructuralGate {
    min_section_chars: usize,
}

impl Default for StructuralGate {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SECTION_CHARS)
    }
}

impl StructuralGate {
    pub fn new(min_section_chars: usize) -> Self {
        Self { min_section_chars }
    }

    /// Run every enabled check for the contract's task type.
    ///
    /// A check runs when the profile enables it. `word_count` and
    /// `required_sections` also run when the contract sets them explicitly.
    pub fn evaluate(&self, settings: &CouncilSettings, output: &str) -> LayerReport<StructuralCheck> {
        let profile = settings.profile();
        let mut report = LayerReport::new();

        let enabled = |check: StructuralCheck| match check {
            StructuralCheck::WordCount => {
                profile.checks_structural(check) || settings.min_words.is_some()
            }
            StructuralCheck::RequiredSections => {
                profile.checks_structural(check) || !settings.required_sections.is_empty()
            }
            _ => profile.checks_structural(check),
        };

        if enabled(StructuralCheck::WordCount) {
            self.check_word_count(settings.effective_min_words(), output, &mut report);
        }
        if enabled(StructuralCheck::RequiredSections) {
            self.check_required_sections(&settings.required_sections, output, &mut report);
        }
        if enabled(StructuralCheck::NoEmptySections) {
            self.check_no_empty_sections(output, &mut report);
        }
        if enabled(StructuralCheck::SourcesList) {
            self.check_sources_list(output, &mut report);
        }
        if enabled(StructuralCheck::HasSteps) {
            self.check_has_steps(output, &mut report);
        }

        info!(
            task_type = %settings.task_type,
            passed = report.passed,
            failures = report.failures.len(),
            "structural layer evaluated"
        );
        report
    }

    /// `(pass, messages)` for a contract. Deterministic contracts have no
    /// text profile and pass trivially.
    pub fn evaluate_structural(&self, contract: &TaskContract, output: &str) -> (bool, Vec<String>) {
        match contract.council() {
            Some(settings) => self.evaluate(settings, output).into_parts(),
            None => self
                .evaluate(&CouncilSettings::new(TaskType::Custom), output)
                .into_parts(),
        }
    }

    fn check_word_count(&self, min_words: usize, output: &str, report: &mut LayerReport<StructuralCheck>) {
        let words = text::word_count(output);
        debug!(words, min_words, "word_count");
        if words < min_words {
            report.fail(
                StructuralCheck::WordCount,
                format!("Word count {words} is below the minimum of {min_words}"),
            );
        }
    }

    fn check_required_sections(
        &self,
        required: &[String],
        output: &str,
        report: &mut LayerReport<StructuralCheck>,
    ) {
        let present: Vec<String> = text::sections(output)
            .iter()
            .map(text::Section::normalized_title)
            .collect();

        let missing: Vec<&str> = required
            .iter()
            .filter(|name| !present.contains(&normalize_heading(name)))
            .map(String::as_str)
            .collect();

        if !missing.is_empty() {
            report.fail(
                StructuralCheck::RequiredSections,
                format!("Missing required section(s): {}", missing.join(", ")),
            );
        }
    }

    fn check_no_empty_sections(&self, output: &str, report: &mut LayerReport<StructuralCheck>) {
        let empty: Vec<String> = text::sections(output)
            .into_iter()
            .filter(|section| section.body_chars() < self.min_section_chars)
            .map(|section| section.title)
            .collect();

        if !empty.is_empty() {
            report.fail(
                StructuralCheck::NoEmptySections,
                format!(
                    "Section(s) with fewer than {} characters of content: {}",
                    self.min_section_chars,
                    empty.join(", ")
                ),
            );
        }
    }

    fn check_sources_list(&self, output: &str, report: &mut LayerReport<StructuralCheck>) {
        if text::urls(output).is_empty() {
            report.fail(StructuralCheck::SourcesList, "No source URLs found");
        }
    }

    fn check_has_steps(&self, output: &str, report: &mut LayerReport<StructuralCheck>) {
        if !NUMBERED_STEP.is_match(output) {
            report.fail(
                StructuralCheck::HasSteps,
                "No numbered step list found (expected an item starting with `1.` or `1)`)",
            );
        }
    }
}
