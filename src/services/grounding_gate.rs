//! Layer 2 of council verification: grounding checks with bounded probing.
//!
//! `url_reachable`, `citations_present`, and `cross_refs_resolve` are hard
//! checks. `numbers_consistent` and `dates_valid` only produce warnings.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use chrono::{Months, NaiveDate, Utc};
use futures::future::join_all;
use regex::Regex;
use tracing::{debug, info, warn};

use super::text;
use crate::domain::models::{
    CouncilSettings, GroundingCheck, LayerReport, TaskContract, VerificationConfig,
};
use crate::domain::ports::{ProbeOutcome, UrlProber};

static AUTHOR_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\p{Lu}[\p{L}'\-]+(?:\s+et\s+al\.)?\s+\(\d{4}[a-z]?\)")
        .expect("author-year regex is valid")
});

static BRACKETED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\d+(?:\s*[,\-–]\s*\d+)*\]").expect("bracketed citation regex is valid")
});

static PARENTHETICAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\p{Lu}[\p{L}'\-]+(?:\s+et\s+al\.)?,\s*\d{4}[a-z]?\)")
        .expect("parenthetical citation regex is valid")
});

static NUMBER_WITH_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s?(%|€|\$|[a-z]+)").expect("number regex is valid")
});

static CROSS_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i:\b(?:see|siehe)\s+(?:section|abschnitt))\s+(?:(\d+(?:\.\d+)*)|["“'‚„]([^"”'‘“]+)["”'‘“]|(\p{Lu}[\p{L}\d\-]*))"#,
    )
    .expect("cross-reference regex is valid")
});

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("date regex is valid"));

/// Units recognized by the number consistency check.
const UNITS: &[&str] = &[
    "%", "percent", "prozent", "€", "$", "eur", "usd", "k", "m", "bn", "thousand", "million",
    "millionen", "billion", "milliarden", "kg", "g", "t", "km", "mi", "ms", "s", "min", "h",
    "hours", "days", "weeks", "months", "years", "users", "x",
];

/// Characters within which the same number with different units is flagged.
const UNIT_WINDOW: usize = 300;

/// Bounds on the external probing done by the grounding layer.
#[derive(Debug, Clone)]
pub struct GroundingLimits {
    pub url_timeout: Duration,
    pub max_urls: usize,
    pub max_past_years: u32,
    pub max_future_years: u32,
}

impl Default for GroundingLimits {
    fn default() -> Self {
        Self {
            url_timeout: Duration::from_secs(3),
            max_urls: 5,
            max_past_years: 10,
            max_future_years: 5,
        }
    }
}

impl From<&VerificationConfig> for GroundingLimits {
    fn from(config: &VerificationConfig) -> Self {
        Self {
            url_timeout: config.url_timeout(),
            max_urls: config.max_urls,
            max_past_years: config.max_past_years.max(0).unsigned_abs(),
            max_future_years: config.max_future_years.max(0).unsigned_abs(),
        }
    }
}

pub struct GroundingGate {
    prober: Arc<dyn UrlProber>,
    limits: GroundingLimits,
}

impl GroundingGate {
    pub fn new(prober: Arc<dyn UrlProber>, limits: GroundingLimits) -> Self {
        Self { prober, limits }
    }

    pub async fn evaluate(&self, settings: &CouncilSettings, output: &str) -> LayerReport<GroundingCheck> {
        self.evaluate_at(settings, output, Utc::now().date_naive()).await
    }

    /// Evaluate against a fixed verification date.
    pub async fn evaluate_at(
        &self,
        settings: &CouncilSettings,
        output: &str,
        today: NaiveDate,
    ) -> LayerReport<GroundingCheck> {
        let profile = settings.profile();
        let mut report = LayerReport::new();

        if profile.checks_grounding(GroundingCheck::UrlReachable) {
            self.check_urls(output, &mut report).await;
        }
        if profile.checks_grounding(GroundingCheck::CitationsPresent) {
            check_citations(output, &mut report);
        }
        if profile.checks_grounding(GroundingCheck::NumbersConsistent) {
            check_numbers(output, &mut report);
        }
        if profile.checks_grounding(GroundingCheck::CrossRefsResolve) {
            check_cross_refs(output, &mut report);
        }
        if profile.checks_grounding(GroundingCheck::DatesValid) {
            self.check_dates(output, today, &mut report);
        }

        info!(
            task_type = %settings.task_type,
            passed = report.passed,
            failures = report.failures.len(),
            warnings = report.warnings.len(),
            "grounding layer evaluated"
        );
        report
    }

    /// `(pass, messages)` for a contract. Deterministic contracts pass trivially.
    pub async fn evaluate_grounding(&self, contract: &TaskContract, output: &str) -> (bool, Vec<String>) {
        match contract.council() {
            Some(settings) => self.evaluate(settings, output).await.into_parts(),
            None => (true, Vec::new()),
        }
    }

    async fn check_urls(&self, output: &str, report: &mut LayerReport<GroundingCheck>) {
        let urls: Vec<String> = text::urls(output)
            .into_iter()
            .take(self.limits.max_urls)
            .collect();
        if urls.is_empty() {
            return;
        }

        let timeout = self.limits.url_timeout;
        let probes = urls.iter().map(|url| async move {
            // The prober gets the timeout too, but the deadline is enforced here.
            let outcome = tokio::time::timeout(timeout, self.prober.probe(url, timeout))
                .await
                .unwrap_or(ProbeOutcome::TimedOut);
            (url, outcome)
        });

        let unreachable: Vec<String> = join_all(probes)
            .await
            .into_iter()
            .filter(|(_, outcome)| !outcome.is_reachable())
            .map(|(url, outcome)| format!("{url} ({})", outcome.describe()))
            .collect();

        debug!(probed = urls.len(), unreachable = unreachable.len(), "url_reachable");
        if !unreachable.is_empty() {
            warn!(unreachable = ?unreachable, "unreachable urls in output");
            report.fail(
                GroundingCheck::UrlReachable,
                format!("Unreachable URL(s): {}", unreachable.join(", ")),
            );
        }
    }

    fn check_dates(&self, output: &str, today: NaiveDate, report: &mut LayerReport<GroundingCheck>) {
        let earliest = today.checked_sub_months(Months::new(self.limits.max_past_years.saturating_mul(12)));
        let latest = today.checked_add_months(Months::new(self.limits.max_future_years.saturating_mul(12)));

        for caps in ISO_DATE.captures_iter(output) {
            let raw = &caps[0];
            let parsed = (|| {
                let year = caps[1].parse().ok()?;
                let month = caps[2].parse().ok()?;
                let day = caps[3].parse().ok()?;
                NaiveDate::from_ymd_opt(year, month, day)
            })();

            match parsed {
                None => report.warn(format!("Invalid date: {raw}")),
                Some(date) if earliest.is_some_and(|e| date < e) => report.warn(format!(
                    "Date {raw} is more than {} years in the past",
                    self.limits.max_past_years
                )),
                Some(date) if latest.is_some_and(|l| date > l) => report.warn(format!(
                    "Date {raw} is more than {} years in the future",
                    self.limits.max_future_years
                )),
                Some(_) => {}
            }
        }
    }
}

fn check_citations(output: &str, report: &mut LayerReport<GroundingCheck>) {
    let found = AUTHOR_YEAR.is_match(output)
        || BRACKETED.is_match(output)
        || PARENTHETICAL.is_match(output);
    if !found {
        report.fail(
            GroundingCheck::CitationsPresent,
            "No citations found (expected `Author (2020)`, `[1]`, or `(Author, 2020)`)",
        );
    }
}

fn check_numbers(output: &str, report: &mut LayerReport<GroundingCheck>) {
    let mentions: Vec<(usize, &str, String)> = NUMBER_WITH_UNIT
        .captures_iter(output)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let unit = caps[2].to_lowercase();
            UNITS
                .contains(&unit.as_str())
                .then(|| (whole.start(), caps.get(1).map_or("", |m| m.as_str()), unit))
        })
        .collect();

    let mut flagged: Vec<String> = Vec::new();
    for (i, (pos, number, unit)) in mentions.iter().enumerate() {
        for (other_pos, other_number, other_unit) in &mentions[i + 1..] {
            if other_pos - pos > UNIT_WINDOW {
                break;
            }
            if number == other_number && unit != other_unit && !flagged.contains(&number.to_string()) {
                flagged.push((*number).to_string());
                report.warn(format!(
                    "Number {number} appears with different units nearby ({unit} and {other_unit})"
                ));
            }
        }
    }
}

fn check_cross_refs(output: &str, report: &mut LayerReport<GroundingCheck>) {
    let sections = text::sections(output);
    let mut unresolved: Vec<String> = Vec::new();

    for caps in CROSS_REF.captures_iter(output) {
        let resolved = if let Some(number) = caps.get(1) {
            sections.iter().any(|s| s.number() == Some(number.as_str()))
        } else if let Some(title) = caps.get(2).or_else(|| caps.get(3)) {
            let wanted = text::normalize_heading(title.as_str());
            sections
                .iter()
                .any(|s| s.normalized_title().starts_with(&wanted))
        } else {
            true
        };

        if !resolved {
            let reference = caps[0].to_string();
            if !unresolved.contains(&reference) {
                unresolved.push(reference);
            }
        }
    }

    if !unresolved.is_empty() {
        report.fail(
            GroundingCheck::CrossRefsResolve,
            format!("Unresolved cross-reference(s): {}", unresolved.join("; ")),
        );
    }
}
