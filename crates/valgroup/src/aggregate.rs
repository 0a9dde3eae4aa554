//! Collected failures of a validation run, flat or partitioned by group.

use crate::error::{RuleError, ValidationErrors};
use serde::Serialize;

/// A failed rule evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    /// Field the rule checked
    pub field: String,
    /// Group whose evaluation produced the failure, `None` for ungrouped rules
    pub group: Option<String>,
    /// The failure itself
    pub error: RuleError,
}

/// Failures of the current error snapshot plus the groups it evaluated.
#[derive(Debug, Clone, Default)]
pub struct ErrorAggregator {
    records: Vec<ErrorRecord>,
    evaluated: Vec<Option<String>>,
    has_run: bool,
}

impl ErrorAggregator {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all records and forget which groups were evaluated.
    pub fn reset(&mut self) {
        self.records.clear();
        self.evaluated.clear();
        self.has_run = false;
    }

    /// Whether any run contributed to the current snapshot.
    pub fn has_run(&self) -> bool {
        self.has_run
    }

    /// All records in evaluation order.
    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if no rule failed.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check whether a group (or the ungrouped set, for `None`) was evaluated.
    pub fn was_evaluated(&self, group: Option<&str>) -> bool {
        self.evaluated.iter().any(|g| g.as_deref() == group)
    }

    pub(crate) fn begin_run(&mut self) {
        self.has_run = true;
    }

    pub(crate) fn mark_evaluated(&mut self, group: Option<&str>) {
        if !self.was_evaluated(group) {
            self.evaluated.push(group.map(str::to_string));
        }
    }

    pub(crate) fn record(&mut self, record: ErrorRecord) {
        self.records.push(record);
    }

    /// All failures keyed by field, regardless of origin group.
    pub fn flat(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for record in &self.records {
            errors.add(record.field.clone(), record.error.clone());
        }
        errors
    }

    /// Failures partitioned by the group that produced them.
    pub fn grouped(&self) -> GroupedErrors {
        let mut entries: Vec<(Option<String>, ValidationErrors)> = self
            .evaluated
            .iter()
            .map(|group| (group.clone(), ValidationErrors::new()))
            .collect();

        for record in &self.records {
            let position = match entries.iter().position(|(group, _)| *group == record.group) {
                Some(position) => position,
                None => {
                    entries.push((record.group.clone(), ValidationErrors::new()));
                    entries.len() - 1
                }
            };
            entries[position]
                .1
                .add(record.field.clone(), record.error.clone());
        }

        GroupedErrors { entries }
    }
}

/// Failures partitioned by group, `None` keying ungrouped rules.
///
/// A group that was evaluated but had no failures is present and empty; a
/// group that was never evaluated is absent. Only groups with failures count
/// towards [`GroupedErrors::len`] and [`GroupedErrors::is_empty`].
///
/// ## Example
///
/// ```rust,ignore
/// let grouped = person.validation().grouped_errors()?;
///
/// assert!(grouped.group("first_name_group").map_or(false, |e| e.is_empty()));
/// assert!(grouped.group("not_a_group").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedErrors {
    entries: Vec<(Option<String>, ValidationErrors)>,
}

impl GroupedErrors {
    /// Errors produced by a group, or by ungrouped rules for `None`.
    pub fn get(&self, group: Option<&str>) -> Option<&ValidationErrors> {
        self.entries
            .iter()
            .find(|(name, _)| name.as_deref() == group)
            .map(|(_, errors)| errors)
    }

    /// Errors produced by the named group.
    pub fn group(&self, name: &str) -> Option<&ValidationErrors> {
        self.get(Some(name))
    }

    /// Errors produced by ungrouped rules.
    pub fn ungrouped(&self) -> Option<&ValidationErrors> {
        self.get(None)
    }

    /// Number of groups with at least one failure.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Check if no group has failures.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Groups with failures, in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = (Option<&str>, &ValidationErrors)> {
        self.entries
            .iter()
            .filter(|(_, errors)| !errors.is_empty())
            .map(|(name, errors)| (name.as_deref(), errors))
    }

    /// Every evaluated group, including those without failures.
    pub fn evaluated(&self) -> impl Iterator<Item = Option<&str>> {
        self.entries.iter().map(|(name, _)| name.as_deref())
    }
}
