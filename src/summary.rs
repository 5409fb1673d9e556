//! Aggregation of per-identifier outcomes into a batch summary.

use std::collections::BTreeSet;

use crate::cas::CasNumber;
use crate::download::FetchOutcome;

/// Resolved and still-missing CAS numbers of a batch.
///
/// Both sets are ordered so printed output is stable between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// CAS numbers with a sheet on disk.
    pub resolved: BTreeSet<CasNumber>,
    /// CAS numbers without a sheet.
    pub missing: BTreeSet<CasNumber>,
}

impl BatchSummary {
    /// Partitions outcomes by whether a sheet was persisted.
    ///
    /// A CAS number reported both ways (only possible with duplicate
    /// outcomes) counts as resolved.
    #[must_use]
    pub fn summarize<'a>(outcomes: impl IntoIterator<Item = &'a FetchOutcome>) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            if outcome.persisted {
                summary.missing.remove(&outcome.cas);
                summary.resolved.insert(outcome.cas.clone());
            } else if !summary.resolved.contains(&outcome.cas) {
                summary.missing.insert(outcome.cas.clone());
            }
        }
        summary
    }

    /// Like [`summarize`](Self::summarize), skipping empty result slots.
    #[must_use]
    pub fn summarize_slots<'a>(slots: impl IntoIterator<Item = &'a Option<FetchOutcome>>) -> Self {
        Self::summarize(slots.into_iter().flatten())
    }

    /// Number of CAS numbers with a sheet.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }

    /// Number of CAS numbers without a sheet.
    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.missing.len()
    }

    /// True when every CAS number has a sheet.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cas(value: &str) -> CasNumber {
        CasNumber::new(value).unwrap()
    }

    #[test]
    fn test_summarize_partitions_by_persisted() {
        let outcomes = vec![
            FetchOutcome::fetched(cas("A"), "Fisher"),
            FetchOutcome::missing(cas("B")),
            FetchOutcome::already_present(cas("C")),
        ];
        let summary = BatchSummary::summarize(&outcomes);
        assert_eq!(
            summary.resolved,
            BTreeSet::from([cas("A"), cas("C")])
        );
        assert_eq!(summary.missing, BTreeSet::from([cas("B")]));
        assert!(!summary.is_complete());
        assert_eq!(summary.resolved_count(), 2);
        assert_eq!(summary.missing_count(), 1);
    }

    #[test]
    fn test_summarize_slots_drops_empty_slots() {
        let slots = vec![
            Some(FetchOutcome::fetched(cas("A"), "TCI")),
            None,
            Some(FetchOutcome::missing(cas("B"))),
            None,
        ];
        let summary = BatchSummary::summarize_slots(&slots);
        assert_eq!(summary.resolved_count() + summary.missing_count(), 2);
    }

    #[test]
    fn test_summarize_empty_is_complete() {
        let summary = BatchSummary::summarize(&[]);
        assert!(summary.is_complete());
        assert_eq!(summary, BatchSummary::default());
    }

    #[test]
    fn test_resolved_wins_over_missing_for_same_id() {
        let outcomes = vec![
            FetchOutcome::missing(cas("A")),
            FetchOutcome::fetched(cas("A"), "VWR"),
            FetchOutcome::missing(cas("A")),
        ];
        let summary = BatchSummary::summarize(&outcomes);
        assert_eq!(summary.resolved, BTreeSet::from([cas("A")]));
        assert!(summary.missing.is_empty());
    }
}
