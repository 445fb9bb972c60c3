//! View filter/sort pipeline applied to the jurisdiction-scoped feed.
//!
//! Filters run in a fixed order (status, pincode, severity) before the sort;
//! the order only clarifies precedence, it does not change the final set.

use crate::features::reports::models::{Report, Severity};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Resolved,
}

impl StatusFilter {
    fn matches(&self, status: Option<&str>) -> bool {
        let wanted = match self {
            StatusFilter::All => return true,
            StatusFilter::Pending => "pending",
            StatusFilter::Resolved => "resolved",
        };
        status.is_some_and(|s| s.eq_ignore_ascii_case(wanted))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PincodeFilter {
    #[default]
    All,
    Exact(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateOrder {
    Asc,
    #[default]
    Desc,
}

/// Which severities are currently checked in the dashboard.
///
/// An empty selection is an explicit "show nothing", not "show all".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeveritySelection {
    pub mild: bool,
    pub moderate: bool,
    pub severe: bool,
}

impl Default for SeveritySelection {
    fn default() -> Self {
        Self {
            mild: true,
            moderate: true,
            severe: true,
        }
    }
}

impl SeveritySelection {
    pub fn is_empty(&self) -> bool {
        !(self.mild || self.moderate || self.severe)
    }

    pub fn is_full(&self) -> bool {
        self.mild && self.moderate && self.severe
    }

    pub fn contains(&self, severity: Severity) -> bool {
        match severity {
            Severity::Mild => self.mild,
            Severity::Moderate => self.moderate,
            Severity::Severe => self.severe,
        }
    }
}

/// User-selected view state. `Default` is the reset state: everything
/// visible, newest first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterState {
    pub status: StatusFilter,
    pub pincode: PincodeFilter,
    pub order: DateOrder,
    pub severities: SeveritySelection,
}

/// Apply the view pipeline to a scoped feed snapshot
pub fn apply(state: &FilterState, mut reports: Vec<Report>) -> Vec<Report> {
    if !matches!(state.status, StatusFilter::All) {
        reports.retain(|r| state.status.matches(r.status.as_deref()));
    }

    if let PincodeFilter::Exact(pincode) = &state.pincode {
        let pincode = pincode.trim();
        reports.retain(|r| r.pincode.as_deref() == Some(pincode));
    }

    if state.severities.is_empty() {
        // none selected: show nothing
        reports.clear();
    } else if !state.severities.is_full() {
        reports.retain(|r| r.severity.is_some_and(|s| state.severities.contains(s)));
    }

    // Stable sort: equal timestamps preserve input relative order
    match state.order {
        DateOrder::Asc => reports.sort_by(|a, b| a.timestamp_ms.cmp(&b.timestamp_ms)),
        DateOrder::Desc => reports.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms)),
    }

    reports
}
