//! Milestone block layout selection.
//!
//! A milestone block is rendered with a layout chosen by the milestone's
//! effective status. Planned and in-progress milestones whose end date has
//! passed are shown as overdue. Statuses without a dedicated layout use the
//! index layout.

use chrono::NaiveDate;
use std::fmt;

/// Layout used when a status has no dedicated one.
pub const INDEX_LAYOUT: &str = "components/milestone-blocks/index";

/// Issue statuses that count towards milestone progress.
const CLOSED_ISSUE_STATUSES: &[&str] = &["done", "complete", "closed", "deferred"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MilestoneStatus {
    Planned,
    InProgress,
    Completed,
    Overdue,
    /// Any status without special handling.
    Other,
}

const LAYOUTS: &[(MilestoneStatus, &str)] = &[
    (MilestoneStatus::Planned, "components/milestone-blocks/planned"),
    (MilestoneStatus::InProgress, "components/milestone-blocks/in_progress"),
    (MilestoneStatus::Completed, "components/milestone-blocks/completed"),
    (MilestoneStatus::Overdue, "components/milestone-blocks/overdue"),
];

impl MilestoneStatus {
    pub fn parse(status: &str) -> Self {
        match status.trim() {
            "planned" => MilestoneStatus::Planned,
            "in_progress" => MilestoneStatus::InProgress,
            "completed" => MilestoneStatus::Completed,
            "overdue" => MilestoneStatus::Overdue,
            _ => MilestoneStatus::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MilestoneStatus::Planned => "planned",
            MilestoneStatus::InProgress => "in_progress",
            MilestoneStatus::Completed => "completed",
            MilestoneStatus::Overdue => "overdue",
            MilestoneStatus::Other => "other",
        }
    }

    /// Whether a milestone in this status can become overdue.
    pub fn is_open(&self) -> bool {
        matches!(self, MilestoneStatus::Planned | MilestoneStatus::InProgress)
    }

    pub fn layout(&self) -> &'static str {
        LAYOUTS
            .iter()
            .find(|(status, _)| status == self)
            .map_or(INDEX_LAYOUT, |(_, layout)| layout)
    }
}

impl fmt::Display for MilestoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a milestone block shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneView {
    pub status: MilestoneStatus,
    /// Percentage of closed issues, rounded.
    pub progress: u8,
    pub layout: &'static str,
}

/// Share of issues in a closed status, as a rounded percentage.
pub fn progress<S: AsRef<str>>(issue_statuses: &[S]) -> u8 {
    if issue_statuses.is_empty() {
        return 0;
    }
    let closed = issue_statuses
        .iter()
        .filter(|s| CLOSED_ISSUE_STATUSES.contains(&s.as_ref()))
        .count();
    ((closed as f64 / issue_statuses.len() as f64) * 100.0).round() as u8
}

/// Status shown for a milestone on `today`.
pub fn effective_status(status: MilestoneStatus, end_date: Option<NaiveDate>, today: NaiveDate) -> MilestoneStatus {
    match end_date {
        Some(end) if status.is_open() && today >= end => MilestoneStatus::Overdue,
        _ => status,
    }
}

/// Build the view of a milestone from its raw fields.
///
/// `end_date` is `YYYY-MM-DD`; an unparseable date never makes a milestone overdue.
pub fn milestone_view<S: AsRef<str>>(
    status: &str,
    end_date: Option<&str>,
    issue_statuses: &[S],
    today: NaiveDate,
) -> MilestoneView {
    let end = end_date.and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok());
    let status = effective_status(MilestoneStatus::parse(status), end, today);
    MilestoneView {
        status,
        progress: progress(issue_statuses),
        layout: status.layout(),
    }
}
