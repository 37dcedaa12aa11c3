use crate::{report::AgentReport, AgentId};

/// In-memory, per-validator consensus state. Exists only on the collector,
/// only while at least one `UNHEALTHY` report is pending. The aggregator crate owns
/// the state-machine transitions (open / quorum / cancel / age-out); this type is
/// the data the state machine operates on.
#[derive(Clone, Debug)]
pub struct ConsensusWindow {
    /// At most one entry per `agentId`; latest report from each agent wins.
    pub reports: Vec<AgentReport>,
    pub consensus_reached: bool,
    pub threshold: usize,
    pub opened_at: time::OffsetDateTime,
}

impl ConsensusWindow {
    pub fn new(threshold: usize, first_report: AgentReport) -> Self {
        Self { reports: vec![first_report], consensus_reached: false, threshold, opened_at: time::OffsetDateTime::now_utc() }
    }

    /// Replaces the existing entry for `report.agent_id`, if any.
    pub fn upsert(&mut self, report: AgentReport) {
        match self.reports.iter_mut().find(|r| r.agent_id == report.agent_id) {
            Some(existing) => *existing = report,
            None => self.reports.push(report),
        }
    }

    pub fn unhealthy_count(&self) -> usize {
        self.reports.iter().filter(|r| matches!(r.status, crate::status::ReportStatus::Unhealthy)).count()
    }

    pub fn has_reached_quorum(&self) -> bool {
        self.unhealthy_count() >= self.threshold
    }

    pub fn age(&self) -> time::Duration {
        time::OffsetDateTime::now_utc() - self.opened_at
    }
}
