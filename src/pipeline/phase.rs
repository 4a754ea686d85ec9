use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Research,
    Serp,
    Content,
    Images,
}

impl Phase {
    /// Execution order.
    pub const ALL: [Phase; 4] = [Phase::Research, Phase::Serp, Phase::Content, Phase::Images];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Research => "research",
            Phase::Serp => "serp",
            Phase::Content => "content",
            Phase::Images => "images",
        }
    }

    /// A failed required phase aborts the whole request.
    pub fn is_required(&self) -> bool {
        matches!(self, Phase::Research | Phase::Content)
    }

    /// Share of overall progress owned by this phase. Spans sum to 100.
    pub fn weight(&self) -> u8 {
        match self {
            Phase::Research => 15,
            Phase::Serp => 20,
            Phase::Content => 50,
            Phase::Images => 15,
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Phase::Research => 0,
            Phase::Serp => 1,
            Phase::Content => 2,
            Phase::Images => 3,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Skipped,
}

impl PhaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseStatus::Pending => "pending",
            PhaseStatus::Processing => "processing",
            PhaseStatus::Completed => "completed",
            PhaseStatus::Failed => "failed",
            PhaseStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseResult {
    pub phase: Phase,
    pub status: PhaseStatus,
    pub progress: u8,
    pub message: Option<String>,
}

impl PhaseResult {
    pub fn pending(phase: Phase) -> Self {
        Self {
            phase,
            status: PhaseStatus::Pending,
            progress: 0,
            message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_cover_full_range() {
        let total: u32 = Phase::ALL.iter().map(|p| u32::from(p.weight())).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn only_research_and_content_are_required() {
        let required: Vec<Phase> = Phase::ALL.into_iter().filter(Phase::is_required).collect();
        assert_eq!(required, vec![Phase::Research, Phase::Content]);
    }

    #[test]
    fn index_matches_execution_order() {
        for (i, phase) in Phase::ALL.iter().enumerate() {
            assert_eq!(phase.index(), i);
        }
    }
}
