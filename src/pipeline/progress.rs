use serde::Serialize;
use uuid::Uuid;

use super::phase::{Phase, PhaseResult, PhaseStatus};

/// Emitted whenever a phase changes status or progress.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub request_id: Uuid,
    pub phase: Phase,
    pub status: PhaseStatus,
    pub phase_progress: u8,
    pub overall: u8,
}

/// Per-phase progress plus the weighted overall value.
///
/// Phase progress only moves forward, so `overall` is non-decreasing. A
/// phase that resolves as failed-but-optional or skipped counts as done
/// for the overall value; a failed required phase keeps whatever it had.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    phases: [PhaseResult; 4],
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            phases: Phase::ALL.map(PhaseResult::pending),
        }
    }

    pub fn get(&self, phase: Phase) -> &PhaseResult {
        &self.phases[phase.index()]
    }

    pub fn phases(&self) -> Vec<PhaseResult> {
        self.phases.to_vec()
    }

    pub fn start(&mut self, phase: Phase) {
        let entry = &mut self.phases[phase.index()];
        entry.status = PhaseStatus::Processing;
    }

    pub fn advance(&mut self, phase: Phase, progress: u8) {
        let entry = &mut self.phases[phase.index()];
        entry.progress = entry.progress.max(progress.min(100));
    }

    pub fn complete(&mut self, phase: Phase) {
        let entry = &mut self.phases[phase.index()];
        entry.status = PhaseStatus::Completed;
        entry.progress = 100;
    }

    pub fn skip(&mut self, phase: Phase, reason: impl Into<String>) {
        let entry = &mut self.phases[phase.index()];
        entry.status = PhaseStatus::Skipped;
        entry.progress = 100;
        entry.message = Some(reason.into());
    }

    pub fn fail(&mut self, phase: Phase, message: impl Into<String>) {
        let entry = &mut self.phases[phase.index()];
        entry.status = PhaseStatus::Failed;
        entry.message = Some(message.into());
        if !phase.is_required() {
            entry.progress = 100;
        }
    }

    /// Weighted sum of phase progress. Each phase contributes
    /// `weight * progress / 100` rounded down, so the total reaches 100 only
    /// when every phase sits at 100.
    pub fn overall(&self) -> u8 {
        let total: u32 = self
            .phases
            .iter()
            .map(|p| u32::from(p.phase.weight()) * u32::from(p.progress) / 100)
            .sum();
        total.min(100) as u8
    }

    pub fn event(&self, request_id: Uuid, phase: Phase) -> ProgressEvent {
        let entry = self.get(phase);
        ProgressEvent {
            request_id,
            phase,
            status: entry.status,
            phase_progress: entry.progress,
            overall: self.overall(),
        }
    }
}
