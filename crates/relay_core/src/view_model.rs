use crate::OrchestratorState;

/// Flat phase name, for display and control gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    OpeningApp,
    LocatingRecipient,
    SendingText,
    HandingOffMedia,
    AdvancingRecipient,
    Completed,
}

impl Phase {
    pub fn of(state: &OrchestratorState) -> Self {
        match state {
            OrchestratorState::Idle => Phase::Idle,
            OrchestratorState::OpeningApp => Phase::OpeningApp,
            OrchestratorState::LocatingRecipient(_) => Phase::LocatingRecipient,
            OrchestratorState::SendingText { .. } => Phase::SendingText,
            OrchestratorState::HandingOffMedia(_) => Phase::HandingOffMedia,
            OrchestratorState::AdvancingRecipient(_) => Phase::AdvancingRecipient,
            OrchestratorState::Completed => Phase::Completed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrchestratorView {
    pub phase: Phase,
    pub active: bool,
    pub recipient: Option<String>,
    /// 1-based position and total.
    pub recipient_position: Option<(usize, usize)>,
    pub sent_to_current: usize,
    pub share_mode: bool,
    pub delivered_total: usize,
    pub failed_total: usize,
}
