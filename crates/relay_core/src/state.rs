use std::collections::BTreeSet;

use crate::view_model::{OrchestratorView, Phase};
use crate::{MediaKind, SendTask, Step, TaskReport, Timings};

/// Identifies one scheduled callback. Only the most recently issued ticket is acted upon.
pub type Ticket = u64;

/// Message indices delivered to the current recipient.
///
/// An index only enters the set after the send control (or the share confirm
/// control) was located and activated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SentSet(BTreeSet<usize>);

impl SentSet {
    pub fn contains(&self, index: usize) -> bool {
        self.0.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    pub(crate) fn mark(&mut self, index: usize) -> bool {
        self.0.insert(index)
    }

    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateStage {
    OpenSearch,
    FocusSearchField,
    TypeQuery,
    SelectResult,
    AwaitChat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStage {
    FocusComposer,
    TypeMessage,
    PressSend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareStage {
    /// Share request submitted, waiting for the platform to accept it.
    Launch,
    Chooser,
    Search,
    SelectRecipient,
    Confirm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackStage {
    ChatScreen,
    SearchScreen,
}

/// Lives only while a media hand-off is in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareContext {
    pub recipient: String,
    pub file_path: String,
    pub kind: MediaKind,
    pub index: usize,
    pub stage: ShareStage,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OrchestratorState {
    #[default]
    Idle,
    OpeningApp,
    LocatingRecipient(LocateStage),
    SendingText { index: usize, stage: TextStage },
    HandingOffMedia(Option<ShareContext>),
    AdvancingRecipient(BackStage),
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wait {
    /// Fixed pacing delay.
    Timer,
    /// Backoff after a failed probe.
    Retry,
    /// Share stage waiting for the next surface change.
    Poll,
    /// Early probe triggered by a surface change; does not consume an attempt.
    Woken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Pending {
    pub(crate) ticket: Ticket,
    pub(crate) step: Step,
    pub(crate) attempts: u32,
    pub(crate) wait: Wait,
    pub(crate) woken: bool,
    pub(crate) in_flight: bool,
}

/// Owns the lifecycle of one send task. Driven exclusively through [`crate::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Orchestrator {
    pub(crate) timings: Timings,
    pub(crate) state: OrchestratorState,
    pub(crate) task: Option<SendTask>,
    pub(crate) cursor: usize,
    pub(crate) sent: SentSet,
    /// Indices given up on for the current recipient.
    pub(crate) attempted: BTreeSet<usize>,
    pub(crate) pending: Option<Pending>,
    pub(crate) next_ticket: Ticket,
    pub(crate) report: TaskReport,
    dirty: bool,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(Timings::default())
    }
}

impl Orchestrator {
    pub fn new(timings: Timings) -> Self {
        Self {
            timings,
            state: OrchestratorState::Idle,
            task: None,
            cursor: 0,
            sent: SentSet::default(),
            attempted: BTreeSet::new(),
            pending: None,
            next_ticket: 1,
            report: TaskReport::default(),
            dirty: false,
        }
    }

    pub fn state(&self) -> &OrchestratorState {
        &self.state
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    /// True while a task is owned, from start until completion or stop.
    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    pub fn share_context(&self) -> Option<&ShareContext> {
        match &self.state {
            OrchestratorState::HandingOffMedia(ctx) => ctx.as_ref(),
            _ => None,
        }
    }

    /// Notifications belong to the hand-off sub-flow while this holds.
    pub fn in_share_mode(&self) -> bool {
        self.share_context().is_some()
    }

    pub fn current_recipient(&self) -> Option<&str> {
        self.task.as_ref()?.recipient(self.cursor)
    }

    pub fn sent(&self) -> &SentSet {
        &self.sent
    }

    /// Ticket of the callback the machine is currently waiting for.
    pub fn expected_ticket(&self) -> Option<Ticket> {
        self.pending.as_ref().map(|p| p.ticket)
    }

    pub fn report(&self) -> &TaskReport {
        &self.report
    }

    pub fn view(&self) -> OrchestratorView {
        let phase = Phase::of(&self.state);
        let recipients = self.task.as_ref().map_or(0, |t| t.recipients().len());
        OrchestratorView {
            phase,
            active: self.is_active(),
            recipient: self.current_recipient().map(ToOwned::to_owned),
            recipient_position: self
                .is_active()
                .then_some((self.cursor + 1, recipients)),
            sent_to_current: self.sent.len(),
            share_mode: self.in_share_mode(),
            delivered_total: self.report.delivered.len(),
            failed_total: self.report.failed.len(),
        }
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn issue_ticket(&mut self) -> Ticket {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        ticket
    }
}
