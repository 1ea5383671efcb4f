use crate::{MediaKind, TaskEvent, Ticket};

/// One atomic UI operation, executed against a fresh tree snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Target application is in the foreground.
    AwaitTargetForeground,
    OpenSearch,
    FocusSearchField,
    TypeSearchQuery { query: String },
    SelectSearchResult { name: String },
    /// Chat composer is present and the search surface for `name` is gone.
    AwaitChatComposer { name: String },
    FocusComposer,
    TypeMessage { text: String },
    PressSend,
    StartShare { path: String, kind: MediaKind },
    PickShareTarget,
    EnterShareRecipient { name: String },
    SelectShareRecipient { name: String },
    ConfirmShare,
    NavigateBack,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::AwaitTargetForeground => "await_target_foreground",
            Step::OpenSearch => "open_search",
            Step::FocusSearchField => "focus_search_field",
            Step::TypeSearchQuery { .. } => "type_search_query",
            Step::SelectSearchResult { .. } => "select_search_result",
            Step::AwaitChatComposer { .. } => "await_chat_composer",
            Step::FocusComposer => "focus_composer",
            Step::TypeMessage { .. } => "type_message",
            Step::PressSend => "press_send",
            Step::StartShare { .. } => "start_share",
            Step::PickShareTarget => "pick_share_target",
            Step::EnterShareRecipient { .. } => "enter_share_recipient",
            Step::SelectShareRecipient { .. } => "select_share_recipient",
            Step::ConfirmShare => "confirm_share",
            Step::NavigateBack => "navigate_back",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Bring the target application to the foreground (clear-top).
    LaunchTarget,
    /// Fire `Msg::TimerFired { ticket }` after `delay_ms`.
    Schedule { ticket: Ticket, delay_ms: u64 },
    /// Run `step` now and answer with `Msg::StepFinished { ticket, .. }`.
    Execute { ticket: Ticket, step: Step },
    Report(TaskEvent),
}
