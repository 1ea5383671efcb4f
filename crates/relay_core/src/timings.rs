use serde::{Deserialize, Serialize};

/// Delays and retry budgets that pace the send workflow.
///
/// The fixed delays were tuned against the target application; they are waits
/// before a probe, not guarantees. Every probe that finds nothing is retried with
/// exponential backoff until `max_step_attempts` is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub launch_settle_ms: u64,
    pub open_search_ms: u64,
    pub focus_search_ms: u64,
    pub focus_settle_ms: u64,
    pub select_result_ms: u64,
    pub chat_ready_ms: u64,
    pub message_gap_ms: u64,
    pub type_to_send_ms: u64,
    pub first_back_ms: u64,
    pub second_back_ms: u64,
    pub relocate_ms: u64,
    pub retry_base_ms: u64,
    pub retry_max_ms: u64,
    pub max_step_attempts: u32,
    pub wake_settle_ms: u64,
    pub share_poll_ms: u64,
    pub share_settle_ms: u64,
    pub share_max_polls: u32,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            launch_settle_ms: 3000,
            open_search_ms: 1000,
            focus_search_ms: 1500,
            focus_settle_ms: 300,
            select_result_ms: 1500,
            chat_ready_ms: 2000,
            message_gap_ms: 1000,
            type_to_send_ms: 800,
            first_back_ms: 500,
            second_back_ms: 1000,
            relocate_ms: 1000,
            retry_base_ms: 500,
            retry_max_ms: 4000,
            max_step_attempts: 8,
            wake_settle_ms: 250,
            share_poll_ms: 1500,
            share_settle_ms: 300,
            share_max_polls: 10,
        }
    }
}

impl Timings {
    /// Backoff before retry number `attempt` (1-based), doubling up to `retry_max_ms`.
    pub fn retry_delay(&self, attempt: u32) -> u64 {
        let shift = attempt.saturating_sub(1).min(16);
        self.retry_base_ms
            .saturating_mul(1u64 << shift)
            .min(self.retry_max_ms)
    }
}
