use crate::state::{Pending, Wait};
use crate::{
    BackStage, Delivery, Effect, Failure, FailureReason, LocateStage, Msg, Orchestrator,
    OrchestratorState, SendTask, ShareContext, ShareStage, Step, StepOutcome, TaskEvent,
    TaskReport, TextStage,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: Orchestrator, msg: Msg) -> (Orchestrator, Vec<Effect>) {
    let effects = match msg {
        Msg::StartTask(task) => state.start(task),
        Msg::StopRequested => state.stop(),
        Msg::TimerFired { ticket } => state.on_timer(ticket),
        Msg::StepFinished { ticket, outcome } => {
            let pending = match state.pending.take() {
                Some(p) if p.ticket == ticket && p.in_flight => p,
                other => {
                    // Stale or duplicate answer; the machine has moved on.
                    state.pending = other;
                    return (state, Vec::new());
                }
            };
            state.mark_dirty();
            state.on_step_finished(pending, outcome)
        }
        Msg::SurfaceChanged => state.on_surface_changed(),
    };

    (state, effects)
}

fn is_share_step(step: &Step) -> bool {
    matches!(
        step,
        Step::PickShareTarget
            | Step::EnterShareRecipient { .. }
            | Step::SelectShareRecipient { .. }
            | Step::ConfirmShare
    )
}

impl Orchestrator {
    fn start(&mut self, task: SendTask) -> Vec<Effect> {
        if self.is_active() {
            return Vec::new();
        }
        let recipients = task.recipients().len();
        let messages = task.messages().len();
        self.report = TaskReport {
            recipients,
            messages,
            ..TaskReport::default()
        };
        self.task = Some(task);
        self.cursor = 0;
        self.sent.clear();
        self.attempted.clear();
        self.state = OrchestratorState::OpeningApp;
        self.mark_dirty();

        let mut effects = vec![
            Effect::Report(TaskEvent::Started {
                recipients,
                messages,
            }),
            Effect::LaunchTarget,
        ];
        let delay = self.timings.launch_settle_ms;
        effects.extend(self.arm(Step::AwaitTargetForeground, delay));
        effects
    }

    fn stop(&mut self) -> Vec<Effect> {
        match self.state {
            OrchestratorState::Idle => Vec::new(),
            OrchestratorState::Completed => {
                self.state = OrchestratorState::Idle;
                self.mark_dirty();
                Vec::new()
            }
            _ => {
                let report = self.release(OrchestratorState::Idle);
                vec![Effect::Report(TaskEvent::Stopped(report))]
            }
        }
    }

    /// Drops the task and every outstanding callback, returning the report so far.
    fn release(&mut self, next: OrchestratorState) -> TaskReport {
        self.task = None;
        self.cursor = 0;
        self.sent.clear();
        self.attempted.clear();
        self.pending = None;
        self.state = next;
        self.mark_dirty();
        std::mem::take(&mut self.report)
    }

    fn arm(&mut self, step: Step, delay_ms: u64) -> Vec<Effect> {
        self.arm_with(step, delay_ms, Wait::Timer, 0, false)
    }

    fn arm_with(
        &mut self,
        step: Step,
        delay_ms: u64,
        wait: Wait,
        attempts: u32,
        woken: bool,
    ) -> Vec<Effect> {
        let ticket = self.issue_ticket();
        self.pending = Some(Pending {
            ticket,
            step,
            attempts,
            wait,
            woken,
            in_flight: false,
        });
        vec![Effect::Schedule { ticket, delay_ms }]
    }

    fn on_timer(&mut self, ticket: crate::Ticket) -> Vec<Effect> {
        match self.pending.as_mut() {
            Some(p) if p.ticket == ticket && !p.in_flight => {
                p.in_flight = true;
                vec![Effect::Execute {
                    ticket,
                    step: p.step.clone(),
                }]
            }
            _ => Vec::new(),
        }
    }

    fn on_surface_changed(&mut self) -> Vec<Effect> {
        let Some(p) = self.pending.as_ref() else {
            return Vec::new();
        };
        if p.in_flight || p.woken {
            return Vec::new();
        }
        let delay = match p.wait {
            Wait::Poll => self.timings.share_settle_ms,
            Wait::Retry => self.timings.wake_settle_ms,
            Wait::Timer | Wait::Woken => return Vec::new(),
        };
        let (step, attempts) = (p.step.clone(), p.attempts);
        self.arm_with(step, delay, Wait::Woken, attempts, true)
    }

    fn on_step_finished(&mut self, pending: Pending, outcome: StepOutcome) -> Vec<Effect> {
        // Back presses are fire-and-forget: the next surface is verified by the next probe.
        if pending.step == Step::NavigateBack {
            return self.advance(StepOutcome::Done);
        }
        match outcome {
            StepOutcome::Done | StepOutcome::Skipped => self.advance(outcome),
            StepOutcome::FileMissing => self.media_missing(),
            StepOutcome::Absent | StepOutcome::Rejected => self.retry(pending),
        }
    }

    fn advance(&mut self, outcome: StepOutcome) -> Vec<Effect> {
        let Some(recipient) = self.current_recipient().map(ToOwned::to_owned) else {
            return Vec::new();
        };
        let t = self.timings.clone();

        match self.state.clone() {
            OrchestratorState::OpeningApp => self.begin_recipient(t.open_search_ms),
            OrchestratorState::LocatingRecipient(stage) => {
                let (next, step, delay) = match stage {
                    LocateStage::OpenSearch => (
                        LocateStage::FocusSearchField,
                        Step::FocusSearchField,
                        t.focus_search_ms,
                    ),
                    LocateStage::FocusSearchField => (
                        LocateStage::TypeQuery,
                        Step::TypeSearchQuery { query: recipient },
                        t.focus_settle_ms,
                    ),
                    LocateStage::TypeQuery => (
                        LocateStage::SelectResult,
                        Step::SelectSearchResult { name: recipient },
                        t.select_result_ms,
                    ),
                    LocateStage::SelectResult => (
                        LocateStage::AwaitChat,
                        Step::AwaitChatComposer { name: recipient },
                        t.chat_ready_ms,
                    ),
                    LocateStage::AwaitChat => return self.next_text(),
                };
                self.state = OrchestratorState::LocatingRecipient(next);
                self.arm(step, delay)
            }
            OrchestratorState::SendingText { index, stage } => match stage {
                TextStage::FocusComposer => {
                    let text = match self.task.as_ref().and_then(|task| task.message(index)) {
                        Some(crate::Message::Text(text)) => text.clone(),
                        _ => return self.next_text(),
                    };
                    self.state = OrchestratorState::SendingText {
                        index,
                        stage: TextStage::TypeMessage,
                    };
                    self.arm(Step::TypeMessage { text }, t.focus_settle_ms)
                }
                TextStage::TypeMessage => {
                    self.state = OrchestratorState::SendingText {
                        index,
                        stage: TextStage::PressSend,
                    };
                    self.arm(Step::PressSend, t.type_to_send_ms)
                }
                TextStage::PressSend => {
                    let mut effects = self.deliver(index);
                    effects.extend(self.next_text());
                    effects
                }
            },
            OrchestratorState::HandingOffMedia(Some(mut ctx)) => {
                let (next, step, wait, delay) = match (ctx.stage, outcome) {
                    (ShareStage::Launch, _) => (
                        ShareStage::Chooser,
                        Step::PickShareTarget,
                        Wait::Poll,
                        t.share_poll_ms,
                    ),
                    // No chooser on screen: the share went straight to the target app.
                    (ShareStage::Chooser, StepOutcome::Skipped) => (
                        ShareStage::Search,
                        Step::EnterShareRecipient {
                            name: ctx.recipient.clone(),
                        },
                        Wait::Timer,
                        t.share_settle_ms,
                    ),
                    (ShareStage::Chooser, _) => (
                        ShareStage::Search,
                        Step::EnterShareRecipient {
                            name: ctx.recipient.clone(),
                        },
                        Wait::Poll,
                        t.share_poll_ms,
                    ),
                    (ShareStage::Search, _) => (
                        ShareStage::SelectRecipient,
                        Step::SelectShareRecipient {
                            name: ctx.recipient.clone(),
                        },
                        Wait::Poll,
                        t.share_poll_ms,
                    ),
                    (ShareStage::SelectRecipient, _) => (
                        ShareStage::Confirm,
                        Step::ConfirmShare,
                        Wait::Poll,
                        t.share_poll_ms,
                    ),
                    (ShareStage::Confirm, _) => {
                        let mut effects = self.deliver(ctx.index);
                        self.state = OrchestratorState::HandingOffMedia(None);
                        effects.extend(self.next_media());
                        return effects;
                    }
                };
                ctx.stage = next;
                self.state = OrchestratorState::HandingOffMedia(Some(ctx));
                self.arm_with(step, delay, wait, 0, false)
            }
            OrchestratorState::AdvancingRecipient(BackStage::ChatScreen) => {
                self.state = OrchestratorState::AdvancingRecipient(BackStage::SearchScreen);
                self.arm(Step::NavigateBack, t.second_back_ms)
            }
            OrchestratorState::AdvancingRecipient(BackStage::SearchScreen) => {
                self.next_recipient()
            }
            OrchestratorState::HandingOffMedia(None)
            | OrchestratorState::Idle
            | OrchestratorState::Completed => Vec::new(),
        }
    }

    fn retry(&mut self, pending: Pending) -> Vec<Effect> {
        let counted = pending.wait != Wait::Woken;
        let attempts = pending.attempts + u32::from(counted);
        let share = is_share_step(&pending.step);
        let budget = if share {
            self.timings.share_max_polls
        } else {
            self.timings.max_step_attempts
        };

        if attempts >= budget {
            return self.exhausted(pending.step);
        }
        // A new wait starts after every counted attempt; a failed early probe keeps its wait.
        let woken = !counted;
        if share {
            let delay = self.timings.share_poll_ms;
            self.arm_with(pending.step, delay, Wait::Poll, attempts, woken)
        } else {
            let delay = self.timings.retry_delay(attempts.max(1));
            self.arm_with(pending.step, delay, Wait::Retry, attempts, woken)
        }
    }

    fn exhausted(&mut self, step: Step) -> Vec<Effect> {
        match self.state.clone() {
            OrchestratorState::OpeningApp => {
                let mut effects = self.fail_remaining(FailureReason::TargetUnavailable);
                effects.extend(self.finish());
                effects
            }
            OrchestratorState::HandingOffMedia(Some(ctx)) => {
                let reason = if ctx.stage == ShareStage::Launch {
                    FailureReason::StepExhausted { step: step.name() }
                } else {
                    FailureReason::HandOffStalled
                };
                let mut effects = self.fail(ctx.index, reason);
                self.state = OrchestratorState::HandingOffMedia(None);
                effects.extend(self.next_media());
                effects
            }
            OrchestratorState::LocatingRecipient(_) | OrchestratorState::SendingText { .. } => {
                let mut effects = self.abandon_recipient(FailureReason::StepExhausted {
                    step: step.name(),
                });
                effects.extend(self.begin_advancing());
                effects
            }
            _ => Vec::new(),
        }
    }

    fn media_missing(&mut self) -> Vec<Effect> {
        let Some(index) = self.share_context().map(|ctx| ctx.index) else {
            return Vec::new();
        };
        let mut effects = self.fail(index, FailureReason::ResourceMissing);
        self.state = OrchestratorState::HandingOffMedia(None);
        effects.extend(self.next_media());
        effects
    }

    fn begin_recipient(&mut self, delay_ms: u64) -> Vec<Effect> {
        let Some(recipient) = self.current_recipient().map(ToOwned::to_owned) else {
            return self.finish();
        };
        self.sent.clear();
        self.attempted.clear();
        self.state = OrchestratorState::LocatingRecipient(LocateStage::OpenSearch);
        let mut effects = vec![Effect::Report(TaskEvent::RecipientStarted {
            recipient,
            position: self.cursor,
        })];
        effects.extend(self.arm(Step::OpenSearch, delay_ms));
        effects
    }

    fn is_open(&self, index: usize) -> bool {
        !self.sent.contains(index) && !self.attempted.contains(&index)
    }

    fn next_text(&mut self) -> Vec<Effect> {
        let next = self.task.as_ref().and_then(|task| {
            task.messages()
                .iter()
                .enumerate()
                .find(|(i, m)| m.is_text() && self.is_open(*i))
                .map(|(i, _)| i)
        });
        match next {
            Some(index) => {
                self.state = OrchestratorState::SendingText {
                    index,
                    stage: TextStage::FocusComposer,
                };
                let delay = self.timings.message_gap_ms;
                self.arm(Step::FocusComposer, delay)
            }
            None => self.next_media(),
        }
    }

    fn next_media(&mut self) -> Vec<Effect> {
        let Some(recipient) = self.current_recipient().map(ToOwned::to_owned) else {
            return Vec::new();
        };
        let next = self.task.as_ref().and_then(|task| {
            task.messages().iter().enumerate().find_map(|(i, m)| {
                let (kind, path) = m.media()?;
                self.is_open(i).then(|| (i, kind, path.to_owned()))
            })
        });
        match next {
            Some((index, kind, path)) => {
                self.state = OrchestratorState::HandingOffMedia(Some(ShareContext {
                    recipient,
                    file_path: path.clone(),
                    kind,
                    index,
                    stage: ShareStage::Launch,
                }));
                let delay = self.timings.message_gap_ms;
                self.arm(Step::StartShare { path, kind }, delay)
            }
            None => self.begin_advancing(),
        }
    }

    fn begin_advancing(&mut self) -> Vec<Effect> {
        self.state = OrchestratorState::AdvancingRecipient(BackStage::ChatScreen);
        let delay = self.timings.first_back_ms;
        self.arm(Step::NavigateBack, delay)
    }

    fn next_recipient(&mut self) -> Vec<Effect> {
        self.cursor += 1;
        self.sent.clear();
        self.attempted.clear();
        let total = self.task.as_ref().map_or(0, |task| task.recipients().len());
        if self.cursor >= total {
            self.finish()
        } else {
            let delay = self.timings.relocate_ms;
            self.begin_recipient(delay)
        }
    }

    fn finish(&mut self) -> Vec<Effect> {
        let report = self.release(OrchestratorState::Completed);
        vec![Effect::Report(TaskEvent::Finished(report))]
    }

    fn deliver(&mut self, index: usize) -> Vec<Effect> {
        let Some(kind) = self
            .task
            .as_ref()
            .and_then(|task| task.message(index))
            .map(|m| m.kind())
        else {
            return Vec::new();
        };
        let Some(recipient) = self.current_recipient().map(ToOwned::to_owned) else {
            return Vec::new();
        };
        if !self.sent.mark(index) {
            return Vec::new();
        }
        let delivery = Delivery {
            recipient,
            index,
            kind,
        };
        self.report.delivered.push(delivery.clone());
        vec![Effect::Report(TaskEvent::Delivered(delivery))]
    }

    fn fail(&mut self, index: usize, reason: FailureReason) -> Vec<Effect> {
        let Some(recipient) = self.current_recipient().map(ToOwned::to_owned) else {
            return Vec::new();
        };
        if !self.attempted.insert(index) {
            return Vec::new();
        }
        let failure = Failure {
            recipient,
            index,
            reason,
        };
        self.report.failed.push(failure.clone());
        vec![Effect::Report(TaskEvent::Skipped(failure))]
    }

    /// Gives up on every open index of the current recipient.
    fn abandon_recipient(&mut self, reason: FailureReason) -> Vec<Effect> {
        let count = self.task.as_ref().map_or(0, |task| task.messages().len());
        let open: Vec<usize> = (0..count).filter(|i| self.is_open(*i)).collect();
        open.into_iter()
            .flat_map(|index| self.fail(index, reason.clone()))
            .collect()
    }

    /// Gives up on the current and every later recipient.
    fn fail_remaining(&mut self, reason: FailureReason) -> Vec<Effect> {
        let total = self.task.as_ref().map_or(0, |task| task.recipients().len());
        let mut effects = Vec::new();
        while self.cursor < total {
            effects.extend(self.abandon_recipient(reason.clone()));
            self.cursor += 1;
            self.sent.clear();
            self.attempted.clear();
        }
        effects
    }
}
