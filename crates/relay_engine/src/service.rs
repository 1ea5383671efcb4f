use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use relay_core::{
    update, Effect, FailureReason, Message, Msg, Orchestrator, OrchestratorView, SendTask,
    TaskError, TaskEvent, Ticket,
};
use relay_logging::{relay_debug, relay_error, relay_info, relay_warn, set_timeline_ms};
use thiserror::Error;

use crate::{
    AccessibilityHost, AutomationConfig, ContactStore, EventDispatcher, HarvestSession,
    HarvestStep, HostEvent, Locator, PersistError, ReportSink, Route, ServiceEvent,
    StepExecutor, StoredContacts, Timeline,
};

#[derive(Debug, Error)]
pub enum StartError {
    #[error("invalid task: {0}")]
    Invalid(#[from] TaskError),
    #[error("automation session busy: {0}")]
    Busy(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wakeup {
    Orchestrator(Ticket),
    Harvest(u64),
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Owns the one automation session: a send task or a contact sync, never both.
///
/// All work runs on the service's [`Timeline`]. Callers move the clock with
/// [`AutomationService::advance_to`] and feed host notifications through
/// [`AutomationService::handle_event`]; [`crate::run_realtime`] does both against
/// wall time.
pub struct AutomationService<H: AccessibilityHost> {
    host: H,
    config: AutomationConfig,
    dispatcher: EventDispatcher,
    timeline: Timeline<Wakeup>,
    orchestrator: Orchestrator,
    harvest: Option<HarvestSession>,
    harvest_generation: u64,
    store: Option<Box<dyn ContactStore>>,
    sink: Box<dyn ReportSink>,
    clock: Clock,
}

impl<H: AccessibilityHost> AutomationService<H> {
    pub fn new(host: H, config: AutomationConfig, sink: Box<dyn ReportSink>) -> Self {
        Self {
            dispatcher: EventDispatcher::new(&config.target),
            orchestrator: Orchestrator::new(config.timings.clone()),
            host,
            config,
            timeline: Timeline::new(),
            harvest: None,
            harvest_generation: 0,
            store: None,
            sink,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_store(mut self, store: impl ContactStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Overrides the wall clock used for sync timestamps.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> &AutomationConfig {
        &self.config
    }

    /// Instance-presence check used to gate controls.
    pub fn is_active(&self) -> bool {
        self.orchestrator.is_active() || self.harvest.is_some()
    }

    pub fn view(&self) -> OrchestratorView {
        self.orchestrator.view()
    }

    pub fn start_send_task(&mut self, task: SendTask) -> Result<(), StartError> {
        self.ensure_idle()?;
        relay_info!(
            "send task: {} recipients x {} messages",
            task.recipients().len(),
            task.messages().len()
        );
        self.apply(Msg::StartTask(task));
        Ok(())
    }

    /// Validates and starts a task from its parts.
    pub fn submit(&mut self, recipients: Vec<String>, messages: Vec<Message>) -> Result<(), StartError> {
        let task = SendTask::new(recipients, messages)?;
        self.start_send_task(task)
    }

    /// Stops whatever is running. Calling it when idle does nothing.
    pub fn stop_task(&mut self) {
        self.apply(Msg::StopRequested);
        if self.harvest.take().is_some() {
            relay_info!("contact sync stopped");
            self.harvest_generation += 1;
            self.timeline.retain(|w| !matches!(w, Wakeup::Harvest(_)));
        }
    }

    pub fn sync_contacts(&mut self) -> Result<(), StartError> {
        self.ensure_idle()?;
        let mut session = HarvestSession::new(self.config.harvest.clone());
        let delay = session.begin(&self.host, &self.config.target);
        self.harvest_generation += 1;
        self.timeline
            .schedule(delay, Wakeup::Harvest(self.harvest_generation));
        self.harvest = Some(session);
        Ok(())
    }

    /// Last persisted harvest, or nothing when no store is attached.
    pub fn stored_contacts(&self) -> Result<StoredContacts, PersistError> {
        match &self.store {
            Some(store) => store.load(),
            None => Ok(StoredContacts::default()),
        }
    }

    pub fn handle_event(&mut self, event: &HostEvent) {
        let route = self.dispatcher.route(
            event,
            self.orchestrator.is_active(),
            self.orchestrator.in_share_mode(),
        );
        match route {
            Route::Orchestrator | Route::HandOff => self.apply(Msg::SurfaceChanged),
            Route::Foreign => relay_debug!("foreign surface {} ({:?})", event.package, event.kind),
            Route::Ignore => {}
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.timeline.now_ms()
    }

    pub fn next_deadline(&mut self) -> Option<u64> {
        self.timeline.next_due()
    }

    /// Fires every timer due up to `ms`, in order, then leaves the clock at `ms`.
    pub fn advance_to(&mut self, ms: u64) {
        while let Some(wakeup) = self.timeline.pop_due(ms) {
            set_timeline_ms(self.timeline.now_ms());
            match wakeup {
                Wakeup::Orchestrator(ticket) => self.apply(Msg::TimerFired { ticket }),
                Wakeup::Harvest(generation) => self.on_harvest_tick(generation),
            }
        }
        self.timeline.advance_to(ms);
        set_timeline_ms(self.timeline.now_ms());
    }

    /// Fires timers until the session goes idle or the next one lies past `limit_ms`.
    /// Returns true when idle.
    pub fn run_until_idle(&mut self, limit_ms: u64) -> bool {
        while self.is_active() {
            match self.next_deadline() {
                Some(due) if due <= limit_ms => self.advance_to(due),
                _ => return false,
            }
        }
        true
    }

    fn ensure_idle(&self) -> Result<(), StartError> {
        if self.orchestrator.is_active() {
            return Err(StartError::Busy("a send task is running"));
        }
        if self.harvest.is_some() {
            return Err(StartError::Busy("a contact sync is running"));
        }
        Ok(())
    }

    fn apply(&mut self, msg: Msg) {
        let mut queue = VecDeque::from([msg]);
        while let Some(msg) = queue.pop_front() {
            let orchestrator = std::mem::take(&mut self.orchestrator);
            let (orchestrator, effects) = update(orchestrator, msg);
            self.orchestrator = orchestrator;

            for effect in effects {
                match effect {
                    Effect::LaunchTarget => self.host.launch(&self.config.target.launch_target()),
                    Effect::Schedule { ticket, delay_ms } => {
                        self.timeline
                            .schedule(delay_ms, Wakeup::Orchestrator(ticket));
                    }
                    Effect::Execute { ticket, step } => {
                        let outcome = StepExecutor::new(&self.host, &self.config.target).execute(&step);
                        queue.push_back(Msg::StepFinished { ticket, outcome });
                    }
                    Effect::Report(event) => {
                        log_task_event(&event);
                        self.sink.emit(ServiceEvent::Task(event));
                    }
                }
            }

            if self.orchestrator.consume_dirty() {
                self.sink.emit(ServiceEvent::Status(self.orchestrator.view()));
            }
        }
        if !self.orchestrator.is_active() {
            self.timeline
                .retain(|w| !matches!(w, Wakeup::Orchestrator(_)));
        }
    }

    fn on_harvest_tick(&mut self, generation: u64) {
        if generation != self.harvest_generation {
            return;
        }
        let Some(mut session) = self.harvest.take() else {
            return;
        };
        let locator = Locator::new(&self.host);
        match session.step(&locator, &self.config.target) {
            HarvestStep::Continue { delay_ms } => {
                self.timeline.schedule(delay_ms, Wakeup::Harvest(generation));
                self.harvest = Some(session);
            }
            HarvestStep::Finished(contacts) => self.finish_harvest(contacts),
        }
    }

    fn finish_harvest(&mut self, contacts: Vec<String>) {
        relay_info!("contact sync finished: {} contacts", contacts.len());
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&contacts, (self.clock)()) {
                relay_error!("failed to persist contacts: {e}");
            }
        }
        self.sink.emit(ServiceEvent::HarvestCompleted { contacts });
    }
}

fn log_task_event(event: &TaskEvent) {
    match event {
        TaskEvent::RecipientStarted {
            recipient,
            position,
        } => relay_info!("recipient {} ({recipient})", position + 1),
        TaskEvent::Delivered(d) => relay_info!("delivered #{} to {}", d.index, d.recipient),
        TaskEvent::Skipped(f) => match f.reason {
            FailureReason::ResourceMissing => {
                relay_warn!("skipped #{} for {}: {}", f.index, f.recipient, f.reason)
            }
            _ => relay_error!("gave up on #{} for {}: {}", f.index, f.recipient, f.reason),
        },
        TaskEvent::Finished(report) => relay_info!(
            "task finished: {} delivered, {} failed",
            report.delivered.len(),
            report.failed.len()
        ),
        TaskEvent::Stopped(report) => {
            relay_info!("task stopped after {} deliveries", report.delivered.len())
        }
        TaskEvent::Started { .. } => {}
    }
}
