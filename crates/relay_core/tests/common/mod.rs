#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Once;

use relay_core::{
    update, Delivery, Effect, Message, MessageKind, Msg, Orchestrator, SendTask, Step,
    StepOutcome, TaskEvent,
};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(relay_logging::initialize_for_tests);
}

pub fn task(recipients: &[&str], messages: Vec<Message>) -> SendTask {
    SendTask::new(recipients.iter().map(|r| r.to_string()).collect(), messages)
        .expect("valid task")
}

/// Plays the engine's role: fires every scheduled timer in order and answers every
/// executed step through `respond`.
pub struct Driver {
    pub state: Orchestrator,
    pub steps: Vec<Step>,
    pub events: Vec<TaskEvent>,
    pub launches: usize,
    queue: VecDeque<Msg>,
}

impl Driver {
    pub fn new(state: Orchestrator) -> Self {
        Self {
            state,
            steps: Vec::new(),
            events: Vec::new(),
            launches: 0,
            queue: VecDeque::new(),
        }
    }

    pub fn send(&mut self, msg: Msg) -> Vec<Effect> {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        effects
    }

    pub fn run<F>(&mut self, first: Msg, mut respond: F)
    where
        F: FnMut(&Step) -> StepOutcome,
    {
        self.queue.push_back(first);
        let mut guard = 0;
        while let Some(msg) = self.queue.pop_front() {
            guard += 1;
            assert!(guard < 10_000, "state machine did not settle");
            let effects = self.send(msg);
            for effect in effects {
                match effect {
                    Effect::LaunchTarget => self.launches += 1,
                    Effect::Schedule { ticket, .. } => {
                        self.queue.push_back(Msg::TimerFired { ticket })
                    }
                    Effect::Execute { ticket, step } => {
                        let outcome = respond(&step);
                        self.steps.push(step);
                        self.queue.push_back(Msg::StepFinished { ticket, outcome });
                    }
                    Effect::Report(event) => self.events.push(event),
                }
            }
        }
    }

    pub fn deliveries(&self) -> Vec<(String, usize, MessageKind)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                TaskEvent::Delivered(Delivery {
                    recipient,
                    index,
                    kind,
                }) => Some((recipient.clone(), *index, *kind)),
                _ => None,
            })
            .collect()
    }

    pub fn count_steps(&self, name: &str) -> usize {
        self.steps.iter().filter(|s| s.name() == name).count()
    }
}
