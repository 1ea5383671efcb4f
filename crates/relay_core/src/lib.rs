//! Relay core: pure send-task state machine, harvest accumulation and report model.
mod effect;
mod harvest;
mod msg;
mod report;
mod state;
mod task;
mod timings;
mod update;
mod view_model;

pub use effect::{Effect, Step};
pub use harvest::{contact_order, sort_contacts, HarvestAccumulator};
pub use msg::{Msg, StepOutcome};
pub use report::{Delivery, Failure, FailureReason, TaskEvent, TaskReport};
pub use state::{
    BackStage, LocateStage, Orchestrator, OrchestratorState, SentSet, ShareContext, ShareStage,
    TextStage, Ticket,
};
pub use task::{MediaKind, Message, MessageKind, SendTask, TaskError};
pub use timings::Timings;
pub use update::update;
pub use view_model::{OrchestratorView, Phase};
