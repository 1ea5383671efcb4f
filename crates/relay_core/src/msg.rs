use crate::{SendTask, Ticket};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step found its target and the platform accepted the action.
    Done,
    /// Nothing to do on this surface; continue with the following stage.
    Skipped,
    /// The target node is not (yet) on screen.
    Absent,
    /// The platform refused the dispatch.
    Rejected,
    /// The media file referenced by the step does not exist.
    FileMissing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Caller submitted a validated task.
    StartTask(SendTask),
    /// Caller asked to stop; idempotent.
    StopRequested,
    /// A timer scheduled through `Effect::Schedule` elapsed.
    TimerFired { ticket: Ticket },
    /// Result of an `Effect::Execute`.
    StepFinished { ticket: Ticket, outcome: StepOutcome },
    /// The observed UI tree or window changed.
    SurfaceChanged,
}
