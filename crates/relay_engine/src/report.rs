use relay_core::{OrchestratorView, TaskEvent};

/// In-process notifications for the hosting UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    HarvestCompleted { contacts: Vec<String> },
    Task(TaskEvent),
    Status(OrchestratorView),
}

pub trait ReportSink: Send + Sync {
    fn emit(&self, event: ServiceEvent);
}

pub struct ChannelReportSink {
    tx: std::sync::mpsc::Sender<ServiceEvent>,
}

impl ChannelReportSink {
    pub fn new(tx: std::sync::mpsc::Sender<ServiceEvent>) -> Self {
        Self { tx }
    }

    /// Sink plus the receiving end, for callers that own neither yet.
    pub fn channel() -> (Self, std::sync::mpsc::Receiver<ServiceEvent>) {
        let (tx, rx) = std::sync::mpsc::channel();
        (Self::new(tx), rx)
    }
}

impl ReportSink for ChannelReportSink {
    fn emit(&self, event: ServiceEvent) {
        let _ = self.tx.send(event);
    }
}
