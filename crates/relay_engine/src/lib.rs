//! Relay engine: host seam, UI locator, harvesting, step execution and the automation service.
mod config;
mod dispatcher;
mod driver;
mod harvest;
mod host;
mod locator;
mod persist;
mod replay;
mod report;
mod service;
mod share;
mod steps;
mod timeline;
mod tree;

pub use config::{AutomationConfig, ConfigError, HarvestSettings, TargetProfile};
pub use dispatcher::{EventDispatcher, EventKind, HostEvent, Route};
pub use driver::run_realtime;
pub use harvest::{HarvestSession, HarvestStage, HarvestStep};
pub use host::{AccessibilityHost, LaunchTarget, NodeAction, ShareRequest, Stroke};
pub use locator::{Locator, Screen, MAX_ANCESTOR_DEPTH};
pub use persist::{
    describe_sync_age, write_atomically, ContactStore, FileContactStore, PersistError,
    StoredContacts,
};
pub use replay::{NodeSpec, RecordedAction, ScreenSpec, Script, ScriptError, ScriptedHost, Transition};
pub use report::{ChannelReportSink, ReportSink, ServiceEvent};
pub use service::{AutomationService, StartError};
pub use steps::StepExecutor;
pub use timeline::{Timeline, TimerId};
pub use tree::{NodeHandle, NodeId, Rect, UiNode, UiTree};
