use std::path::Path;

use crate::{NodeHandle, UiTree};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeAction {
    Click,
    Focus,
    /// Replace the node's whole text content.
    SetText(String),
}

/// Single-stroke swipe gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stroke {
    pub from: (i32, i32),
    pub to: (i32, i32),
    pub duration_ms: u64,
}

/// Foreground launch of the target application's entry component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchTarget {
    pub package: String,
    pub component: String,
    pub clear_top: bool,
}

/// Inter-app share of one file, scoped to the target application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareRequest {
    pub target_package: String,
    pub path: String,
    pub mime_type: String,
}

/// The host platform's introspection and input-synthesis capability.
///
/// Every method degrades instead of failing: an absent window is `None`, a refused
/// dispatch is `false`. The return value of a dispatch only acknowledges submission,
/// not that the action had its intended effect.
pub trait AccessibilityHost {
    /// Fresh snapshot of the active window, if any.
    fn active_window(&self) -> Option<UiTree>;

    fn perform(&self, node: NodeHandle, action: &NodeAction) -> bool;

    fn dispatch_gesture(&self, stroke: &Stroke) -> bool;

    fn navigate_back(&self) -> bool;

    /// Fire-and-forget; success is inferred later from window notifications.
    fn launch(&self, target: &LaunchTarget);

    fn share(&self, request: &ShareRequest) -> bool;

    fn file_exists(&self, path: &Path) -> bool {
        path.exists()
    }
}
