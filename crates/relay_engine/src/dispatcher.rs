use crate::TargetProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    WindowStateChanged,
    WindowContentChanged,
    Other,
}

/// Asynchronous notification from the host platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEvent {
    pub kind: EventKind,
    pub package: String,
    pub class_name: Option<String>,
}

impl HostEvent {
    pub fn new(kind: EventKind, package: impl Into<String>) -> Self {
        Self {
            kind,
            package: package.into(),
            class_name: None,
        }
    }

    pub fn window_changed(package: impl Into<String>) -> Self {
        Self::new(EventKind::WindowStateChanged, package)
    }

    pub fn content_changed(package: impl Into<String>) -> Self {
        Self::new(EventKind::WindowContentChanged, package)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Nothing is running, or the event carries no surface change.
    Ignore,
    Orchestrator,
    /// The media hand-off owns notifications while share mode is on.
    HandOff,
    /// Another application surfaced.
    Foreign,
}

/// Single entry point for host notifications.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    target_package: String,
    chooser_packages: Vec<String>,
}

impl EventDispatcher {
    pub fn new(profile: &TargetProfile) -> Self {
        Self {
            target_package: profile.package.clone(),
            chooser_packages: profile.chooser_packages.clone(),
        }
    }

    pub fn route(&self, event: &HostEvent, running: bool, share_mode: bool) -> Route {
        if !running || event.kind == EventKind::Other {
            return Route::Ignore;
        }
        let from_target = event.package == self.target_package;
        if share_mode {
            if from_target || self.chooser_packages.iter().any(|p| *p == event.package) {
                return Route::HandOff;
            }
        } else if from_target {
            return Route::Orchestrator;
        }
        Route::Foreign
    }
}
