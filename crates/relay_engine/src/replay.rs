//! Scripted stand-in for the host platform.
//!
//! A [`Script`] describes a small graph of screens. Clicking a node, swiping,
//! navigating back, launching and sharing move between screens the way the
//! script says, and every move queues the notification a real platform would
//! deliver. The host records each dispatched action so a run can be inspected
//! afterwards.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use relay_logging::relay_debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    AccessibilityHost, AutomationService, HostEvent, LaunchTarget, NodeAction, NodeHandle, Rect,
    ShareRequest, Stroke, UiNode, UiTree,
};

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read script {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse script: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("script references unknown screen {0:?}")]
    UnknownScreen(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Goto(String),
    /// Back to the screen that was showing when the share started.
    ReturnFromShare,
}

fn default_class() -> String {
    "android.view.View".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    #[serde(default = "default_class")]
    pub class: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub clickable: bool,
    #[serde(default)]
    pub editable: bool,
    #[serde(default)]
    pub bounds: Rect,
    #[serde(default)]
    pub on_click: Option<Transition>,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

impl Default for NodeSpec {
    fn default() -> Self {
        Self::new(default_class())
    }
}

impl NodeSpec {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            id: None,
            text: None,
            desc: None,
            clickable: false,
            editable: false,
            bounds: Rect::default(),
            on_click: None,
            children: Vec::new(),
        }
    }

    pub fn edit_text() -> Self {
        Self::new("android.widget.EditText").editable()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    pub fn clickable(mut self) -> Self {
        self.clickable = true;
        self
    }

    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    pub fn bounds(mut self, bounds: Rect) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn on_click(mut self, transition: Transition) -> Self {
        self.on_click = Some(transition);
        self
    }

    pub fn goto(self, screen: impl Into<String>) -> Self {
        self.on_click(Transition::Goto(screen.into()))
    }

    pub fn child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }

    fn caption(&self) -> Option<&String> {
        self.text.as_ref().or(self.desc.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSpec {
    pub package: String,
    pub root: NodeSpec,
    /// Screen revealed by a swipe; the screen stays put when absent.
    #[serde(default)]
    pub on_swipe: Option<String>,
    #[serde(default)]
    pub on_back: Option<Transition>,
}

impl ScreenSpec {
    pub fn new(package: impl Into<String>, root: NodeSpec) -> Self {
        Self {
            package: package.into(),
            root,
            on_swipe: None,
            on_back: None,
        }
    }

    pub fn on_swipe(mut self, screen: impl Into<String>) -> Self {
        self.on_swipe = Some(screen.into());
        self
    }

    pub fn on_back(mut self, transition: Transition) -> Self {
        self.on_back = Some(transition);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub start: String,
    /// Screen shown after the target app is launched.
    #[serde(default)]
    pub launch: Option<String>,
    /// Screen shown when a share request is accepted. Shares are refused without one.
    #[serde(default)]
    pub share_screen: Option<String>,
    pub screens: BTreeMap<String, ScreenSpec>,
}

impl Script {
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            launch: None,
            share_screen: None,
            screens: BTreeMap::new(),
        }
    }

    pub fn screen(mut self, name: impl Into<String>, spec: ScreenSpec) -> Self {
        self.screens.insert(name.into(), spec);
        self
    }

    pub fn launch_into(mut self, screen: impl Into<String>) -> Self {
        self.launch = Some(screen.into());
        self
    }

    pub fn share_into(mut self, screen: impl Into<String>) -> Self {
        self.share_screen = Some(screen.into());
        self
    }

    pub fn from_json(text: &str) -> Result<Self, ScriptError> {
        let script: Self = serde_json::from_str(text)?;
        script.validate()?;
        Ok(script)
    }

    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let text = fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Every screen name the script mentions must exist.
    pub fn validate(&self) -> Result<(), ScriptError> {
        let mut referenced = vec![&self.start];
        referenced.extend(&self.launch);
        referenced.extend(&self.share_screen);
        for screen in self.screens.values() {
            referenced.extend(&screen.on_swipe);
            if let Some(Transition::Goto(name)) = &screen.on_back {
                referenced.push(name);
            }
            let mut stack = vec![&screen.root];
            while let Some(node) = stack.pop() {
                if let Some(Transition::Goto(name)) = &node.on_click {
                    referenced.push(name);
                }
                stack.extend(&node.children);
            }
        }
        match referenced.into_iter().find(|name| !self.screens.contains_key(*name)) {
            Some(name) => Err(ScriptError::UnknownScreen(name.clone())),
            None => Ok(()),
        }
    }
}

/// One action the host was asked to perform, in dispatch order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedAction {
    Launch(String),
    Click { screen: String, node: String },
    Focus { screen: String, node: String },
    SetText { screen: String, value: String },
    Swipe(Stroke),
    Back { screen: String },
    Share(ShareRequest),
}

#[derive(Debug)]
struct FlatNode {
    spec: NodeSpec,
    parent: Option<usize>,
}

#[derive(Debug)]
struct CompiledScreen {
    name: String,
    package: String,
    nodes: Vec<FlatNode>,
    on_swipe: Option<usize>,
    on_back: Option<Transition>,
}

#[derive(Debug, Default)]
struct ReplayState {
    current: usize,
    share_origin: Option<usize>,
    actions: Vec<RecordedAction>,
    events: VecDeque<HostEvent>,
    /// Text injected into nodes of the current screen, by preorder index.
    typed: HashMap<usize, String>,
}

/// [`AccessibilityHost`] that plays a [`Script`].
#[derive(Debug)]
pub struct ScriptedHost {
    screens: Vec<CompiledScreen>,
    by_name: HashMap<String, usize>,
    launch: Option<usize>,
    share_screen: Option<usize>,
    state: RefCell<ReplayState>,
    reject_gestures: bool,
    missing_files: BTreeSet<PathBuf>,
}

fn flatten(root: &NodeSpec) -> Vec<FlatNode> {
    let mut nodes = Vec::new();
    let mut stack = vec![(root, None)];
    while let Some((spec, parent)) = stack.pop() {
        let index = nodes.len();
        let mut shallow = spec.clone();
        shallow.children = Vec::new();
        nodes.push(FlatNode {
            spec: shallow,
            parent,
        });
        stack.extend(spec.children.iter().rev().map(|child| (child, Some(index))));
    }
    nodes
}

impl ScriptedHost {
    pub fn new(script: Script) -> Result<Self, ScriptError> {
        script.validate()?;
        let by_name: HashMap<String, usize> = script
            .screens
            .keys()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        let lookup = |name: &String| by_name.get(name).copied();
        let screens = script
            .screens
            .iter()
            .map(|(name, spec)| CompiledScreen {
                name: name.clone(),
                package: spec.package.clone(),
                nodes: flatten(&spec.root),
                on_swipe: spec.on_swipe.as_ref().and_then(lookup),
                on_back: spec.on_back.clone(),
            })
            .collect();
        let launch = script.launch.as_ref().and_then(lookup);
        let share_screen = script.share_screen.as_ref().and_then(lookup);
        let start = lookup(&script.start).ok_or(ScriptError::UnknownScreen(script.start))?;
        Ok(Self {
            screens,
            by_name,
            launch,
            share_screen,
            state: RefCell::new(ReplayState {
                current: start,
                ..ReplayState::default()
            }),
            reject_gestures: false,
            missing_files: BTreeSet::new(),
        })
    }

    /// Every gesture dispatch is refused from now on.
    pub fn reject_gestures(mut self) -> Self {
        self.reject_gestures = true;
        self
    }

    pub fn mark_missing(mut self, path: impl Into<PathBuf>) -> Self {
        self.missing_files.insert(path.into());
        self
    }

    pub fn current_screen(&self) -> String {
        let state = self.state.borrow();
        self.screens[state.current].name.clone()
    }

    pub fn actions(&self) -> Vec<RecordedAction> {
        self.state.borrow().actions.clone()
    }

    /// Switches screens on the platform's initiative, as when a page finishes
    /// loading late. Nothing is recorded as an action.
    pub fn show(&self, screen: &str) -> Result<(), ScriptError> {
        let target = self
            .by_name
            .get(screen)
            .copied()
            .ok_or_else(|| ScriptError::UnknownScreen(screen.to_string()))?;
        self.goto(target);
        Ok(())
    }

    /// Drains the notifications queued since the last call.
    pub fn take_events(&self) -> Vec<HostEvent> {
        self.state.borrow_mut().events.drain(..).collect()
    }

    fn record(&self, action: RecordedAction) {
        self.state.borrow_mut().actions.push(action);
    }

    fn goto(&self, target: usize) {
        let mut state = self.state.borrow_mut();
        state.current = target;
        state.typed.clear();
        relay_debug!("replay: now on {}", self.screens[target].name);
        state
            .events
            .push_back(HostEvent::window_changed(self.screens[target].package.clone()));
    }

    fn content_changed(&self) {
        let mut state = self.state.borrow_mut();
        let package = self.screens[state.current].package.clone();
        state.events.push_back(HostEvent::content_changed(package));
    }

    fn apply(&self, transition: &Transition) {
        match transition {
            Transition::Goto(name) => {
                if let Some(target) = self.by_name.get(name).copied() {
                    self.goto(target);
                }
            }
            Transition::ReturnFromShare => {
                let origin = self.state.borrow_mut().share_origin.take();
                if let Some(origin) = origin {
                    self.goto(origin);
                }
            }
        }
    }

    /// Own caption, else the first caption below the node, else its id or class.
    fn label(&self, screen: usize, index: usize) -> String {
        let nodes = &self.screens[screen].nodes;
        let is_below = |mut i: usize| {
            while let Some(parent) = nodes[i].parent {
                if parent == index {
                    return true;
                }
                i = parent;
            }
            false
        };
        let spec = &nodes[index].spec;
        spec.caption()
            .or_else(|| {
                (index + 1..nodes.len())
                    .take_while(|i| is_below(*i))
                    .find_map(|i| nodes[i].spec.caption())
            })
            .or(spec.id.as_ref())
            .unwrap_or(&spec.class)
            .clone()
    }

    /// Screen and preorder index a handle refers to, if it is still on screen.
    fn resolve(&self, handle: NodeHandle) -> Option<(usize, usize)> {
        let screen = (handle.0 >> 32) as usize;
        let index = (handle.0 & 0xffff_ffff) as usize;
        let current = self.state.borrow().current;
        (screen == current && index < self.screens[screen].nodes.len()).then_some((screen, index))
    }
}

impl AccessibilityHost for ScriptedHost {
    fn active_window(&self) -> Option<UiTree> {
        let state = self.state.borrow();
        let screen = &self.screens[state.current];
        let to_node = |index: usize, flat: &FlatNode| {
            let spec = &flat.spec;
            UiNode {
                handle: NodeHandle(((state.current as u64) << 32) | index as u64),
                class_name: spec.class.clone(),
                resource_id: spec.id.clone(),
                text: state.typed.get(&index).cloned().or_else(|| spec.text.clone()),
                content_description: spec.desc.clone(),
                clickable: spec.clickable,
                editable: spec.editable,
                bounds: spec.bounds,
            }
        };
        let mut nodes = screen.nodes.iter().enumerate();
        let (_, root) = nodes.next()?;
        let mut tree = UiTree::new(screen.package.clone(), to_node(0, root));
        let mut ids = vec![tree.root()];
        for (index, flat) in nodes {
            let parent = ids[flat.parent.unwrap_or(0)];
            ids.push(tree.push_child(parent, to_node(index, flat)));
        }
        Some(tree)
    }

    fn perform(&self, node: NodeHandle, action: &NodeAction) -> bool {
        let Some((screen, index)) = self.resolve(node) else {
            return false;
        };
        let compiled = &self.screens[screen];
        let spec = &compiled.nodes[index].spec;
        match action {
            NodeAction::Click => {
                if !spec.clickable {
                    return false;
                }
                self.record(RecordedAction::Click {
                    screen: compiled.name.clone(),
                    node: self.label(screen, index),
                });
                match &spec.on_click {
                    Some(transition) => self.apply(transition),
                    None => {
                        // Submitting clears whatever was typed.
                        self.state.borrow_mut().typed.clear();
                        self.content_changed();
                    }
                }
                true
            }
            NodeAction::Focus => {
                self.record(RecordedAction::Focus {
                    screen: compiled.name.clone(),
                    node: self.label(screen, index),
                });
                true
            }
            NodeAction::SetText(value) => {
                if !spec.editable {
                    return false;
                }
                self.record(RecordedAction::SetText {
                    screen: compiled.name.clone(),
                    value: value.clone(),
                });
                self.state.borrow_mut().typed.insert(index, value.clone());
                self.content_changed();
                true
            }
        }
    }

    fn dispatch_gesture(&self, stroke: &Stroke) -> bool {
        if self.reject_gestures {
            return false;
        }
        self.record(RecordedAction::Swipe(*stroke));
        let current = self.state.borrow().current;
        match self.screens[current].on_swipe {
            Some(next) => self.goto(next),
            None => self.content_changed(),
        }
        true
    }

    fn navigate_back(&self) -> bool {
        let current = self.state.borrow().current;
        self.record(RecordedAction::Back {
            screen: self.screens[current].name.clone(),
        });
        if let Some(transition) = &self.screens[current].on_back {
            self.apply(transition);
        }
        true
    }

    fn launch(&self, target: &LaunchTarget) {
        self.record(RecordedAction::Launch(target.package.clone()));
        match self.launch {
            Some(screen) => self.goto(screen),
            None => self.content_changed(),
        }
    }

    fn share(&self, request: &ShareRequest) -> bool {
        let Some(share_screen) = self.share_screen else {
            return false;
        };
        self.record(RecordedAction::Share(request.clone()));
        let origin = self.state.borrow().current;
        self.state.borrow_mut().share_origin = Some(origin);
        self.goto(share_screen);
        true
    }

    fn file_exists(&self, path: &Path) -> bool {
        !self.missing_files.contains(path)
    }
}

impl AutomationService<ScriptedHost> {
    /// Runs on virtual time until nothing is running or `limit_ms` is reached,
    /// delivering the host's queued notifications between timer firings.
    ///
    /// Returns true when the service went idle.
    pub fn run_replay(&mut self, limit_ms: u64) -> bool {
        loop {
            for event in self.host().take_events() {
                self.handle_event(&event);
            }
            if !self.is_active() {
                return true;
            }
            match self.next_deadline() {
                Some(due) if due <= limit_ms => self.advance_to(due),
                _ => return false,
            }
        }
    }
}
