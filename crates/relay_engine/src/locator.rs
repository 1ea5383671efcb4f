use relay_logging::{relay_debug, relay_warn};

use crate::{AccessibilityHost, NodeAction, NodeId, Stroke, UiNode, UiTree};

/// Ancestor walks give up after this many hops.
pub const MAX_ANCESTOR_DEPTH: usize = 64;

/// Query surface over one snapshot.
#[derive(Debug, Clone)]
pub struct Screen {
    tree: UiTree,
}

impl Screen {
    pub fn new(tree: UiTree) -> Self {
        Self { tree }
    }

    pub fn package(&self) -> &str {
        self.tree.package()
    }

    pub fn tree(&self) -> &UiTree {
        &self.tree
    }

    pub fn node(&self, id: NodeId) -> &UiNode {
        self.tree.node(id)
    }

    fn find(&self, pred: impl Fn(&UiNode) -> bool) -> Vec<NodeId> {
        self.tree
            .preorder()
            .into_iter()
            .filter(|id| pred(self.tree.node(*id)))
            .collect()
    }

    pub fn find_by_identifier(&self, id: &str) -> Vec<NodeId> {
        self.find(|node| node.resource_id.as_deref() == Some(id))
    }

    /// Nodes whose text or content description equals `literal`.
    pub fn find_by_text(&self, literal: &str) -> Vec<NodeId> {
        self.find(|node| {
            node.text.as_deref() == Some(literal)
                || node.content_description.as_deref() == Some(literal)
        })
    }

    pub fn find_by_class(&self, class_name: &str) -> Vec<NodeId> {
        self.find(|node| node.class_name == class_name)
    }

    /// Editable fields in document order, matched by flag or by class name.
    pub fn editable_fields(&self, edit_class: &str) -> Vec<NodeId> {
        self.find(|node| node.editable || node.class_name == edit_class)
    }

    /// The node itself if activatable, else the closest activatable ancestor.
    pub fn nearest_activatable_ancestor(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        for _ in 0..MAX_ANCESTOR_DEPTH {
            if self.tree.node(current).clickable {
                return Some(current);
            }
            current = self.tree.parent(current)?;
        }
        relay_warn!("ancestor walk hit depth limit at {:?}", id);
        None
    }
}

/// Finds nodes in fresh snapshots and dispatches actions through the host.
///
/// Nothing is cached: every query takes a new snapshot because the tree mutates
/// continuously. Absence is never an error.
pub struct Locator<'a, H: ?Sized> {
    host: &'a H,
}

impl<'a, H: AccessibilityHost + ?Sized> Locator<'a, H> {
    pub fn new(host: &'a H) -> Self {
        Self { host }
    }

    pub fn screen(&self) -> Option<Screen> {
        let screen = self.host.active_window().map(Screen::new);
        if screen.is_none() {
            relay_debug!("no active window");
        }
        screen
    }

    pub fn find_by_identifier(&self, id: &str) -> Vec<UiNode> {
        self.collect(|screen| screen.find_by_identifier(id))
    }

    pub fn find_by_text(&self, literal: &str) -> Vec<UiNode> {
        self.collect(|screen| screen.find_by_text(literal))
    }

    pub fn find_by_class(&self, class_name: &str) -> Vec<UiNode> {
        self.collect(|screen| screen.find_by_class(class_name))
    }

    fn collect(&self, query: impl Fn(&Screen) -> Vec<NodeId>) -> Vec<UiNode> {
        self.screen()
            .map(|screen| {
                query(&screen)
                    .into_iter()
                    .map(|id| screen.node(id).clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn activate(&self, node: &UiNode) -> bool {
        let accepted = self.host.perform(node.handle, &NodeAction::Click);
        relay_debug!(
            "activate {} {:?}: {}",
            node.class_name,
            node.text.as_deref().or(node.resource_id.as_deref()),
            accepted
        );
        accepted
    }

    pub fn focus(&self, node: &UiNode) -> bool {
        self.host.perform(node.handle, &NodeAction::Focus)
    }

    pub fn replace_text(&self, node: &UiNode, value: &str) -> bool {
        self.host
            .perform(node.handle, &NodeAction::SetText(value.to_owned()))
    }

    /// Focus then replace. Callers that need a settle delay between the two use
    /// [`Locator::focus`] and [`Locator::replace_text`] from separate callbacks.
    pub fn set_text(&self, node: &UiNode, value: &str) -> bool {
        if !self.focus(node) {
            relay_debug!("focus refused before text injection");
        }
        self.replace_text(node, value)
    }

    pub fn swipe(&self, x1: i32, y1: i32, x2: i32, y2: i32, duration_ms: u64) -> bool {
        let stroke = Stroke {
            from: (x1, y1),
            to: (x2, y2),
            duration_ms,
        };
        let accepted = self.host.dispatch_gesture(&stroke);
        relay_debug!("swipe ({x1},{y1})->({x2},{y2}) {duration_ms}ms: {accepted}");
        accepted
    }

    pub fn navigate_back(&self) -> bool {
        self.host.navigate_back()
    }
}
