use serde::{Deserialize, Serialize};

/// Screen-space bounds in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn center_x(&self) -> i32 {
        self.left + self.width() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }
}

/// Host-assigned reference used to dispatch actions at a node of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeHandle(pub u64);

/// Index of a node inside one [`UiTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UiNode {
    pub handle: NodeHandle,
    pub class_name: String,
    pub resource_id: Option<String>,
    pub text: Option<String>,
    pub content_description: Option<String>,
    pub clickable: bool,
    pub editable: bool,
    pub bounds: Rect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    node: UiNode,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Immutable snapshot of the active window's semantic tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiTree {
    package: String,
    entries: Vec<Entry>,
}

impl UiTree {
    pub fn new(package: impl Into<String>, root: UiNode) -> Self {
        Self {
            package: package.into(),
            entries: vec![Entry {
                node: root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn push_child(&mut self, parent: NodeId, node: UiNode) -> NodeId {
        let id = NodeId(self.entries.len());
        self.entries.push(Entry {
            node,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.entries[parent.0].children.push(id);
        id
    }

    /// Package of the application that owns the window.
    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &UiNode {
        &self.entries[id.0].node
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.entries[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.entries[id.0].children
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Depth-first pre-order, the order the platform reports query matches in.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.entries.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        order
    }
}
