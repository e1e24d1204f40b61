//! Collapsible tool tree.
//!
//! [`TreeView`] owns the whole view: the node tree, the id counter, the layout
//! and the set of nodes currently on screen. Every click produces a [`Frame`]
//! describing how each node and link moves from its previous position to its
//! new one.

pub mod frame;
pub mod layout;
pub mod svg;

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use arf_model::ToolNode;
use thiserror::Error;
use tracing::debug;

use crate::tooltip::HoverTarget;

pub use frame::{Anchor, Diagonal, Fill, Frame, Label, LinkFrame, NodeFrame, Phase, Tween};
pub use layout::{Canvas, Margin, TreeLayout};

/// Length of every re-layout animation.
pub const TRANSITION: Duration = Duration::from_millis(750);

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("unknown node id {0}")]
    UnknownNode(NodeId),
    #[error("node {0} is not displayed")]
    NotDisplayed(NodeId),
    #[error("no node named {0:?}")]
    NodeNotFound(String),
    #[error("failed to read dataset {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid dataset: {0}")]
    Dataset(#[from] serde_json::Error),
}

/// Identity of a rendered node. Assigned the first time a node is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position in layout space: `x` runs along the breadth of the tree, `y`
/// along its depth. Screen coordinates swap the two.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Positions used to animate a node between two layout passes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VisualState {
    pub current: Point,
    pub previous: Point,
}

/// Children of a node and whether they are shown.
#[derive(Debug, Clone, PartialEq)]
pub enum Branch {
    Leaf,
    Expanded(Vec<ViewNode>),
    Collapsed(Vec<ViewNode>),
}

impl Branch {
    fn from_children(children: Option<Vec<ToolNode>>) -> Self {
        match children {
            Some(children) if !children.is_empty() => {
                Self::Expanded(children.into_iter().map(ViewNode::from_tool).collect())
            }
            _ => Self::Leaf,
        }
    }

    /// True when the node owns children, shown or hidden.
    #[must_use]
    pub const fn has_children(&self) -> bool {
        !matches!(self, Self::Leaf)
    }

    #[must_use]
    pub const fn is_collapsed(&self) -> bool {
        matches!(self, Self::Collapsed(_))
    }

    /// Children currently on screen.
    #[must_use]
    pub fn visible(&self) -> &[ViewNode] {
        match self {
            Self::Expanded(children) => children,
            Self::Leaf | Self::Collapsed(_) => &[],
        }
    }

    fn visible_mut(&mut self) -> &mut [ViewNode] {
        match self {
            Self::Expanded(children) => children,
            Self::Leaf | Self::Collapsed(_) => &mut [],
        }
    }

    /// All children regardless of visibility.
    #[must_use]
    pub fn children(&self) -> &[ViewNode] {
        match self {
            Self::Expanded(children) | Self::Collapsed(children) => children,
            Self::Leaf => &[],
        }
    }

    fn children_mut(&mut self) -> &mut [ViewNode] {
        match self {
            Self::Expanded(children) | Self::Collapsed(children) => children,
            Self::Leaf => &mut [],
        }
    }

    /// Flips between expanded and collapsed. Returns false for leaves.
    fn toggle(&mut self) -> bool {
        match std::mem::replace(self, Self::Leaf) {
            Self::Expanded(children) => {
                *self = Self::Collapsed(children);
                true
            }
            Self::Collapsed(children) => {
                *self = Self::Expanded(children);
                true
            }
            Self::Leaf => false,
        }
    }

    fn expand(&mut self) {
        if self.is_collapsed() {
            self.toggle();
        }
    }

    /// Collapses this branch and every branch below it.
    fn collapse_all(&mut self) {
        for child in self.children_mut() {
            child.branch.collapse_all();
        }
        if matches!(self, Self::Expanded(_)) {
            self.toggle();
        }
    }
}

/// A tool node as held by the view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewNode {
    id: Option<NodeId>,
    name: String,
    url: Option<String>,
    description: Option<String>,
    branch: Branch,
    visual: VisualState,
}

impl ViewNode {
    fn from_tool(node: ToolNode) -> Self {
        let url = node.link().map(str::to_string);
        Self {
            id: None,
            name: node.name,
            url,
            description: node.description,
            branch: Branch::from_children(node.children),
            visual: VisualState::default(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> Option<NodeId> {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub const fn branch(&self) -> &Branch {
        &self.branch
    }

    #[must_use]
    pub const fn visual(&self) -> VisualState {
        self.visual
    }

    fn find(&self, id: NodeId) -> Option<&Self> {
        if self.id == Some(id) {
            return Some(self);
        }
        self.branch.children().iter().find_map(|child| child.find(id))
    }

    fn find_mut(&mut self, id: NodeId) -> Option<&mut Self> {
        if self.id == Some(id) {
            return Some(self);
        }
        self.branch
            .children_mut()
            .iter_mut()
            .find_map(|child| child.find_mut(id))
    }

    /// Child indices leading to the first node named `name`, in preorder.
    fn path_to(&self, name: &str, path: &mut Vec<usize>) -> bool {
        if self.name == name {
            return true;
        }
        for (index, child) in self.branch.children().iter().enumerate() {
            path.push(index);
            if child.path_to(name, path) {
                return true;
            }
            path.pop();
        }
        false
    }
}

fn assign_ids(node: &mut ViewNode, next_id: &mut u64) {
    if node.id.is_none() {
        *next_id += 1;
        node.id = Some(NodeId::new(*next_id));
    }
    for child in node.branch.visible_mut() {
        assign_ids(child, next_id);
    }
}

fn expand_path(node: &mut ViewNode, path: &[usize]) {
    if let Some((&index, rest)) = path.split_first() {
        node.branch.expand();
        expand_path(&mut node.branch.children_mut()[index], rest);
    }
}

fn settle_positions(node: &mut ViewNode) {
    node.visual.previous = node.visual.current;
    for child in node.branch.visible_mut() {
        settle_positions(child);
    }
}

/// A visible node paired with its visible parent.
struct Placed<'a> {
    node: &'a ViewNode,
    parent: Option<&'a ViewNode>,
}

fn collect_visible<'a>(node: &'a ViewNode, parent: Option<&'a ViewNode>, out: &mut Vec<Placed<'a>>) {
    out.push(Placed { node, parent });
    for child in node.branch.visible() {
        collect_visible(child, Some(node), out);
    }
}

/// Nodes that were on screen after the last frame but are hidden now.
fn collect_hidden<'a>(
    node: &'a ViewNode,
    parent: Option<&'a ViewNode>,
    displayed: &HashSet<NodeId>,
    visible: &HashSet<NodeId>,
    out: &mut Vec<Placed<'a>>,
) {
    if let Some(id) = node.id
        && displayed.contains(&id)
        && !visible.contains(&id)
    {
        out.push(Placed { node, parent });
    }
    for child in node.branch.children() {
        collect_hidden(child, Some(node), displayed, visible, out);
    }
}

/// View context for one rendered tree.
#[derive(Debug, Clone)]
pub struct TreeView {
    root: ViewNode,
    canvas: Canvas,
    layout: TreeLayout,
    next_id: u64,
    displayed: HashSet<NodeId>,
    dark_mode: bool,
}

impl TreeView {
    /// Builds a view on the default canvas. Every child of the root starts
    /// collapsed, recursively.
    #[must_use]
    pub fn new(root: ToolNode) -> Self {
        Self::with_canvas(root, Canvas::default())
    }

    #[must_use]
    pub fn with_canvas(root: ToolNode, canvas: Canvas) -> Self {
        let layout = TreeLayout::for_canvas(&canvas);
        let mut root = ViewNode::from_tool(root);
        for child in root.branch.children_mut() {
            child.branch.collapse_all();
        }
        let origin = Point::new(layout.breadth / 2.0, 0.0);
        root.visual = VisualState {
            current: origin,
            previous: origin,
        };
        Self {
            root,
            canvas,
            layout,
            next_id: 0,
            displayed: HashSet::new(),
            dark_mode: false,
        }
    }

    #[must_use]
    pub const fn root(&self) -> &ViewNode {
        &self.root
    }

    #[must_use]
    pub const fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    #[must_use]
    pub const fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    /// Flips the dark theme and returns the new setting.
    pub const fn toggle_dark_mode(&mut self) -> bool {
        self.dark_mode = !self.dark_mode;
        self.dark_mode
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&ViewNode> {
        self.root.find(id)
    }

    #[must_use]
    pub fn is_displayed(&self, id: NodeId) -> bool {
        self.displayed.contains(&id)
    }

    /// Ids of the nodes on screen after the last frame.
    #[must_use]
    pub fn displayed(&self) -> Vec<NodeId> {
        let mut ids: Vec<_> = self.displayed.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Lays out the tree with the root as the animation origin.
    pub fn render(&mut self) -> Frame {
        self.relayout(None)
    }

    /// Toggles a displayed node and re-lays-out the tree around it.
    ///
    /// # Errors
    /// Returns [`TreeError::UnknownNode`] for ids never assigned and
    /// [`TreeError::NotDisplayed`] for nodes hidden under a collapsed parent.
    pub fn click(&mut self, id: NodeId) -> Result<Frame, TreeError> {
        self.toggle(id)?;
        Ok(self.relayout(Some(id)))
    }

    /// Flips a displayed node between expanded and collapsed without laying
    /// out. Returns false when the node is a leaf.
    ///
    /// # Errors
    /// Same as [`TreeView::click`].
    pub fn toggle(&mut self, id: NodeId) -> Result<bool, TreeError> {
        if !self.displayed.contains(&id) {
            return Err(if self.root.find(id).is_some() {
                TreeError::NotDisplayed(id)
            } else {
                TreeError::UnknownNode(id)
            });
        }
        let node = self.root.find_mut(id).ok_or(TreeError::UnknownNode(id))?;
        let flipped = node.branch.toggle();
        debug!(%id, name = %node.name, flipped, collapsed = node.branch.is_collapsed(), "toggled node");
        Ok(flipped)
    }

    /// Expands every ancestor of the first node named `name` (preorder), lays
    /// the tree out, and returns the node's id with the resulting frame.
    ///
    /// # Errors
    /// Returns [`TreeError::NodeNotFound`] when no node has that name.
    pub fn reveal(&mut self, name: &str) -> Result<(NodeId, Frame), TreeError> {
        let mut path = Vec::new();
        if !self.root.path_to(name, &mut path) {
            return Err(TreeError::NodeNotFound(name.to_string()));
        }

        expand_path(&mut self.root, &path);

        let frame = self.relayout(None);
        let id = self
            .find_by_path_name(name)
            .ok_or_else(|| TreeError::NodeNotFound(name.to_string()))?;
        Ok((id, frame))
    }

    fn find_by_path_name(&self, name: &str) -> Option<NodeId> {
        let mut path = Vec::new();
        if !self.root.path_to(name, &mut path) {
            return None;
        }
        let mut cursor = &self.root;
        for index in path {
            cursor = &cursor.branch.children()[index];
        }
        cursor.id
    }

    /// Snapshot of a displayed node for the hover handler.
    ///
    /// # Errors
    /// Same as [`TreeView::click`].
    pub fn hover_target(&self, id: NodeId) -> Result<HoverTarget, TreeError> {
        let node = self.root.find(id).ok_or(TreeError::UnknownNode(id))?;
        if !self.displayed.contains(&id) {
            return Err(TreeError::NotDisplayed(id));
        }
        Ok(HoverTarget {
            id,
            name: node.name.clone(),
            url: node.url.clone(),
            description: node.description.clone(),
        })
    }

    /// Serializes the settled state of `frame` with static tooltips.
    #[must_use]
    pub fn to_svg(&self, frame: &Frame) -> String {
        svg::render_svg(frame, &self.canvas, self.dark_mode, &svg::static_title)
    }

    fn relayout(&mut self, source: Option<NodeId>) -> Frame {
        assign_ids(&mut self.root, &mut self.next_id);
        let root_id = self.root.id.unwrap_or(NodeId::new(0));
        let source_id = source.unwrap_or(root_id);
        let source_before = self
            .root
            .find(source_id)
            .map_or(self.root.visual.previous, |node| node.visual.previous);

        self.layout.apply(&mut self.root);

        let source_after = self
            .root
            .find(source_id)
            .map_or(self.root.visual.current, |node| node.visual.current);

        let mut visible = Vec::new();
        collect_visible(&self.root, None, &mut visible);
        let visible_ids: HashSet<NodeId> = visible.iter().filter_map(|placed| placed.node.id).collect();

        let mut hidden = Vec::new();
        collect_hidden(&self.root, None, &self.displayed, &visible_ids, &mut hidden);

        let mut nodes = Vec::with_capacity(visible.len() + hidden.len());
        let mut links = Vec::with_capacity(visible.len() + hidden.len());

        for Placed { node, parent } in &visible {
            let Some(id) = node.id else { continue };
            let entering = !self.displayed.contains(&id);
            nodes.push(if entering {
                NodeFrame::entering(id, node, source_before)
            } else {
                NodeFrame::updating(id, node)
            });
            let Some(parent) = parent else { continue };
            links.push(if entering {
                LinkFrame::entering(id, parent, node, source_before)
            } else {
                LinkFrame::updating(id, parent, node)
            });
        }

        for Placed { node, parent } in &hidden {
            let Some(id) = node.id else { continue };
            nodes.push(NodeFrame::exiting(id, node, source_after));
            if let Some(parent) = parent {
                links.push(LinkFrame::exiting(id, parent, node, source_after));
            }
        }

        let frame = Frame {
            source: source_id,
            duration: TRANSITION,
            nodes,
            links,
        };

        settle_positions(&mut self.root);
        self.displayed = visible_ids;
        debug!(
            source = %source_id,
            visible = self.displayed.len(),
            entering = frame.count(Phase::Enter),
            exiting = frame.count(Phase::Exit),
            "laid out tree"
        );
        frame
    }
}
