//! Per-pass transition descriptions.

use std::time::Duration;

use super::{NodeId, Point, ViewNode};

/// Radius and opacity used for "not there yet" or "already gone".
pub const VANISHED: f64 = 1e-6;
pub const NODE_RADIUS: f64 = 6.0;
pub const LABEL_OFFSET: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Enter,
    Update,
    Exit,
}

/// Start and end value of an animated attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween<T> {
    pub from: T,
    pub to: T,
}

impl<T: Copy> Tween<T> {
    #[must_use]
    pub const fn new(from: T, to: T) -> Self {
        Self { from, to }
    }

    #[must_use]
    pub const fn hold(value: T) -> Self {
        Self {
            from: value,
            to: value,
        }
    }
}

/// Circle fill. Collapsed nodes are filled to hint at hidden children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    Collapsed,
    Open,
}

impl Fill {
    #[must_use]
    pub const fn css(self) -> &'static str {
        match self {
            Self::Collapsed => "lightsteelblue",
            Self::Open => "#fff",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    End,
}

impl Anchor {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
        }
    }
}

/// Label placement: parents label to the left, leaves to the right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Label {
    pub anchor: Anchor,
    pub dx: f64,
}

impl Label {
    fn for_node(node: &ViewNode) -> Self {
        if node.branch().has_children() {
            Self {
                anchor: Anchor::End,
                dx: -LABEL_OFFSET,
            }
        } else {
            Self {
                anchor: Anchor::Start,
                dx: LABEL_OFFSET,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeFrame {
    pub id: NodeId,
    pub name: String,
    pub url: Option<String>,
    pub description: Option<String>,
    pub phase: Phase,
    pub position: Tween<Point>,
    pub radius: Tween<f64>,
    pub label_opacity: Tween<f64>,
    pub fill: Fill,
    pub label: Label,
}

impl NodeFrame {
    fn base(id: NodeId, node: &ViewNode, phase: Phase, position: Tween<Point>) -> Self {
        let fill = if node.branch().is_collapsed() {
            Fill::Collapsed
        } else {
            Fill::Open
        };
        Self {
            id,
            name: node.name().to_string(),
            url: node.url().map(str::to_string),
            description: node.description().map(str::to_string),
            phase,
            position,
            radius: Tween::hold(NODE_RADIUS),
            label_opacity: Tween::hold(1.0),
            fill,
            label: Label::for_node(node),
        }
    }

    pub(super) fn entering(id: NodeId, node: &ViewNode, origin: Point) -> Self {
        let mut frame = Self::base(id, node, Phase::Enter, Tween::new(origin, node.visual().current));
        frame.radius = Tween::new(VANISHED, NODE_RADIUS);
        frame.label_opacity = Tween::new(VANISHED, 1.0);
        frame
    }

    pub(super) fn updating(id: NodeId, node: &ViewNode) -> Self {
        let visual = node.visual();
        Self::base(id, node, Phase::Update, Tween::new(visual.previous, visual.current))
    }

    pub(super) fn exiting(id: NodeId, node: &ViewNode, target: Point) -> Self {
        let mut frame = Self::base(id, node, Phase::Exit, Tween::new(node.visual().previous, target));
        frame.radius = Tween::new(NODE_RADIUS, VANISHED);
        frame.label_opacity = Tween::new(1.0, VANISHED);
        frame
    }
}

/// Cubic link between two nodes, drawn horizontally (depth → screen x).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diagonal {
    pub source: Point,
    pub target: Point,
}

impl Diagonal {
    #[must_use]
    pub const fn new(source: Point, target: Point) -> Self {
        Self { source, target }
    }

    /// Zero-length link sitting on a single point.
    #[must_use]
    pub const fn collapsed(at: Point) -> Self {
        Self::new(at, at)
    }

    /// SVG path data with control points halfway along the depth axis.
    #[must_use]
    pub fn path(&self) -> String {
        let Self { source, target } = self;
        let mid = f64::midpoint(source.y, target.y);
        format!(
            "M{},{}C{},{} {},{} {},{}",
            source.y, source.x, mid, source.x, mid, target.x, target.y, target.x
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkFrame {
    /// Links are keyed by the child end.
    pub target: NodeId,
    pub phase: Phase,
    pub path: Tween<Diagonal>,
}

impl LinkFrame {
    pub(super) fn entering(id: NodeId, parent: &ViewNode, node: &ViewNode, origin: Point) -> Self {
        Self {
            target: id,
            phase: Phase::Enter,
            path: Tween::new(
                Diagonal::collapsed(origin),
                Diagonal::new(parent.visual().current, node.visual().current),
            ),
        }
    }

    pub(super) fn updating(id: NodeId, parent: &ViewNode, node: &ViewNode) -> Self {
        Self {
            target: id,
            phase: Phase::Update,
            path: Tween::new(
                Diagonal::new(parent.visual().previous, node.visual().previous),
                Diagonal::new(parent.visual().current, node.visual().current),
            ),
        }
    }

    pub(super) fn exiting(id: NodeId, parent: &ViewNode, node: &ViewNode, target: Point) -> Self {
        Self {
            target: id,
            phase: Phase::Exit,
            path: Tween::new(
                Diagonal::new(parent.visual().previous, node.visual().previous),
                Diagonal::collapsed(target),
            ),
        }
    }
}

/// Everything that moves during one layout pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Node whose click caused the pass; the root for the first render.
    pub source: NodeId,
    pub duration: Duration,
    pub nodes: Vec<NodeFrame>,
    pub links: Vec<LinkFrame>,
}

impl Frame {
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&NodeFrame> {
        self.nodes.iter().find(|node| node.id == id)
    }

    #[must_use]
    pub fn count(&self, phase: Phase) -> usize {
        self.nodes.iter().filter(|node| node.phase == phase).count()
    }

    /// Nodes still on screen once the transition ends.
    pub fn settled_nodes(&self) -> impl Iterator<Item = &NodeFrame> {
        self.nodes.iter().filter(|node| node.phase != Phase::Exit)
    }

    pub fn settled_links(&self) -> impl Iterator<Item = &LinkFrame> {
        self.links.iter().filter(|link| link.phase != Phase::Exit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_bends_halfway_along_depth() {
        let diagonal = Diagonal::new(Point::new(100.0, 0.0), Point::new(40.0, 180.0));
        assert_eq!(diagonal.path(), "M0,100C90,100 90,40 180,40");
    }

    #[test]
    fn collapsed_diagonal_is_a_point() {
        let diagonal = Diagonal::collapsed(Point::new(5.0, 10.0));
        assert_eq!(diagonal.path(), "M10,5C10,5 10,5 10,5");
    }
}
