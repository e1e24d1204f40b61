//! Slot layout over the visible part of the tree.
//!
//! Visible leaves take breadth slots in preorder, one apart under the same
//! parent and two apart otherwise; every parent sits midway between its first
//! and last child. Subtrees are never pulled together by contour, so a leaf
//! always lands past every leaf of the subtree before it.

use super::{NodeId, Point, ViewNode};

/// Space reserved around the drawing, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Drawing surface for the tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
    pub margin: Margin,
}

impl Canvas {
    #[must_use]
    pub const fn inner_width(&self) -> f64 {
        self.width - self.margin.left - self.margin.right
    }

    #[must_use]
    pub const fn inner_height(&self) -> f64 {
        self.height - self.margin.top - self.margin.bottom
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
            margin: Margin {
                top: 20.0,
                right: 120.0,
                bottom: 20.0,
                left: 140.0,
            },
        }
    }
}

/// Places visible nodes: siblings one slot apart, cousins two, parents
/// centered over their children, depth at a fixed spacing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeLayout {
    /// Extent of the breadth axis.
    pub breadth: f64,
    pub depth_spacing: f64,
}

impl TreeLayout {
    pub const DEPTH_SPACING: f64 = 180.0;

    #[must_use]
    pub const fn new(breadth: f64, depth_spacing: f64) -> Self {
        Self {
            breadth,
            depth_spacing,
        }
    }

    #[must_use]
    pub const fn for_canvas(canvas: &Canvas) -> Self {
        Self::new(canvas.inner_height(), Self::DEPTH_SPACING)
    }

    /// Writes `visual.current` for every visible node under `root`.
    pub(crate) fn apply(&self, root: &mut ViewNode) {
        let mut slots = Slots::default();
        place(root, None, 0, self.depth_spacing, &mut slots);

        let gap = if slots.first_parent == slots.last_parent {
            1.0
        } else {
            2.0
        };
        let scale = self.breadth / (slots.cursor + gap);
        let shift = gap / 2.0;
        normalize(root, shift, scale);
    }
}

/// Running leaf cursor for the first pass.
#[derive(Default)]
struct Slots {
    cursor: f64,
    placed_any: bool,
    first_parent: Option<NodeId>,
    last_parent: Option<NodeId>,
}

impl Slots {
    fn next(&mut self, parent: Option<NodeId>) -> f64 {
        if self.placed_any {
            self.cursor += if self.last_parent == parent { 1.0 } else { 2.0 };
        } else {
            self.placed_any = true;
            self.first_parent = parent;
        }
        self.last_parent = parent;
        self.cursor
    }
}

#[allow(clippy::cast_precision_loss)]
fn place(
    node: &mut ViewNode,
    parent: Option<NodeId>,
    depth: usize,
    depth_spacing: f64,
    slots: &mut Slots,
) -> f64 {
    let id = node.id;
    let children = node.branch.visible_mut();
    let x = if children.is_empty() {
        slots.next(parent)
    } else {
        let mut first = None;
        let mut last = 0.0;
        for child in children {
            last = place(child, id, depth + 1, depth_spacing, slots);
            if first.is_none() {
                first = Some(last);
            }
        }
        f64::midpoint(first.unwrap_or(last), last)
    };
    node.visual.current = Point::new(x, depth as f64 * depth_spacing);
    x
}

fn normalize(node: &mut ViewNode, shift: f64, scale: f64) {
    node.visual.current.x = (node.visual.current.x + shift) * scale;
    for child in node.branch.visible_mut() {
        normalize(child, shift, scale);
    }
}
