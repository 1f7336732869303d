//! Diagnostic search trees
//!
//! Every search records the positions it visited in a [`SearchTree`], an arena
//! of [`SearchNode`]s addressed by [`NodeId`]. Boards are not stored per node;
//! [`SearchTree::board_at`] replays the moves on the path from the root instead.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use std::fmt::Write;

use crate::board::{Board, Player};

/// Index of a node inside its [`SearchTree`]
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a node represents in the search
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The position the search was started from
    Root,
    /// The automated player is to move
    Max,
    /// The human is to move
    Min,
    /// A chosen column whose landing column is still to be resolved
    Chance,
    /// Recursion stopped here and the position was evaluated statically
    Leaf,
}

impl Role {
    fn label(self) -> &'static str {
        match self {
            Role::Root => "ROOT",
            Role::Max => "MAX",
            Role::Min => "MIN",
            Role::Chance => "CHANCE",
            Role::Leaf => "LEAF",
        }
    }
}

/// How a node was reached from its parent
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Transition {
    Root,
    /// A disc was dropped in `column`, or for chance nodes, `column` was chosen
    Drop { column: usize },
    /// The disc of a chosen column actually landed in `column`
    Outcome { column: usize, probability: f64 },
}

/// Alpha-beta window in effect when a node was expanded
#[derive(Copy, Clone, PartialEq, Debug, Serialize)]
pub struct Bounds {
    pub alpha: f64,
    pub beta: f64,
}

impl Bounds {
    /// The window before anything is known
    pub const FULL: Bounds = Bounds {
        alpha: f64::NEG_INFINITY,
        beta: f64::INFINITY,
    };
}

#[derive(Clone, Debug)]
pub struct SearchNode {
    pub value: f64,
    pub role: Role,
    pub transition: Transition,
    /// Plies from the root; chance nodes share the depth of the decision they resolve
    pub depth: u32,
    pub bounds: Option<Bounds>,
    /// Set on the child after which the remaining siblings were cut off
    pub pruned: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SearchNode {
    pub fn column(&self) -> Option<usize> {
        match self.transition {
            Transition::Root => None,
            Transition::Drop { column } | Transition::Outcome { column, .. } => Some(column),
        }
    }

    pub fn probability(&self) -> Option<f64> {
        match self.transition {
            Transition::Outcome { probability, .. } => Some(probability),
            _ => None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in exploration order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Rendering options for [`SearchTree::nested`] and [`SearchTree::dump`]
#[derive(Copy, Clone, Debug, Default)]
pub struct ViewOptions {
    /// Attach a digit snapshot of each node's board
    pub include_board: bool,
    /// Omit the children of nodes at this depth or deeper
    pub max_depth: Option<u32>,
}

#[derive(Clone, Debug)]
pub struct SearchTree {
    nodes: Vec<SearchNode>,
}

impl SearchTree {
    /// Creates a tree holding only the root node
    pub fn new() -> Self {
        Self {
            nodes: vec![SearchNode {
                value: 0.0,
                role: Role::Root,
                transition: Transition::Root,
                depth: 0,
                bounds: None,
                pruned: false,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &SearchNode {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut SearchNode {
        &mut self.nodes[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SearchNode)> {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i), node))
    }

    /// Appends a child to `parent`; its value is filled in once it has been searched
    pub(crate) fn push_child(
        &mut self,
        parent: NodeId,
        role: Role,
        transition: Transition,
        depth: u32,
        bounds: Option<Bounds>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SearchNode {
            value: 0.0,
            role,
            transition,
            depth,
            bounds,
            pruned: false,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Reconstructs the board at `id` by replaying the landing columns from `root_board`
    ///
    /// The automated player moves on even plies. Chance nodes have chosen a
    /// column but not dropped anything yet.
    pub fn board_at(&self, id: NodeId, root_board: &Board) -> Board {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id);
            if node.role != Role::Chance {
                if let Some(column) = node.column() {
                    path.push((column, node.depth));
                }
            }
            current = node.parent;
        }

        let mut board = root_board.clone();
        for (column, depth) in path.into_iter().rev() {
            let player = if depth % 2 == 1 { Player::Ai } else { Player::Human };
            board.drop_disc(column, player);
        }
        board
    }

    /// A nested, order-preserving serializable view of the tree
    pub fn nested<'a>(&'a self, root_board: &'a Board, options: ViewOptions) -> NestedNode<'a> {
        NestedNode {
            tree: self,
            id: self.root(),
            root_board,
            options,
        }
    }

    /// Indented text rendering, two spaces per level
    pub fn dump(&self, root_board: &Board, options: ViewOptions) -> String {
        let mut out = String::new();
        self.dump_node(self.root(), 0, root_board, options, &mut out);
        out
    }

    fn dump_node(&self, id: NodeId, indent: usize, root_board: &Board, options: ViewOptions, out: &mut String) {
        let node = self.node(id);
        let prefix = "  ".repeat(indent);

        // writing to a String never fails
        let _ = write!(out, "{}[{}]", prefix, node.role.label());
        if let Some(column) = node.column() {
            let _ = write!(out, " Col:{}", column);
        }
        let _ = write!(out, " Value:{}", node.value);
        if let Some(bounds) = node.bounds {
            let _ = write!(out, " α:{} β:{}", bounds.alpha, bounds.beta);
        }
        if let Some(probability) = node.probability() {
            let _ = write!(out, " P:{:.2}", probability);
        }
        if node.pruned {
            out.push_str(" [PRUNED]");
        }
        out.push('\n');
        if options.include_board && node.role != Role::Chance {
            for line in self.board_at(id, root_board).snapshot().lines() {
                let _ = writeln!(out, "{}  {}", prefix, line);
            }
        }

        if options.max_depth.map_or(false, |max| node.depth >= max) {
            return;
        }
        for &child in node.children() {
            self.dump_node(child, indent + 1, root_board, options, out);
        }
    }
}

impl Default for SearchTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Borrowed view of one node and its subtree, see [`SearchTree::nested`]
#[derive(Copy, Clone, Debug)]
pub struct NestedNode<'a> {
    tree: &'a SearchTree,
    id: NodeId,
    root_board: &'a Board,
    options: ViewOptions,
}

impl<'a> NestedNode<'a> {
    fn child(&self, id: NodeId) -> Self {
        Self { id, ..*self }
    }
}

impl Serialize for NestedNode<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node = self.tree.node(self.id);
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("value", &node.value)?;
        map.serialize_entry("role", &node.role)?;
        if let Some(column) = node.column() {
            map.serialize_entry("column", &column)?;
        }
        map.serialize_entry("depth", &node.depth)?;
        if let Some(bounds) = node.bounds {
            map.serialize_entry("alpha", &bounds.alpha)?;
            map.serialize_entry("beta", &bounds.beta)?;
        }
        if let Some(probability) = node.probability() {
            map.serialize_entry("probability", &probability)?;
        }
        if node.pruned {
            map.serialize_entry("pruned", &true)?;
        }
        if self.options.include_board && node.role != Role::Chance {
            let board = self.tree.board_at(self.id, self.root_board);
            map.serialize_entry("board", &board.snapshot())?;
        }

        let truncated = self.options.max_depth.map_or(false, |max| node.depth >= max);
        let children: Vec<NestedNode<'_>> = if truncated {
            Vec::new()
        } else {
            node.children().iter().map(|&child| self.child(child)).collect()
        };
        map.serialize_entry("children", &children)?;
        map.end()
    }
}
