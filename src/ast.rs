//! The executable program tree.
//!
//! The tree is built once by the parser and only read afterwards, so the same
//! program can be run against any number of independent runtimes.

use std::fmt;

use crate::position::SourcePosition;

/// One executable node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A nested sequence of nodes. Only produced as a loop body or the root,
    /// both of which are reached through [`Block`] directly, but kept as a
    /// variant so any subtree can be executed on its own.
    Block(Block),
    /// `[...]`
    Loop(Loop),
    /// `<` (delta -1) or `>` (delta +1)
    Move { pos: SourcePosition, delta: isize },
    /// `-` (delta -1) or `+` (delta +1), wrapping on a single byte
    Update { pos: SourcePosition, delta: i8 },
    /// `.`
    Output { pos: SourcePosition },
    /// `,`
    Input { pos: SourcePosition },
}

impl Node {
    /// Where the node's opening byte was read.
    pub fn pos(&self) -> SourcePosition {
        match self {
            Node::Block(block) => block.pos,
            Node::Loop(lp) => lp.pos,
            Node::Move { pos, .. }
            | Node::Update { pos, .. }
            | Node::Output { pos }
            | Node::Input { pos } => *pos,
        }
    }

    /// Number of source instruction bytes this node stands for.
    pub fn instruction_count(&self) -> usize {
        match self {
            Node::Block(block) => block.instruction_count(),
            Node::Loop(lp) => 2 + lp.body.instruction_count(),
            Node::Move { .. } | Node::Update { .. } | Node::Output { .. } | Node::Input { .. } => 1,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Block(block) => fmt::Display::fmt(block, f),
            Node::Loop(lp) => write!(f, "Loop[{}]", lp.body.len()),
            Node::Move { delta, .. } => write!(f, "Move({delta:+})"),
            Node::Update { delta, .. } => write!(f, "Update({delta:+})"),
            Node::Output { .. } => write!(f, "Output"),
            Node::Input { .. } => write!(f, "Input"),
        }
    }
}

/// An ordered run of nodes: the whole program or a loop body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub pos: SourcePosition,
    nodes: Vec<Node>,
}

impl Block {
    pub fn new(pos: SourcePosition) -> Self {
        Self { pos, nodes: Vec::new() }
    }

    pub fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn instruction_count(&self) -> usize {
        self.nodes.iter().map(Node::instruction_count).sum()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block[{}]", self.len())
    }
}

/// A `[...]` loop, owning its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loop {
    pub pos: SourcePosition,
    pub body: Block,
}
