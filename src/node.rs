//! Immutable YAML node tree.
//!
//! A [`Document`] is an arena of [`Node`]s addressed by [`NodeId`]. The arena index is the
//! node's identity: aliases point at the id of the anchored node, and the binder keys its
//! anchor table by it. Documents are usually produced by [`crate::compose`], but they can
//! also be assembled by hand, which is how structurally cyclic trees (no alias markers,
//! a mapping whose value is the mapping itself) can be expressed.

use crate::location::Location;
use crate::tags;

/// Identity of a node within its [`Document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Presentation style of a scalar, as written in the source text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ScalarStyle {
    #[default]
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
}

impl ScalarStyle {
    /// True for the styles where the text cannot be a YAML null or a number.
    pub fn is_quoted(self) -> bool {
        !matches!(self, ScalarStyle::Plain)
    }
}

impl From<saphyr_parser::ScalarStyle> for ScalarStyle {
    fn from(style: saphyr_parser::ScalarStyle) -> Self {
        match style {
            saphyr_parser::ScalarStyle::Plain => ScalarStyle::Plain,
            saphyr_parser::ScalarStyle::SingleQuoted => ScalarStyle::SingleQuoted,
            saphyr_parser::ScalarStyle::DoubleQuoted => ScalarStyle::DoubleQuoted,
            saphyr_parser::ScalarStyle::Literal => ScalarStyle::Literal,
            saphyr_parser::ScalarStyle::Folded => ScalarStyle::Folded,
        }
    }
}

/// Shape of a node.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Scalar { value: String, style: ScalarStyle },
    Sequence(Vec<NodeId>),
    /// Key/value pairs in document order.
    Mapping(Vec<(NodeId, NodeId)>),
    /// Reference to a previously anchored node.
    Alias(NodeId),
}

/// Shape name used in type mismatch diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Scalar,
    Sequence,
    Mapping,
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Shape::Scalar => "scalar",
            Shape::Sequence => "sequence",
            Shape::Mapping => "mapping",
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Anchor number assigned by the parser (unique within the document), if anchored.
    pub anchor: Option<usize>,
    /// Explicit tag, as written (`!!int`, `!custom`, ...).
    pub tag: Option<String>,
    pub location: Location,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            anchor: None,
            tag: None,
            location: Location::UNKNOWN,
        }
    }

    /// Shape of this node; `None` for aliases, which take the shape of their target.
    pub fn shape(&self) -> Option<Shape> {
        match self.kind {
            NodeKind::Scalar { .. } => Some(Shape::Scalar),
            NodeKind::Sequence(_) => Some(Shape::Sequence),
            NodeKind::Mapping(_) => Some(Shape::Mapping),
            NodeKind::Alias(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Scalar { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Plain `~`/`null`/empty scalars and explicit `!!null` are null-like. Quoted scalars
    /// never are.
    pub fn is_null_like(&self) -> bool {
        match &self.kind {
            NodeKind::Scalar { value, style } => {
                tags::is_null_tag(self.tag.as_deref())
                    || (!style.is_quoted() && self.tag.is_none() && is_null_text(value))
            }
            _ => false,
        }
    }
}

pub(crate) fn is_null_text(value: &str) -> bool {
    matches!(value, "" | "~" | "null" | "Null" | "NULL")
}

/// Arena of nodes forming one YAML document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root node. For a document with no explicit root, the last pushed node.
    pub fn root(&self) -> Option<NodeId> {
        self.root
            .or_else(|| self.nodes.len().checked_sub(1).map(NodeId))
    }

    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// All nodes with their ids, in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Append a fully built node.
    pub fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn push_scalar(&mut self, value: impl Into<String>) -> NodeId {
        self.push(Node::new(NodeKind::Scalar {
            value: value.into(),
            style: ScalarStyle::Plain,
        }))
    }

    pub fn push_sequence(&mut self, items: Vec<NodeId>) -> NodeId {
        self.push(Node::new(NodeKind::Sequence(items)))
    }

    pub fn push_mapping(&mut self, entries: Vec<(NodeId, NodeId)>) -> NodeId {
        self.push(Node::new(NodeKind::Mapping(entries)))
    }

    pub fn push_alias(&mut self, target: NodeId) -> NodeId {
        self.push(Node::new(NodeKind::Alias(target)))
    }

    /// Replace the items of a sequence node. Lets callers wire children that were pushed
    /// after their parent. Returns false if `id` is not a sequence.
    pub fn set_items(&mut self, id: NodeId, items: Vec<NodeId>) -> bool {
        match self.nodes.get_mut(id.0).map(|n| &mut n.kind) {
            Some(NodeKind::Sequence(slot)) => {
                *slot = items;
                true
            }
            _ => false,
        }
    }

    /// Replace the entries of a mapping node. Returns false if `id` is not a mapping.
    pub fn set_entries(&mut self, id: NodeId, entries: Vec<(NodeId, NodeId)>) -> bool {
        match self.nodes.get_mut(id.0).map(|n| &mut n.kind) {
            Some(NodeKind::Mapping(slot)) => {
                *slot = entries;
                true
            }
            _ => false,
        }
    }

    /// Mark a node as anchored with the given anchor number.
    pub fn set_anchor(&mut self, id: NodeId, anchor: usize) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.anchor = Some(anchor);
        }
    }

    /// Follow alias links until a non-alias node is reached. Alias chains longer than the
    /// arena itself can only be cycles, which yield `None`.
    pub fn resolve(&self, mut id: NodeId) -> Option<NodeId> {
        for _ in 0..=self.nodes.len() {
            match &self.get(id)?.kind {
                NodeKind::Alias(target) => id = *target,
                _ => return Some(id),
            }
        }
        None
    }
}
