//! Anchor table for one deserialize call.
//!
//! Entries are keyed by the anchored node and the concrete type it was bound as, so one
//! anchored node requested as two different types is bound once per type and each binding
//! is shared by every alias that asks for that type.
//!
//! Only objects carry identity. An alias to a sequence, dictionary or scalar yields a clone
//! of the one completed [`Value`]: the node is not bound again, but the copies are
//! independent values. Elements that are objects still point at the same instances.

use ahash::AHashMap;

use crate::descriptor::TypeDescriptor;
use crate::node::NodeId;
use crate::value::{ObjectId, Value};

/// State of one anchored node.
#[derive(Clone, Debug, PartialEq)]
pub enum AnchorState {
    /// Binding has started and not finished yet. Reference objects expose their
    /// pre-allocated handle; sequences, dictionaries and value objects have none.
    Pending(Option<ObjectId>),
    Complete(Value),
}

#[derive(Debug, Default)]
pub struct AliasResolver {
    table: AHashMap<(NodeId, TypeDescriptor), AnchorState>,
}

impl AliasResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `node` as under construction for `ty`.
    pub fn declare(&mut self, node: NodeId, ty: &TypeDescriptor, handle: Option<ObjectId>) {
        self.table
            .insert((node, ty.clone()), AnchorState::Pending(handle));
    }

    pub fn complete(&mut self, node: NodeId, ty: &TypeDescriptor, value: Value) {
        self.table
            .insert((node, ty.clone()), AnchorState::Complete(value));
    }

    pub fn lookup(&self, node: NodeId, ty: &TypeDescriptor) -> Option<&AnchorState> {
        self.table.get(&(node, ty.clone()))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
