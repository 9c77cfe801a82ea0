//! The binding engine: node tree in, object graph out.
//!
//! [`ObjectGraphBuilder::bind`] takes a node and the type requested for it, resolves
//! capabilities through the type mappings, and then dispatches on the node shape:
//! scalars go through the converter chain, sequences and dictionaries are bound element by
//! element, and mappings bound as objects have each entry matched to a member by applying
//! the naming convention to the declared member names.
//!
//! Anchored nodes (and nodes reached through an alias) are recorded in the per-call
//! [`AliasResolver`], so every alias to them yields the same value. A reference object is
//! recorded before its members are bound; an alias met while it is still being built
//! receives the pre-allocated handle, which is how cyclic graphs terminate.

use std::rc::Rc;

use ahash::{AHashMap, AHashSet};

use crate::alias::{AliasResolver, AnchorState};
use crate::descriptor::{ObjectDescriptor, TypeDescriptor, TypeRegistry};
use crate::error::Error;
use crate::mapping::TypeMappingRegistry;
use crate::naming::NamingConvention;
use crate::node::{Document, Node, NodeId, NodeKind, ScalarStyle, Shape};
use crate::options::{DuplicateKeyPolicy, Options};
use crate::path::Path;
use crate::scalar::{ConvertContext, ScalarConverterChain, ScalarInput};
use crate::tags;
use crate::value::{Bound, ObjectGraph, Value};

/// Immutable configuration shared by every bind of one call.
#[derive(Clone, Copy)]
pub struct BindSettings<'a> {
    pub types: &'a TypeRegistry,
    pub mappings: &'a TypeMappingRegistry,
    pub naming: &'a dyn NamingConvention,
    pub converters: &'a ScalarConverterChain,
    pub options: &'a Options,
}

/// Mutable state of one deserialize call: the anchor table, the graph under construction,
/// the current path and the recursion depth. Never shared between calls.
#[derive(Debug, Default)]
pub struct ResolutionContext {
    aliases: AliasResolver,
    graph: ObjectGraph,
    path: Path,
    depth: usize,
    /// Mappings whose merge keys were already expanded in this call.
    merged: AHashMap<NodeId, Rc<[Entry]>>,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn graph(&self) -> &ObjectGraph {
        &self.graph
    }

    pub fn into_graph(self) -> ObjectGraph {
        self.graph
    }
}

/// One mapping entry after merge keys were expanded.
#[derive(Clone, Debug)]
struct Entry {
    key: NodeId,
    value: NodeId,
    /// Key text when the key is a scalar.
    text: Option<String>,
}

/// Entries gathered from `<<` values. The first source to offer a key keeps it.
#[derive(Default)]
struct MergeSink {
    entries: Vec<Entry>,
    keys: AHashSet<NodeId>,
    texts: AHashSet<String>,
}

impl MergeSink {
    fn offer(&mut self, entry: &Entry) {
        if !self.keys.insert(entry.key) {
            return;
        }
        if let Some(text) = &entry.text {
            if !self.texts.insert(text.clone()) {
                return;
            }
        }
        self.entries.push(entry.clone());
    }
}

pub struct ObjectGraphBuilder<'a> {
    doc: &'a Document,
    settings: BindSettings<'a>,
    /// Anchored nodes and alias targets: the nodes whose bound values must be shared.
    shared: AHashSet<NodeId>,
}

impl<'a> ObjectGraphBuilder<'a> {
    pub fn new(doc: &'a Document, settings: BindSettings<'a>) -> Self {
        let mut shared = AHashSet::new();
        for (id, node) in doc.iter() {
            if node.anchor.is_some() {
                shared.insert(id);
            }
            if let NodeKind::Alias(_) = node.kind {
                if let Some(target) = doc.resolve(id) {
                    shared.insert(target);
                }
            }
        }
        Self {
            doc,
            settings,
            shared,
        }
    }

    /// Bind the document root. An empty document binds to `Null`.
    pub fn bind_root(&self, requested: &TypeDescriptor) -> Result<Bound, Error> {
        let mut ctx = ResolutionContext::new();
        let root = match self.doc.root() {
            Some(root) => self.bind(root, requested, &mut ctx)?,
            None => Value::Null,
        };
        if !ctx.aliases.is_empty() {
            tracing::trace!(
                bindings = ctx.aliases.len(),
                merged = ctx.merged.len(),
                "anchor table settled"
            );
        }
        Ok(Bound {
            graph: ctx.into_graph(),
            root,
        })
    }

    /// Bind `node` as `requested`, one level deeper than the caller.
    pub fn bind(
        &self,
        node: NodeId,
        requested: &TypeDescriptor,
        ctx: &mut ResolutionContext,
    ) -> Result<Value, Error> {
        let max_depth = self.settings.options.max_depth;
        ctx.depth += 1;
        let result = if ctx.depth > max_depth {
            let location = self.node(node)?.location;
            Err(Error::depth_exceeded(max_depth)
                .with_path(&ctx.path)
                .with_location(location))
        } else {
            self.bind_node(node, requested, ctx)
        };
        ctx.depth -= 1;
        result
    }

    fn node(&self, id: NodeId) -> Result<&'a Node, Error> {
        self.doc
            .get(id)
            .ok_or_else(|| Error::msg(format!("node {} is not part of the document", id.index())))
    }

    fn bind_node(
        &self,
        site_id: NodeId,
        requested: &TypeDescriptor,
        ctx: &mut ResolutionContext,
    ) -> Result<Value, Error> {
        let site = self.node(site_id)?;
        let target_id = self.doc.resolve(site_id).ok_or_else(|| {
            Error::msg("alias chain does not end in a node").with_location(site.location)
        })?;
        let target = self.node(target_id)?;

        let mut requested = requested;
        while let TypeDescriptor::Optional(inner) = requested {
            if target.is_null_like() {
                return Ok(Value::Null);
            }
            requested = &**inner;
        }

        let ty = self
            .resolve_type(requested)
            .map_err(|err| locate(err, &ctx.path, site))?;

        if target.is_null_like()
            && matches!(
                ty,
                TypeDescriptor::Object(_)
                    | TypeDescriptor::Sequence(_)
                    | TypeDescriptor::Dictionary(_)
            )
        {
            return Ok(Value::Null);
        }

        let shared = self.shared.contains(&target_id);
        if shared {
            match ctx.aliases.lookup(target_id, &ty) {
                Some(AnchorState::Complete(value)) => {
                    tracing::trace!(
                        node = target_id.index(),
                        path = %ctx.path,
                        "alias reuses bound value"
                    );
                    return Ok(value.clone());
                }
                Some(AnchorState::Pending(Some(id))) => {
                    tracing::trace!(
                        node = target_id.index(),
                        object = id.index(),
                        path = %ctx.path,
                        "alias refers to an object under construction"
                    );
                    return Ok(Value::Object(*id));
                }
                Some(AnchorState::Pending(None)) => {
                    return Err(locate(
                        Error::cyclic_reference(&ty.to_string()),
                        &ctx.path,
                        site,
                    ));
                }
                None => {}
            }
        }

        let value = match &ty {
            TypeDescriptor::Scalar(_) | TypeDescriptor::Enum(_) => {
                self.bind_scalar(target, &ty, ctx)?
            }
            TypeDescriptor::Sequence(element) => {
                self.bind_sequence(target_id, target, &ty, element, shared, ctx)?
            }
            TypeDescriptor::Dictionary(value_ty) => {
                self.bind_dictionary(target_id, target, &ty, value_ty, shared, ctx)?
            }
            TypeDescriptor::Object(name) => {
                let descriptor = self
                    .settings
                    .types
                    .object(name)
                    .cloned()
                    .ok_or_else(|| locate(Error::unknown_type(name), &ctx.path, site))?;
                self.bind_object(target_id, target, &ty, &descriptor, shared, ctx)?
            }
            TypeDescriptor::Optional(_) | TypeDescriptor::Capability(_) => {
                return Err(locate(
                    Error::msg(format!("`{ty}` cannot be bound directly")),
                    &ctx.path,
                    site,
                ));
            }
        };

        if shared {
            ctx.aliases.complete(target_id, &ty, value.clone());
        }
        Ok(value)
    }

    /// Replace a capability by its mapped concrete type.
    fn resolve_type(&self, requested: &TypeDescriptor) -> Result<TypeDescriptor, Error> {
        match requested {
            TypeDescriptor::Capability(name) => match self.settings.mappings.resolve(name) {
                Some(concrete) => {
                    tracing::trace!(capability = %name, concrete, "resolved capability");
                    Ok(TypeDescriptor::Object(concrete.into()))
                }
                None => Err(Error::unresolved_type_mapping(name)),
            },
            other => Ok(other.clone()),
        }
    }

    fn bind_scalar(
        &self,
        target: &Node,
        ty: &TypeDescriptor,
        ctx: &ResolutionContext,
    ) -> Result<Value, Error> {
        let NodeKind::Scalar { value, style } = &target.kind else {
            return Err(locate(
                Error::type_mismatch(Shape::Scalar, shape_of(target)),
                &ctx.path,
                target,
            ));
        };
        let input = ScalarInput {
            text: value,
            style: *style,
            tag: target.tag.as_deref(),
        };
        let convert_ctx = ConvertContext {
            options: self.settings.options,
            naming: self.settings.naming,
            types: self.settings.types,
        };
        self.settings
            .converters
            .convert(&input, ty, &convert_ctx)
            .map_err(|err| locate(err, &ctx.path, target))
    }

    fn bind_sequence(
        &self,
        target_id: NodeId,
        target: &Node,
        ty: &TypeDescriptor,
        element: &TypeDescriptor,
        shared: bool,
        ctx: &mut ResolutionContext,
    ) -> Result<Value, Error> {
        let NodeKind::Sequence(items) = &target.kind else {
            return Err(locate(
                Error::type_mismatch(Shape::Sequence, shape_of(target)),
                &ctx.path,
                target,
            ));
        };
        if shared {
            ctx.aliases.declare(target_id, ty, None);
        }
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            ctx.path.push(index);
            let value = self.bind(*item, element, ctx);
            ctx.path.pop();
            out.push(value?);
        }
        Ok(Value::Sequence(out))
    }

    fn bind_dictionary(
        &self,
        target_id: NodeId,
        target: &Node,
        ty: &TypeDescriptor,
        value_ty: &TypeDescriptor,
        shared: bool,
        ctx: &mut ResolutionContext,
    ) -> Result<Value, Error> {
        if !matches!(target.kind, NodeKind::Mapping(_)) {
            return Err(locate(
                Error::type_mismatch(Shape::Mapping, shape_of(target)),
                &ctx.path,
                target,
            ));
        }
        if shared {
            ctx.aliases.declare(target_id, ty, None);
        }
        let entries = self.effective_entries(target_id, ctx)?;
        let mut out: Vec<(String, Value)> = Vec::with_capacity(entries.len());
        for entry in entries.iter() {
            let Some(key) = entry.text.clone() else {
                let key_node = self.node(entry.key)?;
                let actual = self
                    .doc
                    .resolve(entry.key)
                    .and_then(|id| self.doc.get(id))
                    .map(shape_of)
                    .unwrap_or(Shape::Scalar);
                return Err(locate(
                    Error::type_mismatch(Shape::Scalar, actual),
                    &ctx.path,
                    key_node,
                ));
            };
            let existing = out.iter().position(|(k, _)| *k == key);
            if existing.is_some() && !self.accept_duplicate(&key, entry.key, &ctx.path)? {
                continue;
            }
            ctx.path.push(key.as_str());
            let value = self.bind(entry.value, value_ty, ctx);
            ctx.path.pop();
            let value = value?;
            match existing {
                Some(pos) => out[pos].1 = value,
                None => out.push((key, value)),
            }
        }
        Ok(Value::Dictionary(out))
    }

    fn bind_object(
        &self,
        target_id: NodeId,
        target: &Node,
        ty: &TypeDescriptor,
        descriptor: &ObjectDescriptor,
        shared: bool,
        ctx: &mut ResolutionContext,
    ) -> Result<Value, Error> {
        if !matches!(target.kind, NodeKind::Mapping(_)) {
            return Err(locate(
                Error::type_mismatch(Shape::Mapping, shape_of(target)),
                &ctx.path,
                target,
            ));
        }

        // Allocated before the members are bound so that aliases inside can refer to it.
        let id = ctx.graph.allocate(descriptor.name.clone(), Vec::new());
        if shared {
            let handle = descriptor.by_reference.then_some(id);
            ctx.aliases.declare(target_id, ty, handle);
        }

        let mut fields: Vec<_> = descriptor
            .members
            .iter()
            .map(|m| (m.name.clone(), m.ty.default_value(self.settings.types)))
            .collect();
        let keys: Vec<String> = descriptor
            .members
            .iter()
            .map(|m| self.settings.naming.apply(&m.name))
            .collect();
        let mut assigned = vec![false; keys.len()];

        let entries = self.effective_entries(target_id, ctx)?;
        for entry in entries.iter() {
            let key = entry.text.as_deref();
            // First declared member wins if the convention maps two members to one key.
            let Some(index) = key.and_then(|k| keys.iter().position(|m| m == k)) else {
                let shown = key.unwrap_or("<non-scalar key>");
                if self.settings.options.strict_members {
                    let key_node = self.node(entry.key)?;
                    return Err(locate(
                        Error::unknown_member(shown, &descriptor.name),
                        &ctx.path,
                        key_node,
                    ));
                }
                tracing::trace!(
                    key = shown,
                    type_name = %descriptor.name,
                    path = %ctx.path,
                    "ignoring unknown member"
                );
                continue;
            };
            if assigned[index] && !self.accept_duplicate(&keys[index], entry.key, &ctx.path)? {
                continue;
            }
            ctx.path.push(keys[index].as_str());
            let value = self.bind(entry.value, &descriptor.members[index].ty, ctx);
            ctx.path.pop();
            fields[index].1 = value?;
            assigned[index] = true;
        }

        ctx.graph.set_fields(id, fields);
        Ok(Value::Object(id))
    }

    /// Apply the duplicate key policy to a key seen before. Returns whether the new entry
    /// should be bound.
    fn accept_duplicate(&self, key: &str, key_node: NodeId, path: &Path) -> Result<bool, Error> {
        match self.settings.options.duplicate_keys {
            DuplicateKeyPolicy::Error => {
                let node = self.node(key_node)?;
                Err(locate(Error::duplicate_key(key), path, node))
            }
            DuplicateKeyPolicy::FirstWins => Ok(false),
            DuplicateKeyPolicy::LastWins => Ok(true),
        }
    }

    /// Entries of a mapping with merge keys (`<<`) expanded. Merged entries come first and
    /// are dropped when the mapping spells the same key explicitly. Among several merged
    /// mappings the earlier one wins.
    ///
    /// Each mapping is expanded at most once per call. Nested merge levels count against
    /// `max_depth` like nested nodes.
    fn effective_entries(
        &self,
        mapping: NodeId,
        ctx: &mut ResolutionContext,
    ) -> Result<Rc<[Entry]>, Error> {
        let mut visiting = Vec::new();
        let (entries, _) = self.expand_entries(mapping, &mut visiting, ctx)?;
        Ok(entries)
    }

    /// Returns the entries and whether a merge cycle was cut while computing them. Results
    /// that depend on a cut are not cached, since they depend on where expansion started.
    fn expand_entries(
        &self,
        mapping: NodeId,
        visiting: &mut Vec<NodeId>,
        ctx: &mut ResolutionContext,
    ) -> Result<(Rc<[Entry]>, bool), Error> {
        if let Some(entries) = ctx.merged.get(&mapping) {
            return Ok((Rc::clone(entries), false));
        }
        let node = self.node(mapping)?;
        let NodeKind::Mapping(pairs) = &node.kind else {
            return Ok((Rc::from(Vec::new()), false));
        };
        visiting.push(mapping);
        let result = self.expand_pairs(node, pairs, visiting, ctx);
        visiting.pop();
        let (entries, cut) = result?;
        let entries: Rc<[Entry]> = entries.into();
        if !cut {
            ctx.merged.insert(mapping, Rc::clone(&entries));
        }
        Ok((entries, cut))
    }

    fn expand_pairs(
        &self,
        node: &Node,
        pairs: &[(NodeId, NodeId)],
        visiting: &mut Vec<NodeId>,
        ctx: &mut ResolutionContext,
    ) -> Result<(Vec<Entry>, bool), Error> {
        let max_depth = self.settings.options.max_depth;
        if ctx.depth + visiting.len().saturating_sub(1) > max_depth {
            return Err(locate(Error::depth_exceeded(max_depth), &ctx.path, node));
        }

        let mut sink = MergeSink::default();
        let mut explicit: Vec<Entry> = Vec::with_capacity(pairs.len());
        let mut cut = false;
        for (key, value) in pairs {
            if self.is_merge_key(*key) {
                cut |= self.collect_merge(*value, true, &mut sink, visiting, ctx)?;
            } else {
                explicit.push(Entry {
                    key: *key,
                    value: *value,
                    text: self.key_text(*key),
                });
            }
        }
        if sink.entries.is_empty() {
            return Ok((explicit, cut));
        }
        let mut entries: Vec<Entry> = {
            let spelled: AHashSet<&str> =
                explicit.iter().filter_map(|e| e.text.as_deref()).collect();
            sink.entries
                .into_iter()
                .filter(|m| m.text.as_deref().is_none_or(|t| !spelled.contains(t)))
                .collect()
        };
        entries.extend(explicit);
        Ok((entries, cut))
    }

    /// Offer the entries of one `<<` value to `sink`. Returns whether a merge cycle was cut.
    fn collect_merge(
        &self,
        source: NodeId,
        allow_sequence: bool,
        sink: &mut MergeSink,
        visiting: &mut Vec<NodeId>,
        ctx: &mut ResolutionContext,
    ) -> Result<bool, Error> {
        let site = self.node(source)?;
        let Some(target_id) = self.doc.resolve(source) else {
            return Err(locate(
                Error::msg("alias chain does not end in a node"),
                &ctx.path,
                site,
            ));
        };
        let target = self.node(target_id)?;
        match &target.kind {
            NodeKind::Mapping(_) => {
                // A mapping already being expanded adds nothing.
                if visiting.contains(&target_id) {
                    tracing::trace!(node = target_id.index(), path = %ctx.path, "merge cycle cut");
                    return Ok(true);
                }
                let (entries, cut) = self.expand_entries(target_id, visiting, ctx)?;
                for entry in entries.iter() {
                    sink.offer(entry);
                }
                Ok(cut)
            }
            NodeKind::Sequence(items) if allow_sequence => {
                let mut cut = false;
                for item in items {
                    cut |= self.collect_merge(*item, false, sink, visiting, ctx)?;
                }
                Ok(cut)
            }
            _ => Err(locate(
                Error::type_mismatch(Shape::Mapping, shape_of(target)),
                &ctx.path,
                site,
            )),
        }
    }

    fn is_merge_key(&self, key: NodeId) -> bool {
        let Some(node) = self.doc.resolve(key).and_then(|id| self.doc.get(id)) else {
            return false;
        };
        match &node.kind {
            NodeKind::Scalar { value, style } => {
                tags::is_merge_tag(node.tag.as_deref())
                    || (*style == ScalarStyle::Plain && node.tag.is_none() && value == "<<")
            }
            _ => false,
        }
    }

    fn key_text(&self, key: NodeId) -> Option<String> {
        self.doc
            .resolve(key)
            .and_then(|id| self.doc.get(id))
            .and_then(Node::as_scalar)
            .map(str::to_owned)
    }
}

fn shape_of(node: &Node) -> Shape {
    node.shape().unwrap_or(Shape::Scalar)
}

fn locate(err: Error, path: &Path, node: &Node) -> Error {
    err.with_path(path).with_location(node.location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::compose_str;
    use crate::descriptor::EnumDescriptor;
    use crate::naming::{CamelCase, NullNaming};
    use crate::scalar::ScalarConverter;
    use crate::value::ObjectRef;
    use indoc::indoc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Fixture {
        types: TypeRegistry,
        mappings: TypeMappingRegistry,
        converters: ScalarConverterChain,
        options: Options,
    }

    impl Fixture {
        fn new() -> Self {
            let mut types = TypeRegistry::new();
            types.register_object(
                ObjectDescriptor::new("Node")
                    .member("Name", TypeDescriptor::string())
                    .member("Next", TypeDescriptor::object("Node")),
            );
            types.register_object(
                ObjectDescriptor::new("Point")
                    .by_value()
                    .member("X", TypeDescriptor::i32())
                    .member("Y", TypeDescriptor::i32())
                    .member("Peer", TypeDescriptor::object("Point")),
            );
            types.register_object(
                ObjectDescriptor::new("Car")
                    .member("Name", TypeDescriptor::string())
                    .member("Year", TypeDescriptor::i32())
                    .member("Drive", TypeDescriptor::enumeration("Drive")),
            );
            types.register_enum(EnumDescriptor::new("Drive", &["Front", "Rear", "All"]));
            let mut mappings = TypeMappingRegistry::new();
            mappings.register("ICar", "Car");
            Self {
                types,
                mappings,
                converters: ScalarConverterChain::new(),
                options: Options::default(),
            }
        }

        fn bind_with(
            &self,
            naming: &dyn NamingConvention,
            doc: &Document,
            ty: &TypeDescriptor,
        ) -> Result<Bound, Error> {
            let settings = BindSettings {
                types: &self.types,
                mappings: &self.mappings,
                naming,
                converters: &self.converters,
                options: &self.options,
            };
            ObjectGraphBuilder::new(doc, settings).bind_root(ty)
        }

        fn bind(&self, yaml: &str, ty: &TypeDescriptor) -> Result<Bound, Error> {
            let doc = compose_str(yaml, &self.options)?.unwrap_or_default();
            self.bind_with(&CamelCase, &doc, ty)
        }
    }

    #[test]
    fn capability_binds_mapped_concrete_type() {
        let fx = Fixture::new();
        let bound = fx
            .bind("name: Mercedes\nyear: 2018\ndrive: all\n", &TypeDescriptor::capability("ICar"))
            .unwrap();
        let car = bound.root_object().unwrap();
        assert_eq!(car.type_name(), "Car");
        assert_eq!(car.get::<String>("Name").unwrap(), "Mercedes");
        assert_eq!(car.get::<i64>("Year").unwrap(), 2018);
        assert_eq!(car.get::<String>("Drive").unwrap(), "All");
    }

    #[test]
    fn missing_members_keep_defaults() {
        let fx = Fixture::new();
        let bound = fx.bind("name: Honda\n", &TypeDescriptor::object("Car")).unwrap();
        let car = bound.root_object().unwrap();
        assert_eq!(car.get::<i32>("Year").unwrap(), 0);
        assert_eq!(car.get::<String>("Drive").unwrap(), "Front");
    }

    #[test]
    fn unmapped_capability_fails_with_its_name() {
        let fx = Fixture::new();
        let err = fx
            .bind("a: 1\n", &TypeDescriptor::capability("IEngine"))
            .unwrap_err();
        match err {
            Error::UnresolvedTypeMapping { type_name, .. } => assert_eq!(type_name, "IEngine"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn self_alias_yields_same_instance() {
        let fx = Fixture::new();
        let bound = fx
            .bind(
                indoc! {"
                    &n
                    name: loop
                    next: *n
                "},
                &TypeDescriptor::object("Node"),
            )
            .unwrap();
        let node = bound.root_object().unwrap();
        let next = node.object("Next").unwrap();
        assert!(node.same_instance(&next));
        assert_eq!(bound.graph.len(), 1);
    }

    #[test]
    fn value_types_cannot_close_a_cycle() {
        let fx = Fixture::new();
        let err = fx
            .bind(
                indoc! {"
                    &p
                    x: 1
                    peer: *p
                "},
                &TypeDescriptor::object("Point"),
            )
            .unwrap_err();
        assert!(
            matches!(
                err,
                Error::CyclicReferenceUnsupported { ref type_name, .. } if type_name == "Point"
            ),
            "{err:?}"
        );
        assert_eq!(err.path().map(|p| p.to_string()).as_deref(), Some("peer"));
    }

    #[test]
    fn structural_cycle_hits_depth_limit() {
        let mut fx = Fixture::new();
        fx.options.max_depth = 16;
        let mut doc = Document::new();
        let map = doc.push_mapping(Vec::new());
        let key = doc.push_scalar("Next");
        doc.set_entries(map, vec![(key, map)]);
        doc.set_root(map);
        let err = fx
            .bind_with(&NullNaming, &doc, &TypeDescriptor::object("Node"))
            .unwrap_err();
        match err {
            Error::DepthExceeded { max_depth, path, .. } => {
                assert_eq!(max_depth, 16);
                assert_eq!(path.len(), 16);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn merge_keys_apply_before_explicit_keys() {
        let fx = Fixture::new();
        let yaml = indoc! {"
            base: &base
              name: Generic
              year: 2000
            car:
              <<: *base
              year: 2020
        "};
        let ty = TypeDescriptor::dictionary(TypeDescriptor::object("Car"));
        let bound = fx.bind(yaml, &ty).unwrap();
        let entries = bound.root.as_dictionary().unwrap();
        assert_eq!(entries[1].0, "car");
        let car = ObjectRef::from_value(&entries[1].1, &bound.graph).unwrap();
        assert_eq!(car.get::<String>("Name").unwrap(), "Generic");
        assert_eq!(car.get::<i32>("Year").unwrap(), 2020);
    }

    #[test]
    fn duplicate_keys_follow_policy() {
        let mut fx = Fixture::new();
        let yaml = "name: A\nname: B\n";
        let ty = TypeDescriptor::object("Car");

        let bound = fx.bind(yaml, &ty).unwrap();
        assert_eq!(bound.root_object().unwrap().get::<String>("Name").unwrap(), "B");

        fx.options.duplicate_keys = DuplicateKeyPolicy::FirstWins;
        let bound = fx.bind(yaml, &ty).unwrap();
        assert_eq!(bound.root_object().unwrap().get::<String>("Name").unwrap(), "A");

        fx.options.duplicate_keys = DuplicateKeyPolicy::Error;
        let err = fx.bind(yaml, &ty).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { ref key, .. } if key == "name"));
        assert_eq!(err.location().map(|l| l.line()), Some(2));
    }

    #[test]
    fn null_scalars_bind_to_null_for_containers() {
        let fx = Fixture::new();
        let ty = TypeDescriptor::dictionary(TypeDescriptor::optional(TypeDescriptor::i32()));
        let bound = fx.bind("a: ~\nb: 3\n", &ty).unwrap();
        assert_eq!(
            bound.root,
            Value::Dictionary(vec![("a".into(), Value::Null), ("b".into(), Value::Int(3))])
        );
        let bound = fx.bind("~\n", &TypeDescriptor::object("Car")).unwrap();
        assert_eq!(bound.root, Value::Null);
    }

    #[test]
    fn shape_mismatch_reports_expected_and_actual() {
        let fx = Fixture::new();
        let err = fx
            .bind("[1, 2]\n", &TypeDescriptor::object("Car"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch {
                expected: Shape::Mapping,
                actual: Shape::Sequence,
                ..
            }
        ));
    }

    #[test]
    fn anchored_node_bound_as_two_types() {
        let fx = Fixture::new();
        let yaml = "- &v 42\n- *v\n";
        let ty = TypeDescriptor::sequence(TypeDescriptor::i32());
        let bound = fx.bind(yaml, &ty).unwrap();
        assert_eq!(bound.root, Value::Sequence(vec![Value::Int(42), Value::Int(42)]));
        let ty = TypeDescriptor::sequence(TypeDescriptor::string());
        let bound = fx.bind(yaml, &ty).unwrap();
        assert_eq!(
            bound.root,
            Value::Sequence(vec![Value::String("42".into()), Value::String("42".into())])
        );
    }

    #[derive(Debug)]
    struct CountingInts(Arc<AtomicUsize>);

    impl ScalarConverter for CountingInts {
        fn can_handle(&self, target: &TypeDescriptor) -> bool {
            *target == TypeDescriptor::i32()
        }

        fn convert(
            &self,
            scalar: &ScalarInput<'_>,
            target: &TypeDescriptor,
            _ctx: &ConvertContext<'_>,
        ) -> Result<Value, Error> {
            self.0.fetch_add(1, Ordering::Relaxed);
            scalar
                .text
                .parse()
                .map(Value::Int)
                .map_err(|_| Error::scalar_conversion(scalar.text, target))
        }
    }

    #[test]
    fn aliased_sequence_is_bound_once_and_cloned() {
        let mut fx = Fixture::new();
        let calls = Arc::new(AtomicUsize::new(0));
        fx.converters.push(Arc::new(CountingInts(Arc::clone(&calls))));
        let yaml = indoc! {"
            first: &s [1, 2, 3]
            second: *s
        "};
        let ty = TypeDescriptor::dictionary(TypeDescriptor::sequence(TypeDescriptor::i32()));
        let bound = fx.bind(yaml, &ty).unwrap();
        let entries = bound.root.as_dictionary().unwrap();
        assert_eq!(entries[0].1, entries[1].1);
        assert_eq!(
            entries[1].1,
            Value::Sequence(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        assert_eq!(calls.load(Ordering::Relaxed), 3);
        assert!(bound.graph.is_empty());
    }

    #[test]
    fn repeated_merge_sources_keep_each_key_once() {
        let fx = Fixture::new();
        let yaml = indoc! {"
            base: &base
              ? [x, y]
              : 1
              name: Base
            twice: &twice
              <<: [*base, *base]
            derived:
              <<: [*twice, *base, *twice]
              year: 2000
        "};
        let doc = compose_str(yaml, &fx.options).unwrap().unwrap();
        let settings = BindSettings {
            types: &fx.types,
            mappings: &fx.mappings,
            naming: &CamelCase,
            converters: &fx.converters,
            options: &fx.options,
        };
        let builder = ObjectGraphBuilder::new(&doc, settings);
        let root = doc.root().unwrap();
        let NodeKind::Mapping(pairs) = &doc.get(root).unwrap().kind else {
            panic!("root is a mapping");
        };
        let mut ctx = ResolutionContext::new();
        let entries = builder.effective_entries(pairs[2].1, &mut ctx).unwrap();
        let texts: Vec<_> = entries.iter().map(|e| e.text.as_deref()).collect();
        assert_eq!(texts, [None, Some("name"), Some("year")]);
        // base, twice and derived are each expanded once.
        assert_eq!(ctx.merged.len(), 3);
    }

    #[test]
    fn merge_cycles_contribute_nothing_and_are_not_cached() {
        let fx = Fixture::new();
        // a merges b and b merges a. Text cannot alias forward, so wire it by hand.
        let mut doc = Document::new();
        let a = doc.push_mapping(Vec::new());
        let b = doc.push_mapping(Vec::new());
        let merge_a = doc.push_scalar("<<");
        let merge_b = doc.push_scalar("<<");
        let name = doc.push_scalar("name");
        let name_value = doc.push_scalar("A");
        let year = doc.push_scalar("year");
        let year_value = doc.push_scalar("2001");
        doc.set_entries(a, vec![(merge_a, b), (name, name_value)]);
        doc.set_entries(b, vec![(merge_b, a), (year, year_value)]);
        doc.set_root(a);

        let settings = BindSettings {
            types: &fx.types,
            mappings: &fx.mappings,
            naming: &CamelCase,
            converters: &fx.converters,
            options: &fx.options,
        };
        let builder = ObjectGraphBuilder::new(&doc, settings);
        let mut ctx = ResolutionContext::new();
        let from_a = builder.effective_entries(a, &mut ctx).unwrap();
        let texts: Vec<_> = from_a.iter().map(|e| e.text.as_deref()).collect();
        assert_eq!(texts, [Some("year"), Some("name")]);
        assert!(ctx.merged.is_empty());

        let from_b = builder.effective_entries(b, &mut ctx).unwrap();
        let texts: Vec<_> = from_b.iter().map(|e| e.text.as_deref()).collect();
        assert_eq!(texts, [Some("name"), Some("year")]);
    }

    #[test]
    fn nested_merges_count_against_max_depth() {
        let mut fx = Fixture::new();
        fx.options.max_depth = 4;
        let yaml = indoc! {"
            - &m0 {k0: 0}
            - &m1 {<<: *m0, k1: 1}
            - &m2 {<<: *m1, k2: 2}
            - &m3 {<<: *m2, k3: 3}
        "};
        let doc = compose_str(yaml, &fx.options).unwrap().unwrap();
        let settings = BindSettings {
            types: &fx.types,
            mappings: &fx.mappings,
            naming: &CamelCase,
            converters: &fx.converters,
            options: &fx.options,
        };
        let builder = ObjectGraphBuilder::new(&doc, settings);
        let root = doc.root().unwrap();
        let NodeKind::Sequence(items) = &doc.get(root).unwrap().kind else {
            panic!("root is a sequence");
        };
        let mut ctx = ResolutionContext::new();
        ctx.depth = 2;
        // m2 nests two merge levels: 2 + 2 stays within 4.
        assert_eq!(builder.effective_entries(items[2], &mut ctx).unwrap().len(), 3);

        let mut ctx = ResolutionContext::new();
        ctx.depth = 2;
        let err = builder.effective_entries(items[3], &mut ctx).unwrap_err();
        assert!(matches!(err, Error::DepthExceeded { max_depth: 4, .. }), "{err:?}");
    }
}
