//! Composing YAML text into [`Document`] node trees.
//!
//! Responsibilities
//! - Drive `saphyr_parser::Parser` and hide stream/document markers.
//! - Build one arena per document; anchors are per document.
//! - Register anchors when their node *starts*, so an alias inside the anchored node
//!   (recursive YAML) points back at it.
//! - Enforce the [`Budget`](crate::budget::Budget) on raw events.
//! - Attach the source location of every node.

use ahash::AHashMap;
use saphyr_parser::{Event, Parser, StrInput};

use crate::budget::BudgetEnforcer;
use crate::error::Error;
use crate::location::{Location, location_from_span};
use crate::node::{Document, Node, NodeId, NodeKind, ScalarStyle};
use crate::options::Options;

/// Container whose children are still being read.
enum Frame {
    Sequence {
        id: NodeId,
        items: Vec<NodeId>,
    },
    Mapping {
        id: NodeId,
        entries: Vec<(NodeId, NodeId)>,
        pending_key: Option<NodeId>,
    },
}

struct Composer<'a> {
    parser: Parser<'a, StrInput<'a>>,
    budget: Option<BudgetEnforcer>,
    doc: Document,
    anchors: AHashMap<usize, NodeId>,
    stack: Vec<Frame>,
    documents: Vec<Document>,
}

impl<'a> Composer<'a> {
    fn new(input: &'a str, options: &Options) -> Self {
        Self {
            parser: Parser::new_from_str(input),
            budget: options.budget.clone().map(BudgetEnforcer::new),
            doc: Document::new(),
            anchors: AHashMap::new(),
            stack: Vec::new(),
            documents: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Document>, Error> {
        while let Some(item) = self.parser.next() {
            let (event, span) = item.map_err(Error::from_scan_error)?;
            let location = location_from_span(&span);

            if let Some(budget) = self.budget.as_mut() {
                budget
                    .observe(&event)
                    .map_err(|breach| Error::budget(breach).with_location(location))?;
            }

            match event {
                Event::StreamStart | Event::StreamEnd | Event::Nothing => {}
                Event::DocumentStart(_) => self.start_document(),
                Event::DocumentEnd => self.finish_document(),
                Event::Scalar(value, style, anchor_id, tag) => {
                    let style = ScalarStyle::from(style);
                    let node = Node {
                        kind: NodeKind::Scalar {
                            value: value.into_owned(),
                            style,
                        },
                        anchor: (anchor_id != 0).then_some(anchor_id),
                        tag: tag.map(|t| t.to_string()),
                        location,
                    };
                    let id = self.doc.push(node);
                    self.register_anchor(anchor_id, id);
                    self.attach(id);
                }
                Event::SequenceStart(anchor_id, tag) => {
                    let id = self.start_container(
                        NodeKind::Sequence(Vec::new()),
                        anchor_id,
                        tag.map(|t| t.to_string()),
                        location,
                    );
                    self.stack.push(Frame::Sequence {
                        id,
                        items: Vec::new(),
                    });
                }
                Event::MappingStart(anchor_id, tag) => {
                    let id = self.start_container(
                        NodeKind::Mapping(Vec::new()),
                        anchor_id,
                        tag.map(|t| t.to_string()),
                        location,
                    );
                    self.stack.push(Frame::Mapping {
                        id,
                        entries: Vec::new(),
                        pending_key: None,
                    });
                }
                Event::SequenceEnd | Event::MappingEnd => {
                    let id = match self.stack.pop() {
                        Some(Frame::Sequence { id, items }) => {
                            self.doc.set_items(id, items);
                            id
                        }
                        Some(Frame::Mapping { id, entries, .. }) => {
                            self.doc.set_entries(id, entries);
                            id
                        }
                        None => {
                            return Err(
                                Error::msg("unbalanced container end").with_location(location)
                            );
                        }
                    };
                    self.attach(id);
                }
                Event::Alias(anchor_id) => {
                    let target = *self
                        .anchors
                        .get(&anchor_id)
                        .ok_or_else(|| Error::unknown_anchor(anchor_id).with_location(location))?;
                    let mut node = Node::new(NodeKind::Alias(target));
                    node.location = location;
                    let id = self.doc.push(node);
                    self.attach(id);
                }
            }
        }

        if let Some(budget) = self.budget.take() {
            let report = budget.finalize();
            tracing::trace!(
                events = report.events,
                nodes = report.nodes,
                aliases = report.aliases,
                max_depth = report.max_depth,
                "composed within budget"
            );
        }
        // Streams that end without an explicit document end still carry their content.
        self.finish_document();
        Ok(self.documents)
    }

    fn start_container(
        &mut self,
        kind: NodeKind,
        anchor_id: usize,
        tag: Option<String>,
        location: Location,
    ) -> NodeId {
        let node = Node {
            kind,
            anchor: (anchor_id != 0).then_some(anchor_id),
            tag,
            location,
        };
        let id = self.doc.push(node);
        self.register_anchor(anchor_id, id);
        id
    }

    fn register_anchor(&mut self, anchor_id: usize, id: NodeId) {
        if anchor_id != 0 {
            self.anchors.insert(anchor_id, id);
        }
    }

    fn attach(&mut self, id: NodeId) {
        match self.stack.last_mut() {
            None => self.doc.set_root(id),
            Some(Frame::Sequence { items, .. }) => items.push(id),
            Some(Frame::Mapping {
                entries,
                pending_key,
                ..
            }) => match pending_key.take() {
                Some(key) => entries.push((key, id)),
                None => *pending_key = Some(id),
            },
        }
    }

    fn start_document(&mut self) {
        self.finish_document();
    }

    fn finish_document(&mut self) {
        self.stack.clear();
        self.anchors.clear();
        let doc = std::mem::take(&mut self.doc);
        if !doc.is_empty() {
            self.documents.push(doc);
        }
    }
}

/// Compose every non-empty document of a YAML stream.
pub fn compose_all(input: &str, options: &Options) -> Result<Vec<Document>, Error> {
    let input = input.strip_prefix('\u{FEFF}').unwrap_or(input);
    Composer::new(input, options).run()
}

/// Compose a single-document stream. Empty input yields `Ok(None)`; more than one
/// document fails with [`Error::MultipleDocuments`].
pub fn compose_str(input: &str, options: &Options) -> Result<Option<Document>, Error> {
    let mut documents = compose_all(input, options)?;
    match documents.len() {
        0 => Ok(None),
        1 => Ok(documents.pop()),
        n => Err(Error::MultipleDocuments { documents: n }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::BudgetBreach;
    use indoc::indoc;

    fn compose(text: &str) -> Document {
        compose_str(text, &Options::default())
            .unwrap()
            .expect("document")
    }

    fn scalar_text(doc: &Document, id: NodeId) -> &str {
        doc.get(id).and_then(Node::as_scalar).unwrap()
    }

    #[test]
    fn mapping_entries_keep_document_order() {
        let doc = compose(indoc! {"
            name: Jack
            age: 42
            city: Ghent
        "});
        let root = doc.get(doc.root().unwrap()).unwrap();
        let NodeKind::Mapping(entries) = &root.kind else {
            panic!("expected mapping, got {:?}", root.kind);
        };
        let keys: Vec<&str> = entries.iter().map(|(k, _)| scalar_text(&doc, *k)).collect();
        assert_eq!(keys, ["name", "age", "city"]);
        assert_eq!(doc.get(entries[1].1).unwrap().location, Location::new(2, 6));
    }

    #[test]
    fn aliases_point_at_the_anchored_node() {
        let doc = compose(indoc! {"
            base: &b {x: 1}
            copy: *b
        "});
        let root = doc.get(doc.root().unwrap()).unwrap();
        let NodeKind::Mapping(entries) = &root.kind else {
            panic!("expected mapping");
        };
        let anchored = entries[0].1;
        assert!(doc.get(anchored).unwrap().anchor.is_some());
        assert_eq!(doc.get(entries[1].1).unwrap().kind, NodeKind::Alias(anchored));
        assert_eq!(doc.resolve(entries[1].1), Some(anchored));
    }

    #[test]
    fn recursive_alias_resolves_to_enclosing_node() {
        let doc = compose(indoc! {"
            &me
            name: loop
            self: *me
        "});
        let root_id = doc.root().unwrap();
        let NodeKind::Mapping(entries) = &doc.get(root_id).unwrap().kind else {
            panic!("expected mapping");
        };
        assert_eq!(doc.get(entries[1].1).unwrap().kind, NodeKind::Alias(root_id));
    }

    #[test]
    fn unknown_alias_is_reported_with_location() {
        let err = compose_str("a: *nope\n", &Options::default()).unwrap_err();
        assert!(
            matches!(err, Error::UnknownAnchor { .. }) || matches!(err, Error::Message { .. }),
            "{err:?}"
        );
        assert!(err.location().is_some());
    }

    #[test]
    fn scalar_styles_and_tags_are_kept() {
        let doc = compose("- 'quoted'\n- !!str 5\n- plain\n");
        let NodeKind::Sequence(items) = &doc.get(doc.root().unwrap()).unwrap().kind else {
            panic!("expected sequence");
        };
        let quoted = doc.get(items[0]).unwrap();
        assert!(matches!(
            quoted.kind,
            NodeKind::Scalar {
                style: ScalarStyle::SingleQuoted,
                ..
            }
        ));
        assert!(doc.get(items[1]).unwrap().tag.is_some());
        assert!(doc.get(items[2]).unwrap().tag.is_none());
    }

    #[test]
    fn multiple_documents() {
        let text = "---\na: 1\n---\nb: 2\n";
        assert_eq!(compose_all(text, &Options::default()).unwrap().len(), 2);
        assert!(matches!(
            compose_str(text, &Options::default()),
            Err(Error::MultipleDocuments { documents: 2 })
        ));
    }

    #[test]
    fn empty_input_has_no_document() {
        assert!(compose_str("", &Options::default()).unwrap().is_none());
        assert!(compose_all("# only a comment\n", &Options::default()).unwrap().is_empty());
    }

    #[test]
    fn anchors_are_per_document() {
        let text = "--- &a 1\n--- *a\n";
        assert!(compose_all(text, &Options::default()).is_err());
    }

    #[test]
    fn budget_breach_stops_composition() {
        let options = crate::options! {
            budget: Some(crate::budget! { max_aliases: 1 }),
        };
        let err = compose_str("a: &x 1\nb: *x\nc: *x\n", &options).unwrap_err();
        assert!(matches!(
            err,
            Error::Budget {
                breach: BudgetBreach::Aliases { aliases: 2 },
                ..
            }
        ));
    }

    #[test]
    fn scan_errors_carry_location() {
        let err = compose_str("a: [1, 2\n", &Options::default()).unwrap_err();
        assert!(matches!(err, Error::Message { .. }));
        assert!(err.location().is_some());
    }
}
