//! Cursor-location classification.
//!
//! [`resolve`] turns "offset N in this tree" into a [`ResolvedLocation`]:
//! what kind of thing may be typed at the cursor (a new child element, an
//! attribute name, an attribute value) and which span of text a chosen
//! completion replaces.  Providers only ever look at the location through
//! the predicates defined here.
//!
//! The resolver is a pure function over an immutable tree, so any number of
//! concurrent completion requests can call it under the document read lock.

use std::sync::Arc;

use crate::parser::{NodeId, NodeKind, SyntaxTree};
use crate::util::{TextRange, is_name_char, name_end_after, name_start_before};

/// Elements that hold child elements rather than text.
const CONTAINER_ELEMENTS: &[&str] = &[
    "Project",
    "PropertyGroup",
    "ItemGroup",
    "ItemDefinitionGroup",
    "ImportGroup",
    "Target",
    "Choose",
    "When",
    "Otherwise",
    "UsingTask",
    "ParameterGroup",
];

/// The syntactic context at the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationKind {
    /// An empty (or partially typed) slot for a new child element of
    /// `parent`.  The slot is synthetic: no node exists there yet.
    ElementSlot { parent: NodeId },
    /// A position inside `element`'s start tag where a new attribute name
    /// can go.
    AttributeSlot { element: NodeId },
    /// Inside the value of `attribute` on `element`.
    AttributeValue { element: NodeId, attribute: String },
}

/// Where the cursor is and what a completion there would replace.
#[derive(Debug, Clone)]
pub struct ResolvedLocation {
    tree: Arc<SyntaxTree>,
    offset: usize,
    kind: LocationKind,
    replace_range: TextRange,
    partial: String,
}

impl ResolvedLocation {
    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn kind(&self) -> &LocationKind {
        &self.kind
    }

    /// The span a completion overwrites.  Zero-width for pure insertion.
    pub fn replace_range(&self) -> TextRange {
        self.replace_range
    }

    /// What the user has typed so far (without a leading `<`).
    pub fn partial(&self) -> &str {
        &self.partial
    }

    /// The element whose content, start tag or attribute holds the cursor.
    pub fn nearest_element(&self) -> NodeId {
        match &self.kind {
            LocationKind::ElementSlot { parent } => *parent,
            LocationKind::AttributeSlot { element } => *element,
            LocationKind::AttributeValue { element, .. } => *element,
        }
    }

    pub fn nearest_element_name(&self) -> &str {
        &self.tree.node(self.nearest_element()).name
    }

    /// Names of the nearest element and its ancestors, innermost first.
    pub fn ancestor_names(&self) -> impl Iterator<Item = &str> + '_ {
        let nearest = self.nearest_element();
        std::iter::once(nearest)
            .chain(self.tree.ancestors(nearest))
            .map(|id| self.tree.node(id).name.as_str())
    }

    /// Parent element of a new-element slot.
    pub fn element_slot_parent(&self) -> Option<NodeId> {
        match self.kind {
            LocationKind::ElementSlot { parent } => Some(parent),
            _ => None,
        }
    }

    /// Is this a valid slot for a direct child element of an element
    /// named `name`?
    pub fn is_element_slot_under(&self, name: &str) -> bool {
        self.element_slot_parent()
            .is_some_and(|parent| self.tree.node(parent).name == name)
    }

    /// Element whose start tag can take a new attribute here.
    pub fn attribute_slot_element(&self) -> Option<NodeId> {
        match self.kind {
            LocationKind::AttributeSlot { element } => Some(element),
            _ => None,
        }
    }

    /// Is the cursor inside the value of attribute `attribute` on an
    /// element named `element`?
    pub fn is_attribute_value(&self, element: &str, attribute: &str) -> bool {
        self.attribute_value()
            .is_some_and(|(owner, name)| name == attribute && self.tree.node(owner).name == element)
    }

    /// `(owning element, attribute name)` when inside an attribute value.
    pub fn attribute_value(&self) -> Option<(NodeId, &str)> {
        match &self.kind {
            LocationKind::AttributeValue { element, attribute } => {
                Some((*element, attribute.as_str()))
            }
            _ => None,
        }
    }

    /// Attribute names already present on the element being edited.
    pub fn existing_attribute_names(&self) -> Vec<&str> {
        self.tree
            .attributes(self.nearest_element())
            .iter()
            .map(|&a| self.tree.node(a).name.as_str())
            .collect()
    }
}

/// Classify the cursor at byte `offset`.
///
/// Returns `None` wherever nothing can be completed: inside comments,
/// inside the text of a leaf element, outside the document element, on the
/// name of an already-finished element, or when `text` is not the text the
/// tree was parsed from.
pub fn resolve(tree: &Arc<SyntaxTree>, text: &str, offset: usize) -> Option<ResolvedLocation> {
    if text.len() != tree.text_len() || offset > text.len() || !text.is_char_boundary(offset) {
        return None;
    }
    let root = tree.root()?;
    if tree.top_level().iter().any(|&id| {
        let node = tree.node(id);
        node.kind() == NodeKind::Comment && node.range.strictly_contains(offset)
    }) {
        return None;
    }

    let resolver = Resolver {
        tree: tree.as_ref(),
        text,
        offset,
    };
    let root_range = tree.node(root).range;
    if offset <= root_range.start || offset > root_range.end {
        return None;
    }
    let (kind, replace_range, partial) = resolver.in_element(root)?;
    Some(ResolvedLocation {
        tree: Arc::clone(tree),
        offset,
        kind,
        replace_range,
        partial,
    })
}

type Resolution = (LocationKind, TextRange, String);

struct Resolver<'a> {
    tree: &'a SyntaxTree,
    text: &'a str,
    offset: usize,
}

impl Resolver<'_> {
    fn in_element(&self, id: NodeId) -> Option<Resolution> {
        let node = self.tree.node(id);
        let parts = node.element()?;
        let offset = self.offset;

        let in_start_tag = if parts.start_tag_complete {
            offset > parts.start_tag.start && offset < parts.start_tag.end
        } else {
            offset > parts.start_tag.start && offset <= parts.start_tag.end
        };
        if in_start_tag {
            return self.in_start_tag(id);
        }

        match parts.content {
            Some(content) if content.touches(offset) => self.in_content(id),
            _ => None,
        }
    }

    fn in_content(&self, id: NodeId) -> Option<Resolution> {
        let offset = self.offset;
        for &child in &self.tree.node(id).children {
            let node = self.tree.node(child);
            let range = node.range;
            match node.kind() {
                NodeKind::Element => {
                    // An element that was never closed runs to the end of
                    // what the parser saw, so its end is still inside it.
                    let open = node.element().is_some_and(|p| !p.closed);
                    if range.start < offset && (offset < range.end || (open && offset == range.end))
                    {
                        return self.in_element(child);
                    }
                }
                NodeKind::Comment => {
                    let unterminated = !self.text[range.start..range.end].ends_with("-->");
                    if range.start < offset && (offset < range.end || (unterminated && offset == range.end))
                    {
                        return None;
                    }
                }
                NodeKind::Text => {
                    if range.touches(offset) && !node.is_whitespace() && !self.accepts_children(id)
                    {
                        return None;
                    }
                }
                NodeKind::Attribute => {}
            }
        }

        if !self.accepts_children(id) {
            return None;
        }
        Some(self.element_slot(id))
    }

    /// A slot for a new child of `parent`, extended over any tag or name
    /// the user is in the middle of typing.
    fn element_slot(&self, parent: NodeId) -> Resolution {
        let start = name_start_before(self.text, self.offset);
        let end = name_end_after(self.text, self.offset);
        let replace_start = if self.text[..start].ends_with('<') {
            start - 1
        } else {
            start
        };
        (
            LocationKind::ElementSlot { parent },
            TextRange::new(replace_start, end),
            self.text[start..self.offset].to_string(),
        )
    }

    fn in_start_tag(&self, id: NodeId) -> Option<Resolution> {
        let tree = self.tree;
        let parts = tree.node(id).element()?;
        let offset = self.offset;

        if offset <= parts.name_range.end {
            // Still typing the tag name: that is a new element under the
            // parent, as long as the tag was never finished.
            if parts.start_tag_complete {
                return None;
            }
            let parent = tree.parent(id)?;
            return Some((
                LocationKind::ElementSlot { parent },
                TextRange::new(parts.start_tag.start, parts.name_range.end),
                self.text[parts.name_range.start..offset].to_string(),
            ));
        }

        let mut scan_from = parts.name_range.end;
        for &attr_id in &parts.attributes {
            let attr = tree.node(attr_id);
            let Some(attr_parts) = attr.attribute() else {
                continue;
            };
            if attr_parts.value_range.touches(offset) {
                return Some((
                    LocationKind::AttributeValue {
                        element: id,
                        attribute: attr.name.clone(),
                    },
                    attr_parts.value_range,
                    self.text[attr_parts.value_range.start..offset].to_string(),
                ));
            }
            if attr_parts.name_range.touches(offset) || attr.range.strictly_contains(offset) {
                return None;
            }
            if attr.range.end <= offset {
                scan_from = attr.range.end;
            }
        }

        if !parts.start_tag_complete
            && let Some(resolution) = self.unfinished_attribute(id, scan_from)
        {
            return Some(resolution);
        }

        // Whitespace, or a bare name being typed after whitespace.
        let start = name_start_before(self.text, offset);
        let preceded_by_space = self.text[..start]
            .chars()
            .next_back()
            .is_some_and(char::is_whitespace);
        if !preceded_by_space || start < scan_from {
            return None;
        }
        let end = name_end_after(self.text, offset);
        Some((
            LocationKind::AttributeSlot { element: id },
            TextRange::new(start, end),
            self.text[start..offset].to_string(),
        ))
    }

    /// Handle `Name="partial` in a start tag the tokenizer could not finish.
    fn unfinished_attribute(&self, id: NodeId, scan_from: usize) -> Option<Resolution> {
        let offset = self.offset;
        let segment = self.text.get(scan_from..offset)?;
        let (quote_idx, quote) = segment
            .char_indices()
            .find(|&(_, c)| c == '"' || c == '\'')?;
        if segment[quote_idx + 1..].contains(quote) {
            return None;
        }

        let name = segment[..quote_idx].trim_end();
        let name = name.strip_suffix('=')?.trim();
        if name.is_empty() || !name.chars().all(is_name_char) {
            return None;
        }

        let value_start = scan_from + quote_idx + 1;
        let value_end = self.text[offset..]
            .char_indices()
            .find(|&(_, c)| c == quote || matches!(c, '<' | '>' | '\n' | '\r'))
            .map(|(idx, _)| offset + idx)
            .unwrap_or(self.text.len());
        Some((
            LocationKind::AttributeValue {
                element: id,
                attribute: name.to_string(),
            },
            TextRange::new(value_start, value_end),
            self.text[value_start..offset].to_string(),
        ))
    }

    /// Whether `id` holds structured children rather than raw text.
    fn accepts_children(&self, id: NodeId) -> bool {
        let tree = self.tree;
        let node = tree.node(id);
        if CONTAINER_ELEMENTS.contains(&node.name.as_str()) {
            return true;
        }
        if tree.child_elements(id).next().is_some() {
            return true;
        }
        // Items carry metadata elements; tasks inside targets carry
        // `<Output>` elements.
        matches!(
            tree.parent(id).map(|p| tree.node(p).name.as_str()),
            Some("ItemGroup" | "ItemDefinitionGroup" | "Target")
        )
    }
}
