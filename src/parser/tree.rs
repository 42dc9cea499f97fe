//! Arena-backed syntax tree for project documents.
//!
//! Nodes live in a single `Vec` owned by [`SyntaxTree`] and refer to each
//! other by [`NodeId`].  The parent link is an index, never an owning
//! reference, so the tree has no ownership cycles and can be shared
//! read-only across concurrent completion requests behind an `Arc`.

use crate::util::TextRange;

/// Index of a node inside its [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Attribute,
    Text,
    Comment,
}

/// Element-specific spans and flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementParts {
    /// The element name, without the leading `<`.
    pub name_range: TextRange,
    /// `<Name attr="..."` through the closing `>` or `/>`.
    ///
    /// When the start tag was never finished this runs to wherever the
    /// parser gave up on it.
    pub start_tag: TextRange,
    pub attributes: Vec<NodeId>,
    /// Text between the end of the start tag and the start of the end tag.
    /// `None` for self-closing elements and unfinished start tags.
    pub content: Option<TextRange>,
    pub self_closing: bool,
    /// The start tag reached its `>` or `/>`.
    pub start_tag_complete: bool,
    /// A matching end tag (or `/>`) was found.
    pub closed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeParts {
    pub name_range: TextRange,
    /// The value between the quotes (quotes excluded).
    pub value_range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element(ElementParts),
    Attribute(AttributeParts),
    Text,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Element or attribute name; empty for text and comments.
    pub name: String,
    /// Attribute value, text content or comment body.
    pub value: String,
    pub range: TextRange,
    pub parent: Option<NodeId>,
    /// Content children in document order (elements, text, comments).
    /// Attributes are listed separately in [`ElementParts::attributes`].
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self.data {
            NodeData::Element(_) => NodeKind::Element,
            NodeData::Attribute(_) => NodeKind::Attribute,
            NodeData::Text => NodeKind::Text,
            NodeData::Comment => NodeKind::Comment,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    pub fn element(&self) -> Option<&ElementParts> {
        match &self.data {
            NodeData::Element(parts) => Some(parts),
            _ => None,
        }
    }

    pub fn attribute(&self) -> Option<&AttributeParts> {
        match &self.data {
            NodeData::Attribute(parts) => Some(parts),
            _ => None,
        }
    }

    /// Whitespace-only text node (formatting between elements).
    pub fn is_whitespace(&self) -> bool {
        matches!(self.data, NodeData::Text) && self.value.trim().is_empty()
    }
}

/// A tokenizer error the parser recovered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// Byte offset of the last good token boundary before the error.
    pub offset: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct SyntaxTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) top_level: Vec<NodeId>,
    pub(crate) errors: Vec<SyntaxError>,
    pub(crate) text_len: usize,
}

impl SyntaxTree {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Length of the text this tree was parsed from.
    pub fn text_len(&self) -> usize {
        self.text_len
    }

    /// Top-level nodes (comments and the document element).
    pub fn top_level(&self) -> &[NodeId] {
        &self.top_level
    }

    /// The document element: the first top-level element.
    pub fn root(&self) -> Option<NodeId> {
        self.top_level
            .iter()
            .copied()
            .find(|&id| self.node(id).is_element())
    }

    pub fn errors(&self) -> &[SyntaxError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Name of an element node, `None` for anything else.
    pub fn element_name(&self, id: NodeId) -> Option<&str> {
        let node = self.node(id);
        node.is_element().then_some(node.name.as_str())
    }

    /// Element ancestors of `id`, nearest first (excluding `id` itself).
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id)
            .children
            .iter()
            .copied()
            .filter(move |&c| self.node(c).is_element())
    }

    pub fn attributes(&self, id: NodeId) -> &[NodeId] {
        self.node(id)
            .element()
            .map(|e| e.attributes.as_slice())
            .unwrap_or(&[])
    }

    /// Value of the attribute called `name` on element `id`, if present.
    pub fn attribute_value(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .map(|&a| self.node(a))
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Every element in document order.
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack: Vec<NodeId> = self.top_level.iter().rev().copied().collect();
        std::iter::from_fn(move || {
            while let Some(id) = stack.pop() {
                let node = self.node(id);
                if node.is_element() {
                    stack.extend(node.children.iter().rev().copied());
                    return Some(id);
                }
            }
            None
        })
    }
}
