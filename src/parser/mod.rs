//! Project-file parsing.
//!
//! Turns document text into a [`SyntaxTree`] using the `xmlparser`
//! tokenizer.  Documents being edited are rarely well-formed, so the
//! builder is error-tolerant: when the tokenizer gives up it records the
//! error, closes any half-written start tag, and resumes in fragment mode
//! at the next `<`.  Elements still open at the end of input stretch to the
//! end of the text and are flagged as not closed.
//!
//! Sub-modules:
//! - [`tree`]: the arena node types and tree queries
pub mod tree;

use tracing::trace;
use xmlparser::{ElementEnd, StrSpan, Token, Tokenizer};

use crate::util::TextRange;
pub use tree::{
    AttributeParts, ElementParts, Node, NodeData, NodeId, NodeKind, SyntaxError, SyntaxTree,
};

/// Parse a project document.  Never fails; problems end up in
/// [`SyntaxTree::errors`].
pub fn parse(text: &str) -> SyntaxTree {
    let mut builder = TreeBuilder::new(text);
    let mut tokenizer = Tokenizer::from(text);

    loop {
        match tokenizer.next() {
            None => break,
            Some(Ok(token)) => builder.token(token),
            Some(Err(err)) => {
                let message = err.to_string();
                match builder.recover(message) {
                    Some(resume) => {
                        tokenizer = Tokenizer::from_fragment(text, resume..text.len());
                    }
                    None => break,
                }
            }
        }
    }

    builder.finish()
}

struct TreeBuilder<'t> {
    text: &'t str,
    tree: SyntaxTree,
    /// Elements whose start tag is finished and whose end tag is pending.
    open: Vec<NodeId>,
    /// Element whose start tag has not reached `>` / `/>` yet.
    pending_start: Option<NodeId>,
    /// End of the last token the builder accepted.
    last_end: usize,
    last_resume: Option<usize>,
}

impl<'t> TreeBuilder<'t> {
    fn new(text: &'t str) -> Self {
        Self {
            text,
            tree: SyntaxTree {
                text_len: text.len(),
                ..SyntaxTree::default()
            },
            open: Vec::new(),
            pending_start: None,
            last_end: 0,
            last_resume: None,
        }
    }

    fn token(&mut self, token: Token<'t>) {
        match token {
            Token::ElementStart { prefix, local, span } => {
                self.finish_pending_start(span.start());
                let name = qualified_name(prefix, local);
                let id = self.push_node(Node {
                    name,
                    value: String::new(),
                    range: range_of(span),
                    parent: self.open.last().copied(),
                    children: Vec::new(),
                    data: NodeData::Element(ElementParts {
                        name_range: TextRange::new(span.start() + 1, span.end()),
                        start_tag: range_of(span),
                        attributes: Vec::new(),
                        content: None,
                        self_closing: false,
                        start_tag_complete: false,
                        closed: false,
                    }),
                });
                self.attach(id);
                self.pending_start = Some(id);
                self.last_end = span.end();
            }
            Token::Attribute {
                prefix,
                local,
                value,
                span,
            } => {
                let Some(owner) = self.pending_start else {
                    return;
                };
                let name_start = if prefix.as_str().is_empty() {
                    local.start()
                } else {
                    prefix.start()
                };
                let id = self.push_node(Node {
                    name: qualified_name(prefix, local),
                    value: value.as_str().to_string(),
                    range: range_of(span),
                    parent: Some(owner),
                    children: Vec::new(),
                    data: NodeData::Attribute(AttributeParts {
                        name_range: TextRange::new(name_start, local.end()),
                        value_range: range_of(value),
                    }),
                });
                if let Some(parts) = self.element_parts_mut(owner) {
                    parts.attributes.push(id);
                    parts.start_tag.end = span.end();
                }
                self.tree.nodes[owner.index()].range.end = span.end();
                self.last_end = span.end();
            }
            Token::ElementEnd { end, span } => {
                match end {
                    ElementEnd::Open => {
                        if let Some(id) = self.pending_start.take() {
                            if let Some(parts) = self.element_parts_mut(id) {
                                parts.start_tag.end = span.end();
                                parts.start_tag_complete = true;
                                parts.content = Some(TextRange::empty(span.end()));
                            }
                            self.tree.nodes[id.index()].range.end = span.end();
                            self.open.push(id);
                        }
                    }
                    ElementEnd::Empty => {
                        if let Some(id) = self.pending_start.take() {
                            if let Some(parts) = self.element_parts_mut(id) {
                                parts.start_tag.end = span.end();
                                parts.start_tag_complete = true;
                                parts.self_closing = true;
                                parts.closed = true;
                            }
                            self.tree.nodes[id.index()].range.end = span.end();
                        }
                    }
                    ElementEnd::Close(prefix, local) => {
                        self.finish_pending_start(span.start());
                        let name = qualified_name(prefix, local);
                        self.close_element(&name, range_of(span));
                    }
                }
                self.last_end = span.end();
            }
            Token::Text { text } => {
                self.finish_pending_start(text.start());
                self.push_leaf(NodeData::Text, text, text);
            }
            Token::Cdata { text, span } => {
                self.finish_pending_start(span.start());
                self.push_leaf(NodeData::Text, text, span);
            }
            Token::Comment { text, span } => {
                self.finish_pending_start(span.start());
                self.push_leaf(NodeData::Comment, text, span);
            }
            Token::Declaration { span, .. }
            | Token::ProcessingInstruction { span, .. }
            | Token::DtdStart { span, .. }
            | Token::EmptyDtd { span, .. }
            | Token::EntityDeclaration { span, .. }
            | Token::DtdEnd { span } => {
                self.last_end = span.end();
            }
        }
    }

    /// Record a tokenizer error and pick the offset to resume from.
    ///
    /// Resume points strictly increase, so a document can only fail a
    /// bounded number of times.
    fn recover(&mut self, message: String) -> Option<usize> {
        trace!(offset = self.last_end, %message, "recovering from XML error");
        self.tree.errors.push(SyntaxError {
            offset: self.last_end,
            message,
        });

        let floor = self.last_end.max(self.last_resume.unwrap_or(0)) + 1;
        let resume = self
            .text
            .get(floor..)
            .and_then(|rest| rest.find('<'))
            .map(|idx| floor + idx);

        self.finish_pending_start(resume.unwrap_or(self.text.len()));
        self.unterminated_comment(resume.unwrap_or(self.text.len()));
        self.last_resume = resume;
        if let Some(resume) = resume {
            self.last_end = resume;
        }
        resume
    }

    /// A `<!--` the tokenizer failed on is a comment still being typed.
    /// It covers everything up to where parsing resumes.
    fn unterminated_comment(&mut self, end: usize) {
        let rest = &self.text[self.last_end..end];
        let start = self.last_end + (rest.len() - rest.trim_start().len());
        let Some(body) = self.text[start..end].strip_prefix("<!--") else {
            return;
        };
        let id = self.push_node(Node {
            name: String::new(),
            value: body.to_string(),
            range: TextRange::new(start, end),
            parent: self.open.last().copied(),
            children: Vec::new(),
            data: NodeData::Comment,
        });
        self.attach(id);
    }

    fn finish(mut self) -> SyntaxTree {
        let len = self.text.len();
        self.finish_pending_start(len);
        while let Some(id) = self.open.pop() {
            self.end_open_element(id, len, len, false);
        }
        self.tree
    }

    fn push_node(&mut self, node: Node) -> NodeId {
        let id = NodeId::new(self.tree.nodes.len());
        self.tree.nodes.push(node);
        id
    }

    /// Add `id` to the current parent's children (or the top level).
    fn attach(&mut self, id: NodeId) {
        match self.open.last() {
            Some(&parent) => self.tree.nodes[parent.index()].children.push(id),
            None => self.tree.top_level.push(id),
        }
    }

    fn push_leaf(&mut self, data: NodeData, value: StrSpan<'t>, span: StrSpan<'t>) {
        let id = self.push_node(Node {
            name: String::new(),
            value: value.as_str().to_string(),
            range: range_of(span),
            parent: self.open.last().copied(),
            children: Vec::new(),
            data,
        });
        self.attach(id);
        self.last_end = span.end();
    }

    fn element_parts_mut(&mut self, id: NodeId) -> Option<&mut ElementParts> {
        match &mut self.tree.nodes[id.index()].data {
            NodeData::Element(parts) => Some(parts),
            _ => None,
        }
    }

    /// An unfinished start tag ends wherever the next thing begins.
    fn finish_pending_start(&mut self, end: usize) {
        if let Some(id) = self.pending_start.take() {
            let node = &mut self.tree.nodes[id.index()];
            node.range.end = node.range.end.max(end);
            if let NodeData::Element(parts) = &mut node.data {
                parts.start_tag.end = parts.start_tag.end.max(end);
            }
        }
    }

    fn close_element(&mut self, name: &str, end_tag: TextRange) {
        let Some(depth) = self
            .open
            .iter()
            .rposition(|&id| self.tree.nodes[id.index()].name == name)
        else {
            self.tree.errors.push(SyntaxError {
                offset: end_tag.start,
                message: format!("unexpected closing tag </{}>", name),
            });
            return;
        };

        // Anything opened inside the matching element and never closed
        // ends where the matching end tag starts.
        while self.open.len() > depth + 1 {
            if let Some(id) = self.open.pop() {
                self.end_open_element(id, end_tag.start, end_tag.start, false);
            }
        }
        if let Some(id) = self.open.pop() {
            self.end_open_element(id, end_tag.start, end_tag.end, true);
        }
    }

    fn end_open_element(&mut self, id: NodeId, content_end: usize, end: usize, closed: bool) {
        let node = &mut self.tree.nodes[id.index()];
        node.range.end = end;
        if let NodeData::Element(parts) = &mut node.data {
            if let Some(content) = parts.content.as_mut() {
                content.end = content_end.max(content.start);
            }
            parts.closed = closed;
        }
    }
}

fn range_of(span: StrSpan<'_>) -> TextRange {
    TextRange::new(span.start(), span.end())
}

fn qualified_name(prefix: StrSpan<'_>, local: StrSpan<'_>) -> String {
    if prefix.as_str().is_empty() {
        local.as_str().to_string()
    } else {
        format!("{}:{}", prefix.as_str(), local.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(tree: &SyntaxTree) -> Vec<&str> {
        tree.elements()
            .map(|id| tree.node(id).name.as_str())
            .collect()
    }

    #[test]
    fn parses_well_formed_project() {
        let text = concat!(
            "<Project Sdk=\"Microsoft.NET.Sdk\">\n",
            "  <!-- settings -->\n",
            "  <PropertyGroup>\n",
            "    <OutputType>Exe</OutputType>\n",
            "  </PropertyGroup>\n",
            "</Project>\n",
        );
        let tree = parse(text);
        assert!(!tree.has_errors(), "errors: {:?}", tree.errors());
        assert_eq!(names(&tree), vec!["Project", "PropertyGroup", "OutputType"]);

        let root = tree.root().unwrap();
        assert_eq!(tree.attribute_value(root, "Sdk"), Some("Microsoft.NET.Sdk"));

        let output = tree.elements().nth(2).unwrap();
        let node = tree.node(output);
        assert_eq!(node.children.len(), 1);
        assert_eq!(tree.node(node.children[0]).value, "Exe");
        assert!(node.element().unwrap().closed);
        assert_eq!(
            tree.ancestors(output)
                .map(|a| tree.node(a).name.as_str())
                .collect::<Vec<_>>(),
            vec!["PropertyGroup", "Project"]
        );
    }

    #[test]
    fn child_ranges_nest_inside_parents() {
        let text = "<Project><ItemGroup><None Include=\"a\" /></ItemGroup></Project>";
        let tree = parse(text);
        for id in tree.elements() {
            let node = tree.node(id);
            for &child in &node.children {
                assert!(node.range.contains_range(tree.node(child).range));
            }
            let mut prev_end = 0;
            for &child in &node.children {
                let range = tree.node(child).range;
                assert!(range.start >= prev_end);
                prev_end = range.end;
            }
        }
    }

    #[test]
    fn attribute_spans_exclude_quotes() {
        let text = "<Project><Import Project=\"a.props\" /></Project>";
        let tree = parse(text);
        let import = tree.elements().nth(1).unwrap();
        let attr = tree.node(tree.attributes(import)[0]);
        let parts = attr.attribute().unwrap();
        assert_eq!(&text[parts.value_range.start..parts.value_range.end], "a.props");
        assert_eq!(&text[parts.name_range.start..parts.name_range.end], "Project");
    }

    #[test]
    fn recovers_from_half_typed_element() {
        let text = "<Project>\n  <PropertyGroup>\n    <Out\n  </PropertyGroup>\n</Project>";
        let tree = parse(text);
        assert!(tree.has_errors());
        assert_eq!(names(&tree), vec!["Project", "PropertyGroup", "Out"]);

        let group = tree.elements().nth(1).unwrap();
        assert!(tree.node(group).element().unwrap().closed);
        let out = tree.elements().nth(2).unwrap();
        let parts = tree.node(out).element().unwrap();
        assert!(!parts.start_tag_complete);
        assert_eq!(tree.parent(out), Some(group));
    }

    #[test]
    fn recovers_from_bare_angle_bracket() {
        let text = "<Project>\n  <ItemGroup>\n    <\n  </ItemGroup>\n  <Target Name=\"Build\" />\n</Project>";
        let tree = parse(text);
        assert!(tree.has_errors());
        assert_eq!(names(&tree), vec!["Project", "ItemGroup", "Target"]);
        let root = tree.root().unwrap();
        assert!(tree.node(root).element().unwrap().closed);
    }

    #[test]
    fn unterminated_comment_covers_text_up_to_resume_point() {
        let text = "<Project>\n  <PropertyGroup>\n    <!-- note\n  </PropertyGroup>\n</Project>";
        let tree = parse(text);
        assert!(tree.has_errors());
        let group = tree.elements().nth(1).unwrap();
        let comment = tree
            .node(group)
            .children
            .iter()
            .map(|&id| tree.node(id))
            .find(|node| node.kind() == NodeKind::Comment)
            .unwrap();
        let start = text.find("<!--").unwrap();
        let end = text.find("</PropertyGroup>").unwrap();
        assert_eq!(comment.range, TextRange::new(start, end));
        assert_eq!(comment.value, " note\n  ");
        assert!(tree.node(group).element().unwrap().closed);
    }

    #[test]
    fn unclosed_elements_extend_to_end_of_text() {
        let text = "<Project>\n  <PropertyGroup>\n";
        let tree = parse(text);
        for id in tree.elements() {
            let node = tree.node(id);
            assert_eq!(node.range.end, text.len());
            assert!(!node.element().unwrap().closed);
        }
    }

    #[test]
    fn empty_text_has_no_root() {
        let tree = parse("");
        assert!(tree.root().is_none());
    }
}
