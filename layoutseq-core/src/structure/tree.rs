use super::machine::Action;
use super::tags::Vocabulary;
use quick_xml::escape::escape;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static SECTION_NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)*\.?$").unwrap());

/// Stands in for a line-end hyphen until the markup is composed.
const CONJUNCTION: &str = "\u{E000}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructureNode {
    Text { text: String },
    /// Line-end hyphen; the word halves around it are joined
    Conjunction,
    Element(Element),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub label: String,
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<StructureNode>,
    pub closed: bool,
}

impl Element {
    /// Concatenated text of all descendants, without markup.
    pub fn text(&self) -> String {
        let mut parts = Vec::new();
        collect_text(&self.children, &mut parts);
        compose(parts)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Move a leading section number such as `2.3.` into the `n` attribute.
    fn extract_section_number(&mut self) {
        let leading: Vec<&str> = self
            .children
            .iter()
            .map_while(|child| match child {
                StructureNode::Text { text }
                    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit() || c == '.') =>
                {
                    Some(text.as_str())
                }
                _ => None,
            })
            .collect();
        if leading.is_empty() || leading.len() == self.children.len() {
            return;
        }
        let number = leading.concat();
        if !SECTION_NUMBER_REGEX.is_match(&number) {
            return;
        }
        let count = leading.len();
        self.attributes
            .push(("n".to_string(), number.trim_end_matches('.').to_string()));
        self.children.drain(..count);
    }
}

fn collect_text(nodes: &[StructureNode], parts: &mut Vec<String>) {
    for node in nodes {
        match node {
            StructureNode::Text { text } => parts.push(text.clone()),
            StructureNode::Conjunction => parts.push(CONJUNCTION.to_string()),
            StructureNode::Element(element) => collect_text(&element.children, parts),
        }
    }
}

/// Applies machine actions to build the nested tree.
pub struct TreeBuilder<'v> {
    vocabulary: &'v Vocabulary,
    roots: Vec<StructureNode>,
    open: Vec<Element>,
}

impl<'v> TreeBuilder<'v> {
    pub fn new(vocabulary: &'v Vocabulary) -> Self {
        Self {
            vocabulary,
            roots: Vec::new(),
            open: Vec::new(),
        }
    }

    pub fn apply(&mut self, action: Action) {
        match action {
            Action::Open(label) => {
                let (name, attributes) = match self.vocabulary.get(&label) {
                    Some(spec) => (
                        spec.element.clone(),
                        spec.attributes
                            .iter()
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect(),
                    ),
                    None => (
                        label.trim_matches(|c| c == '<' || c == '>').to_string(),
                        Vec::new(),
                    ),
                };
                self.open.push(Element {
                    label,
                    name,
                    attributes,
                    children: Vec::new(),
                    closed: false,
                });
            }
            Action::Close(label) => {
                if let Some(mut element) = self.open.pop() {
                    debug_assert_eq!(element.label, label);
                    element.closed = true;
                    self.attach(element);
                }
            }
            Action::Token(text) => self.push_node(StructureNode::Text { text }),
            Action::Conjunction => self.push_node(StructureNode::Conjunction),
        }
    }

    /// Attach still-open elements as unclosed and return the top-level nodes.
    pub fn finish(mut self) -> Vec<StructureNode> {
        while let Some(element) = self.open.pop() {
            self.attach(element);
        }
        self.roots
    }

    fn attach(&mut self, mut element: Element) {
        let numbered = self
            .vocabulary
            .get(&element.label)
            .map(|spec| spec.numbered)
            .unwrap_or(false);
        if numbered {
            element.extract_section_number();
        }
        self.push_node(StructureNode::Element(element));
    }

    fn push_node(&mut self, node: StructureNode) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }
}

/// Serialize nodes to markup: pieces joined by single spaces, split words rejoined.
pub fn to_markup(nodes: &[StructureNode]) -> String {
    let mut pieces = Vec::new();
    write_pieces(nodes, &mut pieces);
    compose(pieces)
}

fn write_pieces(nodes: &[StructureNode], pieces: &mut Vec<String>) {
    for node in nodes {
        match node {
            StructureNode::Text { text } => pieces.push(escape(text.as_str()).into_owned()),
            StructureNode::Conjunction => pieces.push(CONJUNCTION.to_string()),
            StructureNode::Element(element) => {
                let mut open = format!("<{}", element.name);
                for (name, value) in &element.attributes {
                    open.push_str(&format!(" {}=\"{}\"", name, escape(value.as_str())));
                }
                open.push('>');
                pieces.push(open);
                write_pieces(&element.children, pieces);
                if element.closed {
                    pieces.push(format!("</{}>", element.name));
                }
            }
        }
    }
}

fn compose(pieces: Vec<String>) -> String {
    pieces
        .join(" ")
        .replace(&format!(" {} ", CONJUNCTION), "")
        .replace(CONJUNCTION, "")
        .replace(" - ", "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(t: &str) -> StructureNode {
        StructureNode::Text {
            text: t.to_string(),
        }
    }

    fn head(children: Vec<StructureNode>) -> Element {
        Element {
            label: "<section>".to_string(),
            name: "head".to_string(),
            attributes: vec![],
            children,
            closed: true,
        }
    }

    #[test]
    fn test_section_number_moves_to_attribute() {
        let mut element = head(vec![text("2"), text("."), text("3"), text("."), text("Results")]);
        element.extract_section_number();
        assert_eq!(element.attribute("n"), Some("2.3"));
        assert_eq!(element.children, vec![text("Results")]);
    }

    #[test]
    fn test_number_only_heading_is_left_alone() {
        let mut element = head(vec![text("4")]);
        element.extract_section_number();
        assert_eq!(element.attribute("n"), None);

        let mut element = head(vec![text("."), text("5"), text("Odd")]);
        element.extract_section_number();
        assert_eq!(element.attribute("n"), None);
    }

    #[test]
    fn test_markup_escapes_and_joins() {
        let nodes = vec![StructureNode::Element(Element {
            label: "<paragraph>".to_string(),
            name: "p".to_string(),
            attributes: vec![],
            children: vec![
                text("a"),
                text("<"),
                text("b"),
                text("state"),
                text("-"),
                text("of"),
                text("co"),
                StructureNode::Conjunction,
                text("operation"),
            ],
            closed: true,
        })];
        assert_eq!(to_markup(&nodes), "<p> a &lt; b state-of cooperation </p>");
    }

    #[test]
    fn test_unclosed_element_has_no_close_tag() {
        let nodes = vec![StructureNode::Element(Element {
            label: "<paragraph>".to_string(),
            name: "p".to_string(),
            attributes: vec![("rend".to_string(), "x\"y".to_string())],
            children: vec![text("open")],
            closed: false,
        })];
        assert_eq!(to_markup(&nodes), "<p rend=\"x&quot;y\"> open");
    }
}
