use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry in the OSINT tool tree: a tool, or a category grouping tools.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Static text used as the tooltip until (or instead of) a generated one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ToolNode>>,
}

impl ToolNode {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
            description: None,
            children: None,
        }
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<Self>) -> Self {
        self.children = Some(children);
        self
    }

    /// Parses a serialized tool tree.
    ///
    /// # Errors
    /// Returns the JSON error when the input does not match the node schema.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// External reference for the node. Only an empty url counts as absent.
    #[must_use]
    pub fn link(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.is_empty())
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.as_ref().is_none_or(Vec::is_empty)
    }

    /// Number of nodes in this subtree, including `self`.
    #[must_use]
    pub fn count(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(Self::count)
            .sum::<usize>()
    }
}

/// Body returned by the description endpoint.
///
/// The upstream model decides the exact shape; `response` is the only field
/// callers may rely on. Everything else is carried through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DescriptionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DescriptionPayload {
    #[must_use]
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
            extra: Map::new(),
        }
    }

    /// Reads a loosely typed model output.
    ///
    /// Objects are decoded as-is and bare strings become the `response`.
    /// Any other value yields `None`.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(Self::new(text)),
            Value::Object(_) => serde_json::from_value(value).ok(),
            _ => None,
        }
    }

    /// Generated text, if the payload carries any non-blank text.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.response
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_nested_dataset_and_ignores_unknown_fields() {
        let json = r#"{
            "name": "OSINT Framework",
            "type": "root",
            "children": [
                {"name": "Username", "children": [
                    {"name": "Namechk", "url": "https://namechk.com/"}
                ]},
                {"name": "Email Address", "description": "Mailbox recon"}
            ]
        }"#;

        let root = ToolNode::from_json(json).expect("dataset should parse");

        assert_eq!(root.count(), 4);
        let children = root.children.as_ref().expect("root has children");
        assert_eq!(children[0].name, "Username");
        assert_eq!(children[1].description.as_deref(), Some("Mailbox recon"));
        assert!(children[1].is_leaf());
    }

    #[test]
    fn only_an_empty_url_is_not_a_link() {
        let node = ToolNode::new("Shodan").with_url("");
        assert!(node.link().is_none());

        let node = ToolNode::new("Shodan").with_url("  ");
        assert_eq!(node.link(), Some("  "));

        let node = ToolNode::new("Shodan").with_url("https://www.shodan.io/");
        assert_eq!(node.link(), Some("https://www.shodan.io/"));
    }

    #[test]
    fn empty_children_is_a_leaf() {
        let node = ToolNode::new("Maltego").with_children(Vec::new());
        assert!(node.is_leaf());
    }

    #[test]
    fn payload_accepts_objects_and_bare_strings() {
        let payload = DescriptionPayload::from_value(json!({
            "response": "X marks the spot",
            "usage": {"tokens": 4}
        }))
        .expect("object payload");
        assert_eq!(payload.text(), Some("X marks the spot"));
        assert_eq!(payload.extra["usage"]["tokens"], 4);

        let payload = DescriptionPayload::from_value(json!("plain text")).expect("string payload");
        assert_eq!(payload.text(), Some("plain text"));

        assert!(DescriptionPayload::from_value(json!(42)).is_none());
        assert!(DescriptionPayload::from_value(json!({"response": 7})).is_none());
    }

    #[test]
    fn blank_response_has_no_text() {
        let payload = DescriptionPayload::new("   ");
        assert!(payload.text().is_none());
    }
}
