//! Bounded-budget preview: a small nested document materialized from the
//! head of the token stream for UI display.

use serde::Serialize;

use crate::tree::reader::TreeReader;
use crate::tree::types::{QName, Token};

/// One element of the preview document handed to the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewNode {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<PreviewAttribute>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PreviewChild>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewAttribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PreviewChild {
    Element(PreviewNode),
    Text { text: String },
}

/// Budget shared across the whole recursive descent, so total work is
/// bounded rather than per-call.
struct PreviewState {
    tokens_left: usize,
}

/// Build a bounded preview of the first element in the stream.
///
/// Consumes at most `token_budget` tokens. Returns `None` when the stream
/// ends, the budget runs out before an element is found, or the reader
/// errors; a partially-descended element is still returned.
pub fn build_preview(reader: &mut dyn TreeReader, token_budget: usize) -> Option<PreviewNode> {
    let mut state = PreviewState {
        tokens_left: token_budget,
    };
    while reader.has_next() && state.tokens_left > 0 {
        state.tokens_left -= 1;
        match reader.next() {
            Ok(Token::StartEntity { name, attributes }) => {
                let node = seed_node(name, attributes);
                return Some(descend_element(reader, node, &mut state));
            }
            Ok(_) => {}
            Err(_) => return None,
        }
    }
    None
}

fn seed_node(name: &QName, attributes: &[(QName, String)]) -> PreviewNode {
    PreviewNode {
        name: name.composed(),
        attributes: attributes
            .iter()
            .map(|(name, value)| PreviewAttribute {
                name: name.composed(),
                value: value.clone(),
            })
            .collect(),
        children: Vec::new(),
    }
}

fn descend_element(
    reader: &mut dyn TreeReader,
    mut node: PreviewNode,
    state: &mut PreviewState,
) -> PreviewNode {
    while reader.has_next() && state.tokens_left > 0 {
        state.tokens_left -= 1;
        match reader.next() {
            Ok(Token::EndEntity) => break,
            Ok(Token::StartEntity { name, attributes }) => {
                let child = seed_node(name, attributes);
                let child = descend_element(reader, child, state);
                node.children.push(PreviewChild::Element(child));
            }
            Ok(Token::Value(text)) => {
                node.children.push(PreviewChild::Text { text: text.clone() });
            }
            Ok(Token::Ignorable) => {}
            Err(_) => break,
        }
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ReaderError;
    use crate::tree::xml::XmlReader;

    struct CountingReader<R: TreeReader> {
        inner: R,
        consumed: usize,
    }

    impl<R: TreeReader> TreeReader for CountingReader<R> {
        fn has_next(&self) -> bool {
            self.inner.has_next()
        }

        fn next(&mut self) -> Result<&Token, ReaderError> {
            self.consumed += 1;
            self.inner.next()
        }

        fn current(&self) -> &Token {
            self.inner.current()
        }
    }

    #[test]
    fn builds_full_preview_of_small_document() {
        let xml = r#"<root a="1"><child>text</child></root>"#;
        let mut reader = XmlReader::new(xml.as_bytes());
        let node = build_preview(&mut reader, 1000).unwrap();

        assert_eq!(node.name, "root");
        assert_eq!(node.attributes.len(), 1);
        assert_eq!(node.attributes[0].name, "a");
        assert_eq!(node.attributes[0].value, "1");
        assert_eq!(
            node.children,
            vec![PreviewChild::Element(PreviewNode {
                name: "child".to_string(),
                attributes: vec![],
                children: vec![PreviewChild::Text {
                    text: "text".to_string()
                }],
            })]
        );
    }

    #[test]
    fn never_exceeds_the_token_budget() {
        let mut xml = String::from("<root>");
        for i in 0..20 {
            xml.push_str(&format!("<c>{}</c>", i));
        }
        xml.push_str("</root>");

        let mut reader = CountingReader {
            inner: XmlReader::new(xml.as_bytes()),
            consumed: 0,
        };
        let node = build_preview(&mut reader, 5);

        assert!(reader.consumed <= 5);
        // The result is a partial tree, never the full 20 children.
        let node = node.unwrap();
        assert!(node.children.len() < 20);
    }

    #[test]
    fn zero_budget_consumes_nothing() {
        let mut reader = CountingReader {
            inner: XmlReader::new("<root/>".as_bytes()),
            consumed: 0,
        };
        assert_eq!(build_preview(&mut reader, 0), None);
        assert_eq!(reader.consumed, 0);
    }

    #[test]
    fn no_element_before_budget_is_none() {
        let xml = "<!-- one --><!-- two --><!-- three --><root/>";
        let mut reader = XmlReader::new(xml.as_bytes());
        assert_eq!(build_preview(&mut reader, 2), None);
    }

    #[test]
    fn stream_without_elements_is_none() {
        let mut reader = XmlReader::new("<!-- only a comment -->".as_bytes());
        assert_eq!(build_preview(&mut reader, 1000), None);
    }

    #[test]
    fn serializes_to_the_ui_shape() {
        let xml = r#"<item id="7">hello<sub/></item>"#;
        let mut reader = XmlReader::new(xml.as_bytes());
        let node = build_preview(&mut reader, 1000).unwrap();
        let value = serde_json::to_value(&node).unwrap();

        assert_eq!(value["name"], "item");
        assert_eq!(value["attributes"][0]["name"], "id");
        assert_eq!(value["attributes"][0]["value"], "7");
        assert_eq!(value["children"][0]["text"], "hello");
        assert_eq!(value["children"][1]["name"], "sub");
    }
}
