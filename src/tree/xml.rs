//! XML implementation of the [`TreeReader`] tokenizer.

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::errors::ReaderError;
use crate::tree::reader::TreeReader;
use crate::tree::types::{QName, Token};

/// Streaming tokenizer over an XML byte source.
///
/// Empty elements are expanded into a start/end pair so the token stream is
/// always well-nested. Text and attribute values are unescaped but never
/// trimmed. The end of the document surfaces as one final `Ignorable`
/// token, after which `has_next()` is false.
pub struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    current: Token,
    finished: bool,
}

impl<R: BufRead> XmlReader<R> {
    pub fn new(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.expand_empty_elements(true);
        reader.check_end_names(true);
        XmlReader {
            reader,
            buf: Vec::new(),
            current: Token::Ignorable,
            finished: false,
        }
    }

    fn qname(raw: &[u8]) -> Result<QName, ReaderError> {
        let name =
            std::str::from_utf8(raw).map_err(|err| ReaderError::Syntax(err.to_string()))?;
        Ok(match name.split_once(':') {
            Some((prefix, local)) => QName::new(Some(prefix.to_string()), local),
            None => QName::unprefixed(name),
        })
    }

    fn start_token(element: &BytesStart) -> Result<Token, ReaderError> {
        let name = Self::qname(element.name().into_inner())?;
        let mut attributes = Vec::new();
        for attribute in element.attributes() {
            let attribute = attribute.map_err(|err| ReaderError::Syntax(err.to_string()))?;
            let key = Self::qname(attribute.key.into_inner())?;
            let value = attribute
                .unescape_value()
                .map_err(|err| ReaderError::Syntax(err.to_string()))?;
            attributes.push((key, value.into_owned()));
        }
        Ok(Token::StartEntity { name, attributes })
    }
}

impl<R: BufRead> TreeReader for XmlReader<R> {
    fn has_next(&self) -> bool {
        !self.finished
    }

    fn next(&mut self) -> Result<&Token, ReaderError> {
        if self.finished {
            return Err(ReaderError::EndOfStream);
        }
        self.buf.clear();
        let token = match self.reader.read_event_into(&mut self.buf) {
            Ok(Event::Start(element)) => Self::start_token(&element)?,
            Ok(Event::End(_)) => Token::EndEntity,
            Ok(Event::Text(text)) => {
                let text = text
                    .unescape()
                    .map_err(|err| ReaderError::Syntax(err.to_string()))?;
                Token::Value(text.into_owned())
            }
            Ok(Event::CData(data)) => {
                let text = String::from_utf8(data.into_inner().into_owned())
                    .map_err(|err| ReaderError::Syntax(err.to_string()))?;
                Token::Value(text)
            }
            Ok(Event::Eof) => {
                self.finished = true;
                Token::Ignorable
            }
            // Declarations, comments, processing instructions, doctypes.
            Ok(_) => Token::Ignorable,
            Err(err) => {
                self.finished = true;
                return Err(ReaderError::Syntax(err.to_string()));
            }
        };
        self.current = token;
        Ok(&self.current)
    }

    fn current(&self) -> &Token {
        &self.current
    }
}

/// Cheap sniff for whether an input looks like XML this importer handles.
pub fn can_import(content_type: Option<&str>, file_name: Option<&str>) -> bool {
    if let Some(content_type) = content_type {
        let content_type = content_type.trim().to_ascii_lowercase();
        return matches!(
            content_type.as_str(),
            "application/xml" | "text/xml" | "application/rss+xml" | "application/atom+xml"
        );
    }
    if let Some(file_name) = file_name {
        let file_name = file_name.to_ascii_lowercase();
        return file_name.ends_with(".xml")
            || file_name.ends_with(".atom")
            || file_name.ends_with(".rss");
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(xml: &str) -> Vec<Token> {
        let mut reader = XmlReader::new(xml.as_bytes());
        let mut tokens = Vec::new();
        while reader.has_next() {
            tokens.push(reader.next().expect("well-formed input").clone());
        }
        tokens
    }

    #[test]
    fn tokenizes_nested_elements() {
        let tokens = collect(r#"<a x="1"><b>hi</b></a>"#);
        assert_eq!(
            tokens,
            vec![
                Token::StartEntity {
                    name: QName::unprefixed("a"),
                    attributes: vec![(QName::unprefixed("x"), "1".to_string())],
                },
                Token::StartEntity {
                    name: QName::unprefixed("b"),
                    attributes: vec![],
                },
                Token::Value("hi".to_string()),
                Token::EndEntity,
                Token::EndEntity,
                Token::Ignorable,
            ]
        );
    }

    #[test]
    fn expands_empty_elements() {
        let tokens = collect("<a><b/></a>");
        assert_eq!(
            tokens,
            vec![
                Token::StartEntity {
                    name: QName::unprefixed("a"),
                    attributes: vec![],
                },
                Token::StartEntity {
                    name: QName::unprefixed("b"),
                    attributes: vec![],
                },
                Token::EndEntity,
                Token::EndEntity,
                Token::Ignorable,
            ]
        );
    }

    #[test]
    fn preserves_whitespace_text() {
        let tokens = collect("<a> <b/>  </a>");
        let values: Vec<&Token> = tokens
            .iter()
            .filter(|token| matches!(token, Token::Value(_)))
            .collect();
        assert_eq!(
            values,
            vec![
                &Token::Value(" ".to_string()),
                &Token::Value("  ".to_string()),
            ]
        );
    }

    #[test]
    fn unescapes_attribute_and_text_values() {
        let tokens = collect(r#"<a t="x &amp; y">1 &lt; 2</a>"#);
        match &tokens[0] {
            Token::StartEntity { attributes, .. } => {
                assert_eq!(attributes[0].1, "x & y");
            }
            other => panic!("expected start token, got {:?}", other),
        }
        assert_eq!(tokens[1], Token::Value("1 < 2".to_string()));
    }

    #[test]
    fn carries_prefixes() {
        let tokens = collect(r#"<ns:a ns:k="v"/>"#);
        match &tokens[0] {
            Token::StartEntity { name, attributes } => {
                assert_eq!(name.composed(), "ns:a");
                assert_eq!(attributes[0].0.composed(), "ns:k");
            }
            other => panic!("expected start token, got {:?}", other),
        }
    }

    #[test]
    fn accessors_reflect_the_current_token() {
        let mut reader = XmlReader::new(r#"<a x="1" y="2">text</a>"#.as_bytes());
        reader.next().unwrap();
        assert_eq!(reader.field_name(), Some("a"));
        assert_eq!(reader.attribute_count(), 2);
        assert_eq!(reader.attribute_name(1).unwrap().composed(), "y");
        assert_eq!(reader.attribute_value(0), Some("1"));
        assert_eq!(reader.field_value(), None);

        reader.next().unwrap();
        assert_eq!(reader.field_value(), Some("text"));
        assert_eq!(reader.attribute_count(), 0);
        // current() re-reports without advancing.
        assert_eq!(reader.current(), &Token::Value("text".to_string()));
    }

    #[test]
    fn next_past_end_is_an_error() {
        let mut reader = XmlReader::new("<a/>".as_bytes());
        while reader.has_next() {
            reader.next().unwrap();
        }
        assert!(matches!(reader.next(), Err(ReaderError::EndOfStream)));
    }

    #[test]
    fn malformed_input_surfaces_as_syntax_error() {
        let mut reader = XmlReader::new("<a><b></a>".as_bytes());
        let mut saw_error = false;
        while reader.has_next() {
            if let Err(err) = reader.next() {
                assert!(matches!(err, ReaderError::Syntax(_)));
                saw_error = true;
            }
        }
        assert!(saw_error);
        assert!(!reader.has_next());
    }

    #[test]
    fn sniffs_importable_inputs() {
        assert!(can_import(Some("application/xml"), None));
        assert!(can_import(Some(" TEXT/XML "), None));
        assert!(!can_import(Some("application/json"), None));
        assert!(can_import(None, Some("feed.Atom")));
        assert!(can_import(None, Some("data.xml")));
        assert!(!can_import(None, Some("data.csv")));
        assert!(!can_import(None, None));
    }
}
