use crate::errors::ReaderError;
use crate::tree::types::{QName, Token};

/// Pull cursor over the structural tokens of a hierarchical document.
///
/// One implementation exists per concrete format; the detector, preview
/// builder and import engine depend only on this trait. The cursor is
/// forward-only and performs no buffering beyond what the concrete format
/// requires. Dropping a reader releases the underlying byte stream.
pub trait TreeReader {
    /// Whether another token can be pulled.
    fn has_next(&self) -> bool;

    /// Advance to the next token and return it.
    ///
    /// Fails with [`ReaderError::EndOfStream`] when the stream is exhausted
    /// and [`ReaderError::Syntax`] on malformed input; no recovery is
    /// attempted either way.
    fn next(&mut self) -> Result<&Token, ReaderError>;

    /// Re-report the last returned token without advancing.
    fn current(&self) -> &Token;

    /// Local name of the current entity, if positioned on a start token.
    fn field_name(&self) -> Option<&str> {
        match self.current() {
            Token::StartEntity { name, .. } => Some(&name.local),
            _ => None,
        }
    }

    /// Text content, if positioned on a value token.
    fn field_value(&self) -> Option<&str> {
        match self.current() {
            Token::Value(text) => Some(text),
            _ => None,
        }
    }

    /// Number of attributes on the current start token, zero otherwise.
    fn attribute_count(&self) -> usize {
        match self.current() {
            Token::StartEntity { attributes, .. } => attributes.len(),
            _ => 0,
        }
    }

    fn attribute_name(&self, index: usize) -> Option<&QName> {
        match self.current() {
            Token::StartEntity { attributes, .. } => attributes.get(index).map(|(name, _)| name),
            _ => None,
        }
    }

    fn attribute_value(&self, index: usize) -> Option<&str> {
        match self.current() {
            Token::StartEntity { attributes, .. } => {
                attributes.get(index).map(|(_, value)| value.as_str())
            }
            _ => None,
        }
    }
}
