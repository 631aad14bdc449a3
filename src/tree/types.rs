use std::fmt;

/// A qualified name: optional namespace prefix plus local name.
///
/// Prefixes are carried as plain bookkeeping; no namespace resolution is
/// performed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(prefix: Option<String>, local: impl Into<String>) -> Self {
        QName {
            prefix,
            local: local.into(),
        }
    }

    pub fn unprefixed(local: impl Into<String>) -> Self {
        QName {
            prefix: None,
            local: local.into(),
        }
    }

    /// Composed form, `prefix:local` when a prefix is present.
    pub fn composed(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local),
            None => self.local.clone(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// One structural unit pulled from a hierarchical document.
///
/// Tokens form a well-nested sequence: every `StartEntity` is matched by
/// exactly one later `EndEntity` at the same depth, and `Value` tokens only
/// appear between an entity's start and its matching end.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// An entity (element) opens, carrying its name and attributes.
    StartEntity {
        name: QName,
        attributes: Vec<(QName, String)>,
    },
    /// The matching close of the innermost open entity.
    EndEntity,
    /// Text content between an entity's start and its end, verbatim.
    Value(String),
    /// Structure the importer has no use for (comments, declarations, ...).
    Ignorable,
}

/// Configuration for an import pass.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Explicit element local name to use as the record boundary.
    /// When unset the record path is inferred from the stream.
    pub record_tag: Option<String>,

    /// Token budget for preview building.
    pub preview_token_budget: usize,

    /// Bytes of input buffered up front for record path detection.
    pub detection_buffer_size: usize,

    /// Separator joining group path segments into column names.
    pub separator: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            record_tag: None,
            preview_token_budget: 1000,
            detection_buffer_size: 64 * 1024,
            separator: String::from("."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composed_names() {
        assert_eq!(QName::unprefixed("item").composed(), "item");
        assert_eq!(
            QName::new(Some("ns".to_string()), "item").composed(),
            "ns:item"
        );
    }

    #[test]
    fn default_config() {
        let config = ImportConfig::default();
        assert_eq!(config.preview_token_budget, 1000);
        assert_eq!(config.detection_buffer_size, 64 * 1024);
        assert!(config.record_tag.is_none());
    }
}
