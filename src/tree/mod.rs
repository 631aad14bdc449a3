//! The format-agnostic tree side: tokens, the tokenizer trait and its XML
//! implementation, record path detection, and preview building.
//!
//! Everything downstream of [`reader::TreeReader`] works on any format that
//! can present itself as a stream of start/end/value tokens.

pub mod detect;
pub mod preview;
pub mod reader;
pub mod types;
pub mod xml;

pub use detect::{detect_path_from_tag, detect_record_path, RecordPath};
pub use preview::{build_preview, PreviewAttribute, PreviewChild, PreviewNode};
pub use reader::TreeReader;
pub use types::{ImportConfig, QName, Token};
pub use xml::{can_import, XmlReader};
