//! Record path detection: choosing the structural path that delimits one
//! output row, either from an explicit tag hint or by inference.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::tree::reader::TreeReader;
use crate::tree::types::Token;

/// Structural path delimiting one record: composed qualified names from the
/// document root, inclusive.
pub type RecordPath = Vec<String>;

static XML_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9._:-]*$").unwrap());

/// Scan forward for the first entity whose local name matches `tag` and
/// return its full path. `None` if the tag never occurs before the stream
/// (or the buffered prefix) ends.
pub fn detect_path_from_tag(reader: &mut dyn TreeReader, tag: &str) -> Option<RecordPath> {
    if !XML_NAME_REGEX.is_match(tag) {
        warn!(tag, "record tag hint is not a plausible element name");
        return None;
    }
    let mut stack: Vec<String> = Vec::new();
    while reader.has_next() {
        match reader.next() {
            Ok(Token::StartEntity { name, .. }) => {
                let matched = name.local == tag;
                stack.push(name.composed());
                if matched {
                    return Some(stack);
                }
            }
            Ok(Token::EndEntity) => {
                stack.pop();
            }
            Ok(_) => {}
            // A truncated or malformed prefix just ends the scan.
            Err(_) => break,
        }
    }
    None
}

/// Infer the record path with no hint: the shallowest path whose occurrence
/// count reaches two, ties broken by whichever path repeated first.
///
/// When nothing repeats before the scan ends, the outermost element's path
/// is returned and the whole document imports as a single record. `None`
/// only when the stream holds no element at all.
pub fn detect_record_path(reader: &mut dyn TreeReader) -> Option<RecordPath> {
    let mut stack: Vec<String> = Vec::new();
    let mut counts: IndexMap<RecordPath, usize> = IndexMap::new();
    // (depth, path) in the order each path reached its second occurrence.
    let mut repeated: Vec<(usize, RecordPath)> = Vec::new();
    let mut outermost: Option<RecordPath> = None;

    while reader.has_next() {
        match reader.next() {
            Ok(Token::StartEntity { name, .. }) => {
                stack.push(name.composed());
                let path = stack.clone();
                if outermost.is_none() {
                    outermost = Some(path.clone());
                }
                let count = counts.entry(path.clone()).or_insert(0);
                *count += 1;
                if *count == 2 {
                    repeated.push((path.len(), path));
                }
            }
            Ok(Token::EndEntity) => {
                stack.pop();
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }

    // min_by_key keeps the first of equally shallow paths, which is exactly
    // the reached-two-first tie break.
    repeated
        .into_iter()
        .min_by_key(|(depth, _)| *depth)
        .map(|(_, path)| path)
        .or(outermost)
}
