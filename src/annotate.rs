//! Source-attribution notes.
//!
//! When requested, every merged top-level topic (or every topic, if a deeper
//! merge will consolidate subtrees) gets a note line recording which source
//! file it came from, so provenance survives the merge.

use crate::model::{Notes, Topic};

/// Prefix of the attribution note line.
pub const SRC_ATTR_TAG: &str = "Merge-Source: ";

/// Append an attribution note to each topic in the list.
///
/// With `recursive` set, descends into both child lists first so that
/// context is not lost when consolidation later re-parents subtrees.
/// Topics without notes get a fresh three-representation note; topics with
/// notes get the line appended. A note whose shape can't be appended to is
/// reported and skipped, never aborting the rest of the list.
pub fn annotate_topics(topics: &mut [Topic], source_file: &str, recursive: bool) -> Vec<String> {
    let line = format!("{}{}", SRC_ATTR_TAG, source_file);
    let mut errors = Vec::new();
    annotate_inner(topics, &line, source_file, recursive, &mut errors);
    errors
}

fn annotate_inner(
    topics: &mut [Topic],
    line: &str,
    source_file: &str,
    recursive: bool,
    errors: &mut Vec<String>,
) {
    for topic in topics {
        if recursive {
            if let Some(children) = topic.children.as_mut() {
                if let Some(attached) = children.attached.as_mut() {
                    annotate_inner(attached, line, source_file, recursive, errors);
                }
                if let Some(detached) = children.detached.as_mut() {
                    annotate_inner(detached, line, source_file, recursive, errors);
                }
            }
        }

        match topic.notes.as_mut() {
            Some(notes) => {
                if let Err(e) = notes.append_line(line) {
                    errors.push(format!(
                        "Unable to add to existing note in {}: {}",
                        source_file, e
                    ));
                }
            }
            None => topic.notes = Some(Notes::single_line(line)),
        }
    }
}
