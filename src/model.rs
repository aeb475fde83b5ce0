//! Typed schema for XMind workbook content.
//!
//! Mirrors the JSON layout of `content.json`: a workbook is an array of
//! sheets, each sheet has one root topic, and topics nest through two
//! independent child lists (`attached` renders nested, `detached` floats).
//! Unknown XMind fields (markers, style, extensions) are round-tripped
//! through flattened `extra` maps so a merge never strips them.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// One sheet of a workbook. Only the first sheet of a source is merged.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Sheet {
    #[serde(rename = "rootTopic", default, skip_serializing_if = "Option::is_none")]
    pub root_topic: Option<Topic>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A node in the mind-map tree.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Topic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Children>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Notes>,
    /// Presentation marker; `"folded"` collapses the branch in the editor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Topic {
    /// Leaf topic with a fresh id, used for merge-log summary entries.
    pub fn with_title(title: impl Into<String>) -> Self {
        Topic {
            id: Some(uuid::Uuid::new_v4().to_string()),
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Case-insensitive title match; topics without a title never match.
    pub fn title_matches(&self, other: &Topic) -> bool {
        match (&self.title, &other.title) {
            (Some(a), Some(b)) => a.to_uppercase() == b.to_uppercase(),
            _ => false,
        }
    }
}

/// The two child-list slots of a topic.
///
/// Both lists deserialize leniently: a malformed (non-list) value is treated
/// the same as an absent one, which the merge step reports as a warning
/// rather than failing the whole source.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Children {
    #[serde(
        default,
        deserialize_with = "lenient_topic_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub attached: Option<Vec<Topic>>,
    #[serde(
        default,
        deserialize_with = "lenient_topic_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub detached: Option<Vec<Topic>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn lenient_topic_list<'de, D>(deserializer: D) -> Result<Option<Vec<Topic>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Recoverable note-shape mismatch.
///
/// The three note representations must stay mutually consistent, so an
/// append or merge first verifies the shape it is about to touch and bails
/// out before mutating anything if a representation is missing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NoteShapeError {
    #[error("plain note content missing")]
    MissingPlain,
    #[error("html note content missing")]
    MissingHtml,
}

/// A topic note in up to three parallel representations.
///
/// `plain` and `html` travel together; `ops` is optional even when the
/// other two are present.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Notes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plain: Option<PlainNote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ops: Option<OpsNote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<HtmlNote>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlainNote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpsNote {
    #[serde(default)]
    pub ops: Vec<InsertOp>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InsertOp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HtmlNote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<HtmlContent>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HtmlContent {
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Paragraph {
    #[serde(default)]
    pub spans: Vec<Span>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Span {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Notes {
    /// Fresh note carrying a single line in all three representations.
    pub fn single_line(line: &str) -> Self {
        Notes {
            plain: Some(PlainNote {
                content: Some(line.to_string()),
                extra: Map::new(),
            }),
            ops: Some(OpsNote {
                ops: vec![InsertOp {
                    insert: Some(Value::String(format!("{}\n", line))),
                    extra: Map::new(),
                }],
                extra: Map::new(),
            }),
            html: Some(HtmlNote {
                content: Some(HtmlContent {
                    paragraphs: vec![Paragraph {
                        spans: vec![Span {
                            text: Some(line.to_string()),
                            extra: Map::new(),
                        }],
                        extra: Map::new(),
                    }],
                    extra: Map::new(),
                }),
                extra: Map::new(),
            }),
            extra: Map::new(),
        }
    }

    /// Verify that the plain and html representations are present and
    /// appendable. Run before any mutation so a mismatch never leaves the
    /// representations half-updated.
    fn check_appendable(&self) -> Result<(), NoteShapeError> {
        let plain_ok = self
            .plain
            .as_ref()
            .map(|p| p.content.is_some())
            .unwrap_or(false);
        if !plain_ok {
            return Err(NoteShapeError::MissingPlain);
        }
        let html_ok = self
            .html
            .as_ref()
            .map(|h| h.content.is_some())
            .unwrap_or(false);
        if !html_ok {
            return Err(NoteShapeError::MissingHtml);
        }
        Ok(())
    }

    /// Append one line to every representation that is present.
    ///
    /// Plain gets a newline separator, html a new single-span paragraph, and
    /// ops a trailing-newline insert only if an ops section already exists.
    pub fn append_line(&mut self, line: &str) -> Result<(), NoteShapeError> {
        self.check_appendable()?;

        // Checked above, so these always hit the Some arms.
        if let Some(content) = self.plain.as_mut().and_then(|p| p.content.as_mut()) {
            content.push('\n');
            content.push_str(line);
        }
        if let Some(content) = self.html.as_mut().and_then(|h| h.content.as_mut()) {
            content.paragraphs.push(Paragraph {
                spans: vec![Span {
                    text: Some(line.to_string()),
                    extra: Map::new(),
                }],
                extra: Map::new(),
            });
        }
        if let Some(ops) = self.ops.as_mut() {
            ops.ops.push(InsertOp {
                insert: Some(Value::String(format!("{}\n", line))),
                extra: Map::new(),
            });
        }
        Ok(())
    }

    /// Concatenate another topic's notes onto this one.
    ///
    /// Plain text is newline-joined, html paragraph lists are concatenated,
    /// and ops lists are concatenated only when the other side carries ops
    /// (creating an ops section here if it was missing).
    pub fn merge_from(&mut self, other: &Notes) -> Result<(), NoteShapeError> {
        self.check_appendable()?;
        other.check_appendable()?;

        if let (Some(mine), Some(theirs)) = (
            self.plain.as_mut().and_then(|p| p.content.as_mut()),
            other.plain.as_ref().and_then(|p| p.content.as_ref()),
        ) {
            mine.push('\n');
            mine.push_str(theirs);
        }
        if let (Some(mine), Some(theirs)) = (
            self.html.as_mut().and_then(|h| h.content.as_mut()),
            other.html.as_ref().and_then(|h| h.content.as_ref()),
        ) {
            mine.paragraphs.extend(theirs.paragraphs.iter().cloned());
        }
        if let Some(theirs) = other.ops.as_ref() {
            match self.ops.as_mut() {
                Some(mine) => mine.ops.extend(theirs.ops.iter().cloned()),
                None => self.ops = Some(theirs.clone()),
            }
        }
        Ok(())
    }

    /// The plain-text content, if present. Test and reporting helper.
    pub fn plain_text(&self) -> Option<&str> {
        self.plain.as_ref().and_then(|p| p.content.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_note() {
        let notes = Notes::single_line("Merge-Source: a.xmind");
        assert_eq!(notes.plain_text(), Some("Merge-Source: a.xmind"));

        let ops = notes.ops.as_ref().unwrap();
        assert_eq!(ops.ops.len(), 1);
        assert_eq!(
            ops.ops[0].insert,
            Some(Value::String("Merge-Source: a.xmind\n".to_string()))
        );

        let paragraphs = &notes.html.as_ref().unwrap().content.as_ref().unwrap().paragraphs;
        assert_eq!(paragraphs.len(), 1);
        assert_eq!(paragraphs[0].spans[0].text.as_deref(), Some("Merge-Source: a.xmind"));
    }

    #[test]
    fn test_append_line_to_existing() {
        let mut notes = Notes::single_line("X");
        notes.append_line("Merge-Source: file.ext").unwrap();

        assert_eq!(notes.plain_text(), Some("X\nMerge-Source: file.ext"));
        let paragraphs = &notes.html.as_ref().unwrap().content.as_ref().unwrap().paragraphs;
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(notes.ops.as_ref().unwrap().ops.len(), 2);
    }

    #[test]
    fn test_append_without_ops_leaves_ops_absent() {
        let mut notes = Notes::single_line("X");
        notes.ops = None;
        notes.append_line("Y").unwrap();
        assert!(notes.ops.is_none());
        assert_eq!(notes.plain_text(), Some("X\nY"));
    }

    #[test]
    fn test_append_line_missing_plain() {
        let mut notes = Notes::single_line("X");
        notes.plain = None;
        let before = serde_json::to_value(&notes).unwrap();
        assert_eq!(notes.append_line("Y"), Err(NoteShapeError::MissingPlain));
        // Nothing mutated on failure.
        assert_eq!(serde_json::to_value(&notes).unwrap(), before);
    }

    #[test]
    fn test_append_line_missing_html() {
        let mut notes = Notes::single_line("X");
        notes.html = None;
        assert_eq!(notes.append_line("Y"), Err(NoteShapeError::MissingHtml));
    }

    #[test]
    fn test_merge_from_concatenates() {
        let mut a = Notes::single_line("from a");
        let b = Notes::single_line("from b");
        a.merge_from(&b).unwrap();

        assert_eq!(a.plain_text(), Some("from a\nfrom b"));
        let paragraphs = &a.html.as_ref().unwrap().content.as_ref().unwrap().paragraphs;
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(a.ops.as_ref().unwrap().ops.len(), 2);
    }

    #[test]
    fn test_merge_from_creates_ops_when_absent() {
        let mut a = Notes::single_line("from a");
        a.ops = None;
        let b = Notes::single_line("from b");
        a.merge_from(&b).unwrap();
        assert_eq!(a.ops.as_ref().unwrap().ops.len(), 1);
    }

    #[test]
    fn test_merge_from_skips_ops_when_other_lacks_them() {
        let mut a = Notes::single_line("from a");
        let mut b = Notes::single_line("from b");
        b.ops = None;
        a.merge_from(&b).unwrap();
        // Only a's own op remains.
        assert_eq!(a.ops.as_ref().unwrap().ops.len(), 1);
    }

    #[test]
    fn test_topic_title_match_case_insensitive() {
        let a = Topic::with_title("Alpha");
        let b = Topic::with_title("alpha");
        let c = Topic::with_title("Beta");
        let untitled = Topic::default();
        assert!(a.title_matches(&b));
        assert!(!a.title_matches(&c));
        assert!(!a.title_matches(&untitled));
        assert!(!untitled.title_matches(&untitled));
    }

    #[test]
    fn test_topic_roundtrip_preserves_unknown_fields() {
        let json = r#"{
            "id": "t1",
            "title": "Plan",
            "markers": [{"markerId": "priority-1"}],
            "children": {"attached": [{"id": "t2", "title": "Q1"}], "summaries": []}
        }"#;
        let topic: Topic = serde_json::from_str(json).unwrap();
        assert_eq!(topic.title.as_deref(), Some("Plan"));
        assert!(topic.extra.contains_key("markers"));
        let children = topic.children.as_ref().unwrap();
        assert_eq!(children.attached.as_ref().unwrap().len(), 1);
        assert!(children.extra.contains_key("summaries"));

        let back = serde_json::to_value(&topic).unwrap();
        assert_eq!(back["markers"][0]["markerId"], "priority-1");
    }

    #[test]
    fn test_malformed_attached_list_becomes_none() {
        let json = r#"{"id": "t1", "children": {"attached": "not a list"}}"#;
        let topic: Topic = serde_json::from_str(json).unwrap();
        assert!(topic.children.as_ref().unwrap().attached.is_none());
    }
}
