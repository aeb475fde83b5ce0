//! Tree merge engine.
//!
//! A `MergeSession` owns the accumulating master tree for one run. Each
//! source contributes its root topic's top-level attached and detached
//! lists (with all ids reissued first), plus a summary entry under the
//! master's merge-log topic. The post passes (consolidate, sort, fold)
//! mutate the same session in place, in that order.

use crate::annotate;
use crate::consolidate;
use crate::identity;
use crate::model::{Children, Sheet, Topic};
use crate::transform;
use serde_json::Value;

/// Outcome of merging one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStatus {
    Ok,
    Warning,
    Failure,
}

impl MergeStatus {
    /// Single-character progress code printed per source.
    pub fn glyph(self) -> char {
        match self {
            MergeStatus::Ok => '+',
            MergeStatus::Warning => '?',
            MergeStatus::Failure => 'x',
        }
    }
}

/// Per-run merge options.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    /// Add a source-file attribution note to merged topics.
    pub attribution: bool,
    /// A deeper merge (consolidation) is configured; attribution recurses.
    pub deeper: bool,
}

/// The accumulating master workbook plus the run's ordered error log.
#[derive(Debug)]
pub struct MergeSession {
    root: Topic,
    sheet_extra: serde_json::Map<String, Value>,
    options: MergeOptions,
    /// Ordered log of per-source and per-operation errors, surfaced at the
    /// end of the run.
    pub errors: Vec<String>,
    /// Sources that merged with status ok or warning.
    pub sources_merged: usize,
    /// Top-level topics (attached + detached) appended across all sources.
    pub topics_merged: usize,
}

impl MergeSession {
    /// Build a session from template content.json. Parse failures and a
    /// missing root topic are fatal.
    pub fn new(template_json: &str, options: MergeOptions) -> Result<Self, String> {
        let mut sheets: Vec<Sheet> = serde_json::from_str(template_json)
            .map_err(|e| format!("template content unreadable: {}", e))?;
        if sheets.is_empty() {
            return Err("template content has no sheet".to_string());
        }
        let mut sheet = sheets.remove(0);
        let root = sheet
            .root_topic
            .take()
            .ok_or_else(|| "template content has no root topic".to_string())?;

        Ok(MergeSession {
            root,
            sheet_extra: sheet.extra,
            options,
            errors: Vec::new(),
            sources_merged: 0,
            topics_merged: 0,
        })
    }

    /// Merge one source's content.json into the master.
    ///
    /// `resource_count` is how many resources the source carried; it only
    /// feeds the merge-log summary. Only the first sheet of the workbook is
    /// considered.
    pub fn merge_source(
        &mut self,
        src_json: &str,
        src_name: &str,
        resource_count: usize,
    ) -> MergeStatus {
        let value: Value = match serde_json::from_str(src_json) {
            Ok(v) => v,
            Err(e) => {
                self.errors
                    .push(format!("Unable to parse JSON in '{}': {}", src_name, e));
                return MergeStatus::Failure;
            }
        };

        let first = value.as_array().and_then(|sheets| sheets.first());
        let sheet: Sheet = match first.map(|v| serde_json::from_value(v.clone())) {
            Some(Ok(sheet)) => sheet,
            Some(Err(e)) => {
                self.errors
                    .push(format!("Unable to parse JSON in '{}': {}", src_name, e));
                return MergeStatus::Failure;
            }
            None => {
                self.errors
                    .push(format!("No root topic in '{}'", src_name));
                return MergeStatus::Failure;
            }
        };

        let mut root = match sheet.root_topic {
            Some(root) => root,
            None => {
                self.errors
                    .push(format!("No root topic in '{}'", src_name));
                return MergeStatus::Failure;
            }
        };

        identity::reissue_ids(&mut root);

        let src_title = root.title.clone();
        let mut src_children = root.children.take().unwrap_or_default();
        let mut status = MergeStatus::Ok;
        let mut topic_count = 0usize;

        match src_children.attached.take() {
            Some(mut attached) => {
                if self.options.attribution {
                    let errors =
                        annotate::annotate_topics(&mut attached, src_name, self.options.deeper);
                    self.errors.extend(errors);
                }
                topic_count += attached.len();
                self.attached_mut().extend(attached);
            }
            None => {
                status = MergeStatus::Warning;
                self.errors
                    .push(format!("No attached subtopics found in '{}'", src_name));
            }
        }

        if let Some(mut detached) = src_children.detached.take() {
            if self.options.attribution {
                let errors =
                    annotate::annotate_topics(&mut detached, src_name, self.options.deeper);
                self.errors.extend(errors);
            }
            topic_count += detached.len();
            self.detached_mut().extend(detached);
        }

        self.push_summary(src_title, src_name, topic_count, resource_count);
        self.sources_merged += 1;
        self.topics_merged += topic_count;
        status
    }

    /// Record a source that failed before its content could be merged.
    pub fn record_failure(&mut self, message: String) {
        self.errors.push(message);
    }

    /// Consolidate matching top-level topics; returns the match count.
    pub fn consolidate(&mut self) -> usize {
        let (count, warnings) = consolidate::consolidate_top_level(&mut self.root);
        self.errors.extend(warnings);
        count
    }

    /// Sort every attached list by title, root to leaf.
    pub fn sort_topics(&mut self) {
        transform::sort_topics(&mut self.root);
    }

    /// Mark top-level branches with children as folded.
    pub fn fold_top_level(&mut self) {
        transform::fold_top_level(&mut self.root);
    }

    /// Serialize the master workbook back to content.json form.
    pub fn to_json(&self) -> Result<String, String> {
        let sheet = Sheet {
            root_topic: Some(self.root.clone()),
            extra: self.sheet_extra.clone(),
        };
        serde_json::to_string(&vec![sheet])
            .map_err(|e| format!("unable to serialize merged content: {}", e))
    }

    /// Read access to the master root, for post-pass assertions.
    pub fn root(&self) -> &Topic {
        &self.root
    }

    fn children_mut(&mut self) -> &mut Children {
        self.root.children.get_or_insert_with(Children::default)
    }

    fn attached_mut(&mut self) -> &mut Vec<Topic> {
        self.children_mut().attached.get_or_insert_with(Vec::new)
    }

    fn detached_mut(&mut self) -> &mut Vec<Topic> {
        self.children_mut().detached.get_or_insert_with(Vec::new)
    }

    /// The merge-log topic's attached list. The template guarantees the
    /// first detached topic is the merge log; recreate it if a template
    /// variant lacks one.
    fn merge_log_mut(&mut self) -> &mut Vec<Topic> {
        let detached = self.detached_mut();
        if detached.is_empty() {
            detached.push(Topic::with_title("Merge Log"));
        }
        detached[0]
            .children
            .get_or_insert_with(Children::default)
            .attached
            .get_or_insert_with(Vec::new)
    }

    /// Append the per-source summary entry to the merge log: source title,
    /// topic count, resource count (only when non-zero), source filename.
    fn push_summary(
        &mut self,
        src_title: Option<String>,
        src_name: &str,
        topic_count: usize,
        resource_count: usize,
    ) {
        let mut lines = vec![Topic::with_title(format!(
            "Merged {} top-level topics",
            topic_count
        ))];
        if resource_count > 0 {
            lines.push(Topic::with_title(format!(
                "Merged {} resources",
                resource_count
            )));
        }
        lines.push(Topic::with_title(format!("Source file was {}", src_name)));

        let summary = Topic {
            id: Some(uuid::Uuid::new_v4().to_string()),
            title: src_title,
            children: Some(Children {
                attached: Some(lines),
                detached: None,
                extra: serde_json::Map::new(),
            }),
            ..Default::default()
        };
        self.merge_log_mut().push(summary);
    }
}
