//! Top-level topic consolidation.
//!
//! After all sources are merged, top-level attached topics whose titles
//! match case-insensitively collapse into one: notes are merged, attached
//! children are concatenated, and a childless duplicate is dropped outright
//! since the surviving topic already represents it. Detached topics are
//! never consolidated and nothing below the top level is touched.

use crate::model::Topic;

/// Consolidate matching top-level attached topics in place.
///
/// Returns the number of consolidations performed plus any note-merge
/// warnings (possible note data loss, never fatal).
pub fn consolidate_top_level(root: &mut Topic) -> (usize, Vec<String>) {
    let mut warnings = Vec::new();

    let attached = match root.children.as_mut().and_then(|c| c.attached.as_mut()) {
        Some(list) => list,
        None => return (0, warnings),
    };

    let mut output: Vec<Topic> = Vec::new();
    let mut count = 0usize;

    for topic in attached.drain(..) {
        // First match wins; earlier-inserted topics take precedence.
        let slot = output.iter().position(|t| t.title_matches(&topic));
        match slot {
            Some(i) => {
                count += 1;
                merge_into(&mut output[i], topic, &mut warnings);
            }
            None => output.push(topic),
        }
    }

    *attached = output;
    (count, warnings)
}

/// Fold `topic` into the already-kept `target`.
fn merge_into(target: &mut Topic, mut topic: Topic, warnings: &mut Vec<String>) {
    if let Some(notes) = topic.notes.take() {
        match target.notes.as_mut() {
            Some(existing) => {
                if let Err(e) = existing.merge_from(&notes) {
                    warnings.push(format!(
                        "Warning: Unable to merge notes within top-level topic '{}', possible note data loss: {}",
                        target.title.as_deref().unwrap_or(""),
                        e
                    ));
                }
            }
            None => target.notes = Some(notes),
        }
    }

    if let Some(attached) = topic
        .children
        .take()
        .and_then(|mut c| c.attached.take())
    {
        target
            .children
            .get_or_insert_with(Default::default)
            .attached
            .get_or_insert_with(Vec::new)
            .extend(attached);
    }
    // A duplicate without children is dropped here; the kept topic already
    // stands in for it.
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Notes;

    fn root_with(attached: serde_json::Value) -> Topic {
        serde_json::from_value(serde_json::json!({
            "id": "root",
            "title": "Master",
            "children": {"attached": attached, "detached": [{"id": "log", "title": "Merge Log"}]}
        }))
        .unwrap()
    }

    fn titles(root: &Topic) -> Vec<String> {
        root.children.as_ref().unwrap().attached.as_ref().unwrap()
            .iter()
            .map(|t| t.title.clone().unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_case_insensitive_match_collapses() {
        let mut root = root_with(serde_json::json!([
            {"id": "1", "title": "Alpha", "children": {"attached": [{"id": "1a", "title": "One"}]}},
            {"id": "2", "title": "Beta"},
            {"id": "3", "title": "alpha", "children": {"attached": [{"id": "3a", "title": "Two"}]}}
        ]));
        let (count, warnings) = consolidate_top_level(&mut root);
        assert_eq!(count, 1);
        assert!(warnings.is_empty());
        assert_eq!(titles(&root), vec!["Alpha", "Beta"]);

        let alpha = &root.children.as_ref().unwrap().attached.as_ref().unwrap()[0];
        let kids: Vec<_> = alpha.children.as_ref().unwrap().attached.as_ref().unwrap()
            .iter()
            .map(|t| t.title.clone().unwrap())
            .collect();
        assert_eq!(kids, vec!["One", "Two"]);
    }

    #[test]
    fn test_distinct_titles_do_not_consolidate() {
        let mut root = root_with(serde_json::json!([
            {"id": "1", "title": "Alpha"},
            {"id": "2", "title": "Beta"}
        ]));
        let (count, _) = consolidate_top_level(&mut root);
        assert_eq!(count, 0);
        assert_eq!(titles(&root), vec!["Alpha", "Beta"]);
    }

    #[test]
    fn test_childless_duplicate_is_dropped() {
        let mut root = root_with(serde_json::json!([
            {"id": "1", "title": "Plan", "children": {"attached": [{"id": "1a", "title": "Q1"}]}},
            {"id": "2", "title": "plan"}
        ]));
        let (count, _) = consolidate_top_level(&mut root);
        assert_eq!(count, 1);
        assert_eq!(titles(&root), vec!["Plan"]);
        let plan = &root.children.as_ref().unwrap().attached.as_ref().unwrap()[0];
        assert_eq!(plan.children.as_ref().unwrap().attached.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_creates_children_on_bare_target() {
        let mut root = root_with(serde_json::json!([
            {"id": "1", "title": "Plan"},
            {"id": "2", "title": "plan", "children": {"attached": [{"id": "2a", "title": "Q2"}]}}
        ]));
        let (count, _) = consolidate_top_level(&mut root);
        assert_eq!(count, 1);
        let plan = &root.children.as_ref().unwrap().attached.as_ref().unwrap()[0];
        assert_eq!(plan.title.as_deref(), Some("Plan"));
        let kids = plan.children.as_ref().unwrap().attached.as_ref().unwrap();
        assert_eq!(kids[0].title.as_deref(), Some("Q2"));
    }

    #[test]
    fn test_notes_are_merged_not_lost() {
        let mut root = root_with(serde_json::json!([
            {"id": "1", "title": "Plan"},
            {"id": "2", "title": "plan"}
        ]));
        {
            let attached = root.children.as_mut().unwrap().attached.as_mut().unwrap();
            attached[0].notes = Some(Notes::single_line("kept"));
            attached[1].notes = Some(Notes::single_line("merged in"));
        }
        let (count, warnings) = consolidate_top_level(&mut root);
        assert_eq!(count, 1);
        assert!(warnings.is_empty());

        let plan = &root.children.as_ref().unwrap().attached.as_ref().unwrap()[0];
        assert_eq!(plan.notes.as_ref().unwrap().plain_text(), Some("kept\nmerged in"));
    }

    #[test]
    fn test_notes_copied_wholesale_when_target_has_none() {
        let mut root = root_with(serde_json::json!([
            {"id": "1", "title": "Plan"},
            {"id": "2", "title": "plan"}
        ]));
        root.children.as_mut().unwrap().attached.as_mut().unwrap()[1].notes =
            Some(Notes::single_line("from dup"));
        consolidate_top_level(&mut root);
        let plan = &root.children.as_ref().unwrap().attached.as_ref().unwrap()[0];
        assert_eq!(plan.notes.as_ref().unwrap().plain_text(), Some("from dup"));
    }

    #[test]
    fn test_bad_note_shape_is_warning_not_abort() {
        let mut root = root_with(serde_json::json!([
            {"id": "1", "title": "Plan", "children": {"attached": []}},
            {"id": "2", "title": "plan", "children": {"attached": [{"id": "2a", "title": "Q2"}]}}
        ]));
        {
            let attached = root.children.as_mut().unwrap().attached.as_mut().unwrap();
            let mut broken = Notes::single_line("kept");
            broken.html = None;
            attached[0].notes = Some(broken);
            attached[1].notes = Some(Notes::single_line("incoming"));
        }
        let (count, warnings) = consolidate_top_level(&mut root);
        assert_eq!(count, 1);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("possible note data loss"));
        // Children still merged despite the note warning.
        let plan = &root.children.as_ref().unwrap().attached.as_ref().unwrap()[0];
        assert_eq!(plan.children.as_ref().unwrap().attached.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_idempotence() {
        let mut root = root_with(serde_json::json!([
            {"id": "1", "title": "Alpha", "children": {"attached": [{"id": "1a", "title": "One"}]}},
            {"id": "2", "title": "ALPHA", "children": {"attached": [{"id": "2a", "title": "Two"}]}},
            {"id": "3", "title": "Beta"}
        ]));
        let (first, _) = consolidate_top_level(&mut root);
        assert_eq!(first, 1);
        let snapshot = serde_json::to_value(&root).unwrap();

        let (second, _) = consolidate_top_level(&mut root);
        assert_eq!(second, 0);
        assert_eq!(serde_json::to_value(&root).unwrap(), snapshot);
    }

    #[test]
    fn test_detached_never_consolidated() {
        let mut root = root_with(serde_json::json!([]));
        root.children.as_mut().unwrap().detached = Some(vec![
            Topic::with_title("Same"),
            Topic::with_title("same"),
        ]);
        let (count, _) = consolidate_top_level(&mut root);
        assert_eq!(count, 0);
        assert_eq!(root.children.as_ref().unwrap().detached.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_untitled_topics_never_match() {
        let mut root = root_with(serde_json::json!([
            {"id": "1"},
            {"id": "2"}
        ]));
        let (count, _) = consolidate_top_level(&mut root);
        assert_eq!(count, 0);
    }
}
