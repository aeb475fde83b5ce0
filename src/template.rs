//! Bundled output template.
//!
//! The master workbook starts from an empty template whose root topic
//! carries one detached "Merge Log" topic, the accumulation anchor for
//! per-source summaries. The auxiliary files are copied verbatim into the
//! output archive.

/// Template `content.json`: one sheet, empty attached list, merge-log topic.
pub const TEMPLATE_CONTENT: &str = include_str!("../template/content.json");

/// Auxiliary files written into every output archive unchanged.
pub const OTHER_FILES: &[(&str, &[u8])] = &[
    ("content.xml", include_bytes!("../template/content.xml")),
    ("metadata.json", include_bytes!("../template/metadata.json")),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sheet;

    #[test]
    fn test_template_parses_with_merge_log_anchor() {
        let sheets: Vec<Sheet> = serde_json::from_str(TEMPLATE_CONTENT).unwrap();
        assert_eq!(sheets.len(), 1);

        let root = sheets[0].root_topic.as_ref().unwrap();
        let children = root.children.as_ref().unwrap();
        assert_eq!(children.attached.as_ref().unwrap().len(), 0);

        let detached = children.detached.as_ref().unwrap();
        assert_eq!(detached.len(), 1);
        let log = &detached[0];
        assert_eq!(log.title.as_deref(), Some("Merge Log"));
        assert!(log
            .children
            .as_ref()
            .unwrap()
            .attached
            .as_ref()
            .unwrap()
            .is_empty());
    }
}
