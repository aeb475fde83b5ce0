//! Post-merge presentation passes: recursive title sort and branch folding.

use crate::model::Topic;
use std::cmp::Ordering;

/// Stable ascending title sort of every attached list, root to leaf.
///
/// Detached lists are never reordered. Untitled topics sort after titled
/// ones.
pub fn sort_topics(topic: &mut Topic) {
    if let Some(attached) = topic.children.as_mut().and_then(|c| c.attached.as_mut()) {
        attached.sort_by(compare_titles);
        for child in attached {
            sort_topics(child);
        }
    }
}

fn compare_titles(a: &Topic, b: &Topic) -> Ordering {
    match (&a.title, &b.title) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Mark every top-level attached topic that has children as folded.
///
/// Presentation-only; no recursion, no effect on detached topics.
pub fn fold_top_level(root: &mut Topic) {
    if let Some(attached) = root.children.as_mut().and_then(|c| c.attached.as_mut()) {
        for topic in attached {
            if topic.children.is_some() {
                topic.branch = Some("folded".to_string());
            }
        }
    }
}
