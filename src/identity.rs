//! Identifier reissue for ingested topic trees.
//!
//! Every source topic gets a freshly generated UUID before it touches the
//! master tree, so identifiers can never collide once trees are combined and
//! no source identifier survives the merge.

use crate::model::Topic;
use serde_json::Value;
use uuid::Uuid;

/// Replace every `id` in the subtree with a fresh UUID.
///
/// Walks the known schema (the topic itself, then both child lists), and
/// additionally sweeps the flattened unknown-field maps so ids buried in
/// XMind substructures we don't model (summaries, extensions) are reissued
/// too.
pub fn reissue_ids(topic: &mut Topic) {
    topic.id = Some(Uuid::new_v4().to_string());

    for value in topic.extra.values_mut() {
        reissue_value_ids(value);
    }

    if let Some(children) = topic.children.as_mut() {
        for list in [children.attached.as_mut(), children.detached.as_mut()]
            .into_iter()
            .flatten()
        {
            for child in list {
                reissue_ids(child);
            }
        }
        for value in children.extra.values_mut() {
            reissue_value_ids(value);
        }
    }
}

/// Deep walk over untyped JSON replacing the value of any `id` key.
fn reissue_value_ids(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if key == "id" {
                    *val = Value::String(Uuid::new_v4().to_string());
                } else {
                    reissue_value_ids(val);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                reissue_value_ids(item);
            }
        }
        _ => {}
    }
}
