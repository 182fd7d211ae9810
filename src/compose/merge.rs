//! Deep merge for compose documents.
//!
//! # Merge Rules
//!
//! - Mappings are merged recursively
//! - Sequences are unioned: existing items keep their order, new items are
//!   appended, duplicates are dropped
//! - Anything else in the source replaces the target

use serde_yaml::{Mapping, Value};

/// Merge `source` into `target` in place.
pub fn merge_with(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Mapping(target_map), Value::Mapping(source_map)) => {
            for (key, source_value) in source_map {
                match target_map.get_mut(key) {
                    Some(existing) => merge_with(existing, source_value),
                    None => {
                        target_map.insert(key.clone(), source_value.clone());
                    }
                }
            }
        }
        (Value::Sequence(target_seq), Value::Sequence(source_seq)) => {
            for item in source_seq {
                if !target_seq.contains(item) {
                    target_seq.push(item.clone());
                }
            }
        }
        (target, source) => *target = source.clone(),
    }
}

/// Merge documents in order into a fresh mapping.
pub fn merge_all<'a, I>(documents: I) -> Value
where
    I: IntoIterator<Item = &'a Value>,
{
    documents
        .into_iter()
        .fold(Value::Mapping(Mapping::new()), |mut acc, doc| {
            merge_with(&mut acc, doc);
            acc
        })
}
