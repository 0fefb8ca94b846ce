//! Managed resource implementations
//!
//! Each resource translates between the flat `Dynamic` config/state maps
//! and the typed request structs in `crate::api`. Absent optional values
//! never reach the wire and missing response fields never reach state, so
//! both sides stay free of spurious nulls and zero values.

pub mod cce_access;
pub mod host_access;
pub mod keywords_alarm_rule;
pub mod log_converge;
pub mod log_group;
pub mod log_stream;
pub mod metric_rule;
pub mod sql_alarm_rule;
pub mod struct_template;
pub mod transfer;

use std::collections::HashMap;

use crate::api::Tag;
use crate::types::Dynamic;

pub(crate) fn get_string(values: &HashMap<String, Dynamic>, name: &str) -> Option<String> {
    values
        .get(name)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

pub(crate) fn get_bool(values: &HashMap<String, Dynamic>, name: &str) -> Option<bool> {
    values.get(name).and_then(|v| v.as_bool())
}

pub(crate) fn get_i64(values: &HashMap<String, Dynamic>, name: &str) -> Option<i64> {
    values.get(name).and_then(|v| v.as_i64())
}

pub(crate) fn get_string_list(
    values: &HashMap<String, Dynamic>,
    name: &str,
) -> Option<Vec<String>> {
    values.get(name).and_then(|v| v.as_list()).map(|items| {
        items
            .iter()
            .filter_map(|v| v.as_string())
            .map(|s| s.to_string())
            .collect()
    })
}

pub(crate) fn get_string_map(
    values: &HashMap<String, Dynamic>,
    name: &str,
) -> Option<HashMap<String, String>> {
    values.get(name).and_then(|v| v.as_map()).map(|entries| {
        entries
            .iter()
            .filter_map(|(k, v)| v.as_string().map(|s| (k.clone(), s.to_string())))
            .collect()
    })
}

/// First element of a list-of-objects block, the shape single nested
/// blocks arrive in
pub(crate) fn get_block<'a>(
    values: &'a HashMap<String, Dynamic>,
    name: &str,
) -> Option<&'a HashMap<String, Dynamic>> {
    values
        .get(name)
        .and_then(|v| v.as_list())
        .and_then(|items| items.first())
        .and_then(|v| v.as_map())
}

pub(crate) fn get_block_list<'a>(
    values: &'a HashMap<String, Dynamic>,
    name: &str,
) -> Option<&'a [Dynamic]> {
    values.get(name).and_then(|v| v.as_list())
}

/// Tags arrive as a string map and go out as key/value pairs
pub(crate) fn expand_tags(values: &HashMap<String, Dynamic>, name: &str) -> Option<Vec<Tag>> {
    get_string_map(values, name).map(|entries| {
        let mut tags: Vec<Tag> = entries
            .into_iter()
            .map(|(key, value)| Tag { key, value })
            .collect();
        tags.sort_by(|a, b| a.key.cmp(&b.key));
        tags
    })
}

pub(crate) fn flatten_tags(tags: &[Tag]) -> Dynamic {
    Dynamic::Map(
        tags.iter()
            .map(|t| (t.key.clone(), Dynamic::String(t.value.clone())))
            .collect(),
    )
}

pub(crate) fn string_list(items: &[String]) -> Dynamic {
    Dynamic::List(
        items
            .iter()
            .map(|s| Dynamic::String(s.clone()))
            .collect(),
    )
}

pub(crate) fn string_map(entries: &HashMap<String, String>) -> Dynamic {
    Dynamic::Map(
        entries
            .iter()
            .map(|(k, v)| (k.clone(), Dynamic::String(v.clone())))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_accessor_returns_first_element() {
        let mut inner = HashMap::new();
        inner.insert("mode".to_string(), Dynamic::String("single".to_string()));
        let mut values = HashMap::new();
        values.insert(
            "format".to_string(),
            Dynamic::List(vec![Dynamic::Map(inner)]),
        );

        let block = get_block(&values, "format").unwrap();
        assert_eq!(block["mode"].as_string(), Some("single"));
        assert!(get_block(&values, "missing").is_none());
    }

    #[test]
    fn tags_round_trip_between_map_and_pairs() {
        let mut values = HashMap::new();
        let mut tags = HashMap::new();
        tags.insert("owner".to_string(), Dynamic::String("ops".to_string()));
        tags.insert("env".to_string(), Dynamic::String("prod".to_string()));
        values.insert("tags".to_string(), Dynamic::Map(tags));

        let expanded = expand_tags(&values, "tags").unwrap();
        assert_eq!(expanded.len(), 2);
        assert_eq!(expanded[0].key, "env");

        let flattened = flatten_tags(&expanded);
        assert_eq!(
            flattened.as_map().unwrap()["owner"].as_string(),
            Some("ops")
        );
    }
}
