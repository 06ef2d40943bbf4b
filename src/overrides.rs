//! Convert `key=value` overrides into a config layer.
//!
//! Values are read as YAML scalars or flow collections, so `enabled=false`
//! is a boolean, `tags=[a, b]` is a list and `alias=orders` stays a string.
//! Dotted keys nest: `meta.owner=finance` becomes `{meta: {owner: finance}}`.

use serde_json::Value;

use crate::error::NodefigError;
use crate::types::ConfigMap;

/// Split `key=value` at the first `=`.
pub fn parse_override(raw: &str) -> Result<(String, Value), NodefigError> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(NodefigError::InvalidOverride {
            key: raw.to_string(),
            reason: "expected key=value".into(),
        });
    };
    let key = key.trim();
    if key.is_empty() || key.split('.').any(str::is_empty) {
        return Err(NodefigError::InvalidOverride {
            key: key.to_string(),
            reason: "empty key segment".into(),
        });
    }
    Ok((key.to_string(), parse_value(value)))
}

fn parse_value(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::String(raw.to_string());
    }
    serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Convert dotted-key overrides into a nested mapping.
///
/// `("meta.owner", "finance")` becomes `{meta: {owner: finance}}`.
///
/// If multiple entries target the same key, the last one wins.
pub fn overrides_to_map(entries: &[(String, Value)]) -> Result<ConfigMap, NodefigError> {
    let mut map = ConfigMap::new();
    for (dotted_key, value) in entries {
        set_nested(&mut map, dotted_key, value.clone())?;
    }
    Ok(map)
}

fn set_nested(map: &mut ConfigMap, dotted_key: &str, value: Value) -> Result<(), NodefigError> {
    let (parents, leaf) = match dotted_key.rsplit_once('.') {
        Some((parents, leaf)) => (parents.split('.').collect::<Vec<_>>(), leaf),
        None => (Vec::new(), dotted_key),
    };

    let mut current = map;
    for segment in parents {
        current = current
            .entry(segment)
            .or_insert_with(|| Value::Object(ConfigMap::new()))
            .as_object_mut()
            .ok_or_else(|| NodefigError::InvalidOverride {
                key: dotted_key.to_string(),
                reason: format!("'{segment}' is already set to a non-mapping value"),
            })?;
    }
    current.insert(leaf.to_string(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::obj;
    use serde_json::json;

    fn entries(pairs: &[(&str, Value)]) -> Vec<(String, Value)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn values_are_typed() {
        assert_eq!(parse_override("enabled=false").unwrap(), ("enabled".into(), json!(false)));
        assert_eq!(parse_override("limit=10").unwrap().1, json!(10));
        assert_eq!(parse_override("tags=[a, b]").unwrap().1, json!(["a", "b"]));
        assert_eq!(parse_override("alias=orders").unwrap().1, json!("orders"));
    }

    #[test]
    fn value_may_contain_equals() {
        assert_eq!(
            parse_override("where=id = 1").unwrap(),
            ("where".into(), json!("id = 1"))
        );
    }

    #[test]
    fn empty_value_is_empty_string() {
        assert_eq!(parse_override("alias=").unwrap().1, json!(""));
    }

    #[test]
    fn missing_equals() {
        let err = parse_override("materialized").unwrap_err();
        assert!(matches!(err, NodefigError::InvalidOverride { .. }));
    }

    #[test]
    fn empty_key_segment() {
        assert!(parse_override("=x").is_err());
        assert!(parse_override("meta..owner=x").is_err());
    }

    #[test]
    fn flat_key() {
        let map = overrides_to_map(&entries(&[("materialized", json!("table"))])).unwrap();
        assert_eq!(map, obj(json!({"materialized": "table"})));
    }

    #[test]
    fn nested_keys_share_parent() {
        let map = overrides_to_map(&entries(&[
            ("meta.owner", json!("finance")),
            ("meta.team", json!("core")),
            ("docs.show", json!(false)),
        ]))
        .unwrap();
        assert_eq!(
            map,
            obj(json!({"meta": {"owner": "finance", "team": "core"}, "docs": {"show": false}}))
        );
    }

    #[test]
    fn last_entry_wins_for_same_key() {
        let map = overrides_to_map(&entries(&[
            ("materialized", json!("table")),
            ("materialized", json!("view")),
        ]))
        .unwrap();
        assert_eq!(map["materialized"], json!("view"));
    }

    #[test]
    fn conflicting_parent_is_an_error() {
        let err = overrides_to_map(&entries(&[
            ("meta", json!("flat")),
            ("meta.owner", json!("finance")),
        ]))
        .unwrap_err();
        assert!(matches!(err, NodefigError::InvalidOverride { ref key, .. } if key == "meta.owner"));
    }

    #[test]
    fn empty_list_empty_map() {
        assert!(overrides_to_map(&[]).unwrap().is_empty());
    }
}
