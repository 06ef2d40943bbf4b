//! Same-contents comparison of unrendered configs across runs.

use crate::policy::{PolicyTable, ResourceShape, ShapeId};
use crate::types::{CompareBehavior, ConfigMap};

/// The only fields a test's config is compared on.
pub const TEST_MODIFIERS: [&str; 8] = [
    "severity",
    "where",
    "limit",
    "fail_calc",
    "warn_if",
    "error_if",
    "store_failures",
    "store_failures_as",
];

/// A key matches when it is absent from both sides or present and equal in
/// both.
pub fn compare_key(a: &ConfigMap, b: &ConfigMap, key: &str) -> bool {
    match (a.get(key), b.get(key)) {
        (None, None) => true,
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Whether two configs are equivalent for state comparison.
///
/// Declared fields are compared first, skipping those marked
/// [`CompareBehavior::Exclude`]; then every undeclared key of either side.
/// Tests only compare [`TEST_MODIFIERS`].
pub fn same_contents(
    a: &ConfigMap,
    b: &ConfigMap,
    shape: ResourceShape,
    table: &PolicyTable,
) -> bool {
    if shape == ResourceShape::Test {
        return TEST_MODIFIERS.iter().all(|key| compare_key(a, b, key));
    }

    let id = ShapeId::Resource(shape);
    let declared = table.fields(&id);
    for field in declared {
        if field.compare == CompareBehavior::Include && !compare_key(a, b, &field.name) {
            tracing::trace!(field = %field.name, shape = shape.name(), "config differs");
            return false;
        }
    }

    a.keys()
        .chain(b.keys())
        .filter(|key| !declared.iter().any(|f| &f.name == *key))
        .all(|key| {
            let same = compare_key(a, b, key);
            if !same {
                tracing::trace!(field = %key, shape = shape.name(), "config differs");
            }
            same
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::obj;
    use serde_json::json;

    fn same(a: serde_json::Value, b: serde_json::Value, shape: ResourceShape) -> bool {
        same_contents(&obj(a), &obj(b), shape, PolicyTable::shared())
    }

    #[test]
    fn reflexive() {
        let x = json!({
            "materialized": "table",
            "tags": ["a"],
            "meta": {"owner": "x"},
            "custom": [1, 2],
        });
        assert!(same(x.clone(), x, ResourceShape::Node));
    }

    #[test]
    fn excluded_fields_may_differ() {
        assert!(same(
            json!({"materialized": "table", "schema": "a", "tags": ["x"]}),
            json!({"materialized": "table", "schema": "b"}),
            ResourceShape::Node,
        ));
    }

    #[test]
    fn included_field_difference() {
        assert!(!same(
            json!({"materialized": "table"}),
            json!({"materialized": "view"}),
            ResourceShape::Node,
        ));
    }

    #[test]
    fn presence_on_one_side_only() {
        assert!(!same(
            json!({"materialized": "table"}),
            json!({}),
            ResourceShape::Node,
        ));
        assert!(!same(json!({}), json!({"custom": 1}), ResourceShape::Node));
    }

    #[test]
    fn extra_keys_compared() {
        assert!(!same(
            json!({"transient": true}),
            json!({"transient": false}),
            ResourceShape::Node,
        ));
        assert!(same(
            json!({"transient": true}),
            json!({"transient": true}),
            ResourceShape::Node,
        ));
    }

    #[test]
    fn tests_compare_only_modifiers() {
        assert!(same(
            json!({"severity": "warn", "enabled": true, "custom": 1}),
            json!({"severity": "warn", "enabled": false}),
            ResourceShape::Test,
        ));
        assert!(!same(
            json!({"severity": "warn"}),
            json!({"severity": "error"}),
            ResourceShape::Test,
        ));
        assert!(!same(
            json!({"where": "id > 1"}),
            json!({}),
            ResourceShape::Test,
        ));
    }

    #[test]
    fn unknown_shape_compares_everything() {
        let a = obj(json!({"schema": "a"}));
        let b = obj(json!({"schema": "b"}));
        assert!(!same_contents(&a, &b, ResourceShape::Node, &PolicyTable::empty()));
    }

    #[test]
    fn compare_key_rules() {
        let a = obj(json!({"x": 1}));
        let b = obj(json!({"x": 1, "y": 2}));
        assert!(compare_key(&a, &b, "x"));
        assert!(!compare_key(&a, &b, "y"));
        assert!(compare_key(&a, &b, "z"));
    }
}
