//! The field merge-policy table.
//!
//! Every resource kind and every adapter has a *shape*: the ordered list of
//! fields it declares, each with a [`MergeBehavior`], a [`CompareBehavior`]
//! and an optional default value. The merger, the finalizer and the
//! comparator all consult the same [`PolicyTable`], so the rules for a field
//! live in exactly one place.
//!
//! The table is plain data. Build it once (or use [`PolicyTable::shared`])
//! and pass it by reference into every call. Lookups never fail: a field a
//! shape does not declare behaves as `(Clobber, Include)`.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use serde_json::{Value, json};

use crate::error::NodefigError;
use crate::types::{CompareBehavior, ConfigMap, MergeBehavior, ResourceType};

/// The configuration shape of a resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceShape {
    /// Models, analyses, operations and any other node type.
    Node,
    Seed,
    Test,
    Snapshot,
    /// A snapshot shape without the mandatory snapshot settings, used while
    /// project-level configuration is still being accumulated.
    EmptySnapshot,
    Source,
    Exposure,
    Metric,
    SemanticModel,
    SavedQuery,
}

impl ResourceShape {
    /// Select the shape for a resource type. With `base` set, snapshots use
    /// [`ResourceShape::EmptySnapshot`] so nothing is mandatory.
    pub fn for_resource(resource_type: ResourceType, base: bool) -> Self {
        match resource_type {
            ResourceType::Metric => ResourceShape::Metric,
            ResourceType::SemanticModel => ResourceShape::SemanticModel,
            ResourceType::SavedQuery => ResourceShape::SavedQuery,
            ResourceType::Exposure => ResourceShape::Exposure,
            ResourceType::Source => ResourceShape::Source,
            ResourceType::Seed => ResourceShape::Seed,
            ResourceType::Test => ResourceShape::Test,
            ResourceType::Snapshot if base => ResourceShape::EmptySnapshot,
            ResourceType::Snapshot => ResourceShape::Snapshot,
            ResourceType::Model | ResourceType::Analysis | ResourceType::Operation => {
                ResourceShape::Node
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResourceShape::Node => "node",
            ResourceShape::Seed => "seed",
            ResourceShape::Test => "test",
            ResourceShape::Snapshot => "snapshot",
            ResourceShape::EmptySnapshot => "empty_snapshot",
            ResourceShape::Source => "source",
            ResourceShape::Exposure => "exposure",
            ResourceShape::Metric => "metric",
            ResourceShape::SemanticModel => "semantic_model",
            ResourceShape::SavedQuery => "saved_query",
        }
    }

    const ALL: [ResourceShape; 10] = [
        ResourceShape::Node,
        ResourceShape::Seed,
        ResourceShape::Test,
        ResourceShape::Snapshot,
        ResourceShape::EmptySnapshot,
        ResourceShape::Source,
        ResourceShape::Exposure,
        ResourceShape::Metric,
        ResourceShape::SemanticModel,
        ResourceShape::SavedQuery,
    ];
}

/// Key into the policy table: a resource shape or a named adapter shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShapeId {
    Resource(ResourceShape),
    Adapter(String),
}

impl From<ResourceShape> for ShapeId {
    fn from(shape: ResourceShape) -> Self {
        ShapeId::Resource(shape)
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeId::Resource(shape) => f.write_str(shape.name()),
            ShapeId::Adapter(name) => write!(f, "{name} adapter"),
        }
    }
}

/// The policy for one declared field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPolicy {
    /// Dictionary key, e.g. `"pre-hook"`.
    pub name: String,
    pub merge: MergeBehavior,
    pub compare: CompareBehavior,
    /// Filled in by the finalizer when the merged dictionary lacks the key.
    pub default: Option<Value>,
}

impl FieldPolicy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            merge: MergeBehavior::default(),
            compare: CompareBehavior::default(),
            default: None,
        }
    }

    pub fn merge(mut self, merge: MergeBehavior) -> Self {
        self.merge = merge;
        self
    }

    pub fn compare(mut self, compare: CompareBehavior) -> Self {
        self.compare = compare;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Parse a field description: either a bare merge behavior name
    /// (`"append"`) or a table with optional `merge`, `compare` and
    /// `default` keys.
    fn from_description(name: &str, desc: &Value) -> Result<Self, NodefigError> {
        let policy = FieldPolicy::new(name);
        match desc {
            Value::String(merge) => Ok(policy.merge(merge.parse()?)),
            Value::Object(table) => {
                let mut policy = policy;
                if let Some(merge) = table.get("merge") {
                    let merge = merge.as_str().ok_or_else(|| {
                        NodefigError::validation(
                            format!("{name}.merge"),
                            Some(merge),
                            "expected a merge behavior name",
                        )
                    })?;
                    policy = policy.merge(merge.parse()?);
                }
                if let Some(compare) = table.get("compare") {
                    let compare = compare.as_str().ok_or_else(|| {
                        NodefigError::validation(
                            format!("{name}.compare"),
                            Some(compare),
                            "expected a compare behavior name",
                        )
                    })?;
                    policy = policy.compare(compare.parse()?);
                }
                if let Some(default) = table.get("default") {
                    policy = policy.default_value(default.clone());
                }
                Ok(policy)
            }
            other => Err(NodefigError::validation(
                name,
                Some(other),
                "expected a merge behavior name or a table",
            )),
        }
    }
}

/// The declared fields of one shape, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeSpec {
    fields: Vec<FieldPolicy>,
    allows_extra: bool,
}

impl Default for ShapeSpec {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeSpec {
    /// An empty shape that accepts undeclared keys.
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            allows_extra: true,
        }
    }

    /// Declare a field. Re-declaring a name replaces the earlier policy in
    /// place, keeping its position.
    pub fn field(mut self, policy: FieldPolicy) -> Self {
        match self.fields.iter_mut().find(|f| f.name == policy.name) {
            Some(existing) => *existing = policy,
            None => self.fields.push(policy),
        }
        self
    }

    /// Reject undeclared keys at finalization.
    pub fn closed(mut self) -> Self {
        self.allows_extra = false;
        self
    }

    pub fn fields(&self) -> &[FieldPolicy] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldPolicy> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn declares(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn allows_extra(&self) -> bool {
        self.allows_extra
    }

    /// Build a shape from a description mapping `{field: behavior | table}`.
    pub fn from_map(desc: &ConfigMap) -> Result<Self, NodefigError> {
        let mut spec = ShapeSpec::new();
        for (name, field_desc) in desc {
            spec = spec.field(FieldPolicy::from_description(name, field_desc)?);
        }
        Ok(spec)
    }
}

/// Static mapping from `(shape, field)` to the field's policy.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyTable {
    shapes: HashMap<ShapeId, ShapeSpec>,
}

static SHARED: LazyLock<PolicyTable> = LazyLock::new(PolicyTable::builtin);

impl PolicyTable {
    /// A table with no shapes at all. Every lookup falls back to defaults.
    pub fn empty() -> Self {
        Self {
            shapes: HashMap::new(),
        }
    }

    /// The built-in resource shapes plus the built-in adapter shapes.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for shape in ResourceShape::ALL {
            table
                .shapes
                .insert(ShapeId::Resource(shape), builtin::resource_shape(shape));
        }
        for (name, spec) in builtin::adapter_shapes() {
            table.register_adapter(name, spec);
        }
        table
    }

    /// A lazily built, process-wide copy of [`PolicyTable::builtin`].
    pub fn shared() -> &'static PolicyTable {
        &SHARED
    }

    pub fn shape(&self, id: &ShapeId) -> Option<&ShapeSpec> {
        self.shapes.get(id)
    }

    /// Declared fields of a shape, in order. Unknown shapes declare nothing.
    pub fn fields(&self, id: &ShapeId) -> &[FieldPolicy] {
        self.shapes.get(id).map(ShapeSpec::fields).unwrap_or(&[])
    }

    pub fn field(&self, id: &ShapeId, name: &str) -> Option<&FieldPolicy> {
        self.shapes.get(id)?.get(name)
    }

    /// Merge and compare behavior for a field, `(Clobber, Include)` when the
    /// shape does not declare it.
    pub fn policy_for(&self, id: &ShapeId, name: &str) -> (MergeBehavior, CompareBehavior) {
        match self.field(id, name) {
            Some(policy) => (policy.merge, policy.compare),
            None => (MergeBehavior::default(), CompareBehavior::default()),
        }
    }

    /// The default dictionary for a resource shape.
    pub fn defaults(&self, shape: ResourceShape) -> ConfigMap {
        self.fields(&ShapeId::Resource(shape))
            .iter()
            .filter_map(|f| f.default.clone().map(|v| (f.name.clone(), v)))
            .collect()
    }

    /// Shape id for an adapter type. Adapter names are case-insensitive; an
    /// unregistered adapter simply declares no fields.
    pub fn adapter_shape(&self, adapter_type: &str) -> ShapeId {
        ShapeId::Adapter(adapter_type.trim().to_ascii_lowercase())
    }

    /// Replace the shape of a resource kind.
    pub fn register_resource(&mut self, shape: ResourceShape, spec: ShapeSpec) {
        self.shapes.insert(ShapeId::Resource(shape), spec);
    }

    pub fn register_adapter(&mut self, name: &str, spec: ShapeSpec) {
        let id = self.adapter_shape(name);
        self.shapes.insert(id, spec);
    }

    /// Register adapter shapes from `{adapter: {field: behavior | table}}`.
    pub fn register_adapters_from_map(&mut self, desc: &ConfigMap) -> Result<(), NodefigError> {
        for (adapter, fields) in desc {
            let fields = fields.as_object().ok_or_else(|| {
                NodefigError::validation(adapter, Some(fields), "expected a table of fields")
            })?;
            let spec = ShapeSpec::from_map(fields)?;
            tracing::debug!(adapter, fields = spec.fields().len(), "registered adapter shape");
            self.register_adapter(adapter, spec);
        }
        Ok(())
    }

    /// Registered adapter names, sorted.
    pub fn adapters(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .shapes
            .keys()
            .filter_map(|id| match id {
                ShapeId::Adapter(name) => Some(name.as_str()),
                ShapeId::Resource(_) => None,
            })
            .collect();
        names.sort_unstable();
        names
    }
}

mod builtin {
    use super::*;

    use crate::types::CompareBehavior::Exclude;
    use crate::types::MergeBehavior::{Append, DictKeyAppend, Update};

    pub(super) fn resource_shape(shape: ResourceShape) -> ShapeSpec {
        match shape {
            ResourceShape::Node => node(),
            ResourceShape::Seed => seed(),
            ResourceShape::Test => test(),
            ResourceShape::Snapshot | ResourceShape::EmptySnapshot => snapshot(),
            ResourceShape::Source
            | ResourceShape::Exposure
            | ResourceShape::Metric
            | ResourceShape::SemanticModel => common(),
            ResourceShape::SavedQuery => common()
                .field(FieldPolicy::new("export_as").default_value(Value::Null))
                .field(FieldPolicy::new("schema").default_value(Value::Null)),
        }
    }

    fn common() -> ShapeSpec {
        ShapeSpec::new()
            .field(FieldPolicy::new("enabled").default_value(json!(true)))
            .field(
                FieldPolicy::new("tags")
                    .merge(Append)
                    .compare(Exclude)
                    .default_value(json!([])),
            )
            .field(FieldPolicy::new("meta").merge(Update).default_value(json!({})))
            .field(
                FieldPolicy::new("group")
                    .compare(Exclude)
                    .default_value(Value::Null),
            )
    }

    fn node_and_test() -> ShapeSpec {
        // alias/schema/database describe the relation, not the config
        ["alias", "schema", "database"]
            .into_iter()
            .fold(common(), |spec, name| {
                spec.field(
                    FieldPolicy::new(name)
                        .compare(Exclude)
                        .default_value(Value::Null),
                )
            })
    }

    fn node() -> ShapeSpec {
        node_and_test()
            .field(FieldPolicy::new("materialized").default_value(json!("view")))
            .field(FieldPolicy::new("incremental_strategy").default_value(Value::Null))
            .field(FieldPolicy::new("persist_docs").default_value(json!({})))
            .field(
                FieldPolicy::new("post-hook")
                    .merge(Append)
                    .default_value(json!([])),
            )
            .field(
                FieldPolicy::new("pre-hook")
                    .merge(Append)
                    .default_value(json!([])),
            )
            .field(FieldPolicy::new("quoting").merge(Update).default_value(json!({})))
            .field(
                FieldPolicy::new("column_types")
                    .merge(Update)
                    .default_value(json!({})),
            )
            .field(FieldPolicy::new("full_refresh").default_value(Value::Null))
            .field(FieldPolicy::new("unique_key").default_value(Value::Null))
            .field(FieldPolicy::new("on_schema_change").default_value(json!("ignore")))
            .field(FieldPolicy::new("on_configuration_change").default_value(json!("apply")))
            .field(
                FieldPolicy::new("grants")
                    .merge(DictKeyAppend)
                    .default_value(json!({})),
            )
            .field(FieldPolicy::new("packages").merge(Append).default_value(json!([])))
            .field(
                FieldPolicy::new("docs")
                    .merge(Update)
                    .default_value(json!({"show": true, "node_color": null})),
            )
            .field(
                FieldPolicy::new("contract")
                    .merge(Update)
                    .default_value(json!({"enforced": false, "alias_types": true})),
            )
    }

    fn seed() -> ShapeSpec {
        node()
            .field(FieldPolicy::new("materialized").default_value(json!("seed")))
            .field(FieldPolicy::new("delimiter").default_value(json!(",")))
            .field(FieldPolicy::new("quote_columns").default_value(Value::Null))
    }

    fn test() -> ShapeSpec {
        node_and_test()
            .field(
                FieldPolicy::new("schema")
                    .compare(Exclude)
                    .default_value(json!("dbt_test__audit")),
            )
            .field(FieldPolicy::new("materialized").default_value(json!("test")))
            .field(FieldPolicy::new("severity").default_value(json!("ERROR")))
            .field(FieldPolicy::new("store_failures").default_value(Value::Null))
            .field(FieldPolicy::new("store_failures_as").default_value(Value::Null))
            .field(FieldPolicy::new("where").default_value(Value::Null))
            .field(FieldPolicy::new("limit").default_value(Value::Null))
            .field(FieldPolicy::new("fail_calc").default_value(json!("count(*)")))
            .field(FieldPolicy::new("warn_if").default_value(json!("!= 0")))
            .field(FieldPolicy::new("error_if").default_value(json!("!= 0")))
    }

    fn snapshot() -> ShapeSpec {
        [
            "strategy",
            "target_schema",
            "target_database",
            "updated_at",
            "check_cols",
        ]
        .into_iter()
        .fold(
            node().field(FieldPolicy::new("materialized").default_value(json!("snapshot"))),
            |spec, name| spec.field(FieldPolicy::new(name).default_value(Value::Null)),
        )
    }

    fn clobber_fields(names: &[&str]) -> ShapeSpec {
        names
            .iter()
            .fold(ShapeSpec::new(), |spec, name| spec.field(FieldPolicy::new(*name)))
    }

    pub(super) fn adapter_shapes() -> Vec<(&'static str, ShapeSpec)> {
        vec![
            ("postgres", clobber_fields(&["unlogged", "indexes"])),
            (
                "redshift",
                clobber_fields(&["sort_type", "dist", "sort", "bind", "backup", "auto_refresh"]),
            ),
            (
                "snowflake",
                clobber_fields(&[
                    "transient",
                    "cluster_by",
                    "automatic_clustering",
                    "secure",
                    "copy_grants",
                    "snowflake_warehouse",
                    "query_tag",
                    "tmp_relation_type",
                    "merge_update_columns",
                    "merge_exclude_columns",
                ]),
            ),
            (
                "bigquery",
                clobber_fields(&[
                    "cluster_by",
                    "partition_by",
                    "kms_key_name",
                    "labels",
                    "partitions",
                    "grant_access_to",
                    "hours_to_expiration",
                    "require_partition_filter",
                    "partition_expiration_days",
                ]),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::obj;

    fn node() -> ShapeId {
        ResourceShape::Node.into()
    }

    #[test]
    fn undeclared_field_defaults_to_clobber_include() {
        let table = PolicyTable::builtin();
        assert_eq!(
            table.policy_for(&node(), "not_a_field"),
            (MergeBehavior::Clobber, CompareBehavior::Include)
        );
    }

    #[test]
    fn unknown_shape_defaults_to_clobber_include() {
        let table = PolicyTable::empty();
        assert_eq!(
            table.policy_for(&node(), "tags"),
            (MergeBehavior::Clobber, CompareBehavior::Include)
        );
        assert!(table.fields(&node()).is_empty());
    }

    #[test]
    fn node_field_policies() {
        let table = PolicyTable::builtin();
        let node = node();
        assert_eq!(
            table.policy_for(&node, "tags"),
            (MergeBehavior::Append, CompareBehavior::Exclude)
        );
        assert_eq!(table.policy_for(&node, "meta").0, MergeBehavior::Update);
        assert_eq!(table.policy_for(&node, "grants").0, MergeBehavior::DictKeyAppend);
        assert_eq!(table.policy_for(&node, "pre-hook").0, MergeBehavior::Append);
        assert_eq!(table.policy_for(&node, "schema").1, CompareBehavior::Exclude);
        assert_eq!(
            table.policy_for(&node, "materialized"),
            (MergeBehavior::Clobber, CompareBehavior::Include)
        );
    }

    #[test]
    fn hook_fields_use_dashed_keys() {
        let table = PolicyTable::builtin();
        assert!(table.field(&node(), "post-hook").is_some());
        assert!(table.field(&node(), "post_hook").is_none());
    }

    #[test]
    fn every_resource_shape_has_common_base() {
        let table = PolicyTable::builtin();
        for shape in ResourceShape::ALL {
            let id = ShapeId::Resource(shape);
            for name in ["enabled", "tags", "meta", "group"] {
                assert!(
                    table.field(&id, name).is_some(),
                    "{} is missing {name}",
                    shape.name()
                );
            }
        }
    }

    #[test]
    fn redeclared_default_keeps_position() {
        let table = PolicyTable::builtin();
        let seed = table.fields(&ResourceShape::Seed.into());
        let node = table.fields(&node());
        let pos = |fields: &[FieldPolicy]| fields.iter().position(|f| f.name == "materialized");
        assert_eq!(pos(seed), pos(node));
        assert_eq!(table.defaults(ResourceShape::Seed)["materialized"], json!("seed"));
    }

    #[test]
    fn shape_defaults() {
        let table = PolicyTable::builtin();
        let defaults = table.defaults(ResourceShape::Test);
        assert_eq!(defaults["schema"], json!("dbt_test__audit"));
        assert_eq!(defaults["severity"], json!("ERROR"));
        assert_eq!(defaults["enabled"], json!(true));
        assert_eq!(defaults["store_failures"], Value::Null);
        assert!(!defaults.contains_key("grants"));

        let node_defaults = table.defaults(ResourceShape::Node);
        assert_eq!(node_defaults["materialized"], json!("view"));
        assert_eq!(
            node_defaults["contract"],
            json!({"enforced": false, "alias_types": true})
        );
    }

    #[test]
    fn snapshot_shape_for_base() {
        assert_eq!(
            ResourceShape::for_resource(ResourceType::Snapshot, true),
            ResourceShape::EmptySnapshot
        );
        assert_eq!(
            ResourceShape::for_resource(ResourceType::Snapshot, false),
            ResourceShape::Snapshot
        );
        assert_eq!(
            ResourceShape::for_resource(ResourceType::Analysis, false),
            ResourceShape::Node
        );
    }

    #[test]
    fn adapter_shapes_are_case_insensitive() {
        let table = PolicyTable::builtin();
        let id = table.adapter_shape("Snowflake");
        assert!(table.field(&id, "transient").is_some());
        assert!(table.adapters().contains(&"postgres"));
    }

    #[test]
    fn unknown_adapter_declares_nothing() {
        let table = PolicyTable::builtin();
        let id = table.adapter_shape("duckdb");
        assert!(table.fields(&id).is_empty());
    }

    #[test]
    fn register_adapters_from_description() {
        let mut table = PolicyTable::builtin();
        let desc = obj(json!({
            "spark": {
                "partition_by": "append",
                "tblproperties": {"merge": "update", "compare": "exclude"},
                "file_format": {"default": "delta"},
            }
        }));
        table.register_adapters_from_map(&desc).unwrap();
        let id = table.adapter_shape("spark");
        assert_eq!(
            table.policy_for(&id, "partition_by"),
            (MergeBehavior::Append, CompareBehavior::Include)
        );
        assert_eq!(
            table.policy_for(&id, "tblproperties"),
            (MergeBehavior::Update, CompareBehavior::Exclude)
        );
        assert_eq!(
            table.field(&id, "file_format").unwrap().default,
            Some(json!("delta"))
        );
    }

    #[test]
    fn unknown_behavior_in_description_fails() {
        let mut table = PolicyTable::empty();
        let desc = obj(json!({"spark": {"partition_by": "prepend"}}));
        let err = table.register_adapters_from_map(&desc).unwrap_err();
        assert!(matches!(err, NodefigError::UnknownMergeBehavior(ref s) if s == "prepend"));
    }

    #[test]
    fn non_table_adapter_description_fails() {
        let mut table = PolicyTable::empty();
        let desc = obj(json!({"spark": ["partition_by"]}));
        assert!(matches!(
            table.register_adapters_from_map(&desc),
            Err(NodefigError::Validation { .. })
        ));
    }

    #[test]
    fn shared_table_matches_builtin() {
        assert_eq!(PolicyTable::shared(), &PolicyTable::builtin());
    }
}
