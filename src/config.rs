//! Typed resource configurations.
//!
//! Each resource kind has its own struct; all of them embed [`CommonConfig`]
//! and keep unrecognized keys in an ordered `extra` mapping. The closed set
//! of kinds is the [`ResourceConfig`] enum. Values are built by
//! [`finalize_and_validate`](crate::finalize::finalize_and_validate) and are
//! not meant to change afterwards, so only read accessors are provided.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::NodefigError;
use crate::types::ConfigMap;

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        match value {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(OneOrMany::<String>::deserialize(deserializer)?.into())
}

/// A single string or a list of strings, e.g. `unique_key` or `check_cols`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            StringOrList::One(s) => vec![s.clone()],
            StringOrList::Many(items) => items.clone(),
        }
    }
}

/// A pre- or post-hook. Hooks written as bare SQL strings become
/// `{sql, transaction: true}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hook {
    pub sql: String,
    #[serde(default = "default_true")]
    pub transaction: bool,
    #[serde(default)]
    pub index: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HookEntry {
    Sql(String),
    Full(Hook),
}

impl From<HookEntry> for Hook {
    fn from(entry: HookEntry) -> Self {
        match entry {
            HookEntry::Sql(sql) => Hook {
                sql,
                transaction: true,
                index: None,
            },
            HookEntry::Full(hook) => hook,
        }
    }
}

fn hooks<'de, D>(deserializer: D) -> Result<Vec<Hook>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries: Vec<HookEntry> = OneOrMany::<HookEntry>::deserialize(deserializer)?.into();
    Ok(entries.into_iter().map(Hook::from).collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Docs {
    #[serde(default = "default_true")]
    pub show: bool,
    #[serde(default)]
    pub node_color: Option<String>,
}

impl Default for Docs {
    fn default() -> Self {
        Self {
            show: true,
            node_color: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractConfig {
    #[serde(default)]
    pub enforced: bool,
    #[serde(default = "default_true")]
    pub alias_types: bool,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            enforced: false,
            alias_types: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnConfigurationChange {
    #[default]
    Apply,
    Continue,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportDestination {
    Table,
    View,
}

/// Fields every resource configuration carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, deserialize_with = "string_or_list")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub meta: ConfigMap,
    #[serde(default)]
    pub group: Option<String>,
}

/// Configuration of models, analyses, operations, and the base of seeds and
/// snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    pub materialized: String,
    #[serde(default)]
    pub incremental_strategy: Option<String>,
    #[serde(default)]
    pub persist_docs: ConfigMap,
    #[serde(rename = "post-hook", default, deserialize_with = "hooks")]
    pub post_hook: Vec<Hook>,
    #[serde(rename = "pre-hook", default, deserialize_with = "hooks")]
    pub pre_hook: Vec<Hook>,
    #[serde(default)]
    pub quoting: ConfigMap,
    #[serde(default)]
    pub column_types: ConfigMap,
    #[serde(default)]
    pub full_refresh: Option<bool>,
    #[serde(default)]
    pub unique_key: Option<StringOrList>,
    #[serde(default)]
    pub on_schema_change: Option<String>,
    #[serde(default)]
    pub on_configuration_change: OnConfigurationChange,
    #[serde(default)]
    pub grants: ConfigMap,
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default)]
    pub docs: Docs,
    #[serde(default)]
    pub contract: ContractConfig,
    #[serde(flatten)]
    pub extra: ConfigMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedConfig {
    #[serde(flatten)]
    pub node: NodeConfig,
    pub delimiter: String,
    #[serde(default)]
    pub quote_columns: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    #[serde(flatten)]
    pub node: NodeConfig,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub target_schema: Option<String>,
    #[serde(default)]
    pub target_database: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub check_cols: Option<StringOrList>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestConfig {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    pub materialized: String,
    pub severity: String,
    #[serde(default)]
    pub store_failures: Option<bool>,
    #[serde(default)]
    pub store_failures_as: Option<String>,
    #[serde(rename = "where", default)]
    pub where_clause: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    pub fail_calc: String,
    pub warn_if: String,
    pub error_if: String,
    #[serde(flatten)]
    pub extra: ConfigMap,
}

/// Configuration of resources that carry only the common fields: sources,
/// exposures, metrics and semantic models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicConfig {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(flatten)]
    pub extra: ConfigMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedQueryConfig {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(default)]
    pub export_as: Option<ExportDestination>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(flatten)]
    pub extra: ConfigMap,
}

/// A finalized configuration, one variant per resource kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceConfig {
    Node(NodeConfig),
    Seed(SeedConfig),
    Snapshot(SnapshotConfig),
    Test(TestConfig),
    Source(BasicConfig),
    Exposure(BasicConfig),
    Metric(BasicConfig),
    SemanticModel(BasicConfig),
    SavedQuery(SavedQueryConfig),
}

impl ResourceConfig {
    pub fn common(&self) -> &CommonConfig {
        match self {
            ResourceConfig::Node(c) => &c.common,
            ResourceConfig::Seed(c) => &c.node.common,
            ResourceConfig::Snapshot(c) => &c.node.common,
            ResourceConfig::Test(c) => &c.common,
            ResourceConfig::Source(c)
            | ResourceConfig::Exposure(c)
            | ResourceConfig::Metric(c)
            | ResourceConfig::SemanticModel(c) => &c.common,
            ResourceConfig::SavedQuery(c) => &c.common,
        }
    }

    /// Keys no field of this kind claimed, in the order they were merged.
    pub fn extra(&self) -> &ConfigMap {
        match self {
            ResourceConfig::Node(c) => &c.extra,
            ResourceConfig::Seed(c) => &c.node.extra,
            ResourceConfig::Snapshot(c) => &c.node.extra,
            ResourceConfig::Test(c) => &c.extra,
            ResourceConfig::Source(c)
            | ResourceConfig::Exposure(c)
            | ResourceConfig::Metric(c)
            | ResourceConfig::SemanticModel(c) => &c.extra,
            ResourceConfig::SavedQuery(c) => &c.extra,
        }
    }

    /// The node-level fields, for models, seeds and snapshots.
    pub fn as_node(&self) -> Option<&NodeConfig> {
        match self {
            ResourceConfig::Node(c) => Some(c),
            ResourceConfig::Seed(c) => Some(&c.node),
            ResourceConfig::Snapshot(c) => Some(&c.node),
            _ => None,
        }
    }

    pub fn as_test(&self) -> Option<&TestConfig> {
        match self {
            ResourceConfig::Test(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_snapshot(&self) -> Option<&SnapshotConfig> {
        match self {
            ResourceConfig::Snapshot(c) => Some(c),
            _ => None,
        }
    }

    pub fn enabled(&self) -> bool {
        self.common().enabled
    }

    pub fn tags(&self) -> &[String] {
        &self.common().tags
    }

    pub fn meta(&self) -> &ConfigMap {
        &self.common().meta
    }

    pub fn group(&self) -> Option<&str> {
        self.common().group.as_deref()
    }

    pub fn materialized(&self) -> Option<&str> {
        match self {
            ResourceConfig::Test(c) => Some(&c.materialized),
            other => other.as_node().map(|n| n.materialized.as_str()),
        }
    }

    /// Serialize back to a dictionary. Known fields come first, followed by
    /// the extras.
    pub fn to_map(&self) -> Result<ConfigMap, NodefigError> {
        let value = match self {
            ResourceConfig::Node(c) => serde_json::to_value(c),
            ResourceConfig::Seed(c) => serde_json::to_value(c),
            ResourceConfig::Snapshot(c) => serde_json::to_value(c),
            ResourceConfig::Test(c) => serde_json::to_value(c),
            ResourceConfig::Source(c)
            | ResourceConfig::Exposure(c)
            | ResourceConfig::Metric(c)
            | ResourceConfig::SemanticModel(c) => serde_json::to_value(c),
            ResourceConfig::SavedQuery(c) => serde_json::to_value(c),
        }
        .map_err(|e| NodefigError::validation("<config>", None, e.to_string()))?;

        match value {
            Value::Object(map) => Ok(map),
            other => Err(NodefigError::validation(
                "<config>",
                Some(&other),
                "config did not serialize to a mapping",
            )),
        }
    }

    /// Look up any key, declared or extra, by its dictionary name.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.to_map().ok()?.shift_remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::obj;
    use serde_json::json;

    fn node_config(value: Value) -> NodeConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn extras_are_preserved_in_order() {
        let config = node_config(json!({
            "materialized": "table",
            "zeta": 1,
            "alpha": {"nested": true},
        }));
        let keys: Vec<&String> = config.extra.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert_eq!(config.common.enabled, true);
    }

    #[test]
    fn common_fields_are_not_extras() {
        let config = node_config(json!({
            "materialized": "table",
            "enabled": false,
            "tags": "one",
            "meta": {"owner": "a"},
        }));
        assert!(config.extra.is_empty());
        assert!(!config.common.enabled);
        assert_eq!(config.common.tags, vec!["one"]);
    }

    #[test]
    fn hooks_accept_strings_and_objects() {
        let config = node_config(json!({
            "materialized": "view",
            "pre-hook": ["grant select", {"sql": "vacuum", "transaction": false}],
            "post-hook": "analyze",
        }));
        assert_eq!(config.pre_hook.len(), 2);
        assert_eq!(config.pre_hook[0].sql, "grant select");
        assert!(config.pre_hook[0].transaction);
        assert!(!config.pre_hook[1].transaction);
        assert_eq!(config.post_hook[0].sql, "analyze");
    }

    #[test]
    fn seed_nests_node_fields() {
        let seed: SeedConfig = serde_json::from_value(json!({
            "materialized": "seed",
            "delimiter": "|",
            "column_types": {"id": "int"},
            "custom": "kept",
        }))
        .unwrap();
        assert_eq!(seed.delimiter, "|");
        assert_eq!(seed.node.column_types["id"], json!("int"));
        assert_eq!(seed.node.extra, obj(json!({"custom": "kept"})));
    }

    #[test]
    fn unique_key_string_or_list() {
        let one = node_config(json!({"materialized": "table", "unique_key": "id"}));
        let many = node_config(json!({"materialized": "table", "unique_key": ["a", "b"]}));
        assert_eq!(one.unique_key.unwrap().to_vec(), vec!["id"]);
        assert_eq!(many.unique_key.unwrap().to_vec(), vec!["a", "b"]);
    }

    #[test]
    fn to_map_round_trips_extras_and_hook_keys() {
        let config = ResourceConfig::Node(node_config(json!({
            "materialized": "table",
            "pre-hook": ["select 1"],
            "custom": 7,
        })));
        let map = config.to_map().unwrap();
        assert_eq!(map["materialized"], json!("table"));
        assert_eq!(
            map["pre-hook"],
            json!([{"sql": "select 1", "transaction": true, "index": null}])
        );
        assert_eq!(map["custom"], json!(7));
        assert_eq!(config.get("custom"), Some(json!(7)));
        assert_eq!(config.get("missing"), None);
    }

    #[test]
    fn accessors_reach_common_fields() {
        let config = ResourceConfig::Source(
            serde_json::from_value(json!({"enabled": false, "group": "finance"})).unwrap(),
        );
        assert!(!config.enabled());
        assert_eq!(config.group(), Some("finance"));
        assert!(config.tags().is_empty());
        assert_eq!(config.materialized(), None);
        assert!(config.as_node().is_none());
    }

    #[test]
    fn saved_query_export_as() {
        let config: SavedQueryConfig =
            serde_json::from_value(json!({"export_as": "table", "schema": "exports"})).unwrap();
        assert_eq!(config.export_as, Some(ExportDestination::Table));
        assert!(serde_json::from_value::<SavedQueryConfig>(json!({"export_as": "csv"})).is_err());
    }

    #[test]
    fn on_configuration_change_rejects_unknown() {
        let result = serde_json::from_value::<NodeConfig>(json!({
            "materialized": "view",
            "on_configuration_change": "ignore",
        }));
        assert!(result.is_err());
    }
}
