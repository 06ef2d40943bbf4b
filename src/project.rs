//! Config lookup in a project file's resource sections.
//!
//! A project file nests configs by directory:
//!
//! ```yaml
//! models:
//!   +materialized: view
//!   bank:
//!     staging:
//!       +materialized: table
//! ```
//!
//! Walking the section along a node's fqn yields one config dictionary per
//! level, most general first. Within a level, `+key` entries and non-mapping
//! values are config keys; nested mappings without a `+` are subdirectories.

use serde_json::Value;

use crate::types::{ConfigMap, ResourceType};

/// The resource section of a project file, if it has one.
pub fn section<'a>(project: &'a ConfigMap, resource_type: ResourceType) -> Option<&'a ConfigMap> {
    resource_type
        .project_sections()
        .iter()
        .find_map(|key| project.get(*key))
        .and_then(Value::as_object)
}

/// Config dictionaries for `fqn`, from the section root down to the deepest
/// level present. Walking stops at the first fqn part that is missing or is
/// not a mapping. Levels with no config keys are skipped.
pub fn project_configs(
    project: &ConfigMap,
    resource_type: ResourceType,
    fqn: &[String],
) -> Vec<ConfigMap> {
    let Some(mut level) = section(project, resource_type) else {
        return Vec::new();
    };

    let mut configs = Vec::new();
    push_level(&mut configs, level);
    for part in fqn {
        match level.get(part).and_then(Value::as_object) {
            Some(next) => {
                level = next;
                push_level(&mut configs, level);
            }
            None => break,
        }
    }
    configs
}

fn push_level(configs: &mut Vec<ConfigMap>, level: &ConfigMap) {
    let config = level_config(level);
    if !config.is_empty() {
        configs.push(config);
    }
}

/// The config keys of one level, `+` prefixes removed.
pub fn level_config(level: &ConfigMap) -> ConfigMap {
    level
        .iter()
        .filter_map(|(key, value)| {
            if let Some(stripped) = key.strip_prefix('+') {
                Some((stripped.to_string(), value.clone()))
            } else if value.is_object() {
                None
            } else {
                Some((key.clone(), value.clone()))
            }
        })
        .collect()
}
