//! Turn a fully merged dictionary into a validated [`ResourceConfig`].

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{ResourceConfig, TestConfig};
use crate::error::NodefigError;
use crate::policy::{PolicyTable, ResourceShape, ShapeId};
use crate::types::ConfigMap;
use crate::validate;

/// Finalize a merged dictionary for `shape`.
///
/// Missing keys are filled from the shape's defaults, then the key checks,
/// the dictionary-level invariants, typed deserialization and the typed
/// invariants run in that order. The first failure aborts finalization.
pub fn finalize_and_validate(
    merged: ConfigMap,
    shape: ResourceShape,
    table: &PolicyTable,
) -> Result<ResourceConfig, NodefigError> {
    let config = with_defaults(merged, shape, table);

    if let Some(spec) = table.shape(&ShapeId::Resource(shape)) {
        validate::validate_declared_keys(&config, spec, shape.name())?;
        validate::validate_nested_keys(&config, spec, shape.name())?;
    }

    match shape {
        ResourceShape::Seed => validate::validate_materialized(&config, "seed")?,
        ResourceShape::Test => validate::validate_materialized(&config, "test")?,
        ResourceShape::Snapshot => {
            validate::validate_snapshot(&config)?;
            validate::validate_materialized(&config, "snapshot")?;
        }
        _ => {}
    }

    let value = Value::Object(config);
    let finalized = match shape {
        ResourceShape::Node => ResourceConfig::Node(typed(value)?),
        ResourceShape::Seed => ResourceConfig::Seed(typed(value)?),
        ResourceShape::Snapshot | ResourceShape::EmptySnapshot => {
            ResourceConfig::Snapshot(typed(value)?)
        }
        ResourceShape::Test => {
            let mut test: TestConfig = typed(value)?;
            validate::validate_severity(&test)?;
            resolve_store_failures(&mut test);
            ResourceConfig::Test(test)
        }
        ResourceShape::Source => ResourceConfig::Source(typed(value)?),
        ResourceShape::Exposure => ResourceConfig::Exposure(typed(value)?),
        ResourceShape::Metric => ResourceConfig::Metric(typed(value)?),
        ResourceShape::SemanticModel => ResourceConfig::SemanticModel(typed(value)?),
        ResourceShape::SavedQuery => ResourceConfig::SavedQuery(typed(value)?),
    };

    if let Some(node) = finalized.as_node() {
        validate::validate_contract(node)?;
        validate::validate_node_color(&node.docs)?;
    }

    tracing::debug!(shape = shape.name(), "finalized config");
    Ok(finalized)
}

fn with_defaults(merged: ConfigMap, shape: ResourceShape, table: &PolicyTable) -> ConfigMap {
    let mut config = table.defaults(shape);
    for (key, value) in merged {
        config.insert(key, value);
    }
    config
}

fn typed<T: DeserializeOwned>(value: Value) -> Result<T, NodefigError> {
    serde_json::from_value(value)
        .map_err(|e| NodefigError::validation("<config>", None, e.to_string()))
}

/// Cross-default `store_failures` and `store_failures_as`. An explicit
/// `store_failures_as` wins: `ephemeral` turns storing off, anything else
/// turns it on.
fn resolve_store_failures(test: &mut TestConfig) {
    match test.store_failures_as.as_deref() {
        None => {
            test.store_failures_as = test
                .store_failures
                .map(|store| if store { "table" } else { "ephemeral" }.to_string());
        }
        Some("ephemeral") => test.store_failures = Some(false),
        Some(_) => test.store_failures = Some(true),
    }
}
