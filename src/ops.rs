//! Config operations: resolve, compare, field listing, settings template, and
//! result types.
//!
//! Provides the logic behind the `resolve`, `compare`, `fields` and `template`
//! commands and the `ConfigResult` enum that callers use to display results.

use std::fmt;

use confique::Config;
use serde_json::Value;

use crate::builder::Nodefig;
use crate::compare::same_contents;
use crate::config::ResourceConfig;
use crate::error::NodefigError;
use crate::file;
use crate::overrides;
use crate::policy::{PolicyTable, ResourceShape, ShapeId};
use crate::resolve::{Layer, translate_hook_names};
use crate::settings::Settings;
use crate::types::{ConfigAction, LayerSource, ResourceType};

/// One row of a field listing.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRow {
    pub name: String,
    pub merge: String,
    pub compare: String,
    pub default: String,
}

/// Result of a config operation. Returned to the caller for display.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigResult {
    /// All keys of a finalized config.
    Listing {
        resource_type: ResourceType,
        entries: Vec<(String, String)>,
    },
    /// Whether two unrendered configs are equivalent.
    Comparison {
        resource_type: ResourceType,
        same: bool,
    },
    /// The declared fields of a shape, in declaration order.
    Fields {
        shape: String,
        rows: Vec<FieldRow>,
    },
    /// A generated settings template.
    Template(String),
}

impl fmt::Display for ConfigResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigResult::Listing { entries, .. } => {
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{key} = {value}")?;
                }
                Ok(())
            }
            ConfigResult::Comparison {
                resource_type,
                same,
            } => {
                let verdict = if *same { "unchanged" } else { "changed" };
                write!(f, "{resource_type} config {verdict}")
            }
            ConfigResult::Fields { shape, rows } => {
                let width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0);
                write!(f, "# {shape}")?;
                for row in rows {
                    write!(
                        f,
                        "\n{:width$}  {:<15}  {:<7}  {}",
                        row.name, row.merge, row.compare, row.default
                    )?;
                }
                Ok(())
            }
            ConfigResult::Template(t) => write!(f, "{t}"),
        }
    }
}

/// Handle a `ConfigAction`, loading whatever files it names.
pub fn handle(
    action: &ConfigAction,
    settings: &Settings,
    table: &PolicyTable,
) -> Result<ConfigResult, NodefigError> {
    match action {
        ConfigAction::Resolve {
            resource_type,
            fqn,
            project,
            package,
            layers,
            overrides,
        } => {
            let mut builder = Nodefig::builder(*resource_type)
                .settings(settings)
                .policy_table(table)
                .fqn(fqn.iter().cloned());
            if let Some(path) = project {
                builder = builder.project_config(file::load_mapping(path)?);
            }
            if let Some(path) = package {
                builder = builder.package_config(file::load_mapping(path)?);
            }
            for config in file::load_mappings(layers)? {
                builder = builder.inline(config);
            }
            if !overrides.is_empty() {
                let config = overrides::overrides_to_map(overrides)?;
                builder = builder.layer(Layer::new(LayerSource::Inline, config));
            }
            let resolved = builder.resolve()?;
            list_values(*resource_type, &resolved.config)
        }
        ConfigAction::Compare {
            resource_type,
            current,
            previous,
        } => {
            let current = translate_hook_names(file::load_mapping(current)?);
            let previous = translate_hook_names(file::load_mapping(previous)?);
            let shape = ResourceShape::for_resource(*resource_type, false);
            Ok(ConfigResult::Comparison {
                resource_type: *resource_type,
                same: same_contents(&current, &previous, shape, table),
            })
        }
        ConfigAction::Fields { resource_type } => {
            let shape = ResourceShape::for_resource(*resource_type, false);
            Ok(list_fields(&ShapeId::Resource(shape), table))
        }
        ConfigAction::Template => Ok(ConfigResult::Template(generate_template::<Settings>())),
    }
}

/// Generate a commented TOML template from the settings struct's doc comments.
pub fn generate_template<C: Config>() -> String {
    confique::toml::template::<C>(confique::toml::FormatOptions::default())
}

/// List every key of a finalized config, known fields first.
pub fn list_values(
    resource_type: ResourceType,
    config: &ResourceConfig,
) -> Result<ConfigResult, NodefigError> {
    let entries = config
        .to_map()?
        .into_iter()
        .map(|(key, value)| (key, format_value(&value)))
        .collect();
    Ok(ConfigResult::Listing {
        resource_type,
        entries,
    })
}

/// The field policies of one shape.
pub fn list_fields(shape: &ShapeId, table: &PolicyTable) -> ConfigResult {
    let rows = table
        .fields(shape)
        .iter()
        .map(|field| FieldRow {
            name: field.name.clone(),
            merge: field.merge.as_str().to_string(),
            compare: field.compare.as_str().to_string(),
            default: field
                .default
                .as_ref()
                .map_or_else(|| "<none>".to_string(), format_value),
        })
        .collect();
    ConfigResult::Fields {
        shape: shape.to_string(),
        rows,
    }
}

/// Format a value for display: strings bare, everything else as JSON.
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
