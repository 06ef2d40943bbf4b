//! Core resolution pipeline: merge all config layers and produce a typed config.
//!
//! Operates on pre-loaded data (`ResolveInput`) with no I/O, making the full
//! pipeline testable with synthetic inputs. Steps:
//!
//! 1. Select the resource shape and the adapter shape
//! 2. Start from the resource shape's defaults
//! 3. Merge every layer on top through `update_from` (later overrides earlier)
//! 4. Clobber every layer's unrendered dictionary into the unrendered config
//! 5. Finalize and validate the merged dictionary

use serde_json::Value;

use crate::config::ResourceConfig;
use crate::error::NodefigError;
use crate::finalize::finalize_and_validate;
use crate::merge::{listify, update_from};
use crate::policy::{PolicyTable, ResourceShape, ShapeId};
use crate::types::{ConfigMap, LayerSource, ResourceType};

/// One configuration dictionary from one source.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub source: LayerSource,
    /// The rendered config keys.
    pub config: ConfigMap,
    /// The same keys before template rendering. `None` means they were
    /// never templated and `config` is used.
    pub unrendered: Option<ConfigMap>,
}

impl Layer {
    pub fn new(source: LayerSource, config: ConfigMap) -> Self {
        Self {
            source,
            config,
            unrendered: None,
        }
    }

    pub fn with_unrendered(mut self, unrendered: ConfigMap) -> Self {
        self.unrendered = Some(unrendered);
        self
    }
}

/// All pre-loaded data needed to resolve a config. No I/O happens here.
#[derive(Debug, Clone)]
pub struct ResolveInput {
    pub resource_type: ResourceType,
    /// Selects the adapter shape, e.g. `"snowflake"`.
    pub adapter_type: String,
    /// Accumulating project-level config: snapshots skip their mandatory
    /// settings.
    pub base: bool,
    /// Layers in precedence order: first = lowest priority, last = highest.
    pub layers: Vec<Layer>,
}

/// The outcome of a resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub shape: ResourceShape,
    pub config: ResourceConfig,
    /// The merged dictionary the config was finalized from.
    pub rendered: ConfigMap,
    /// Every layer's unrendered keys, later layers clobbering earlier ones.
    pub unrendered: ConfigMap,
}

/// Resolve configuration from pre-loaded inputs.
pub fn resolve(input: ResolveInput, table: &PolicyTable) -> Result<ResolvedConfig, NodefigError> {
    let shape = ResourceShape::for_resource(input.resource_type, input.base);
    let resource = ShapeId::Resource(shape);
    let adapter = table.adapter_shape(&input.adapter_type);

    let mut rendered = table.defaults(shape);
    let mut unrendered = ConfigMap::new();

    for layer in input.layers {
        let Layer {
            source,
            config,
            unrendered: layer_unrendered,
        } = layer;
        tracing::debug!(
            %source,
            resource_type = %input.resource_type,
            keys = config.len(),
            "applying config layer"
        );

        let raw = translate_hook_names(layer_unrendered.unwrap_or_else(|| config.clone()));
        unrendered.extend(raw);
        rendered = update_from(
            &rendered,
            translate_hook_names(config),
            &resource,
            &adapter,
            table,
        )?;
    }

    let config = finalize_and_validate(rendered.clone(), shape, table)?;
    Ok(ResolvedConfig {
        shape,
        config,
        rendered,
        unrendered,
    })
}

/// Rename `pre_hook` and `post_hook` to the dashed keys the shapes declare.
/// When both spellings are present the hooks are concatenated, dashed first.
pub fn translate_hook_names(mut config: ConfigMap) -> ConfigMap {
    for (underscored, dashed) in [("pre_hook", "pre-hook"), ("post_hook", "post-hook")] {
        let Some(value) = config.shift_remove(underscored) else {
            continue;
        };
        match config.get_mut(dashed) {
            Some(existing) => {
                let mut hooks = listify(existing.take());
                hooks.extend(listify(value));
                *existing = Value::Array(hooks);
            }
            None => {
                config.insert(dashed.to_string(), value);
            }
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{check_snapshot, obj};
    use serde_json::json;

    fn empty_input(resource_type: ResourceType) -> ResolveInput {
        ResolveInput {
            resource_type,
            adapter_type: "postgres".into(),
            base: false,
            layers: vec![],
        }
    }

    fn layer(source: LayerSource, value: serde_json::Value) -> Layer {
        Layer::new(source, obj(value))
    }

    #[test]
    fn defaults_only() {
        let resolved = resolve(empty_input(ResourceType::Model), PolicyTable::shared()).unwrap();
        assert_eq!(resolved.config.materialized(), Some("view"));
        assert!(resolved.unrendered.is_empty());
        assert_eq!(resolved.rendered["materialized"], json!("view"));
    }

    #[test]
    fn later_layer_overrides_earlier() {
        let input = ResolveInput {
            layers: vec![
                layer(LayerSource::Project, json!({"materialized": "view", "tags": ["a"]})),
                layer(LayerSource::Inline, json!({"materialized": "table", "tags": ["b"]})),
            ],
            ..empty_input(ResourceType::Model)
        };
        let resolved = resolve(input, PolicyTable::shared()).unwrap();
        assert_eq!(resolved.config.materialized(), Some("table"));
        assert_eq!(resolved.config.tags(), ["a", "b"]);
        assert_eq!(
            resolved.unrendered,
            obj(json!({"materialized": "table", "tags": ["b"]}))
        );
    }

    #[test]
    fn unrendered_prefers_raw_layer() {
        let input = ResolveInput {
            layers: vec![
                layer(LayerSource::Properties, json!({"schema": "analytics"}))
                    .with_unrendered(obj(json!({"schema": "{{ target.schema }}"}))),
            ],
            ..empty_input(ResourceType::Model)
        };
        let resolved = resolve(input, PolicyTable::shared()).unwrap();
        assert_eq!(resolved.rendered["schema"], json!("analytics"));
        assert_eq!(resolved.unrendered["schema"], json!("{{ target.schema }}"));
    }

    #[test]
    fn hook_names_translated() {
        let input = ResolveInput {
            layers: vec![
                layer(LayerSource::Project, json!({"pre_hook": "select 1"})),
                layer(LayerSource::Inline, json!({"pre-hook": ["select 2"]})),
            ],
            ..empty_input(ResourceType::Model)
        };
        let resolved = resolve(input, PolicyTable::shared()).unwrap();
        let node = resolved.config.as_node().unwrap();
        let sql: Vec<&str> = node.pre_hook.iter().map(|h| h.sql.as_str()).collect();
        assert_eq!(sql, vec!["select 1", "select 2"]);
        assert!(!resolved.config.extra().contains_key("pre_hook"));
    }

    #[test]
    fn adapter_fields_are_extras() {
        let input = ResolveInput {
            adapter_type: "snowflake".into(),
            layers: vec![
                layer(LayerSource::Project, json!({"transient": true})),
                layer(LayerSource::Inline, json!({"transient": false})),
            ],
            ..empty_input(ResourceType::Model)
        };
        let resolved = resolve(input, PolicyTable::shared()).unwrap();
        assert_eq!(resolved.config.extra()["transient"], json!(false));
    }

    #[test]
    fn snapshot_base_skips_mandatory_settings() {
        let input = ResolveInput {
            base: true,
            ..empty_input(ResourceType::Snapshot)
        };
        let resolved = resolve(input, PolicyTable::shared()).unwrap();
        assert_eq!(resolved.shape, ResourceShape::EmptySnapshot);

        let err = resolve(empty_input(ResourceType::Snapshot), PolicyTable::shared()).unwrap_err();
        assert!(matches!(err, NodefigError::Validation { .. }));
    }

    #[test]
    fn snapshot_resolves_from_layers() {
        let input = ResolveInput {
            layers: vec![Layer::new(LayerSource::Inline, check_snapshot())],
            ..empty_input(ResourceType::Snapshot)
        };
        let resolved = resolve(input, PolicyTable::shared()).unwrap();
        assert_eq!(resolved.config.materialized(), Some("snapshot"));
    }

    #[test]
    fn merge_error_aborts() {
        let input = ResolveInput {
            layers: vec![layer(LayerSource::Inline, json!({"meta": "owner"}))],
            ..empty_input(ResourceType::Model)
        };
        let err = resolve(input, PolicyTable::shared()).unwrap_err();
        assert!(matches!(err, NodefigError::TypeMismatch { ref field, .. } if field == "meta"));
    }

    #[test]
    fn translate_keeps_other_keys() {
        let config = translate_hook_names(obj(json!({"post_hook": ["a"], "enabled": true})));
        assert_eq!(config, obj(json!({"enabled": true, "post-hook": ["a"]})));
    }

    #[test]
    fn both_hook_spellings_in_one_layer_are_kept() {
        let config = translate_hook_names(obj(json!({"post-hook": "a", "post_hook": ["b"]})));
        assert_eq!(config, obj(json!({"post-hook": ["a", "b"]})));

        let input = ResolveInput {
            layers: vec![layer(
                LayerSource::Inline,
                json!({"pre-hook": ["select 1"], "pre_hook": ["select 2"]}),
            )],
            ..empty_input(ResourceType::Model)
        };
        let resolved = resolve(input, PolicyTable::shared()).unwrap();
        let node = resolved.config.as_node().unwrap();
        let sql: Vec<&str> = node.pre_hook.iter().map(|h| h.sql.as_str()).collect();
        assert_eq!(sql, vec!["select 1", "select 2"]);
        assert_eq!(resolved.unrendered["pre-hook"], json!(["select 1", "select 2"]));
    }
}
