//! Validation rules applied while finalizing a merged config.
//!
//! Two families of checks live here. Key checks use `serde_ignored` to find
//! keys a closed shape or a closed nested object does not consume, and report
//! every one of them at once. Value checks enforce the cross-field invariants
//! of individual resource kinds, on either the raw dictionary or the typed
//! config.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{ContractConfig, Docs, Hook, NodeConfig, TestConfig};
use crate::error::NodefigError;
use crate::policy::ShapeSpec;
use crate::types::ConfigMap;

/// Reject keys a closed shape does not declare.
pub fn validate_declared_keys(
    config: &ConfigMap,
    spec: &ShapeSpec,
    shape: &str,
) -> Result<(), NodefigError> {
    if spec.allows_extra() {
        return Ok(());
    }
    let errors: Vec<NodefigError> = config
        .keys()
        .filter(|key| !spec.declares(key))
        .map(|key| NodefigError::UnknownKey {
            key: key.clone(),
            shape: shape.to_string(),
        })
        .collect();
    into_result(errors)
}

/// Reject unknown keys inside the closed nested objects `docs`, `contract`,
/// `pre-hook` and `post-hook`, where the shape declares them. Keys are
/// reported as dotted paths, e.g. `contract.enfroced` or `pre-hook.1.sqll`.
pub fn validate_nested_keys(
    config: &ConfigMap,
    spec: &ShapeSpec,
    shape: &str,
) -> Result<(), NodefigError> {
    let declared = |key: &str| config.get(key).filter(|_| spec.declares(key));
    let mut unknown: Vec<String> = Vec::new();

    if let Some(docs) = declared("docs") {
        collect_ignored::<Docs>("docs", docs, &mut unknown);
    }
    if let Some(contract) = declared("contract") {
        collect_ignored::<ContractConfig>("contract", contract, &mut unknown);
    }
    for hook_key in ["pre-hook", "post-hook"] {
        let Some(Value::Array(hooks)) = declared(hook_key) else {
            continue;
        };
        for (i, hook) in hooks.iter().enumerate() {
            if hook.is_object() {
                collect_ignored::<Hook>(&format!("{hook_key}.{i}"), hook, &mut unknown);
            }
        }
    }

    let errors = unknown
        .into_iter()
        .map(|key| NodefigError::UnknownKey {
            key,
            shape: shape.to_string(),
        })
        .collect();
    into_result(errors)
}

/// Deserialize `value` as `T`, recording every key `T` ignores. Type errors
/// are left for typed deserialization to report.
fn collect_ignored<T: DeserializeOwned>(prefix: &str, value: &Value, unknown: &mut Vec<String>) {
    let result: Result<T, _> = serde_ignored::deserialize(value.clone(), |path| {
        unknown.push(format!("{prefix}.{path}"));
    });
    if let Err(e) = result {
        tracing::trace!(field = prefix, error = %e, "nested object did not deserialize");
    }
}

fn into_result(mut errors: Vec<NodefigError>) -> Result<(), NodefigError> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(NodefigError::UnknownKeys(errors)),
    }
}

/// Truthiness of an optional dictionary value: missing, null, `false`, zero
/// and empty strings, lists and mappings are all false.
pub(crate) fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}

/// A kind with a fixed materialization rejects any other value.
pub fn validate_materialized(config: &ConfigMap, expected: &str) -> Result<(), NodefigError> {
    let value = config.get("materialized");
    if truthy(value) && value.and_then(Value::as_str) != Some(expected) {
        return Err(NodefigError::validation(
            "materialized",
            value,
            format!("must be '{expected}'"),
        ));
    }
    Ok(())
}

/// Snapshot settings: `strategy`, `unique_key` and `target_schema` are
/// required; `check` needs `check_cols`; `timestamp` needs `updated_at` and
/// forbids `check_cols`. Any other strategy is a custom one and passes.
pub fn validate_snapshot(config: &ConfigMap) -> Result<(), NodefigError> {
    for required in ["strategy", "unique_key", "target_schema"] {
        if !truthy(config.get(required)) {
            return Err(NodefigError::validation(
                required,
                config.get(required),
                "snapshots must be configured with a 'strategy', 'unique_key', and 'target_schema'",
            ));
        }
    }

    let check_cols = config.get("check_cols");
    match config.get("strategy").and_then(Value::as_str) {
        Some("check") => {
            if !truthy(check_cols) {
                return Err(NodefigError::validation(
                    "check_cols",
                    check_cols,
                    "a snapshot with the 'check' strategy must set 'check_cols'",
                ));
            }
            if let Some(Value::String(cols)) = check_cols
                && cols != "all"
            {
                return Err(NodefigError::validation(
                    "check_cols",
                    check_cols,
                    "must be 'all' or a list of column names",
                ));
            }
        }
        Some("timestamp") => {
            let updated_at = config.get("updated_at");
            if !truthy(updated_at) {
                return Err(NodefigError::validation(
                    "updated_at",
                    updated_at,
                    "a snapshot with the 'timestamp' strategy must set 'updated_at'",
                ));
            }
            if truthy(check_cols) {
                return Err(NodefigError::validation(
                    "check_cols",
                    check_cols,
                    "a snapshot with the 'timestamp' strategy cannot set 'check_cols'",
                ));
            }
        }
        _ => {}
    }
    Ok(())
}

/// Incremental models with an enforced contract must fail or add columns when
/// the schema changes.
pub fn validate_contract(config: &NodeConfig) -> Result<(), NodefigError> {
    if config.materialized != "incremental" || !config.contract.enforced {
        return Ok(());
    }
    match config.on_schema_change.as_deref() {
        Some("append_new_columns" | "fail") => Ok(()),
        other => Err(NodefigError::validation(
            "on_schema_change",
            Some(&other.map_or(Value::Null, |s| Value::String(s.to_string()))),
            "incremental models with an enforced contract must use 'append_new_columns' or 'fail'",
        )),
    }
}

/// An empty color counts as unset.
pub fn validate_node_color(docs: &Docs) -> Result<(), NodefigError> {
    match docs.node_color.as_deref().filter(|color| !color.is_empty()) {
        None => Ok(()),
        Some(color) if is_valid_color(color) => Ok(()),
        Some(color) => Err(NodefigError::validation(
            "docs.node_color",
            Some(&Value::String(color.to_string())),
            "must be a hex code like '#c0c0c0' or an HTML color name",
        )),
    }
}

pub fn validate_severity(config: &TestConfig) -> Result<(), NodefigError> {
    let severity = config.severity.as_str();
    if severity.eq_ignore_ascii_case("warn") || severity.eq_ignore_ascii_case("error") {
        Ok(())
    } else {
        Err(NodefigError::validation(
            "severity",
            Some(&Value::String(severity.to_string())),
            "must be 'warn' or 'error'",
        ))
    }
}

fn is_valid_color(color: &str) -> bool {
    if let Some(hex) = color.strip_prefix('#') {
        return matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    let lower = color.to_ascii_lowercase();
    HTML_COLORS.contains(&lower.as_str())
}

const HTML_COLORS: &[&str] = &[
    "aliceblue", "antiquewhite", "aqua", "aquamarine", "azure", "beige", "bisque", "black",
    "blanchedalmond", "blue", "blueviolet", "brown", "burlywood", "cadetblue", "chartreuse",
    "chocolate", "coral", "cornflowerblue", "cornsilk", "crimson", "cyan", "darkblue", "darkcyan",
    "darkgoldenrod", "darkgray", "darkgrey", "darkgreen", "darkkhaki", "darkmagenta",
    "darkolivegreen", "darkorange", "darkorchid", "darkred", "darksalmon", "darkseagreen",
    "darkslateblue", "darkslategray", "darkslategrey", "darkturquoise", "darkviolet", "deeppink",
    "deepskyblue", "dimgray", "dimgrey", "dodgerblue", "firebrick", "floralwhite", "forestgreen",
    "fuchsia", "gainsboro", "ghostwhite", "gold", "goldenrod", "gray", "grey", "green",
    "greenyellow", "honeydew", "hotpink", "indianred", "indigo", "ivory", "khaki", "lavender",
    "lavenderblush", "lawngreen", "lemonchiffon", "lightblue", "lightcoral", "lightcyan",
    "lightgoldenrodyellow", "lightgray", "lightgrey", "lightgreen", "lightpink", "lightsalmon",
    "lightseagreen", "lightskyblue", "lightslategray", "lightslategrey", "lightsteelblue",
    "lightyellow", "lime", "limegreen", "linen", "magenta", "maroon", "mediumaquamarine",
    "mediumblue", "mediumorchid", "mediumpurple", "mediumseagreen", "mediumslateblue",
    "mediumspringgreen", "mediumturquoise", "mediumvioletred", "midnightblue", "mintcream",
    "mistyrose", "moccasin", "navajowhite", "navy", "oldlace", "olive", "olivedrab", "orange",
    "orangered", "orchid", "palegoldenrod", "palegreen", "paleturquoise", "palevioletred",
    "papayawhip", "peachpuff", "peru", "pink", "plum", "powderblue", "purple", "rebeccapurple",
    "red", "rosybrown", "royalblue", "saddlebrown", "salmon", "sandybrown", "seagreen",
    "seashell", "sienna", "silver", "skyblue", "slateblue", "slategray", "slategrey", "snow",
    "springgreen", "steelblue", "tan", "teal", "thistle", "tomato", "turquoise", "violet",
    "wheat", "white", "whitesmoke", "yellow", "yellowgreen",
];
