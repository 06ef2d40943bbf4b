//! Field-level merging of configuration dictionaries.
//!
//! A merge walks the fields a shape declares, pops each one out of the
//! override dictionary and combines it with the base value according to the
//! field's [`MergeBehavior`]. Whatever is left in the override afterwards was
//! not declared and replaces the base value outright.
//!
//! Consuming the override is part of the contract: [`merge_declared`] takes
//! it by `&mut` and leaves only the keys it did not handle, which is what lets
//! [`update_from`] run a second pass for adapter-specific fields.

use serde_json::Value;

use crate::error::NodefigError;
use crate::policy::{PolicyTable, ShapeId};
use crate::types::{ConfigMap, MergeBehavior};

/// Coerce a value to a list: arrays are kept, anything else becomes a
/// single-element list.
pub fn listify(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => vec![other],
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

fn expect_mapping(field: &str, value: Value) -> Result<ConfigMap, NodefigError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(NodefigError::TypeMismatch {
            field: field.to_string(),
            expected: "mapping",
            found: format!("{} {other}", kind_of(&other)),
        }),
    }
}

/// Combine one field's base value with an incoming value.
///
/// A missing base behaves like the behavior's empty value (`[]` for append,
/// `{}` for update and dict-key-append), so `+` prefixes are stripped the same
/// way whether or not the base had the field.
pub fn merge_field_value(
    field: &str,
    behavior: MergeBehavior,
    base: Option<&Value>,
    incoming: Value,
) -> Result<Value, NodefigError> {
    match behavior {
        MergeBehavior::Clobber => Ok(incoming),
        MergeBehavior::Append => {
            let mut items = base.cloned().map(listify).unwrap_or_default();
            items.extend(listify(incoming));
            Ok(Value::Array(items))
        }
        MergeBehavior::Update => {
            let mut merged = match base {
                Some(base) => expect_mapping(field, base.clone())?,
                None => ConfigMap::new(),
            };
            let incoming = expect_mapping(field, incoming)?;
            merged.extend(incoming);
            Ok(Value::Object(merged))
        }
        MergeBehavior::DictKeyAppend => {
            let base = match base {
                Some(base) => expect_mapping(field, base.clone())?,
                None => ConfigMap::new(),
            };
            let incoming = expect_mapping(field, incoming)?;

            let mut lists: ConfigMap = base
                .into_iter()
                .map(|(key, value)| (key, Value::Array(listify(value))))
                .collect();

            for (key, value) in incoming {
                if key.starts_with('+') {
                    let stripped = key.trim_start_matches('+').to_string();
                    match lists.get_mut(&stripped) {
                        Some(Value::Array(existing)) => existing.extend(listify(value)),
                        _ => {
                            lists.insert(stripped, Value::Array(listify(value)));
                        }
                    }
                } else {
                    lists.insert(key, Value::Array(listify(value)));
                }
            }
            Ok(Value::Object(lists))
        }
    }
}

/// Merge every field declared on `shape` that appears in `data` against its
/// value in `src`, removing it from `data`. Returns only the merged fields;
/// undeclared keys stay in `data`.
pub fn merge_declared(
    src: &ConfigMap,
    data: &mut ConfigMap,
    shape: &ShapeId,
    table: &PolicyTable,
) -> Result<ConfigMap, NodefigError> {
    let mut result = ConfigMap::new();
    for policy in table.fields(shape) {
        let Some(incoming) = data.shift_remove(&policy.name) else {
            continue;
        };
        let merged = merge_field_value(&policy.name, policy.merge, src.get(&policy.name), incoming)?;
        tracing::trace!(field = %policy.name, behavior = policy.merge.as_str(), %shape, "merged field");
        result.insert(policy.name.clone(), merged);
    }
    Ok(result)
}

/// Merge `data` on top of `base` for a single shape. Declared fields follow
/// their merge behavior; every other key in `data` clobbers. `data` is
/// drained.
pub fn merge(
    base: &ConfigMap,
    data: &mut ConfigMap,
    shape: &ShapeId,
    table: &PolicyTable,
) -> Result<ConfigMap, NodefigError> {
    let mut result = base.clone();
    let merged = merge_declared(base, data, shape, table)?;
    result.extend(merged);
    result.extend(std::mem::take(data));
    Ok(result)
}

/// Apply one layer of overrides to an accumulated config dictionary.
///
/// Runs in three stages: fields declared on the resource shape, then fields
/// declared on the adapter shape (against the dictionary as updated so far),
/// then every remaining key as a plain clobber.
pub fn update_from(
    base: &ConfigMap,
    mut data: ConfigMap,
    resource: &ShapeId,
    adapter: &ShapeId,
    table: &PolicyTable,
) -> Result<ConfigMap, NodefigError> {
    let mut dct = base.clone();

    let own = merge_declared(&dct, &mut data, resource, table)?;
    dct.extend(own);

    let adapter_merged = merge_declared(&dct, &mut data, adapter, table)?;
    dct.extend(adapter_merged);

    if !data.is_empty() {
        tracing::trace!(
            keys = ?data.keys().collect::<Vec<_>>(),
            "clobbering undeclared config keys"
        );
    }
    dct.extend(data);
    Ok(dct)
}
