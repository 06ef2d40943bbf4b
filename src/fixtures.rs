#[cfg(test)]
pub mod test {
    use serde_json::Value;

    use crate::types::ConfigMap;

    /// Unwrap a `json!({...})` literal into a config dictionary.
    pub fn obj(value: Value) -> ConfigMap {
        match value {
            Value::Object(map) => map,
            other => panic!("fixture is not an object: {other}"),
        }
    }

    /// A complete, valid snapshot config dictionary using the check strategy.
    pub fn check_snapshot() -> ConfigMap {
        obj(serde_json::json!({
            "strategy": "check",
            "unique_key": "id",
            "target_schema": "snapshots",
            "check_cols": ["status", "amount"],
        }))
    }

    /// A small dbt-style project file with model configs three levels deep.
    pub fn project_file() -> ConfigMap {
        obj(serde_json::json!({
            "name": "bank",
            "models": {
                "+materialized": "view",
                "+tags": ["nightly"],
                "bank": {
                    "staging": {
                        "+materialized": "table",
                        "+tags": "staging",
                        "schema": "stg",
                    },
                    "marts": {
                        "+materialized": "incremental",
                    },
                },
            },
            "seeds": {
                "bank": {
                    "+delimiter": ";",
                },
            },
        }))
    }
}
