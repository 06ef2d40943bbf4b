//! Tool settings, layered from a TOML file and `NODEFIG_*` environment
//! variables (environment wins).

use std::path::{Path, PathBuf};

use confique::Config;

use crate::error::NodefigError;
use crate::file;
use crate::policy::PolicyTable;

#[derive(Config, Debug, Clone, PartialEq)]
pub struct Settings {
    /// Adapter type selecting adapter-specific config fields.
    #[config(env = "NODEFIG_ADAPTER", default = "postgres")]
    pub adapter: String,

    /// Resolve snapshots with the base shape, skipping their mandatory settings.
    #[config(env = "NODEFIG_BASE", default = false)]
    pub base: bool,

    /// A YAML, TOML or JSON file describing extra adapter shapes, as
    /// `{adapter: {field: behavior}}`.
    #[config(env = "NODEFIG_ADAPTER_SHAPES")]
    pub adapter_shapes: Option<PathBuf>,

    /// Log filter used by the command-line tool.
    #[config(env = "NODEFIG_LOG", default = "warn")]
    pub log: String,
}

impl Settings {
    /// Load settings from the environment and, if given, a settings file.
    pub fn load(path: Option<&Path>) -> Result<Self, NodefigError> {
        let mut builder = Settings::builder().env();
        if let Some(path) = path {
            builder = builder.file(path);
        }
        Ok(builder.load()?)
    }

    /// The built-in policy table plus any adapter shapes from
    /// `adapter_shapes`.
    pub fn policy_table(&self) -> Result<PolicyTable, NodefigError> {
        let mut table = PolicyTable::builtin();
        if let Some(path) = &self.adapter_shapes {
            let shapes = file::load_mapping(path)?;
            table.register_adapters_from_map(&shapes)?;
        }
        Ok(table)
    }
}
