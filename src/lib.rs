//! Layered node configuration for dbt-style data projects. Declare where a
//! resource's config comes from, and get back one validated, typed config.
//!
//! A model's effective configuration is spread across several places: the
//! project file (nested by directory), a dependency package's project file,
//! the resource's property file entry and `config()` calls inside the
//! resource itself. Nodefig merges those layers field by field, fills in
//! defaults, validates the result and compares it against a previous run.
//!
//! ```ignore
//! let resolved = Nodefig::builder(ResourceType::Model)
//!     .adapter_type("snowflake")
//!     .fqn(["bank", "staging", "stg_accounts"])
//!     .project_config(file::load_mapping("dbt_project.yml".as_ref())?)
//!     .inline(inline_config)
//!     .resolve()?;
//! ```
//!
//! # Merge behaviors
//!
//! Every field a resource shape declares has a [`MergeBehavior`]:
//!
//! | Behavior | Result of `base` then `override` |
//! |----------|----------------------------------|
//! | `Clobber` | the override value |
//! | `Append` | both values as lists, base first |
//! | `Update` | both mappings, override keys winning |
//! | `DictKeyAppend` | mappings of lists; `+key` extends, `key` replaces |
//!
//! Undeclared keys clobber. A field missing from the base merges as if the
//! base held the empty list or mapping.
//!
//! Merging consumes the override: declared fields are popped out of it, then
//! adapter-specific fields, then whatever is left is copied over. See
//! [`merge::update_from`].
//!
//! # The policy table
//!
//! Behaviors and defaults are data, not code. [`PolicyTable`] maps
//! `(shape, field)` to a [`FieldPolicy`]. The built-in table
//! ([`PolicyTable::shared`]) knows every resource kind and the postgres,
//! redshift, snowflake and bigquery adapters; further adapters can be
//! registered in code or loaded from a description file:
//!
//! ```yaml
//! spark:
//!   partition_by: append
//!   tblproperties: {merge: update, compare: exclude}
//! ```
//!
//! # Layer precedence
//!
//! ```text
//! Shape defaults          PolicyTable::defaults
//!        ↑ overridden by
//! Project levels          models: → +key entries along the fqn
//!        ↑ overridden by
//! Package levels          same walk in a package project file
//!        ↑ overridden by
//! Properties              the resource's property file entry
//!        ↑ overridden by
//! Inline config calls     in call order
//! ```
//!
//! # Finalization
//!
//! [`finalize::finalize_and_validate`] turns the merged dictionary into a
//! [`ResourceConfig`]: one variant per resource kind, each with typed fields
//! and an ordered `extra` mapping for everything else (adapter fields
//! included). Finalization checks closed nested objects (`docs`, `contract`,
//! hooks), snapshot strategies, fixed materializations, the incremental
//! contract rule, node colors and test severities, and resolves
//! `store_failures` against `store_failures_as`.
//!
//! # State comparison
//!
//! [`compare::same_contents`] tells whether two unrendered configs are
//! equivalent. Fields with [`CompareBehavior::Exclude`] (`tags`, `schema`,
//! `alias`, ...) never count; tests compare only their modifiers.
//!
//! # Error handling
//!
//! All fallible operations return [`NodefigError`]. Errors name the field
//! and value that failed, or the file that could not be read. See the
//! [`error`] module for the full set.

pub mod compare;
pub mod config;
pub mod error;
pub mod file;
pub mod finalize;
pub mod merge;
pub mod node;
pub mod ops;
pub mod overrides;
pub mod policy;
pub mod project;
pub mod resolve;
pub mod settings;
pub mod types;
pub mod validate;

mod builder;
#[cfg(feature = "clap")]
mod cli;

#[cfg(test)]
mod fixtures;

pub use builder::{Nodefig, NodefigBuilder};
#[cfg(feature = "clap")]
pub use cli::{Cli, Command};
pub use config::ResourceConfig;
pub use error::NodefigError;
pub use node::ResourceNode;
pub use ops::ConfigResult;
pub use policy::{FieldPolicy, PolicyTable, ResourceShape, ShapeId, ShapeSpec};
pub use resolve::{Layer, ResolvedConfig};
pub use settings::Settings;
pub use types::{CompareBehavior, ConfigAction, ConfigMap, MergeBehavior, ResourceType};
