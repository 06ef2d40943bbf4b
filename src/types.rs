//! Shared vocabulary: resource kinds, merge/compare behaviors, layer sources
//! and the framework-agnostic [`ConfigAction`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::NodefigError;

/// An ordered configuration dictionary. Insertion order is preserved so that
/// merges iterate override keys in the order they were declared.
pub type ConfigMap = serde_json::Map<String, Value>;

/// The kind of resource a configuration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Model,
    Analysis,
    Operation,
    Seed,
    Snapshot,
    Test,
    Source,
    Exposure,
    Metric,
    SemanticModel,
    SavedQuery,
}

impl ResourceType {
    pub const ALL: [ResourceType; 11] = [
        ResourceType::Model,
        ResourceType::Analysis,
        ResourceType::Operation,
        ResourceType::Seed,
        ResourceType::Snapshot,
        ResourceType::Test,
        ResourceType::Source,
        ResourceType::Exposure,
        ResourceType::Metric,
        ResourceType::SemanticModel,
        ResourceType::SavedQuery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Model => "model",
            ResourceType::Analysis => "analysis",
            ResourceType::Operation => "operation",
            ResourceType::Seed => "seed",
            ResourceType::Snapshot => "snapshot",
            ResourceType::Test => "test",
            ResourceType::Source => "source",
            ResourceType::Exposure => "exposure",
            ResourceType::Metric => "metric",
            ResourceType::SemanticModel => "semantic_model",
            ResourceType::SavedQuery => "saved_query",
        }
    }

    /// Keys under which this resource type's configs live in a project file.
    /// The first key found wins. Operations have no project section.
    pub fn project_sections(&self) -> &'static [&'static str] {
        match self {
            ResourceType::Model => &["models"],
            ResourceType::Analysis => &["analyses"],
            ResourceType::Operation => &[],
            ResourceType::Seed => &["seeds"],
            ResourceType::Snapshot => &["snapshots"],
            ResourceType::Test => &["data_tests", "tests"],
            ResourceType::Source => &["sources"],
            ResourceType::Exposure => &["exposures"],
            ResourceType::Metric => &["metrics"],
            ResourceType::SemanticModel => &["semantic-models", "semantic_models"],
            ResourceType::SavedQuery => &["saved-queries", "saved_queries"],
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = NodefigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ResourceType::ALL
            .into_iter()
            .find(|rt| rt.as_str() == normalized)
            .ok_or_else(|| NodefigError::UnknownResourceType(s.to_string()))
    }
}

/// How a base value and an override value combine for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeBehavior {
    Append,
    Update,
    #[default]
    Clobber,
    DictKeyAppend,
}

impl MergeBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeBehavior::Append => "append",
            MergeBehavior::Update => "update",
            MergeBehavior::Clobber => "clobber",
            MergeBehavior::DictKeyAppend => "dict_key_append",
        }
    }
}

impl FromStr for MergeBehavior {
    type Err = NodefigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "append" => Ok(MergeBehavior::Append),
            "update" => Ok(MergeBehavior::Update),
            "clobber" => Ok(MergeBehavior::Clobber),
            "dict_key_append" | "dictkeyappend" => Ok(MergeBehavior::DictKeyAppend),
            _ => Err(NodefigError::UnknownMergeBehavior(s.to_string())),
        }
    }
}

/// Whether a field takes part in same-contents comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareBehavior {
    #[default]
    Include,
    Exclude,
}

impl CompareBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareBehavior::Include => "include",
            CompareBehavior::Exclude => "exclude",
        }
    }
}

impl FromStr for CompareBehavior {
    type Err = NodefigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "include" => Ok(CompareBehavior::Include),
            "exclude" => Ok(CompareBehavior::Exclude),
            _ => Err(NodefigError::UnknownCompareBehavior(s.to_string())),
        }
    }
}

/// Where a configuration layer came from. Used for logging only: precedence
/// is the order in which layers are supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerSource {
    /// A level of the node's own project file.
    Project,
    /// A level of a dependency package's project file.
    Package,
    /// A property (YAML patch) file entry for the resource.
    Properties,
    /// An inline config call in the resource's own file.
    Inline,
}

impl fmt::Display for LayerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LayerSource::Project => "project",
            LayerSource::Package => "package",
            LayerSource::Properties => "properties",
            LayerSource::Inline => "inline",
        };
        f.write_str(s)
    }
}

/// A config operation, independent of any CLI framework.
/// The CLI layer converts parsed clap args into this.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigAction {
    /// Resolve a resource's configuration from files and overrides.
    Resolve {
        resource_type: ResourceType,
        fqn: Vec<String>,
        project: Option<PathBuf>,
        package: Option<PathBuf>,
        layers: Vec<PathBuf>,
        overrides: Vec<(String, Value)>,
    },
    /// Compare two unrendered configs for state equivalence.
    Compare {
        resource_type: ResourceType,
        current: PathBuf,
        previous: PathBuf,
    },
    /// List the declared fields and policies for a resource type.
    Fields { resource_type: ResourceType },
    /// Print a commented settings template.
    Template,
}
