//! A parsed resource with its finalized config.

use crate::compare::same_contents;
use crate::config::ResourceConfig;
use crate::policy::{PolicyTable, ResourceShape};
use crate::resolve::ResolvedConfig;
use crate::types::{ConfigMap, ResourceType};

/// A resource and its config for one parse pass. Built once from a
/// resolution and replaced wholesale on the next run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceNode {
    unique_id: String,
    resource_type: ResourceType,
    fqn: Vec<String>,
    shape: ResourceShape,
    config: ResourceConfig,
    unrendered_config: ConfigMap,
}

impl ResourceNode {
    pub fn new(
        unique_id: impl Into<String>,
        resource_type: ResourceType,
        fqn: Vec<String>,
        resolved: ResolvedConfig,
    ) -> Self {
        Self {
            unique_id: unique_id.into(),
            resource_type,
            fqn,
            shape: resolved.shape,
            config: resolved.config,
            unrendered_config: resolved.unrendered,
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn fqn(&self) -> &[String] {
        &self.fqn
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    pub fn unrendered_config(&self) -> &ConfigMap {
        &self.unrendered_config
    }

    /// Whether this node's config is unchanged since `previous`, judged on
    /// the unrendered configs.
    pub fn same_config(&self, previous: &ResourceNode, table: &PolicyTable) -> bool {
        self.resource_type == previous.resource_type
            && same_contents(
                &self.unrendered_config,
                &previous.unrendered_config,
                self.shape,
                table,
            )
    }
}
