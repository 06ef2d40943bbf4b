use crate::error::NodefigError;
use crate::node::ResourceNode;
use crate::policy::PolicyTable;
use crate::project;
use crate::resolve::{self, Layer, ResolveInput, ResolvedConfig};
use crate::settings::Settings;
use crate::types::{ConfigMap, LayerSource, ResourceType};

/// Entry point for resolving a resource's configuration.
pub struct Nodefig;

impl Nodefig {
    pub fn builder<'t>(resource_type: ResourceType) -> NodefigBuilder<'t> {
        NodefigBuilder::new(resource_type)
    }
}

/// Builder gathering every config source of one resource.
///
/// Sources are applied in a fixed order, lowest priority first:
///
/// 1. the levels of the node's project file along its fqn
///    ([`project_config()`](Self::project_config));
/// 2. the levels of a package project file ([`package_config()`](Self::package_config));
/// 3. the property file entry ([`properties()`](Self::properties));
/// 4. inline config calls, in call order ([`inline()`](Self::inline));
/// 5. pre-built layers, in call order ([`layer()`](Self::layer)).
pub struct NodefigBuilder<'t> {
    resource_type: ResourceType,
    adapter_type: Option<String>,
    fqn: Vec<String>,
    base: bool,
    table: &'t PolicyTable,
    project: Option<ConfigMap>,
    package: Option<ConfigMap>,
    properties: Option<ConfigMap>,
    inline: Vec<Layer>,
    layers: Vec<Layer>,
}

impl<'t> NodefigBuilder<'t> {
    fn new(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            adapter_type: None,
            fqn: Vec::new(),
            base: false,
            table: PolicyTable::shared(),
            project: None,
            package: None,
            properties: None,
            inline: Vec::new(),
            layers: Vec::new(),
        }
    }

    /// Set the adapter type (required), e.g. `"snowflake"`.
    pub fn adapter_type(mut self, adapter_type: &str) -> Self {
        self.adapter_type = Some(adapter_type.to_string());
        self
    }

    /// The node's fully-qualified name: package, directories, then name.
    pub fn fqn<I, S>(mut self, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fqn = parts.into_iter().map(Into::into).collect();
        self
    }

    /// Resolve with the base shape (default: `false`). Only snapshots differ:
    /// their mandatory settings are not checked.
    pub fn base(mut self, base: bool) -> Self {
        self.base = base;
        self
    }

    /// Use a custom policy table instead of [`PolicyTable::shared`].
    pub fn policy_table(mut self, table: &'t PolicyTable) -> Self {
        self.table = table;
        self
    }

    /// Take the adapter type and base flag from loaded settings.
    pub fn settings(self, settings: &Settings) -> Self {
        self.adapter_type(&settings.adapter).base(settings.base)
    }

    /// The node's own project file (the whole file, not just its section).
    pub fn project_config(mut self, project: ConfigMap) -> Self {
        self.project = Some(project);
        self
    }

    /// A package project file whose configs apply on top of the node's own.
    pub fn package_config(mut self, package: ConfigMap) -> Self {
        self.package = Some(package);
        self
    }

    /// The `config:` block of the resource's property file entry.
    pub fn properties(mut self, config: ConfigMap) -> Self {
        self.properties = Some(config);
        self
    }

    /// An inline config call whose values need no rendering.
    pub fn inline(mut self, config: ConfigMap) -> Self {
        self.inline.push(Layer::new(LayerSource::Inline, config));
        self
    }

    /// An inline config call together with its unrendered form.
    pub fn inline_unrendered(mut self, config: ConfigMap, unrendered: ConfigMap) -> Self {
        self.inline
            .push(Layer::new(LayerSource::Inline, config).with_unrendered(unrendered));
        self
    }

    /// Append a pre-built layer after every other source.
    pub fn layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Resolve the effective adapter type, or error if not set.
    fn effective_adapter_type(&self) -> Result<&str, NodefigError> {
        self.adapter_type
            .as_deref()
            .ok_or(NodefigError::AdapterTypeRequired)
    }

    fn tree_layers(&self, tree: Option<&ConfigMap>, source: LayerSource) -> Vec<Layer> {
        tree.map(|tree| project::project_configs(tree, self.resource_type, &self.fqn))
            .unwrap_or_default()
            .into_iter()
            .map(|config| Layer::new(source, config))
            .collect()
    }

    /// Build the `ResolveInput` from current builder state.
    fn build_input(&self) -> Result<ResolveInput, NodefigError> {
        let adapter_type = self.effective_adapter_type()?.to_string();

        let mut layers = self.tree_layers(self.project.as_ref(), LayerSource::Project);
        layers.extend(self.tree_layers(self.package.as_ref(), LayerSource::Package));
        if let Some(properties) = &self.properties {
            layers.push(Layer::new(LayerSource::Properties, properties.clone()));
        }
        layers.extend(self.inline.iter().cloned());
        layers.extend(self.layers.iter().cloned());

        Ok(ResolveInput {
            resource_type: self.resource_type,
            adapter_type,
            base: self.base,
            layers,
        })
    }

    /// Merge and finalize every source.
    pub fn resolve(self) -> Result<ResolvedConfig, NodefigError> {
        let input = self.build_input()?;
        resolve::resolve(input, self.table)
    }

    /// Resolve and wrap the result in a [`ResourceNode`].
    pub fn build_node(self, unique_id: &str) -> Result<ResourceNode, NodefigError> {
        let resource_type = self.resource_type;
        let fqn = self.fqn.clone();
        let resolved = self.resolve()?;
        Ok(ResourceNode::new(unique_id, resource_type, fqn, resolved))
    }
}
