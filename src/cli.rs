//! Clap adapter for nodefig.
//!
//! This module is the **optional integration layer** between nodefig's
//! framework-agnostic core and the [clap](https://docs.rs/clap) CLI parser.
//! It is compiled only when the `clap` Cargo feature is enabled (on by
//! default).
//!
//! The only bridge to the core is [`Command::into_action()`], which converts
//! clap-parsed arguments into a [`ConfigAction`](crate::ConfigAction). From
//! there, all logic flows through the clap-free [`ops::handle()`](crate::ops::handle).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;

use crate::error::NodefigError;
use crate::overrides::parse_override;
use crate::types::{ConfigAction, ResourceType};

/// Resolve and compare node configurations.
#[derive(Debug, Parser)]
#[command(name = "nodefig", version)]
pub struct Cli {
    /// Settings file (TOML). `NODEFIG_*` environment variables win over it.
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Adapter type, overriding the settings.
    #[arg(long, global = true)]
    pub adapter: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct ResourceArg {
    /// Resource type, e.g. model, seed, snapshot, test.
    #[arg(long = "resource-type", short = 't', value_parser = parse_resource_type)]
    pub resource_type: ResourceType,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Merge every config source of a resource and print the final config.
    Resolve {
        #[command(flatten)]
        resource: ResourceArg,
        /// Dotted fully-qualified name, e.g. "bank.staging.stg_accounts".
        #[arg(long, default_value = "")]
        fqn: String,
        /// The node's project file.
        #[arg(long)]
        project: Option<PathBuf>,
        /// A package project file applied after the project file.
        #[arg(long)]
        package: Option<PathBuf>,
        /// Config layer files, lowest priority first.
        #[arg(long = "layer")]
        layers: Vec<PathBuf>,
        /// Override a key (e.g. "materialized=table"), applied last.
        #[arg(long = "set", value_parser = parse_set)]
        overrides: Vec<(String, Value)>,
    },
    /// Check whether two unrendered configs are equivalent.
    Compare {
        #[command(flatten)]
        resource: ResourceArg,
        /// The current config file.
        current: PathBuf,
        /// The previous run's config file.
        previous: PathBuf,
    },
    /// List the declared fields of a resource type and their policies.
    Fields {
        #[command(flatten)]
        resource: ResourceArg,
    },
    /// Print a commented settings template.
    Template,
}

fn parse_resource_type(raw: &str) -> Result<ResourceType, String> {
    raw.parse().map_err(|e: NodefigError| e.to_string())
}

fn parse_set(raw: &str) -> Result<(String, Value), String> {
    parse_override(raw).map_err(|e| e.to_string())
}

impl Command {
    /// Convert clap-parsed args into a framework-agnostic `ConfigAction`.
    pub fn into_action(self) -> ConfigAction {
        match self {
            Command::Resolve {
                resource,
                fqn,
                project,
                package,
                layers,
                overrides,
            } => ConfigAction::Resolve {
                resource_type: resource.resource_type,
                fqn: fqn
                    .split('.')
                    .filter(|part| !part.is_empty())
                    .map(str::to_string)
                    .collect(),
                project,
                package,
                layers,
                overrides,
            },
            Command::Compare {
                resource,
                current,
                previous,
            } => ConfigAction::Compare {
                resource_type: resource.resource_type,
                current,
                previous,
            },
            Command::Fields { resource } => ConfigAction::Fields {
                resource_type: resource.resource_type,
            },
            Command::Template => ConfigAction::Template,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn parse_resolve() {
        let cli = parse(&[
            "nodefig",
            "resolve",
            "-t",
            "model",
            "--fqn",
            "bank.staging.stg_accounts",
            "--project",
            "dbt_project.yml",
            "--layer",
            "a.yml",
            "--layer",
            "b.yml",
            "--set",
            "materialized=table",
        ]);
        assert_eq!(
            cli.command.into_action(),
            ConfigAction::Resolve {
                resource_type: ResourceType::Model,
                fqn: vec!["bank".into(), "staging".into(), "stg_accounts".into()],
                project: Some(PathBuf::from("dbt_project.yml")),
                package: None,
                layers: vec![PathBuf::from("a.yml"), PathBuf::from("b.yml")],
                overrides: vec![("materialized".into(), json!("table"))],
            }
        );
    }

    #[test]
    fn resolve_without_fqn() {
        let cli = parse(&["nodefig", "resolve", "--resource-type", "seed"]);
        match cli.command.into_action() {
            ConfigAction::Resolve { fqn, .. } => assert!(fqn.is_empty()),
            other => panic!("Expected Resolve, got {other:?}"),
        }
    }

    #[test]
    fn parse_compare() {
        let cli = parse(&["nodefig", "compare", "-t", "test", "now.yml", "before.yml"]);
        assert_eq!(
            cli.command.into_action(),
            ConfigAction::Compare {
                resource_type: ResourceType::Test,
                current: PathBuf::from("now.yml"),
                previous: PathBuf::from("before.yml"),
            }
        );
    }

    #[test]
    fn parse_fields_with_dashed_type() {
        let cli = parse(&["nodefig", "fields", "-t", "semantic-model"]);
        assert_eq!(
            cli.command.into_action(),
            ConfigAction::Fields {
                resource_type: ResourceType::SemanticModel
            }
        );
    }

    #[test]
    fn parse_template() {
        let cli = parse(&["nodefig", "template"]);
        assert_eq!(cli.command.into_action(), ConfigAction::Template);
    }

    #[test]
    fn global_flags() {
        let cli = parse(&[
            "nodefig",
            "fields",
            "-t",
            "model",
            "--adapter",
            "snowflake",
            "--settings",
            "nodefig.toml",
        ]);
        assert_eq!(cli.adapter.as_deref(), Some("snowflake"));
        assert_eq!(cli.settings, Some(PathBuf::from("nodefig.toml")));
    }

    #[test]
    fn unknown_resource_type_rejected() {
        assert!(Cli::try_parse_from(["nodefig", "fields", "-t", "widget"]).is_err());
    }

    #[test]
    fn malformed_override_rejected() {
        assert!(
            Cli::try_parse_from(["nodefig", "resolve", "-t", "model", "--set", "oops"]).is_err()
        );
    }

    #[test]
    fn missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["nodefig"]).is_err());
    }
}
