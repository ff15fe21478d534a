//! Publish command implementation for the roadstats CLI.

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use roadstats_data::{PublishConfig, PublishOutcome, SpatialBackend, load_and_merge, publish};
use roadstats_fs::file_is_file;
use serde::{Deserialize, Serialize};

use crate::{
    ARG_SNAPSHOTS, ARG_SPATIAL_EXTENSION, ARG_STATISTICS, ARG_TASKS, CliError, ENV_SNAPSHOTS,
};

/// CLI arguments for the `publish` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Merge worker snapshots, write the road statistics database \
                 and export review tasks. Earlier snapshots win when two \
                 report the same tile, country or way. Destinations can come \
                 from CLI flags, configuration files, or environment \
                 variables; an unset destination skips that output.",
    about = "Merge worker snapshots and publish the results"
)]
#[ortho_config(prefix = "ROADSTATS")]
pub(crate) struct PublishArgs {
    /// Worker snapshot JSON files, in merge priority order.
    #[arg(value_name = "snapshot")]
    #[serde(default)]
    pub(crate) snapshots: Vec<Utf8PathBuf>,
    /// Destination of the SQLite statistics database.
    #[arg(long = ARG_STATISTICS, value_name = "path")]
    #[serde(default)]
    pub(crate) statistics: Option<Utf8PathBuf>,
    /// Destination of the review task JSON file.
    #[arg(long = ARG_TASKS, value_name = "path")]
    #[serde(default)]
    pub(crate) tasks: Option<Utf8PathBuf>,
    /// SpatiaLite module to load instead of the built-in geometry support.
    #[arg(long = ARG_SPATIAL_EXTENSION, value_name = "module")]
    #[serde(default)]
    pub(crate) spatial_extension: Option<String>,
}

impl PublishArgs {
    pub(crate) fn into_config(self) -> Result<PublishPlan, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        PublishPlan::try_from(merged)
    }
}

/// Resolved `publish` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PublishPlan {
    /// Snapshots to merge, in priority order.
    pub(crate) snapshots: Vec<Utf8PathBuf>,
    /// Output destinations.
    pub(crate) config: PublishConfig,
}

impl PublishPlan {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        self.snapshots
            .iter()
            .try_for_each(|path| require_existing(path, ARG_SNAPSHOTS))
    }
}

fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match file_is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::MissingSourceFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn spatial_backend(module: Option<String>) -> Result<SpatialBackend, CliError> {
    match module {
        None => Ok(SpatialBackend::Builtin),
        #[cfg(feature = "spatialite")]
        Some(module) => Ok(SpatialBackend::SpatiaLite { module }),
        #[cfg(not(feature = "spatialite"))]
        Some(_) => Err(CliError::MissingFeature {
            feature: "spatialite",
            action: "--spatial-extension",
        }),
    }
}

impl TryFrom<PublishArgs> for PublishPlan {
    type Error = CliError;

    fn try_from(args: PublishArgs) -> Result<Self, Self::Error> {
        if args.snapshots.is_empty() {
            return Err(CliError::MissingArgument {
                field: ARG_SNAPSHOTS,
                env: ENV_SNAPSHOTS,
            });
        }
        Ok(Self {
            snapshots: args.snapshots,
            config: PublishConfig {
                statistics: args.statistics,
                tasks: args.tasks,
                spatial: spatial_backend(args.spatial_extension)?,
            },
        })
    }
}

/// Validate the plan, merge the snapshots and write every configured output.
pub(crate) fn run_publish(args: PublishArgs) -> Result<PublishOutcome, CliError> {
    let plan = args.into_config()?;
    execute_plan(&plan)
}

pub(crate) fn execute_plan(plan: &PublishPlan) -> Result<PublishOutcome, CliError> {
    plan.validate_sources()?;
    let merged = load_and_merge(&plan.snapshots)?;
    info!(
        "Merged {} tiles, {} countries and {} review tasks",
        merged.metrics.tiles().keys().len(),
        merged.metrics.countries().keys().len(),
        merged.review.len()
    );
    Ok(publish(&plan.config, &merged))
}
