//! Focused unit tests covering publish CLI configuration validation.

use super::helpers::Scratch;
use super::*;
use crate::publish::{PublishArgs, PublishPlan};
use rstest::rstest;
use roadstats_data::SpatialBackend;

#[rstest]
fn converting_without_snapshots_errors() {
    let err = PublishPlan::try_from(PublishArgs::default()).expect_err("snapshots are required");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_SNAPSHOTS);
            assert_eq!(env, ENV_SNAPSHOTS);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn converting_keeps_destinations() {
    let args = PublishArgs {
        snapshots: vec!["a.json".into(), "b.json".into()],
        statistics: Some("out/stats.db".into()),
        tasks: None,
        spatial_extension: None,
    };
    let plan = PublishPlan::try_from(args).expect("plan");
    assert_eq!(plan.snapshots.len(), 2);
    assert_eq!(plan.config.statistics.as_deref().map(|p| p.as_str()), Some("out/stats.db"));
    assert!(plan.config.tasks.is_none());
    assert_eq!(plan.config.spatial, SpatialBackend::Builtin);
}

#[cfg(not(feature = "spatialite"))]
#[rstest]
fn spatial_extension_requires_feature() {
    let args = PublishArgs {
        snapshots: vec!["a.json".into()],
        spatial_extension: Some("mod_spatialite".into()),
        ..PublishArgs::default()
    };
    match PublishPlan::try_from(args) {
        Err(CliError::MissingFeature { feature, .. }) => assert_eq!(feature, "spatialite"),
        other => panic!("expected MissingFeature, found {other:?}"),
    }
}

#[cfg(feature = "spatialite")]
#[rstest]
fn spatial_extension_selects_spatialite() {
    let args = PublishArgs {
        snapshots: vec!["a.json".into()],
        spatial_extension: Some("mod_spatialite".into()),
        ..PublishArgs::default()
    };
    let plan = PublishPlan::try_from(args).expect("plan");
    assert_eq!(
        plan.config.spatial,
        SpatialBackend::SpatiaLite {
            module: "mod_spatialite".into()
        }
    );
}

#[rstest]
fn validate_sources_reports_missing_snapshots() {
    let scratch = Scratch::new();
    let present = scratch.write("present.json", &Default::default());
    let plan = PublishPlan::try_from(PublishArgs {
        snapshots: vec![present, scratch.root.join("absent.json")],
        ..PublishArgs::default()
    })
    .expect("plan");

    match plan.validate_sources() {
        Err(CliError::MissingSourceFile { field, path }) => {
            assert_eq!(field, ARG_SNAPSHOTS);
            assert_eq!(path, scratch.root.join("absent.json"));
        }
        other => panic!("expected MissingSourceFile, found {other:?}"),
    }
}

#[rstest]
fn validate_sources_rejects_directories() {
    let scratch = Scratch::new();
    let plan = PublishPlan::try_from(PublishArgs {
        snapshots: vec![scratch.root.clone()],
        ..PublishArgs::default()
    })
    .expect("plan");

    assert!(matches!(
        plan.validate_sources(),
        Err(CliError::MissingSourceFile { .. })
    ));
}

#[rstest]
#[case::flags(
    &["roadstats", "publish", "a.json", "b.json", "--statistics", "stats.db", "--tasks", "tasks.json"],
    2,
    true
)]
#[case::snapshots_only(&["roadstats", "publish", "a.json"], 1, false)]
fn parses_publish_arguments(
    #[case] argv: &[&str],
    #[case] snapshots: usize,
    #[case] has_outputs: bool,
) {
    let cli = Cli::try_parse_from(argv).expect("parse arguments");
    let Command::Publish(args) = cli.command;
    assert_eq!(args.snapshots.len(), snapshots);
    assert_eq!(args.statistics.is_some(), has_outputs);
    assert_eq!(args.tasks.is_some(), has_outputs);
}

#[rstest]
fn unknown_subcommands_fail_to_parse() {
    assert!(Cli::try_parse_from(["roadstats", "ingest"]).is_err());
}
