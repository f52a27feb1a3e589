//! Command-line surface for ShareSleuth.
//!
//! Parses arguments, applies overrides to the loaded configuration and
//! hands off to [`sharesleuth_core::pipeline::Pipeline`].
mod commands;

pub use commands::{Cli, Commands};

use anyhow::Context;
use sharesleuth_core::checkpoint::{Freshness, ScanPlan};
use sharesleuth_core::pipeline::{Pipeline, StatusReport};
use sharesleuth_core::ScanConfig;
use tracing::info;

/// Load the configuration named by `cli` and apply command-line overrides.
pub fn load_config(cli: &Cli) -> anyhow::Result<ScanConfig> {
    let mut config = ScanConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(keywords) = &cli.keywords {
        config.keyword_file = Some(keywords.clone());
    }
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if cli.force_rescan {
        config.force_rescan = true;
    }
    if cli.no_resume {
        config.resume = false;
    }
    Ok(config)
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let pipeline = Pipeline::new(config);

    let stats = match cli.command {
        Commands::Run => pipeline.run().context("run failed")?,
        Commands::Scan => pipeline.scan().context("scan failed")?,
        Commands::Classify => pipeline.classify().context("classification failed")?,
        Commands::Status { json } => {
            let report = pipeline.status();
            if json {
                println!("{}", serde_json::to_string_pretty(&report.state)?);
            } else {
                println!("{}", render_status(&report));
            }
            return Ok(());
        }
    };

    info!("Done");
    println!("{stats}");
    Ok(())
}

fn render_status(report: &StatusReport) -> String {
    let state = &report.state;
    let mut lines = vec![format!("Checkpoint:  {}", report.checkpoint_path.display())];
    lines.push(format!("State:       {:?}", report.status));
    if let Some(t) = state.last_scan_time {
        lines.push(format!("Last scan:   {}", t.to_rfc3339()));
    }
    lines.push(format!(
        "Processed:   {} folders, {} files",
        state.folders_processed, state.files_processed
    ));
    for root in state.scan_paths.iter().flatten() {
        let done = state.is_complete(root);
        lines.push(format!(
            "  [{}] {}",
            if done { "x" } else { " " },
            root.display()
        ));
    }
    lines.push(match &report.freshness {
        Freshness::Reusable => "Freshness:   reusable".to_owned(),
        Freshness::Stale(reason) => format!("Freshness:   stale ({reason})"),
    });
    lines.push(match &report.plan {
        ScanPlan::Reuse => "Next run:    reuse scan output".to_owned(),
        ScanPlan::Resume { completed } => {
            format!("Next run:    resume ({} root(s) done)", completed.len())
        }
        ScanPlan::Full { .. } => "Next run:    full scan".to_owned(),
    });
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;

    const CONFIG: &str = r#"{
        "rootPaths": ["."],
        "keywordFile": "keywords.csv",
        "outputDir": "out",
        "thresholds": { "maxPathLength": 400, "maxFileSize": 1000, "maxFilesPerFolder": 10 }
    }"#;

    #[test]
    fn overrides_apply_to_loaded_config() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, CONFIG).unwrap();
        let path = path.to_string_lossy().into_owned();

        let cli = Cli::parse_from([
            "sharesleuth",
            "--config",
            &path,
            "scan",
            "--output-dir",
            "elsewhere",
            "--force-rescan",
            "--no-resume",
        ]);
        assert!(matches!(cli.command, Commands::Scan));
        let config = load_config(&cli).unwrap();
        assert_eq!(config.output_dir, std::path::PathBuf::from("elsewhere"));
        assert!(config.force_rescan);
        assert!(!config.resume);
        assert_eq!(
            config.keyword_file,
            Some(std::path::PathBuf::from("keywords.csv"))
        );
    }

    #[test]
    fn status_of_empty_output_dir_plans_full_scan() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, CONFIG).unwrap();
        let cli = Cli::parse_from([
            "sharesleuth",
            "-c",
            &path.to_string_lossy(),
            "--output-dir",
            &tmp.path().join("out").to_string_lossy(),
            "status",
        ]);
        let pipeline = Pipeline::new(load_config(&cli).unwrap());
        let text = render_status(&pipeline.status());
        assert!(text.contains("stale (no checkpoint)"));
        assert!(text.contains("full scan"));
    }

    #[test]
    fn status_matches_completed_roots_like_the_scanner() {
        use sharesleuth_core::checkpoint::{CheckpointState, CheckpointStatus, StaleReason};
        use std::path::PathBuf;

        let report = StatusReport {
            checkpoint_path: PathBuf::from("out/checkpoint.json"),
            status: CheckpointStatus::Loaded,
            state: CheckpointState {
                scan_paths: Some(vec![
                    PathBuf::from("C:\\Share\\"),
                    PathBuf::from("D:\\Archive"),
                ]),
                completed_paths: vec![PathBuf::from("c:\\share")],
                ..Default::default()
            },
            freshness: Freshness::Stale(StaleReason::Incomplete { pending: 1 }),
            plan: ScanPlan::Resume {
                completed: vec![PathBuf::from("C:\\Share\\")],
            },
        };
        let text = render_status(&report);
        assert!(text.contains("  [x] C:\\Share\\"), "{text}");
        assert!(text.contains("  [ ] D:\\Archive"), "{text}");
        assert!(text.contains("resume (1 root(s) done)"));
    }

    #[test]
    fn missing_config_is_an_error() {
        let cli = Cli::parse_from(["sharesleuth", "--config", "/no/such/config.json", "run"]);
        assert!(load_config(&cli).is_err());
    }
}
