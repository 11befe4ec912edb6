use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::{json, Value};

use nt_ops::{FlushReport, OperationsManager, OpsConfig};
use nt_pack::PackReader;
use nt_types::{Oid, Operation};

use crate::cli::*;

const DEFAULT_CONFIG: &str = "ntops.toml";

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Append(args) => cmd_append(&cli.config, args, format).await,
        Command::Flush(args) => cmd_flush(&cli.config, args, format).await,
        Command::Status(_) => cmd_status(&cli.config, format).await,
        Command::Inspect(args) => cmd_inspect(args, format),
        Command::Oid(args) => cmd_oid(args, format),
    }
}

/// The default config file is optional; an explicitly named one is not.
fn load_config(path: &Path) -> anyhow::Result<OpsConfig> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG) {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(OpsConfig::default());
    }
    OpsConfig::load(path).with_context(|| format!("loading config from {}", path.display()))
}

fn open_manager(config_path: &Path) -> anyhow::Result<OperationsManager> {
    let config = load_config(config_path)?;
    Ok(OperationsManager::from_config(config)?)
}

fn parse_extras(raw: Option<&str>) -> anyhow::Result<Value> {
    match raw {
        None => Ok(json!({})),
        Some(raw) => serde_json::from_str(raw).context("--extras is not valid JSON"),
    }
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn cmd_append(config: &Path, args: AppendArgs, format: OutputFormat) -> anyhow::Result<()> {
    let manager = open_manager(config)?;
    let extras = parse_extras(args.extras.as_deref())?;
    let op = Operation::new(args.object, args.name, extras);
    let oid = op.oid.clone();
    let offset = manager.append(&args.repo, op).await?;

    match format {
        OutputFormat::Json => print_json(&json!({ "repo": args.repo, "oid": oid, "offset": offset })),
        OutputFormat::Text => {
            println!("{} Recorded {} in {}", "✓".green().bold(), oid.short().yellow(), args.repo.bold());
            Ok(())
        }
    }
}

async fn cmd_flush(config: &Path, args: FlushArgs, format: OutputFormat) -> anyhow::Result<()> {
    let manager = open_manager(config)?;
    let reports = match args.repo {
        Some(slug) => {
            let report = manager.flush(&slug).await?;
            vec![(slug, report)]
        }
        None => manager.flush_all().await?,
    };

    match format {
        OutputFormat::Json => {
            let out: Vec<Value> = reports.iter().map(|(slug, r)| report_json(slug, r)).collect();
            print_json(&Value::Array(out))
        }
        OutputFormat::Text => {
            if reports.is_empty() {
                println!("No repositories configured.");
            }
            for (slug, report) in &reports {
                if report.is_empty() {
                    println!("{}: nothing to flush", slug.bold());
                    continue;
                }
                println!(
                    "{} {}: {} operations in {} packs",
                    "✓".green().bold(),
                    slug.bold(),
                    report.operation_count(),
                    report.packs.len()
                );
                for pack in &report.packs {
                    println!("  {} {} ({} objects)", pack.oid.short().yellow(), pack.path.display(), pack.object_count);
                }
            }
            Ok(())
        }
    }
}

fn report_json(slug: &str, report: &FlushReport) -> Value {
    let packs: Vec<Value> = report
        .packs
        .iter()
        .map(|p| {
            json!({
                "oid": p.oid,
                "path": p.path.display().to_string(),
                "objects": p.object_count,
                "source": p.source.display().to_string(),
            })
        })
        .collect();
    json!({ "repo": slug, "packs": packs })
}

async fn cmd_status(config: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let manager = open_manager(config)?;
    let mut rows = Vec::new();
    for slug in manager.registry().slugs() {
        let pending = manager.pending_count(&slug).await?;
        let packs = manager.packs(&slug)?.list()?.len();
        let path = manager.resolve_path(&slug)?;
        rows.push((slug, path, pending, packs));
    }

    match format {
        OutputFormat::Json => {
            let out: Vec<Value> = rows
                .iter()
                .map(|(slug, path, pending, packs)| {
                    json!({
                        "repo": slug,
                        "path": path.display().to_string(),
                        "pending": pending,
                        "packs": packs,
                    })
                })
                .collect();
            print_json(&Value::Array(out))
        }
        OutputFormat::Text => {
            if rows.is_empty() {
                println!("No repositories configured.");
            }
            for (slug, path, pending, packs) in &rows {
                let pending = if *pending == 0 {
                    "0 pending".green()
                } else {
                    format!("{pending} pending").yellow()
                };
                println!("{} ({})", slug.bold(), path.display().to_string().dimmed());
                println!("  {}, {} packs", pending, packs);
            }
            Ok(())
        }
    }
}

fn cmd_inspect(args: InspectArgs, format: OutputFormat) -> anyhow::Result<()> {
    let reader = PackReader::open(&args.pack)
        .with_context(|| format!("reading pack {}", args.pack.display()))?;
    let ops = reader.operations()?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "oid": reader.pack().oid,
            "ctime": nt_types::operation::iso8601::format(&reader.pack().ctime),
            "operations": ops,
        })),
        OutputFormat::Text => {
            println!(
                "Pack {} ({} objects)",
                reader.pack().oid.as_str().yellow().bold(),
                reader.object_count()
            );
            for op in &ops {
                println!(
                    "  {}  {}  {} on {}",
                    op.oid.short().yellow(),
                    nt_types::operation::iso8601::format(&op.timestamp).dimmed(),
                    op.name.cyan(),
                    op.object_oid
                );
            }
            Ok(())
        }
    }
}

fn cmd_oid(args: OidArgs, format: OutputFormat) -> anyhow::Result<()> {
    let oid = match args.from.as_deref() {
        Some("") => bail!("--from must not be empty"),
        Some(text) => Oid::from_content(text),
        None => Oid::generate(),
    };
    match format {
        OutputFormat::Json => print_json(&json!({ "oid": oid })),
        OutputFormat::Text => {
            println!("{oid}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn write_config(dir: &Path) -> std::path::PathBuf {
        let repo = dir.join("notes");
        std::fs::create_dir_all(&repo).unwrap();
        let config = dir.join("ops.toml");
        std::fs::write(
            &config,
            format!("[[repositories]]\nslug = \"main\"\npath = \"{}\"\n", repo.display()),
        )
        .unwrap();
        config
    }

    #[test]
    fn extras_default_to_empty_object() {
        assert_eq!(parse_extras(None).unwrap(), json!({}));
        assert_eq!(parse_extras(Some("{\"a\":1}")).unwrap(), json!({ "a": 1 }));
        assert!(parse_extras(Some("{a")).is_err());
    }

    #[test]
    fn missing_default_config_falls_back() {
        let config = load_config(Path::new(DEFAULT_CONFIG));
        if !Path::new(DEFAULT_CONFIG).exists() {
            assert_eq!(config.unwrap(), OpsConfig::default());
        }
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(&dir.path().join("absent.toml")).is_err());
    }

    #[tokio::test]
    async fn append_then_flush_writes_a_pack() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path());
        let config = config.to_str().unwrap();

        for object in ["card-1", "card-2"] {
            let cli = Cli::parse_from([
                "ntops", "-c", config, "append", "--repo", "main", "--name", "review-flashcard",
                "--object", object,
            ]);
            run_command(cli).await.unwrap();
        }
        run_command(Cli::parse_from(["ntops", "-c", config, "flush", "--format", "json"]))
            .await
            .unwrap();

        let manager = open_manager(Path::new(config)).unwrap();
        let packs = manager.packs("main").unwrap().list().unwrap();
        assert_eq!(packs.len(), 1);
        assert_eq!(PackReader::open(&packs[0]).unwrap().object_count(), 2);
        assert!(manager.pending("main").await.unwrap().is_empty());

        let inspect = Cli::parse_from(["ntops", "inspect", packs[0].to_str().unwrap()]);
        run_command(inspect).await.unwrap();
    }

    #[tokio::test]
    async fn append_to_unknown_repository_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path());
        let cli = Cli::parse_from([
            "ntops", "-c", config.to_str().unwrap(), "append", "--repo", "other", "--name", "x",
            "--object", "y",
        ]);
        let err = run_command(cli).await.unwrap_err();
        assert!(err.to_string().contains("other"));
    }
}
