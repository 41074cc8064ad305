// Command-line entry point for the comic page workflow
//
// Usage:
//   comic_workflow detect <image>
//   comic_workflow clean <image> [--output <png>]
//   comic_workflow translate-page <image> [--lang <language>]
//
// Every command prints one JSON document on stdout. Logs go to stderr.

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use comic_workflow::core::{Cleaning, Config};
use comic_workflow::orchestration::PageOrchestrator;
use comic_workflow::utils::{encode_png_async, load_image_from_memory_async};

enum Command {
    Detect,
    Clean { output: Option<PathBuf> },
    TranslatePage { lang: Option<String> },
}

struct Cli {
    command: Command,
    input: PathBuf,
    print_metrics: bool,
}

const USAGE: &str = "Usage: comic_workflow <detect|clean|translate-page> <image> \
                     [--output <png>] [--lang <language>] [--metrics]";

impl Cli {
    fn parse(args: &[String]) -> Result<Self> {
        let (Some(command), Some(input)) = (args.get(1), args.get(2)) else {
            bail!("{USAGE}");
        };

        let mut output = None;
        let mut lang = None;
        let mut print_metrics = false;

        let mut i = 3;
        while i < args.len() {
            match args[i].as_str() {
                "--output" | "-o" => {
                    output = Some(PathBuf::from(flag_value(args, i)?));
                    i += 2;
                }
                "--lang" | "-l" => {
                    lang = Some(flag_value(args, i)?.to_string());
                    i += 2;
                }
                "--metrics" => {
                    print_metrics = true;
                    i += 1;
                }
                other => bail!("Unknown argument '{other}'\n{USAGE}"),
            }
        }

        let command = match command.as_str() {
            "detect" => Command::Detect,
            "clean" => Command::Clean { output },
            "translate-page" => Command::TranslatePage { lang },
            other => bail!("Unknown command '{other}'\n{USAGE}"),
        };

        Ok(Self {
            command,
            input: PathBuf::from(input),
            print_metrics,
        })
    }
}

fn flag_value(args: &[String], i: usize) -> Result<&str> {
    args.get(i + 1)
        .map(String::as_str)
        .with_context(|| format!("{} needs a value", args[i]))
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::new(format!(
        "comic_workflow={}",
        match config.log_level() {
            tracing::Level::TRACE => "trace",
            tracing::Level::DEBUG => "debug",
            tracing::Level::INFO => "info",
            tracing::Level::WARN => "warn",
            tracing::Level::ERROR => "error",
        }
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

async fn run(cli: &Cli, orchestrator: &PageOrchestrator) -> Result<Value> {
    let bytes = tokio::fs::read(&cli.input)
        .await
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;
    let filename = file_name(&cli.input);

    match &cli.command {
        Command::Detect => {
            let detection = orchestrator.detector().detect_bytes(&bytes).await?;
            Ok(serde_json::to_value(detection)?)
        }
        Command::Clean { output } => {
            let image = load_image_from_memory_async(&bytes).await?;
            let detection = orchestrator.detector().detect(&image).await?;

            match orchestrator.remover().remove_text(&image, &detection.blocks).await? {
                Cleaning::NoText => Ok(json!({ "warning": Cleaning::NO_TEXT_WARNING })),
                Cleaning::Cleaned {
                    image: cleaned,
                    blocks_removed,
                } => {
                    let out = output.clone().unwrap_or_else(|| {
                        let stem = cli.input.file_stem().unwrap_or_default().to_string_lossy();
                        cli.input.with_file_name(format!("clean_{stem}.png"))
                    });
                    let png = encode_png_async(cleaned).await?;
                    tokio::fs::write(&out, png)
                        .await
                        .with_context(|| format!("Failed to write {}", out.display()))?;
                    info!("Wrote cleaned image to {}", out.display());

                    Ok(json!({
                        "status": "success",
                        "filename": filename,
                        "output": out.display().to_string(),
                        "blocks_removed": blocks_removed,
                    }))
                }
            }
        }
        Command::TranslatePage { lang } => {
            let result = orchestrator.process_page_bytes(&bytes, lang.as_deref()).await?;
            Ok(json!({
                "status": result.status,
                "filename": filename,
                "translation_status": result.translation_status,
                "blocks": result.blocks,
            }))
        }
    }
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let config = match Config::new() {
        Ok(c) => c,
        Err(e) => {
            println!("{}", json!({ "error": format!("Configuration error: {e}") }));
            std::process::exit(2);
        }
    };
    init_tracing(&config);

    let cli = match Cli::parse(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    let orchestrator = PageOrchestrator::from_config(&config);

    let code = match run(&cli, &orchestrator).await {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()));
            0
        }
        Err(e) => {
            error!("{:#}", e);
            println!("{}", json!({ "error": format!("{e:#}") }));
            1
        }
    };

    if cli.print_metrics {
        eprintln!("{}", orchestrator.metrics().to_prometheus());
    }

    std::process::exit(code);
}
