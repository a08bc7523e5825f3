mod host;
mod letterboxd;
mod numfmt;
mod pipeline;
mod render;
mod settings;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use host::{RatingBar, SourceIdentifier};
use letterboxd::Letterboxd;
use pipeline::{Pipeline, Stage};
use render::{OutputFormat, Rendered};
use settings::Settings;

#[derive(Parser)]
#[command(name = "lbxd_on_imdb", about = "Letterboxd ratings for IMDb titles")]
struct Cli {
    /// Per-request timeout in seconds (default: LBXD_TIMEOUT_SECS or 10)
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,
    /// Output format
    #[arg(long, value_enum, global = true, default_value = "text")]
    format: OutputFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up the Letterboxd rating for one IMDb title
    Rating {
        /// IMDb id or title URL (tt0133093, 0133093, https://www.imdb.com/title/tt0133093/)
        title: String,
        /// Saved IMDb title page; its rating bar gates the lookup and shapes the output
        #[arg(long)]
        host_page: Option<PathBuf>,
    },
    /// Look up several titles, one after another
    Batch {
        /// IMDb ids or title URLs
        #[arg(required = true)]
        titles: Vec<String>,
    },
    /// Print a ratings count in compact form (1.23K, 45.7M, ...)
    Format { count: u64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut settings = Settings::load()?;
    if let Some(secs) = cli.timeout {
        settings.timeout_secs = secs;
    }

    match cli.command {
        Commands::Format { count } => {
            println!("{}", numfmt::compact_count(count));
            Ok(())
        }
        Commands::Rating { title, host_page } => {
            let id = SourceIdentifier::parse(&title)?;
            let bar = match host_page {
                Some(p) => {
                    let html = std::fs::read_to_string(&p)
                        .with_context(|| format!("Failed to read host page {:?}", p))?;
                    match RatingBar::detect(&html) {
                        Some(bar) => bar,
                        None => {
                            info!("No rating bar found. Film has probably not been released yet, or this is a subpage of the title.");
                            return Ok(());
                        }
                    }
                }
                None => RatingBar::Aggregate,
            };

            let site = Letterboxd::new(&settings)?;
            let mut sink = Rendered::new(bar, cli.format);
            Pipeline::new(&site).run(&id, &mut sink).await;
            for line in &sink.lines {
                println!("{}", line);
            }
            Ok(())
        }
        Commands::Batch { titles } => {
            let site = Letterboxd::new(&settings)?;
            let stats = run_batch(&site, &titles, cli.format).await;
            println!(
                "Done: {} titles ({} rated, {} aborted, {} invalid).",
                stats.total, stats.done, stats.aborted, stats.invalid
            );
            let elapsed = t0.elapsed();
            if elapsed.as_secs() >= 1 {
                println!("Finished in {}", format_duration(elapsed));
            }
            Ok(())
        }
    }
}

struct BatchStats {
    total: usize,
    done: usize,
    aborted: usize,
    invalid: usize,
}

/// One pipeline per title, strictly sequential. Lines are printed after the
/// progress bar clears.
async fn run_batch(site: &Letterboxd, titles: &[String], format: OutputFormat) -> BatchStats {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(titles.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("=> "));
    }

    let mut stats = BatchStats {
        total: titles.len(),
        done: 0,
        aborted: 0,
        invalid: 0,
    };
    let mut lines = Vec::new();

    for title in titles {
        let id = match SourceIdentifier::parse(title) {
            Ok(id) => id,
            Err(e) => {
                warn!("Skipping {}: {}", title, e);
                stats.invalid += 1;
                pb.inc(1);
                continue;
            }
        };
        pb.set_message(id.to_string());

        let mut sink = Rendered::new(RatingBar::Aggregate, format).titled(id.to_string());
        match Pipeline::new(site).run(&id, &mut sink).await {
            Stage::Done => stats.done += 1,
            _ => stats.aborted += 1,
        }
        lines.append(&mut sink.lines);
        pb.inc(1);
    }

    pb.finish_and_clear();
    for line in &lines {
        println!("{}", line);
    }
    stats
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(Cli::try_parse_from(["lbxd_on_imdb", "--timeout", "0", "format", "5"]).is_err());
        let cli = Cli::try_parse_from(["lbxd_on_imdb", "--timeout", "3", "format", "5"]).unwrap();
        assert_eq!(cli.timeout, Some(3));
    }
}
