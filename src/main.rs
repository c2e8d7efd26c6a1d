// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use console::Emoji;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use radionews::{
    AppConfig, CombinedFeed, DEFAULT_HISTORY_FILENAME, Episode, NoopReporter, PLAYED_MARKER,
    PlayedHistory, ProgressEvent, ProgressReporter, ReqwestClient, SharedProgressReporter,
    TitleStyle, collect_latest, episode_key, render_feed, serve,
};

// Emoji with fallback for terminals without Unicode support
static RADIO: Emoji<'_, '_> = Emoji("📻 ", "");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static NEWS: Emoji<'_, '_> = Emoji("📰 ", "[*] ");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "x ");

const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Combine the latest news podcast episodes into one feed
#[derive(Parser, Debug)]
#[command(name = "radionews")]
#[command(about = "Combine the latest news podcast episodes into one feed")]
#[command(version)]
struct Args {
    /// Path to a JSON configuration file (defaults to the bundled one)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch all sources and list their latest episodes
    List {
        /// Only show episodes not yet marked as played
        #[arg(short, long)]
        unplayed: bool,

        /// Path to the played-history file
        #[arg(long)]
        history: Option<PathBuf>,

        /// Print episodes as JSON
        #[arg(long)]
        json: bool,

        /// Quiet mode - suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Write the combined RSS feed
    Feed {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Leave the source label out of item titles
        #[arg(long)]
        plain_titles: bool,
    },

    /// Serve the feed proxy and the combined feed over HTTP
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = DEFAULT_BIND)]
        bind: String,
    },

    /// Mark an episode as played
    MarkPlayed {
        /// Episode key as shown by `list`
        key: String,

        /// Path to the played-history file
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// Forget all played episodes
    ClearHistory {
        /// Path to the played-history file
        #[arg(long)]
        history: Option<PathBuf>,
    },
}

/// Progress reporter using indicatif for terminal output
struct IndicatifReporter {
    multi: MultiProgress,
    main_bar: ProgressBar,
}

impl IndicatifReporter {
    fn new() -> Self {
        let multi = MultiProgress::new();

        let main_style = ProgressStyle::with_template("{spinner:.green} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let main_bar = multi.add(ProgressBar::new_spinner());
        main_bar.set_style(main_style);
        main_bar.enable_steady_tick(std::time::Duration::from_millis(100));

        Self { multi, main_bar }
    }
}

impl ProgressReporter for IndicatifReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::FetchingSource { label, url } => {
                self.main_bar.set_message(format!(
                    "{SEARCH}Fetching {}: {}",
                    label.bold(),
                    url.cyan()
                ));
            }

            ProgressEvent::SourceReady { label, title } => {
                let _ = self.multi.println(format!(
                    "  {SUCCESS}{} {}",
                    label.bold().green(),
                    truncate_title(&title, 50)
                ));
            }

            ProgressEvent::SourceFailed { label, error } => {
                let _ = self.multi.println(format!(
                    "  {FAILURE}{} - {}",
                    label.bold().red(),
                    error.red()
                ));
            }

            ProgressEvent::AggregationCompleted {
                episode_count,
                failed_count,
            } => {
                self.main_bar.finish_and_clear();
                println!(
                    "\n{NEWS}{} {} episodes, {} sources failed\n",
                    "Done:".bold().green(),
                    episode_count.to_string().green().bold(),
                    if failed_count > 0 {
                        failed_count.to_string().red().bold()
                    } else {
                        failed_count.to_string().green()
                    }
                );
            }
        }
    }
}

fn truncate_title(title: &str, max_chars: usize) -> String {
    if title.chars().count() <= max_chars {
        title.to_string()
    } else {
        let kept: String = title.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[derive(Serialize)]
struct ListedEpisode<'a> {
    key: String,
    played: bool,
    #[serde(flatten)]
    episode: &'a Episode,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path).context("Failed to load configuration"),
        None => AppConfig::embedded().context("Bundled configuration is invalid"),
    }
}

fn load_history(path: Option<PathBuf>) -> Result<PlayedHistory> {
    let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_FILENAME));
    PlayedHistory::load(&path).context("Failed to load played history")
}

async fn combine(config: &AppConfig, reporter: SharedProgressReporter) -> Result<CombinedFeed> {
    let client = ReqwestClient::for_sources().context("Failed to build HTTP client")?;

    Ok(collect_latest(
        &client,
        &config.sources(),
        &config.fetch_options(),
        &reporter,
    )
    .await)
}

fn print_episode(episode: &Episode, key: &str, played: bool) {
    let marker = if played { PLAYED_MARKER } else { "" };
    let date = episode
        .published_at
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown date".to_string());
    let duration = episode.formatted_duration().unwrap_or_else(|| "-".to_string());

    let title = format!("{marker}{}", episode.prefixed_title());
    println!(
        "{}  {}  {}",
        if played {
            title.dimmed()
        } else {
            title.bold()
        },
        date.cyan(),
        duration.yellow()
    );
    println!("    {}", key.dimmed());
}

async fn list(
    config: &AppConfig,
    unplayed: bool,
    history: Option<PathBuf>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let history = load_history(history)?;

    // Progress goes to stdout, so JSON output stays quiet
    let reporter: SharedProgressReporter = if quiet || json {
        NoopReporter::shared()
    } else {
        println!(
            "\n{}{} {}\n",
            RADIO,
            "radionews".bold().magenta(),
            "- Latest News Episodes".dimmed()
        );
        Arc::new(IndicatifReporter::new())
    };

    let combined = combine(config, reporter).await?;

    let episodes: Vec<&Episode> = if unplayed {
        history.unplayed(&combined.episodes)
    } else {
        combined.episodes.iter().collect()
    };

    if json {
        let listed: Vec<ListedEpisode> = episodes
            .iter()
            .map(|&episode| ListedEpisode {
                key: episode_key(episode),
                played: history.is_episode_played(episode),
                episode,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listed)?);
    } else {
        for episode in &episodes {
            print_episode(episode, &episode_key(episode), history.is_episode_played(episode));
        }

        if !quiet && !combined.failures.is_empty() {
            println!("\n{}", "Failed sources:".red().bold());
            for failure in &combined.failures {
                println!(
                    "  {}{} - {}",
                    CROSS,
                    failure.label.yellow(),
                    failure.reason.dimmed()
                );
            }
        }
    }

    if combined.episodes.is_empty() && !combined.failures.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}

async fn feed(config: &AppConfig, output: Option<PathBuf>, plain_titles: bool) -> Result<()> {
    let combined = combine(config, NoopReporter::shared()).await?;

    let style = if plain_titles {
        TitleStyle::Plain
    } else {
        TitleStyle::Prefixed
    };
    let info = config.channel_info(&format!("http://{DEFAULT_BIND}/combined-feed.xml"));
    let body = render_feed(&combined.episodes, &info, style, chrono::Utc::now())
        .context("Failed to render feed")?;

    match output {
        Some(path) => std::fs::write(&path, body)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => {
            use std::io::Write;
            std::io::stdout()
                .write_all(&body)
                .context("Failed to write feed to stdout")?;
        }
    }

    Ok(())
}

#[actix_web::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::List {
            unplayed,
            history,
            json,
            quiet,
        } => {
            let config = load_config(args.config.as_deref())?;
            list(&config, unplayed, history, json, quiet).await
        }

        Command::Feed {
            output,
            plain_titles,
        } => {
            let config = load_config(args.config.as_deref())?;
            feed(&config, output, plain_titles).await
        }

        Command::Serve { bind } => {
            let config = load_config(args.config.as_deref())?;
            println!(
                "\n{}{} {}\n",
                RADIO,
                "radionews".bold().magenta(),
                format!("- listening on http://{bind}").dimmed()
            );
            serve(config, &bind)
                .await
                .with_context(|| format!("Server on {bind} failed"))
        }

        Command::MarkPlayed { key, history } => {
            let mut history = load_history(history)?;
            if history.mark_played(key.trim()) {
                history.save().context("Failed to save played history")?;
                println!(
                    "{SUCCESS}Marked {} as played in {}",
                    key.trim().cyan(),
                    history.path().display()
                );
            } else {
                println!("{} was already played", key.trim().cyan());
            }
            Ok(())
        }

        Command::ClearHistory { history } => {
            let mut history = load_history(history)?;
            let cleared = history.clear();
            history.save().context("Failed to save played history")?;
            println!(
                "{SUCCESS}Cleared {} played episodes from {}",
                cleared.to_string().green(),
                history.path().display()
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_title_respects_char_boundaries() {
        assert_eq!(truncate_title("Radioavisen", 40), "Radioavisen");
        assert_eq!(truncate_title("Nyheder på dansk i dag", 10), "Nyheder...");
    }

    #[test]
    fn cli_parses_subcommands() {
        let args = Args::try_parse_from(["radionews", "-v", "list", "--unplayed", "--json"]).unwrap();
        assert!(args.verbose);
        assert!(matches!(
            args.command,
            Command::List {
                unplayed: true,
                json: true,
                ..
            }
        ));

        let args = Args::try_parse_from(["radionews", "serve"]).unwrap();
        assert!(matches!(args.command, Command::Serve { bind } if bind == DEFAULT_BIND));
    }
}
