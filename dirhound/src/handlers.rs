use crate::printer::{format_finding_line, format_summary, print_divider};
use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use dirhound_core::config::{DEFAULT_EXTENSIONS, ScanConfig, SoftNotFoundPolicy};
use dirhound_core::engine::Engine;
use dirhound_core::events::{Phase, ScanEvent};
use dirhound_core::output::{Finding, OutputFormat, OutputWriter};
use dirhound_core::target::normalize_target;
use dirhound_core::wordlist::{WordlistSource, load_wordlist, parse_wordlist, resolve_wordlist};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const DEFAULT_WORDLIST: &str = include_str!("../wordlists/default.txt");

/// Split a comma list of extensions, stripping leading dots. Falls back to
/// the default extension set when nothing usable is given.
pub fn parse_extensions(raw: Option<&str>) -> Vec<String> {
    let parsed: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(|ext| ext.trim().trim_start_matches('.'))
        .filter(|ext| !ext.is_empty())
        .map(String::from)
        .collect();

    if parsed.is_empty() {
        DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
    } else {
        parsed
    }
}

/// Comma list of status codes. Unparseable entries are skipped.
pub fn parse_codes(raw: &str) -> Vec<u16> {
    raw.split(',')
        .filter_map(|code| code.trim().parse().ok())
        .collect()
}

/// Comma list of byte sizes. Unparseable entries are skipped.
pub fn parse_sizes(raw: &str) -> Vec<u64> {
    raw.split(',')
        .filter_map(|size| size.trim().parse().ok())
        .collect()
}

fn expand_tilde(path: &Path) -> PathBuf {
    let path = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(path.as_ref()).as_ref())
}

/// Resolve and load the scan wordlist, expanding `~` in a custom path.
pub fn load_words(custom: Option<&PathBuf>) -> Result<(Vec<String>, WordlistSource)> {
    let expanded = custom.map(|path| expand_tilde(path));
    let source = resolve_wordlist(expanded.as_deref());
    let words = match source {
        WordlistSource::File(ref path) => load_wordlist(path).map_err(|e| anyhow!(e))?,
        WordlistSource::Bundled => parse_wordlist(DEFAULT_WORDLIST),
    };
    Ok((words, source))
}

/// Translate `scan` arguments into an engine configuration.
pub fn build_config(args: &ArgMatches, words: Vec<String>) -> Result<ScanConfig> {
    let url = args
        .get_one::<String>("url")
        .ok_or_else(|| anyhow!("--url is required"))?;
    let threads = args.get_one::<usize>("threads").copied().unwrap_or(100);
    let timeout = args.get_one::<u64>("timeout").copied().unwrap_or(5);
    let depth = args.get_one::<usize>("depth").copied().unwrap_or(5);

    let mut config = ScanConfig::new(url.as_str(), words)
        .with_threads(threads)
        .with_timeout(Duration::from_secs(timeout))
        .with_extensions(parse_extensions(
            args.get_one::<String>("extensions").map(String::as_str),
        ))
        .with_recursion(!args.get_flag("no-recursive"), depth)
        .with_add_slash(!args.get_flag("no-slash"))
        .with_soft_404(SoftNotFoundPolicy {
            match_size: !args.get_flag("no-size-match"),
            ..SoftNotFoundPolicy::default()
        });

    if let Some(codes) = args.get_one::<String>("fc") {
        config = config.with_filter_codes(parse_codes(codes));
    }
    if let Some(sizes) = args.get_one::<String>("fs") {
        config = config.with_filter_sizes(parse_sizes(sizes));
    }
    if let Some(codes) = args.get_one::<String>("mc") {
        config = config.with_match_codes(parse_codes(codes));
    }
    if let Some(user_agent) = args.get_one::<String>("user-agent") {
        config.user_agent = user_agent.clone();
    }
    config.accept_invalid_certs = !args.get_flag("verify-tls");

    Ok(config)
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn render_event(pb: &ProgressBar, event: ScanEvent) {
    match event {
        ScanEvent::PhaseStarted { phase, units } => match phase {
            Phase::Calibrating => pb.set_message("calibrating..."),
            Phase::DirDiscovery { depth: 0 } => {
                pb.println(format!("{} Phase 1: {}", "→".blue().bold(), phase));
            }
            Phase::DirDiscovery { .. } => pb.println(format!(
                "{} Phase 2: {} across {} directories",
                "→".blue().bold(),
                phase,
                units
            )),
            Phase::FileDiscovery => pb.println(format!(
                "{} Phase 3: {} in {} directories",
                "→".blue().bold(),
                phase,
                units
            )),
            Phase::Done | Phase::Cancelled => pb.set_message(phase.to_string()),
        },
        ScanEvent::Calibrated {
            samples,
            common_size,
            ..
        } => {
            if samples == 0 {
                pb.println(format!(
                    "{} Calibration failed, soft-404 filtering disabled",
                    "⚠".yellow().bold()
                ));
            } else {
                pb.println(format!(
                    "{} Calibrated against {} samples (common size: {})",
                    "✓".green().bold(),
                    samples,
                    crate::printer::format_size(common_size)
                ));
            }
        }
        ScanEvent::BatchStarted { base, total } => {
            pb.set_length(total as u64);
            pb.set_position(0);
            pb.set_message(base);
        }
        ScanEvent::Progress(progress) | ScanEvent::BatchFinished(progress) => {
            pb.set_position(progress.processed);
        }
    }
}

pub async fn handle_scan(args: &ArgMatches) -> Result<()> {
    let (words, source) = load_words(args.get_one::<PathBuf>("wordlist"))?;
    let config = build_config(args, words)?;
    let format = args
        .get_one::<String>("format")
        .and_then(|f| OutputFormat::from_str(f))
        .unwrap_or(OutputFormat::Url);

    let output = match args.get_one::<PathBuf>("output").map(|path| expand_tilde(path)) {
        Some(path) => {
            let writer = OutputWriter::create(&path, format)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            Some(Arc::new(writer))
        }
        None => None,
    };

    let wordlist_label = match source {
        WordlistSource::File(ref path) => path.display().to_string(),
        WordlistSource::Bundled => "bundled default".to_string(),
    };
    let started_at = chrono::Local::now();
    println!(
        "{} Target:     {}",
        "→".blue(),
        normalize_target(&config.target).bright_white()
    );
    println!(
        "{} Wordlist:   {} ({} words)",
        "→".blue(),
        wordlist_label.bright_white(),
        config.words.len().to_string().cyan()
    );
    println!(
        "{} Workers:    {} | Depth: {} | Recursive: {}",
        "→".blue(),
        config.threads,
        config.max_depth,
        config.recursive
    );
    if !config.extensions.is_empty() {
        println!(
            "{} Extensions: {}",
            "→".blue(),
            config.extensions.join(",")
        );
    }
    println!(
        "{} Started:    {}",
        "→".blue(),
        started_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!();

    let pb = progress_bar();
    let finding_pb = pb.clone();
    let event_pb = pb.clone();

    let mut engine = Engine::new(config)?
        .with_finding_callback(Arc::new(move |finding: &Finding| {
            finding_pb.println(format_finding_line(finding));
        }))
        .with_event_callback(Arc::new(move |event: ScanEvent| {
            render_event(&event_pb, event);
        }));
    if let Some(ref writer) = output {
        engine = engine.with_output(writer.clone());
    }

    let signal = engine.cancel_signal();
    let stop_pb = pb.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop_pb.println(format!("\n{} Stopping...", "⚠".yellow().bold()));
            signal.cancel();
        }
    });

    let result = engine.run().await;
    ctrl_c.abort();
    pb.finish_and_clear();
    let summary = result?;

    if let Some(ref writer) = output
        && let Err(e) = writer.flush()
    {
        debug!("Final flush of {} failed: {}", writer.path().display(), e);
    }

    println!();
    print_divider();
    println!(
        "{}",
        format_summary(&summary, output.as_ref().map(|w| w.path()))
    );
    print_divider();

    Ok(())
}
