// Terminal rendering for findings, phases and the final summary

use colored::{ColoredString, Colorize};
use dirhound_core::output::Finding;
use dirhound_core::stats::ScanSummary;
use std::path::Path;

pub fn print_banner() {
    let art = r#"
     _ _      _                           _
  __| (_)_ __| |__   ___  _   _ _ __   __| |
 / _` | | '__| '_ \ / _ \| | | | '_ \ / _` |
| (_| | | |  | | | | (_) | |_| | | | | (_| |
 \__,_|_|_|  |_| |_|\___/ \__,_|_| |_|\__,_|
"#;
    println!("{}", art.bright_red().bold());
    println!(
        "        {}  {}",
        "[ recursive web content discovery ]".cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).yellow()
    );
    println!();
}

pub fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

/// Human readable size: `512B`, `1.5KB`, `2.0MB`, `N/A` when unknown.
pub fn format_size(size: Option<u64>) -> String {
    match size {
        None => "N/A".to_string(),
        Some(s) if s < 1024 => format!("{}B", s),
        Some(s) if s < 1024 * 1024 => format!("{:.1}KB", s as f64 / 1024.0),
        Some(s) => format!("{:.1}MB", s as f64 / (1024.0 * 1024.0)),
    }
}

/// Tree prefix for a finding at `depth`.
pub fn tree_prefix(depth: usize) -> String {
    match depth {
        0 => String::new(),
        d => format!("{}├── ", "│   ".repeat(d - 1)),
    }
}

pub fn colorize_status(status_code: u16) -> ColoredString {
    let text = format!("[{}]", status_code);
    match status_code {
        200..=299 => text.green(),
        300..=399 => text.blue(),
        400..=499 => text.yellow(),
        500..=599 => text.red(),
        _ => text.white(),
    }
}

/// `├── [200] DIR http://host/admin [1.2KB] -> /admin/`
pub fn format_finding_line(finding: &Finding) -> String {
    let kind = if finding.is_dir {
        "DIR ".cyan().bold()
    } else {
        "FILE".white()
    };
    let mut line = format!(
        "{}{} {} {} [{}]",
        tree_prefix(finding.depth),
        colorize_status(finding.status_code),
        kind,
        finding.url,
        format_size(finding.size)
    );
    if let Some(ref location) = finding.redirect_to {
        line.push_str(&format!(" {} {}", "->".bright_black(), location.bright_black()));
    }
    line
}

pub fn format_summary(summary: &ScanSummary, output: Option<&Path>) -> String {
    let title = if summary.cancelled {
        "  SCAN STOPPED".yellow().bold()
    } else {
        "  SCAN COMPLETE".green().bold()
    };

    let mut lines = vec![
        title.to_string(),
        format!("{} Target: {}", "→".blue(), summary.target.bright_white()),
        format!(
            "{} Duration: {:.2}s",
            "→".blue(),
            summary.duration.as_secs_f64()
        ),
        format!(
            "{} Requests: {}",
            "→".blue(),
            summary.stats.processed.to_string().cyan()
        ),
        format!(
            "{} Found: {}",
            "✓".green().bold(),
            summary.stats.found.to_string().green()
        ),
        format!(
            "{} Directories: {}",
            "✓".green().bold(),
            summary.directories.len().to_string().cyan()
        ),
        format!(
            "{} Filtered: {}",
            "→".blue(),
            summary.stats.dropped.to_string().cyan()
        ),
    ];
    if summary.stats.errors > 0 {
        lines.push(format!(
            "{} Errors: {}",
            "✗".red().bold(),
            summary.stats.errors.to_string().red()
        ));
    }
    if summary.calibration_samples == 0 {
        lines.push(format!(
            "{} Calibration failed, soft-404 filtering was disabled",
            "⚠".yellow().bold()
        ));
    } else {
        lines.push(format!(
            "{} Calibration samples: {}",
            "→".blue(),
            summary.calibration_samples
        ));
    }
    if let Some(path) = output {
        lines.push(format!(
            "{} Output: {}",
            "✓".green().bold(),
            path.display().to_string().bright_white()
        ));
    }
    lines.join("\n")
}
