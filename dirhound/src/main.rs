use clap::ArgMatches;
use colored::Colorize;
use dirhound::commands::command_argument_builder;
use dirhound::handlers::handle_scan;
use dirhound::printer::print_banner;
use tracing::Level;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    init_tracing(&chosen_command);

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    let outcome = match chosen_command.subcommand() {
        Some(("scan", primary_command)) => handle_scan(primary_command).await,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = outcome {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

// Logs go to stderr so they never mix into piped findings.
fn init_tracing(matches: &ArgMatches) {
    let verbosity = matches
        .subcommand()
        .map(|(_, sub)| sub.get_count("verbose"))
        .unwrap_or(0)
        .max(matches.get_count("verbose"));

    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
