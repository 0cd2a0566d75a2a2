use crate::CLAP_STYLING;
use clap::{arg, command};
use std::path::PathBuf;

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("dirhound")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("dirhound")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(
            arg!(-v --"verbose" "Increase log verbosity (-v info, -vv debug)")
                .required(false)
                .global(true)
                .action(clap::ArgAction::Count),
        )
        .subcommand_required(false)
        .subcommand(
            command!("scan")
                .about(
                    "Discover directories and files on a web server by dictionary brute-force, \
                recursing into every directory found.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("Target base URL (https:// is assumed when no scheme is given)"),
                )
                .arg(
                    arg!(-w --"wordlist" <PATH>)
                        .required(false)
                        .help("Path to wordlist file (default: SecLists/dirb if installed, else bundled)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Write findings to file")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Output file format: url, full, json")
                        .value_parser(["url", "full", "json"])
                        .default_value("url"),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("The number of async workers probing concurrently.")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("100"),
                )
                .arg(
                    arg!(-x --"extensions" <EXTS>)
                        .required(false)
                        .help("Comma separated file extensions (default: php,html,js,txt,json,xml,bak,sql,...)"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("5"),
                )
                .arg(
                    arg!(-d --"depth" <DEPTH>)
                        .required(false)
                        .help("Maximum recursion depth")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("5"),
                )
                .arg(
                    arg!(--"no-recursive")
                        .required(false)
                        .help("Only scan the base URL, do not recurse into directories")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"no-slash")
                        .required(false)
                        .help("Do not also probe each directory word with a trailing slash")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"fc" <CODES>)
                        .required(false)
                        .help("Filter (hide) status codes, e.g. 403,500"),
                )
                .arg(
                    arg!(--"fs" <SIZES>)
                        .required(false)
                        .help("Filter (hide) response sizes in bytes, e.g. 0,1234"),
                )
                .arg(
                    arg!(--"mc" <CODES>)
                        .required(false)
                        .help("Only show these status codes, e.g. 200,301"),
                )
                .arg(
                    arg!(--"no-size-match")
                        .required(false)
                        .help("Only treat responses as soft-404 when their body matches, not just their size")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"user-agent" <UA>)
                        .required(false)
                        .help("User-Agent header to send"),
                )
                .arg(
                    arg!(--"verify-tls")
                        .required(false)
                        .help("Reject invalid TLS certificates (accepted by default)")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_well_formed() {
        command_argument_builder().debug_assert();
    }

    #[test]
    fn test_scan_defaults() {
        let matches = command_argument_builder()
            .try_get_matches_from(["dirhound", "scan", "-u", "example.com"])
            .unwrap();
        let (name, scan) = matches.subcommand().unwrap();
        assert_eq!(name, "scan");
        assert_eq!(scan.get_one::<usize>("threads"), Some(&100));
        assert_eq!(scan.get_one::<usize>("depth"), Some(&5));
        assert_eq!(scan.get_one::<u64>("timeout"), Some(&5));
        assert_eq!(scan.get_one::<String>("format").map(String::as_str), Some("url"));
        assert!(!scan.get_flag("no-recursive"));
        assert_eq!(scan.get_count("verbose"), 0);
    }

    #[test]
    fn test_scan_requires_url() {
        assert!(command_argument_builder()
            .try_get_matches_from(["dirhound", "scan"])
            .is_err());
    }

    #[test]
    fn test_verbose_is_global() {
        let matches = command_argument_builder()
            .try_get_matches_from(["dirhound", "scan", "-u", "e.com", "-vv"])
            .unwrap();
        assert_eq!(matches.get_count("verbose"), 2);
    }
}
