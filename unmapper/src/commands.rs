use clap::{Arg, ArgAction, arg};
use unmapper_scanner::config::DEFAULT_OUTPUT;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("unmapper")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("unmapper")
        .about(
            "Discover JavaScript source maps behind web pages and rebuild the original \
            source trees on disk, one directory per host.",
        )
        .styles(CLAP_STYLING)
        .arg(
            Arg::new("URL")
                .num_args(0..)
                .action(ArgAction::Append)
                .help("Seed page URLs. When omitted, seeds are read from --input or stdin"),
        )
        .arg(
            arg!(-i --"input" <PATH>)
                .required(false)
                .help("Path to a newline-delimited file of seed URLs")
                .conflicts_with("URL"),
        )
        .arg(
            arg!(-o --"output" <DIR>)
                .required(false)
                .help("Directory the per-host source trees are written under")
                .default_value(DEFAULT_OUTPUT),
        )
        .arg(
            arg!(-w --"workers" <NUM_WORKERS>)
                .required(false)
                .help("The number of async workers per pipeline stage")
                .value_parser(clap::value_parser!(usize))
                .default_value("20"),
        )
        .arg(
            arg!(--"timeout" <SECONDS>)
                .required(false)
                .help("Request timeout in seconds")
                .value_parser(clap::value_parser!(u64).range(1..))
                .default_value("30"),
        )
        .arg(
            arg!(--"chunk-size" <BYTES>)
                .required(false)
                .help("Chunk size used when scanning script bodies for a sourceMappingURL comment (min 512)")
                .value_parser(clap::value_parser!(usize))
                .default_value("1024"),
        )
        .arg(
            arg!(-f --"format" <FORMAT>)
                .required(false)
                .help("Report format: text, json")
                .value_parser(["text", "json"])
                .default_value("text"),
        )
        .arg(
            arg!(--"report" <PATH>)
                .required(false)
                .help("Save the run report to a file (default: print to stdout)"),
        )
        .arg(arg!(-d --"debug" "Enable debug logging").required(false))
        .arg(arg!(-q --"quiet" "Suppress banner and progress output").required(false))
        .arg(arg!(--"no-progress" "Disable the progress spinner").required(false))
}
