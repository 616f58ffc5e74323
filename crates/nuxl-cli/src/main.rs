use clap::{value_parser, Arg, ArgAction, Command, ValueHint};
use nuxl_cli::input::{Input, OutputFormat};
use nuxl_cli::runner::Runner;
use rayon::ThreadPoolBuilder;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::default()
        .filter_level(log::LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("NUXL_LOG", "error,nuxl=info"))
        .init();

    let matches = Command::new("nuxl-fdr")
        .version(clap::crate_version!())
        .about("Separate FDR control for peptide and nucleotide crosslink PSMs")
        .arg(
            Arg::new("parameters")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Path to configuration parameters (JSON file)")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("identifications")
                .short('i')
                .long("identifications")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Path to identifications (JSON file). Overrides the file \
                     specified in the configuration file.",
                )
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("output_prefix")
                .short('o')
                .long("output-prefix")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Prefix of all output files, e.g. `results/sample_`. \
                     Overrides the prefix specified in the configuration file.",
                )
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("output_format")
                .long("output-format")
                .value_parser(|s: &str| s.parse::<OutputFormat>())
                .help("Format of identification outputs: `idxml` (default) or `json`"),
        )
        .arg(
            Arg::new("xl_fdr")
                .long("xl-fdr")
                .action(ArgAction::Append)
                .value_parser(value_parser!(f64))
                .help(
                    "Crosslink q-value threshold, may be given several times. \
                     0 disables filtering.",
                )
                .value_hint(ValueHint::Other),
        )
        .arg(
            Arg::new("peptide_fdr")
                .long("peptide-fdr")
                .value_parser(value_parser!(f64))
                .help("Peptide q-value threshold. 0 disables filtering.")
                .value_hint(ValueHint::Other),
        )
        .arg(
            Arg::new("report_top_hits")
                .long("report-top-hits")
                .value_parser(value_parser!(usize))
                .help("Number of hits per spectrum; 2 or more estimates q-values on all hits")
                .value_hint(ValueHint::Other),
        )
        .arg(
            Arg::new("report_decoys")
                .long("report-decoys")
                .action(ArgAction::SetTrue)
                .help("Include decoy proteins in the protein reports"),
        )
        .arg(
            Arg::new("parallel_reports")
                .long("parallel-reports")
                .action(ArgAction::SetTrue)
                .help("Write per-threshold crosslink reports in parallel"),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .value_parser(value_parser!(u16).range(1..))
                .help("Number of worker threads (default = # of CPUs)")
                .value_hint(ValueHint::Other),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    let threads = matches
        .get_one::<u16>("threads")
        .copied()
        .map(usize::from)
        .unwrap_or_else(num_cpus::get);
    ThreadPoolBuilder::new().num_threads(threads).build_global()?;

    let input = Input::from_arguments(matches)?;

    input
        .build()
        .and_then(Runner::new)
        .and_then(Runner::run)?;

    Ok(())
}
