use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use scenario_index::SourceType;
use scenario_index_cli::{run, Action, Options};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("scenario-index")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Build and query the scenario yaml-id/UUID index")
        .subcommand_required(true)
        .arg(
            Arg::new("content")
                .long("content")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("JSON array of content items"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML index configuration"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Output as JSON"),
        )
        .subcommand(Command::new("build").about("Build the index and print statistics"))
        .subcommand(
            Command::new("lookup")
                .about("Resolve a yaml id to its entry")
                .arg(Arg::new("yaml-id").long("yaml-id").required(true)),
        )
        .subcommand(
            Command::new("reverse")
                .about("Resolve a UUID to its entry")
                .arg(Arg::new("uuid").long("uuid").required(true)),
        )
        .subcommand(
            Command::new("batch")
                .about("Resolve several yaml ids; unknown ids are omitted")
                .arg(
                    Arg::new("yaml-ids")
                        .long("yaml-ids")
                        .required(true)
                        .value_delimiter(',')
                        .help("Comma-separated yaml ids"),
                ),
        )
        .subcommand(Command::new("export").about("Print the serialized cache payload"))
        .subcommand(
            Command::new("refresh")
                .about("Build, then rebuild a single source")
                .arg(
                    Arg::new("source")
                        .long("source")
                        .required(true)
                        .value_parser(value_parser!(SourceType))
                        .help("pbl, assessment or discovery"),
                ),
        )
}

fn action(matches: &ArgMatches) -> Action {
    match matches.subcommand() {
        Some(("lookup", sub)) => Action::Lookup {
            yaml_id: sub.get_one::<String>("yaml-id").cloned().unwrap_or_default(),
        },
        Some(("reverse", sub)) => Action::Reverse {
            uuid: sub.get_one::<String>("uuid").cloned().unwrap_or_default(),
        },
        Some(("batch", sub)) => Action::Batch {
            yaml_ids: sub
                .get_many::<String>("yaml-ids")
                .map(|ids| ids.cloned().collect())
                .unwrap_or_default(),
        },
        Some(("export", _)) => Action::Export,
        Some(("refresh", sub)) => Action::Refresh {
            source: sub
                .get_one::<SourceType>("source")
                .copied()
                .unwrap_or(SourceType::Pbl),
        },
        _ => Action::Build,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    let Some(content) = matches.get_one::<PathBuf>("content").cloned() else {
        anyhow::bail!("--content <file> is required");
    };
    let options = Options {
        content,
        config: matches.get_one::<PathBuf>("config").cloned(),
        json: matches.get_flag("json"),
    };

    let output = run(&options, action(&matches)).await?;
    println!("{output}");
    Ok(())
}
