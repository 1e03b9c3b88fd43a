use clap::{value_parser, Arg, ArgMatches, Command};
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

use scull::{Config, ScullModule, Shell};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = Command::new("scull")
        .version("0.1.0")
        .about("In-memory scull character devices driven from a command shell")
        .arg(
            Arg::new("config")
                .long("config")
                .help("JSON file with module parameters")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("quantum")
                .long("quantum")
                .help("Bytes per block")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("qset")
                .long("qset")
                .help("Blocks per quantum set")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("nr-devs")
                .long("nr-devs")
                .help("Number of devices")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("minor")
                .long("minor")
                .help("First minor number")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("max-bytes")
                .long("max-bytes")
                .help("Memory ceiling per device in bytes, 0 for none")
                .value_parser(value_parser!(u64)),
        )
        .get_matches();

    let config = load_config(&matches)?;
    info!("Module parameters: {:?}", config);

    let module = ScullModule::init(config)?;
    let mut shell = Shell::new(module.devices());

    println!("{}", scull::shell::HELP);
    let stdin = BufReader::new(tokio::io::stdin());
    let result = shell.run(stdin, tokio::io::stdout()).await;

    module.exit().await;
    result
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<Config> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(quantum) = matches.get_one::<usize>("quantum") {
        config.quantum = *quantum;
    }
    if let Some(qset) = matches.get_one::<usize>("qset") {
        config.qset = *qset;
    }
    if let Some(nr_devs) = matches.get_one::<usize>("nr-devs") {
        config.nr_devs = *nr_devs;
    }
    if let Some(minor) = matches.get_one::<u32>("minor") {
        config.minor = *minor;
    }
    if let Some(max_bytes) = matches.get_one::<u64>("max-bytes") {
        config.max_bytes = *max_bytes;
    }

    Ok(config)
}
