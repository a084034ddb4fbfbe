use clap::Parser;
use gridspice::config::Config;
use gridspice::gateway::{HttpTransport, OfflineTransport, Transport};
use gridspice::script;
use gridspice::session::Workbench;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

/// Grid circuit editor: replays a session script against a remote solver
#[derive(Parser)]
#[command(name = "gridspice", version)]
struct Cli {
    /// Session script to replay (stdin when omitted)
    script: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Never contact the solver service
    #[arg(long)]
    offline: bool,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path).unwrap_or_else(|e| {
            eprintln!("{}", e);
            std::process::exit(1);
        }),
        None => Config::default(),
    };

    let input: Box<dyn BufRead> = match &cli.script {
        Some(path) => Box::new(BufReader::new(File::open(path).unwrap_or_else(|e| {
            eprintln!("Error reading {}: {}", path.display(), e);
            std::process::exit(1);
        }))),
        None => Box::new(io::stdin().lock()),
    };

    let failures = if cli.offline {
        replay(Workbench::new(&config, OfflineTransport), input)
    } else {
        let transport = HttpTransport::new(config.server.base_url.clone());
        replay(Workbench::new(&config, transport), input)
    };

    if failures > 0 {
        std::process::exit(2);
    }
}

fn replay<T: Transport>(mut bench: Workbench<T>, input: Box<dyn BufRead>) -> usize {
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    match script::run_script(&mut bench, input, &mut stdout, &mut stderr) {
        Ok(summary) => {
            tracing::info!(commands = summary.commands, failures = summary.failures, "session finished");
            summary.failures
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
