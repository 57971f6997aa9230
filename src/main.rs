use std::{
    fs,
    io::{self, BufRead, BufReader, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use budget_ledger::{Ledger, LedgerConfig, LedgerRequest, LedgerSnapshot, SnapshotError};
use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "budget-ledger", version, about = "Treasury budget allocation ledger")]
struct Cli {
    /// Log at debug level regardless of RUST_LOG
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply a JSON-lines request script and print one outcome per request
    Replay {
        script: PathBuf,
        /// Ledger owner; overrides the owner in --config
        #[arg(long)]
        owner: Option<String>,
        /// JSON ledger config ({"owner": ..., "treasury_policy": "repeatable" | "once"})
        #[arg(long)]
        config: Option<PathBuf>,
        /// Start from a previously written snapshot instead of an empty ledger
        #[arg(long, conflicts_with_all = ["owner", "config"])]
        resume: Option<PathBuf>,
        /// Write the final ledger snapshot here
        #[arg(long)]
        snapshot_out: Option<PathBuf>,
    },
    /// Recompute a snapshot's state root and print its totals
    VerifySnapshot { file: PathBuf },
}

#[derive(Debug, Error)]
enum HostError {
    #[error("{}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("{}:{line}: {source}", path.display())]
    Json {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },
    #[error("no ledger owner: pass --owner or --config")]
    MissingOwner,
    #[error("snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("output: {0}")]
    Output(io::Error),
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ReplayStats {
    requests: usize,
    rejected: usize,
}

fn read_text(path: &Path) -> Result<String, HostError> {
    fs::read_to_string(path).map_err(|source| HostError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load_config(owner: Option<String>, config: Option<&Path>) -> Result<LedgerConfig, HostError> {
    let from_file = match config {
        Some(path) => {
            let raw = read_text(path)?;
            Some(LedgerConfig::from_json(&raw).map_err(|source| HostError::Json {
                path: path.to_path_buf(),
                line: source.line(),
                source,
            })?)
        }
        None => None,
    };
    match (owner, from_file) {
        (Some(owner), Some(config)) => Ok(LedgerConfig { owner, ..config }),
        (Some(owner), None) => Ok(LedgerConfig::new(owner)),
        (None, Some(config)) => Ok(config),
        (None, None) => Err(HostError::MissingOwner),
    }
}

fn load_snapshot(path: &Path) -> Result<LedgerSnapshot, HostError> {
    let raw = read_text(path)?;
    serde_json::from_str(&raw).map_err(|source| HostError::Json {
        path: path.to_path_buf(),
        line: source.line(),
        source,
    })
}

fn replay_script(
    ledger: &mut Ledger,
    script: &Path,
    reader: impl BufRead,
    mut out: impl Write,
) -> Result<ReplayStats, HostError> {
    let mut stats = ReplayStats::default();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| HostError::Io {
            path: script.to_path_buf(),
            source,
        })?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let request: LedgerRequest =
            serde_json::from_str(line).map_err(|source| HostError::Json {
                path: script.to_path_buf(),
                line: idx + 1,
                source,
            })?;
        let outcome = ledger.execute(&request);
        debug!(line = idx + 1, ?outcome, "request applied");
        stats.requests += 1;
        if outcome.is_error() {
            stats.rejected += 1;
        }
        serde_json::to_writer(&mut out, &outcome).map_err(|e| HostError::Output(e.into()))?;
        writeln!(out).map_err(HostError::Output)?;
    }
    out.flush().map_err(HostError::Output)?;
    Ok(stats)
}

fn write_snapshot(ledger: &Ledger, path: &Path) -> Result<(), HostError> {
    let encoded =
        serde_json::to_vec_pretty(&ledger.snapshot()).map_err(|e| HostError::Output(e.into()))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| HostError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, encoded).map_err(|source| HostError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn replay_cmd(
    script: PathBuf,
    owner: Option<String>,
    config: Option<PathBuf>,
    resume: Option<PathBuf>,
    snapshot_out: Option<PathBuf>,
) -> Result<(), HostError> {
    let mut ledger = match resume {
        Some(path) => Ledger::restore(load_snapshot(&path)?)?,
        None => Ledger::with_config(load_config(owner, config.as_deref())?),
    };
    info!(owner = %ledger.owner(), script = %script.display(), "replaying");

    let file = fs::File::open(&script).map_err(|source| HostError::Io {
        path: script.clone(),
        source,
    })?;
    let stats = replay_script(&mut ledger, &script, BufReader::new(file), io::stdout().lock())?;
    info!(
        requests = stats.requests,
        rejected = stats.rejected,
        treasury = ledger.get_treasury_balance(),
        allocated = ledger.total_allocations(),
        "replay finished"
    );

    if let Some(path) = snapshot_out {
        write_snapshot(&ledger, &path)?;
        info!(path = %path.display(), root = %hex::encode(ledger.state_root()), "snapshot written");
    }
    Ok(())
}

fn verify_snapshot_cmd(file: PathBuf) -> Result<(), HostError> {
    let snapshot = load_snapshot(&file)?;
    snapshot.verify()?;
    println!("owner:             {}", snapshot.owner);
    println!("treasury balance:  {}", snapshot.treasury_balance);
    println!("total allocations: {}", snapshot.total_allocations);
    println!("budgets:           {}", snapshot.budgets.len());
    println!("state root:        {}", hex::encode(snapshot.state_root));
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Replay {
            script,
            owner,
            config,
            resume,
            snapshot_out,
        } => replay_cmd(script, owner, config, resume, snapshot_out),
        Command::VerifySnapshot { file } => verify_snapshot_cmd(file),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
