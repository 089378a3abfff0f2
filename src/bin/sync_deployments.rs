use anyhow::{anyhow, Result};
use registry_warden::config::chains::{self, ChainTable};
use registry_warden::reconciler::ReconcileEngine;

#[derive(Debug)]
struct Args {
    chain_id: Option<u64>,
    deployments_dir: Option<String>,
    authority_config: Option<String>,
}

fn print_usage() {
    eprintln!(
        "usage: sync_deployments [--chain <id>] [--deployments-dir <path>] [--authority-config <path>]\n\
         env fallback: DEPLOYMENTS_DIR, AUTHORITY_CONFIG_FILE, ETH_RPC_URL_<chain_id>"
    );
}

fn parse_args() -> Result<Args> {
    let mut chain_id: Option<u64> = None;
    let mut deployments_dir: Option<String> = None;
    let mut authority_config: Option<String> = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--chain" | "-c" => {
                let raw = iter
                    .next()
                    .ok_or_else(|| anyhow!("missing value for {arg}"))?;
                chain_id = Some(
                    raw.parse::<u64>()
                        .map_err(|e| anyhow!("invalid chain id '{raw}': {e}"))?,
                );
            }
            "--deployments-dir" | "-d" => {
                deployments_dir = Some(
                    iter.next()
                        .ok_or_else(|| anyhow!("missing value for {arg}"))?,
                );
            }
            "--authority-config" => {
                authority_config = Some(
                    iter.next()
                        .ok_or_else(|| anyhow!("missing value for {arg}"))?,
                );
            }
            other => return Err(anyhow!("unknown argument '{other}'")),
        }
    }

    Ok(Args {
        chain_id,
        deployments_dir,
        authority_config,
    })
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args().inspect_err(|_| print_usage())?;
    init_tracing();

    let deployments_dir = chains::resolve_deployments_dir(args.deployments_dir.as_deref());
    let authority_path = chains::resolve_authority_config(args.authority_config.as_deref());
    let mut table = ChainTable::load(&deployments_dir)?;
    if let Some(chain_id) = args.chain_id {
        table.retain(chain_id)?;
    }

    println!(
        "[SYNC] reconciling {} chain(s), authority config {}",
        table.entries().len(),
        authority_path.display()
    );

    let summary = ReconcileEngine::new(table, authority_path).run().await?;

    for chain in &summary.chains {
        println!(
            "[SYNC] {} (chain {}): {} record(s), {}",
            chain.name,
            chain.chain_id,
            chain.records,
            if chain.changed { "updated" } else { "no changes" }
        );
    }
    println!("[SYNC] done; {} file(s) rewritten", summary.changed_count());
    Ok(())
}
