//! wireup deploys a manifest of interdependent contracts and wires
//! their addresses together, resumably.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::Table;

use cli::{Cli, Command};
use wireup_orchestrate::{
    AddressRegistry, Environment, EthRpcClient, Manifest, PhaseOutcome, RunReport,
    run_deploy_phase, run_wiring_phase,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let manifest = Manifest::load_from_file(&cli.manifest)?;
    manifest.validate()?;

    let network = cli.network.to_string();
    let env = Environment::new(
        &network,
        cli.chain_id.unwrap_or(cli.network.to_chain_id()),
        cli.rpc_url
            .as_deref()
            .unwrap_or(cli.network.default_rpc_url()),
        cli.sender,
        &cli.artifacts,
        cli.outdata
            .clone()
            .unwrap_or_else(|| format!("data-{}", network).into()),
    )?;

    if let Command::Status = cli.command {
        return status(&manifest, &env);
    }

    let redeploy = match cli.command {
        Command::Deploy { redeploy } | Command::Run { redeploy } => redeploy,
        Command::Wire | Command::Status => false,
    };

    let mut registry = AddressRegistry::load_or_create(&env, &manifest.fingerprint()?, redeploy)?;
    // A redeploy invalidates every recorded wiring success along with
    // the addresses, so the report starts over too.
    let mut report = if redeploy {
        RunReport::new(&env.network)
    } else {
        RunReport::load_or_create(&env.report_path(), &env.network)?
    };

    let chain = EthRpcClient::new(&env)?.confirmation_timeout_secs(cli.confirmation_timeout);
    chain
        .verify_chain_id(env.chain_id)
        .await
        .context("chain id verification failed")?;

    let mut outcome = PhaseOutcome::default();
    let add = |total: &mut PhaseOutcome, phase: PhaseOutcome| {
        total.succeeded += phase.succeeded;
        total.skipped += phase.skipped;
        total.failed += phase.failed;
    };

    match cli.command {
        Command::Deploy { .. } => {
            add(
                &mut outcome,
                run_deploy_phase(&manifest, &env, &chain, &mut registry, &mut report).await?,
            );
        }
        Command::Wire => {
            add(
                &mut outcome,
                run_wiring_phase(&manifest, &env, &chain, &registry, &mut report).await?,
            );
        }
        Command::Run { .. } => {
            let deploys =
                run_deploy_phase(&manifest, &env, &chain, &mut registry, &mut report).await?;
            add(&mut outcome, deploys);
            if deploys.failed == 0 {
                add(
                    &mut outcome,
                    run_wiring_phase(&manifest, &env, &chain, &registry, &mut report).await?,
                );
            } else {
                tracing::warn!(
                    failed = deploys.failed,
                    "Skipping the wiring phase; not every component deployed"
                );
            }
        }
        Command::Status => unreachable!("handled above"),
    }

    println!("{}", report);

    if outcome.failed > 0 {
        anyhow::bail!(
            "{} step(s) failed; see the run report at {}",
            outcome.failed,
            env.report_path().display()
        );
    }
    Ok(())
}

/// Render the recorded addresses and the accumulated report without
/// touching the chain.
fn status(manifest: &Manifest, env: &Environment) -> Result<()> {
    let registry = AddressRegistry::load_or_create(env, &manifest.fingerprint()?, false)?;

    let mut table = Table::new();
    table.set_header(vec!["Component", "Address"]);
    for descriptor in &manifest.components {
        match registry.get(&descriptor.name) {
            Some(address) => table.add_row(vec![descriptor.name.clone(), address.to_string()]),
            None => table.add_row(vec![descriptor.name.clone(), "(not deployed)".to_string()]),
        };
    }
    println!("{}", table);

    let report = RunReport::load_or_create(&env.report_path(), &env.network)?;
    if report.steps.is_empty() {
        println!("No runs recorded for {} yet.", env.network);
    } else {
        println!("{}", report);
    }
    Ok(())
}
