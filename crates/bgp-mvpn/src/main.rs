//! mvpnd entry point.
//!
//! Builds one inetmvpn table per configured routing instance through the
//! table family registry, installs the configured routes, replicates them
//! between the default instance and the tenants, and prints a JSON summary
//! of every table.

use anyhow::{bail, Context};
use bgp_mvpn::{
    create_table, BgpAttr, BgpPath, InternAttrDb, MvpnConfig, MvpnTable, NoOpTreeManagerFactory,
    PathFlags, PathSource, PeerId, ServerContext, FAMILY_TABLE_NAME,
};
use clap::Parser;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Multicast VPN table daemon
#[derive(Parser, Debug)]
#[command(name = "mvpnd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short = 'c', long, default_value = "/etc/mvpnd/mvpnd.toml")]
    config: PathBuf,

    /// Override the number of partitions per table
    #[arg(short = 'p', long)]
    partitions: Option<usize>,
}

#[derive(Debug, Serialize)]
struct RouteSummary {
    prefix: String,
    paths: usize,
    replicated: usize,
    deleted: bool,
}

#[derive(Debug, Serialize)]
struct TableSummary {
    table: String,
    instance: String,
    partitions: usize,
    tree_manager: bool,
    routes: Vec<RouteSummary>,
}

impl TableSummary {
    fn new(table: &MvpnTable) -> Self {
        Self {
            table: table.name().to_string(),
            instance: table
                .routing_instance()
                .map(|i| i.name().to_string())
                .unwrap_or_default(),
            partitions: table.partition_count(),
            tree_manager: table.tree_manager().is_some(),
            routes: table
                .routes()
                .map(|route| RouteSummary {
                    prefix: route.prefix().to_string(),
                    paths: route.path_count(),
                    replicated: route.paths().iter().filter(|p| p.is_replicated()).count(),
                    deleted: route.is_deleted(),
                })
                .collect(),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("mvpnd: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.log_level);
    info!("mvpnd: Starting with {} partitions", config.partition_count);

    match run(&config) {
        Ok(()) => {
            info!("mvpnd: Exiting normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "mvpnd: Exiting with error");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> anyhow::Result<MvpnConfig> {
    let mut config = MvpnConfig::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(partitions) = args.partitions {
        config.partition_count = partitions;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Installs the fmt subscriber. RUST_LOG wins over the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .init();
}

fn table_name(instance: &str, is_default: bool) -> String {
    if is_default {
        FAMILY_TABLE_NAME.to_string()
    } else {
        format!("{}.{}", instance, FAMILY_TABLE_NAME)
    }
}

fn run(config: &MvpnConfig) -> anyhow::Result<()> {
    let ctx = ServerContext::new(
        Arc::new(InternAttrDb::new()),
        Arc::new(NoOpTreeManagerFactory),
        config.partition_count,
    );

    // Keyed by instance name.
    let mut tables: BTreeMap<String, MvpnTable> = BTreeMap::new();
    for instance in &config.instances {
        let name = table_name(&instance.name, instance.default);
        let Some(mut table) = create_table(&ctx, &name)?.into_inetmvpn() else {
            bail!("table {} is not an inetmvpn table", name);
        };
        table.set_routing_instance(instance.routing_instance());
        tables.insert(instance.name.clone(), table);
    }
    info!("mvpnd: Built {} tables", tables.len());

    for seed in &config.routes {
        let prefix = seed.parsed_prefix()?;
        let attr = ctx
            .attr_db()
            .locate(BgpAttr::new(seed.local_pref).with_source_rd(seed.parsed_source_rd()?));
        let path = BgpPath::new(
            seed.peer.map(PeerId),
            seed.path_id,
            PathSource::BgpXmpp,
            attr,
            PathFlags::NONE,
            0,
        );

        let table = tables
            .get_mut(&seed.instance)
            .with_context(|| format!("no table for instance {}", seed.instance))?;
        table.add_path(prefix, path);
        debug!("mvpnd: Installed {} in {}", prefix, table.name());
    }

    let instance_names: Vec<String> = tables.keys().cloned().collect();
    for seed in &config.routes {
        let prefix = seed.parsed_prefix()?;
        let community = seed.parsed_community()?;

        for dest_name in instance_names.iter().filter(|n| **n != seed.instance) {
            let Some(mut dest) = tables.remove(dest_name) else {
                continue;
            };
            let dest_table = dest.name().to_string();

            if let Some(src_route) = tables.get(&seed.instance).and_then(|t| t.find(&prefix)) {
                let src_table = &tables[&seed.instance];
                for path in src_route.paths().iter().filter(|p| !p.is_replicated()) {
                    if let Some(route) =
                        dest.replicate(&ctx, src_table, src_route, path, community.clone())
                    {
                        debug!("mvpnd: Replicated {} into {}", route, dest_table);
                    }
                }
            }

            tables.insert(dest_name.clone(), dest);
        }
    }

    let summaries: Vec<TableSummary> = tables.values().map(TableSummary::new).collect();
    println!("{}", serde_json::to_string_pretty(&summaries)?);

    for table in tables.values_mut() {
        table.shutdown();
    }
    Ok(())
}
