//! logaudit - Log Store Audit and Repair
//!
//! Compares a search-backed log document store against the canonical log
//! files on disk, writes per-partition diff artifacts for missing lines,
//! replays them to the ingester, and prunes duplicate documents by content
//! fingerprint.

pub mod cli;
pub mod config;
pub mod dedup;
pub mod diff;
pub mod error;
pub mod logging;
pub mod output;
pub mod reload;
pub mod signal;
pub mod store;

use std::time::Duration;

use anyhow::Context;

use crate::cli::{Cli, Commands};
use crate::config::Settings;
use crate::dedup::{dedup_partition, DedupError, DedupStats};
use crate::diff::{build_partition_map, DiffEngine, DiffWorkerPool, PoolConfig};
use crate::error::ExitCode;
use crate::output::DiffSerializer;
use crate::reload::LogsReloader;
use crate::signal::ShutdownHandler;
use crate::store::{filter_reserved, HttpStoreClient, ScanOptions, StoreClient};

/// Run the application with the given CLI arguments.
///
/// # Errors
///
/// Returns an error for failures that abort the run outright: bad
/// configuration, an unreachable store, or a fatal store error mid-pipeline.
/// Degraded-but-completed runs are reported through the exit code instead.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let settings = Settings::load(cli.config_path()?)?;
    let handler = signal::install_handler()?;

    let client = HttpStoreClient::new(&settings.store.host, settings.store.port)
        .context("failed to build store client")?;

    match cli.command {
        Commands::Check => run_check(&settings, &client, &handler),
        Commands::Dedup => run_dedup(&settings, &client, &handler),
        Commands::Reload => run_reload(&settings),
        Commands::Run => {
            let check = run_check(&settings, &client, &handler)?;
            if check == ExitCode::Interrupted {
                return Ok(check);
            }

            let reload = run_reload(&settings)?;
            let dedup = run_dedup(&settings, &client, &handler)?;
            Ok(combine(&[check, reload, dedup]))
        }
    }
}

fn scan_options(settings: &Settings) -> ScanOptions {
    ScanOptions {
        page_size: settings.audit.scan.page_size,
        lease: Duration::from_secs(settings.audit.scan.lease_secs),
        max_advances: settings.audit.scan.max_advances,
    }
}

/// Diff every partition against its source log and write the artifacts.
fn run_check(
    settings: &Settings,
    client: &dyn StoreClient,
    handler: &ShutdownHandler,
) -> anyhow::Result<ExitCode> {
    let audit = &settings.audit;
    let build = build_partition_map(&audit.logs_dir)?;
    for skipped in &build.skipped {
        log::warn!(
            "Skipped source file {}: {}",
            skipped.path.display(),
            skipped.reason
        );
    }
    if build.map.is_empty() {
        log::warn!("No source log files under {}", audit.logs_dir.display());
    }

    let serializer = DiffSerializer::new(audit.output_format, &audit.output_dir)?;
    let engine = DiffEngine::new(client, &audit.message_field, scan_options(settings))
        .with_abort_flag(handler.get_flag());
    let pool = DiffWorkerPool::new(
        PoolConfig::default()
            .with_workers(audit.workers)
            .with_abort_flag(handler.get_flag()),
    );

    let report = pool.run(&engine, &build.map);

    let mut missing_total = 0;
    for result in &report.results {
        missing_total += result.len();
        let path = serializer.write(result)?;
        log::info!(
            "Partition '{}': {} missing lines -> {}",
            result.partition,
            result.len(),
            path.display()
        );
    }

    if report.interrupted {
        return Ok(ExitCode::Interrupted);
    }
    if !report.all_succeeded() || !build.skipped.is_empty() {
        return Ok(ExitCode::PartialSuccess);
    }
    if missing_total == 0 {
        log::info!("Store matches the source logs, nothing to replay");
        return Ok(ExitCode::Clean);
    }
    log::info!("{} missing lines across all partitions", missing_total);
    Ok(ExitCode::Success)
}

/// Prune duplicate documents partition by partition.
fn run_dedup(
    settings: &Settings,
    client: &dyn StoreClient,
    handler: &ShutdownHandler,
) -> anyhow::Result<ExitCode> {
    let audit = &settings.audit;
    let partitions = filter_reserved(
        client.list_partitions().context("failed to list partitions")?,
        &audit.reserved_prefixes,
    );
    log::info!("Deduplicating {} partitions", partitions.len());

    let flag = handler.get_flag();
    let mut total = DedupStats::default();

    for partition in &partitions {
        if handler.is_shutdown_requested() {
            log::warn!("Shutdown requested, stopping before partition '{}'", partition);
            return Ok(ExitCode::Interrupted);
        }

        match dedup_partition(
            client,
            partition,
            &audit.hash_keys,
            scan_options(settings),
            Some(&flag),
        ) {
            Ok(stats) => total.merge(stats),
            Err(DedupError::Interrupted) => return Ok(ExitCode::Interrupted),
            Err(e) => return Err(e).context(format!("dedup of partition '{partition}' failed")),
        }
    }

    for partial in &total.partial_failures {
        log::warn!("Partially pruned group: {}", partial);
    }
    log::info!(
        "Dedup complete: {} groups, {} deleted, {} already absent",
        total.duplicate_groups,
        total.deleted,
        total.already_absent
    );

    if !total.is_complete() {
        return Ok(ExitCode::PartialSuccess);
    }
    if total.duplicate_groups == 0 {
        return Ok(ExitCode::Clean);
    }
    Ok(ExitCode::Success)
}

/// Replay diff artifacts to the ingester.
fn run_reload(settings: &Settings) -> anyhow::Result<ExitCode> {
    let reload = settings
        .reload
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("no [reload] section in the configuration"))?;

    let reloader = LogsReloader::new(
        reload.host.clone(),
        reload.port,
        &reload.input_dir,
        reload.input_format,
    )?;
    let stats = reloader.reload()?;

    if stats.lines == 0 {
        return Ok(ExitCode::Clean);
    }
    Ok(ExitCode::Success)
}

/// Collapse stage exit codes into one overall code.
fn combine(codes: &[ExitCode]) -> ExitCode {
    if codes.contains(&ExitCode::Interrupted) {
        return ExitCode::Interrupted;
    }
    if codes.contains(&ExitCode::GeneralError) {
        return ExitCode::GeneralError;
    }
    if codes.contains(&ExitCode::PartialSuccess) {
        return ExitCode::PartialSuccess;
    }
    if codes.iter().all(|c| *c == ExitCode::Clean) {
        return ExitCode::Clean;
    }
    ExitCode::Success
}
