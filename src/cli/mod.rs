pub mod config;

use std::io::{BufRead, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::api::{KomodorClient, RcaApi};
use crate::core::cluster::{ClusterResolver, KubectlUidSource, MappingStore};
use crate::core::error::RcaError;
use crate::core::paths;
use crate::core::poller::{PollOutcome, PollSettings, Poller};
use crate::core::terminal::{print_error, print_status, print_step, print_success, print_warn};
use crate::core::trigger::{self, JobHandle};
use crate::interfaces::RenderSink;
use crate::interfaces::console::{ConsoleSink, ExitAck};
use crate::interfaces::screen::{self, ScreenExit, ScreenSink};
use crate::logging;
use config::{Args, Config, UiMode};

/// Conventional exit status after an interrupt.
const EXIT_INTERRUPTED: u8 = 130;

/// `.env` in the working directory first, then the per-user one. Neither
/// overrides variables that are already set.
fn load_env_files() {
    let _ = dotenv::from_filename(".env");
    if let Some(path) = paths::env_file_path() {
        let _ = dotenv::from_path(path);
    }
}

/// Resolves on Ctrl+C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Holds the console on "Press Enter to exit" until Enter or Ctrl+C.
async fn hold_console<W, R>(console: &mut ConsoleSink<W, R>)
where
    W: Write + Send,
    R: BufRead + Send + 'static,
{
    if console.wait_for_exit_or(interrupted()).await == ExitAck::Interrupted {
        info!("Exit prompt interrupted");
    }
}

/// Prints a fatal error and holds the terminal until the user acknowledges it,
/// so a K9s-spawned window does not vanish before it can be read.
async fn report_fatal<W, R>(console: &mut ConsoleSink<W, R>, err: &RcaError) -> ExitCode
where
    W: Write + Send,
    R: BufRead + Send + 'static,
{
    error!("{}", err);
    console.on_error("Error", err);
    hold_console(console).await;
    ExitCode::FAILURE
}

pub async fn run_main() -> Result<ExitCode> {
    load_env_files();
    let args = Args::parse();
    logging::init(
        paths::log_file_path().as_deref(),
        args.verbose && args.ui == UiMode::Console,
    );

    let mut console = ConsoleSink::stdio();

    let config = match Config::from_args(args) {
        Ok(config) => config,
        Err(err) => return Ok(report_fatal(&mut console, &err).await),
    };
    info!("Starting k9s-rca with {:?}", config);

    let client = KomodorClient::new(&config.base_url, &config.api_key);

    let uid_source = KubectlUidSource;
    let resolver = ClusterResolver::new(&client, &uid_source, MappingStore::default_location());
    let remote_cluster = match resolver.resolve(&config.cluster).await {
        Ok(name) => name,
        Err(err) => return Ok(report_fatal(&mut console, &err).await),
    };

    let request = config.job_request(&remote_cluster);
    print_step(format!(
        "Triggering RCA for {}: {} in namespace: {} on cluster: {}",
        request.resource_kind, request.resource_name, request.namespace, request.cluster_name
    ));

    let handle = match trigger::trigger(&client, &request).await {
        Ok(handle) => handle,
        Err(err) => return Ok(report_fatal(&mut console, &err).await),
    };
    print_success(format!(
        "RCA triggered successfully! Session ID: {}",
        handle.session_id
    ));

    if !config.monitor {
        print_status("Session", &handle.session_id);
        return Ok(ExitCode::SUCCESS);
    }

    let settings = PollSettings::default();
    match config.ui {
        UiMode::Console => Ok(monitor_console(&client, &mut console, &handle, settings).await),
        UiMode::Tui => monitor_screen(client, &handle, settings).await,
    }
}

fn exit_for(result: &Result<PollOutcome, RcaError>) -> ExitCode {
    match result {
        Ok(PollOutcome::Complete(_)) | Ok(PollOutcome::TimedOut { .. }) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

async fn monitor_console<W, R>(
    api: &dyn RcaApi,
    console: &mut ConsoleSink<W, R>,
    handle: &JobHandle,
    settings: PollSettings,
) -> ExitCode
where
    W: Write + Send + 'static,
    R: BufRead + Send + 'static,
{
    let result = {
        let mut poller = Poller::new(api, &mut *console, settings);
        tokio::select! {
            result = poller.run(handle) => Some(result),
            _ = interrupted() => None,
        }
    };

    let Some(result) = result else {
        warn!("Monitoring of session {} interrupted", handle.session_id);
        console.on_message(&format!(
            "\n⏹  Monitoring stopped. Session {} may still be running in Komodor.",
            handle.session_id
        ));
        return ExitCode::from(EXIT_INTERRUPTED);
    };

    if let Err(err) = &result {
        error!("{}", err);
    }
    // Ctrl+C at the prompt only skips the wait; the outcome decides the code.
    hold_console(console).await;
    exit_for(&result)
}

async fn monitor_screen(
    client: KomodorClient,
    handle: &JobHandle,
    settings: PollSettings,
) -> Result<ExitCode> {
    let (tx, rx) = mpsc::unbounded_channel();
    let task_handle = handle.clone();

    let monitor = tokio::spawn(async move {
        let mut sink = ScreenSink::new(tx);
        let result = {
            let mut poller = Poller::new(&client, &mut sink, settings);
            poller.run(&task_handle).await
        };
        sink.wait_for_exit();
        result
    });

    let exit = match screen::run_screen(&handle.session_id, rx).await {
        Ok(exit) => exit,
        Err(e) => {
            monitor.abort();
            return Err(e).context("interactive screen failed");
        }
    };

    if exit == ScreenExit::Aborted {
        monitor.abort();
        warn!("Monitoring of session {} stopped by user", handle.session_id);
        print_warn(format!(
            "Monitoring stopped. Session {} may still be running in Komodor.",
            handle.session_id
        ));
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }

    let result = monitor.await.context("monitor task panicked")?;
    if let Err(err) = &result {
        error!("{}", err);
        print_error(err);
    }
    Ok(exit_for(&result))
}
