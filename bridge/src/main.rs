//! Job Bridge - Entry Point
//!
//! Receives build triggers from CI and relays them to a remote Jenkins server.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use jobbridge::app::diagnostic::run_diagnostic;
use jobbridge::app::run::run;
use jobbridge::app::settings::Settings;
use jobbridge::logs::init_logging;
use jobbridge::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("Unable to render version info: {e}"),
        }
        return ExitCode::SUCCESS;
    }

    // Gather settings
    let settings_file = cli_args.get("settings").map(PathBuf::from);
    let settings = match Settings::load(settings_file.as_deref(), &cli_args).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to load settings: {e}");
            return ExitCode::FAILURE;
        }
    };
    let options = match settings.into_options() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Invalid settings: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Run diagnostics
    if cli_args.contains_key("diagnostic") || cli_args.contains_key("diag") {
        return match run_diagnostic(&options).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Diagnostic failed: {e}");
                ExitCode::FAILURE
            }
        };
    }

    // Initialize logging, the guard flushes file output on drop
    let _log_guard = match init_logging(options.log.clone()) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    info!("Running job bridge with options: {:?}", options);
    match run(options, await_shutdown_signal()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Failed to run the job bridge: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                _ => {
                    error!("Unable to install signal handlers, falling back to Ctrl+C");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
        }
        info!("Ctrl+C received, shutting down...");
    }
}
