use chronotidy::cli::{Cli, run};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref());

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_cancel = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        handler_cancel.store(true, Ordering::SeqCst);
    }) {
        eprintln!("Warning: could not install Ctrl-C handler: {}", e);
    }

    match run(&cli, cancel) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Installs the tracing subscriber: append-only file sink when requested,
/// stderr otherwise. `RUST_LOG` overrides the default level.
fn init_tracing(log_file: Option<&Path>) {
    match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "chronotidy.log".to_string());
            let appender =
                tracing_appender::rolling::never(dir.unwrap_or(Path::new(".")), name);
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                )
                .with_writer(appender)
                .with_ansi(false)
                .init();
        }
        None => {
            // Console output is the reporter's job; keep stderr to warnings.
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
                )
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
