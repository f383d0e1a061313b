//! Quadromon Daemon (quadromond)
//!
//! Owns the hidraw transport for every attached Aquacomputer Quadro, keeps
//! the decoded sensor state, and answers queries from unprivileged clients
//! over a Unix domain socket.
//!
//! # Runtime Layout
//! - One reader thread and one decode task per device
//! - A periodic hotplug scan attaches devices plugged in later
//! - A single-threaded Tokio runtime serves the socket

mod devices;
mod server;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use qm_core::constants::paths;
use qm_core::settings::{load_settings_from, resolve_socket_path};
use qm_error::{QuadroError, Result};

use devices::{DeviceRegistry, TransportConfig};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable holding the log filter
const LOG_ENV: &str = "QUADROMON_LOG";

/// Global shutdown flag for clean termination
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

// ============================================================================
// Socket and PID File
// ============================================================================

/// Validate socket path before binding
fn validate_socket_path(path: &Path) -> Result<()> {
    if !path.is_absolute() {
        return Err(QuadroError::invalid_socket_path(path, "must be absolute"));
    }

    let text = path.to_string_lossy();
    if text.contains("..") {
        return Err(QuadroError::invalid_socket_path(path, "contains path traversal"));
    }

    let safe_dirs = ["/run/", "/var/run/", "/tmp/"];
    if !safe_dirs.iter().any(|d| text.starts_with(d)) {
        return Err(QuadroError::invalid_socket_path(
            path,
            format!("must be under {:?}", safe_dirs),
        ));
    }

    if let Some(parent) = path.parent() {
        if !parent.exists() {
            return Err(QuadroError::invalid_socket_path(
                path,
                format!("parent directory {:?} does not exist", parent),
            ));
        }
    }

    if path
        .symlink_metadata()
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
    {
        return Err(QuadroError::invalid_socket_path(path, "is a symlink"));
    }

    Ok(())
}

/// Write PID file, refusing to start if another instance is alive
fn write_pid_file(path: &Path) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    if path.exists() {
        if let Ok(content) = std::fs::read_to_string(path) {
            if let Ok(old_pid) = content.trim().parse::<i32>() {
                // SAFETY: signal 0 only checks whether the process exists.
                if unsafe { libc::kill(old_pid, 0) } == 0 {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::AddrInUse,
                        format!("Another instance is running (PID {})", old_pid),
                    ));
                }
            }
        }
        let _ = std::fs::remove_file(path);
    }

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o644)
        .open(path)?;

    writeln!(file, "{}", std::process::id())?;
    file.sync_all()?;

    debug!("PID file written: {:?}", path);
    Ok(())
}

fn cleanup(socket_path: &Path, pid_file: &Path) {
    debug!("Starting cleanup...");

    for path in [socket_path, pid_file] {
        if path.exists() {
            if let Err(e) = std::fs::remove_file(path) {
                warn!("Failed to remove {:?}: {}", path, e);
            }
        }
    }

    info!("Cleanup complete");
}

// ============================================================================
// Logging
// ============================================================================

/// Journald when available, stdout otherwise. Returns true for journald.
fn init_logging(log_level: &str) -> bool {
    use tracing_subscriber::prelude::*;

    if Path::new("/run/systemd/journal/socket").exists() {
        match tracing_journald::layer() {
            Ok(journald_layer) => {
                tracing_subscriber::registry()
                    .with(journald_layer)
                    .with(tracing_subscriber::EnvFilter::new(log_level))
                    .init();
                return true;
            }
            Err(e) => {
                eprintln!("Failed to create journald layer: {}, falling back to stdout", e);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(log_level)
        .init();
    false
}

// ============================================================================
// CLI
// ============================================================================

fn print_help() {
    eprintln!("quadromond {} - Aquacomputer Quadro telemetry daemon", VERSION);
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    quadromond [OPTIONS]");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -f, --foreground    Run in foreground (don't daemonize)");
    eprintln!("    -s, --socket PATH   Socket path");
    eprintln!(
        "    -c, --config PATH   Configuration file (default {})",
        paths::config_file().display()
    );
    eprintln!("    -v, --version       Print version");
    eprintln!("    -h, --help          Print this help");
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("    QUADROMON_LOG       Log filter (trace, debug, info, warn, error)");
    eprintln!("    QUADROMON_SOCKET    Socket path when --socket is not given");
}

fn print_version() {
    println!("quadromond {}", VERSION);
}

/// Parsed command line
struct Args {
    socket: Option<PathBuf>,
    config: PathBuf,
}

/// Parse arguments; `Ok(None)` means help or version was printed
fn parse_args(args: &[String]) -> std::result::Result<Option<Args>, String> {
    let mut parsed = Args {
        socket: None,
        config: paths::config_file(),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                return Ok(None);
            }
            "-v" | "--version" => {
                print_version();
                return Ok(None);
            }
            "-f" | "--foreground" => {
                // Foreground mode is always on (no daemonization implemented)
            }
            "-s" | "--socket" => {
                i += 1;
                let value = args.get(i).ok_or("--socket requires a path argument")?;
                parsed.socket = Some(PathBuf::from(value));
            }
            "-c" | "--config" => {
                i += 1;
                let value = args.get(i).ok_or("--config requires a path argument")?;
                parsed.config = PathBuf::from(value);
            }
            arg => return Err(format!("Unknown argument: {}", arg)),
        }
        i += 1;
    }
    Ok(Some(parsed))
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("PANIC at {}: {}", location, message);
    }));

    let argv: Vec<String> = std::env::args().collect();
    let args = match parse_args(&argv) {
        Ok(Some(args)) => args,
        Ok(None) => return Ok(()),
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    let settings = match load_settings_from(&args.config) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let log_level = std::env::var(LOG_ENV).unwrap_or_else(|_| settings.log_level.clone());
    let use_journald = init_logging(&log_level);

    info!("STARTUP: quadromond {} starting", VERSION);
    info!("STARTUP: Logging to {}", if use_journald { "systemd journal" } else { "stdout" });
    info!("STARTUP: Config: {:?}", args.config);

    let socket_path = resolve_socket_path(args.socket.as_deref(), &settings);
    if let Err(e) = validate_socket_path(&socket_path) {
        error!("{}", e);
        std::process::exit(1);
    }

    let pid_file = paths::default_pid_file();
    if let Err(e) = write_pid_file(&pid_file) {
        error!("Could not write PID file: {}", e);
        std::process::exit(1);
    }

    let cleanup_socket = socket_path.clone();
    let cleanup_pid = pid_file.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("SIGNAL: Received SIGINT/SIGTERM - initiating shutdown");
        SHUTDOWN.store(true, Ordering::SeqCst);
        cleanup(&cleanup_socket, &cleanup_pid);
        info!("SHUTDOWN: Daemon terminated gracefully");
        std::process::exit(0);
    }) {
        warn!("Failed to set signal handler: {}. Shutdown via signals may not work cleanly.", e);
    }

    info!("STARTUP: Socket path: {:?}", socket_path);
    info!("STARTUP: PID: {}", std::process::id());
    info!("STARTUP: Log level: {}", log_level);

    let registry = Arc::new(DeviceRegistry::new());
    let transport = TransportConfig::from(&settings);
    let attached = devices::scan_and_attach(&registry, &transport);
    if attached == 0 {
        warn!("No Quadro found yet; waiting for hotplug");
    } else {
        info!("STARTUP: {} device(s) attached", attached);
    }

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let hotplug_handle = tokio::spawn(devices::run_hotplug_loop(
        Arc::clone(&registry),
        transport,
        Arc::clone(&shutdown_flag),
    ));

    let result = server::run_server(&socket_path, Arc::clone(&registry)).await;

    shutdown_flag.store(true, Ordering::SeqCst);
    hotplug_handle.abort();
    cleanup(&socket_path, &pid_file);

    if let Err(e) = result {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    // Reader threads block in read(2); exit instead of joining them
    std::process::exit(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        std::iter::once("quadromond")
            .chain(args.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_args() {
        let args = parse_args(&argv(&["-f", "-s", "/tmp/q.sock", "--config", "/tmp/q.json"]))
            .unwrap()
            .unwrap();
        assert_eq!(args.socket, Some(PathBuf::from("/tmp/q.sock")));
        assert_eq!(args.config, PathBuf::from("/tmp/q.json"));

        assert!(parse_args(&argv(&["--socket"])).is_err());
        assert!(parse_args(&argv(&["--bogus"])).is_err());
    }

    #[test]
    fn test_validate_socket_path() {
        assert!(validate_socket_path(Path::new("/tmp/quadromon.sock")).is_ok());
        assert!(validate_socket_path(Path::new("quadromon.sock")).is_err());
        assert!(validate_socket_path(Path::new("/tmp/../etc/quadromon.sock")).is_err());
        assert!(validate_socket_path(Path::new("/home/user/quadromon.sock")).is_err());
    }

    #[test]
    fn test_pid_file_refuses_live_instance() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("quadromond.pid");

        write_pid_file(&path).unwrap();
        // Our own PID is alive
        let err = write_pid_file(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::AddrInUse);
    }
}
