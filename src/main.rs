use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use startm::cli::{self, Command, CommandLineOptions};
use startm::{Desktop, ExecutableRegistry, LaunchOutcome, Launcher, LauncherConfig};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let options = match cli::parse_command_line() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}", e);
            print_usage();
            return ExitCode::from(2);
        }
    };
    init_tracing(options.verbose);
    debug!(event = "cli.started", command = ?options.command);

    match run(options) {
        Ok(code) => code,
        Err(e) => {
            error!(event = "cli.failed", error = %e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("startm=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("startm=info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(options: CommandLineOptions) -> Result<ExitCode, Box<dyn Error>> {
    let store = || {
        options
            .config
            .clone()
            .unwrap_or_else(ExecutableRegistry::default_path)
    };

    match &options.command {
        Command::Version => {
            print_version();
            Ok(ExitCode::SUCCESS)
        }
        Command::List => {
            let registry = ExecutableRegistry::open(store())?;
            if registry.is_empty() {
                println!("No executables registered in {}", registry.path().display());
            }
            for executable in &registry {
                let settings = &executable.settings;
                println!(
                    "[{}] {} ({}) args={:?} style={} advanced={} skip={} placement={:?}",
                    executable.id,
                    executable.display_name(),
                    executable.path.display(),
                    executable.arguments.as_deref().unwrap_or(""),
                    settings.window_style,
                    settings.advanced_handling,
                    settings.skip_amount_of_windows,
                    settings.effective_placement()
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Add(request) => {
            let mut registry = ExecutableRegistry::open(store())?;
            match registry.create(
                request.path.clone(),
                request.arguments.clone(),
                request.settings(),
            )? {
                Some(id) => println!("Added [{}] {}", id, request.path.display()),
                None => println!("{} is already registered", request.path.display()),
            }
            registry.close()?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Remove(id) => {
            let mut registry = ExecutableRegistry::open(store())?;
            let removed = registry.remove_by_id(*id);
            registry.close()?;
            if removed {
                println!("Removed [{}]", id);
                Ok(ExitCode::SUCCESS)
            } else {
                println!("No executable with id {}", id);
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Move { process, rect } => native::move_window(process, *rect),
        Command::Run => {
            let registry = ExecutableRegistry::open(store())?;
            native::start_all(registry, options.launcher_config())
        }
    }
}

#[cfg_attr(not(windows), allow(dead_code))]
fn start_all_with<D: Desktop>(
    registry: ExecutableRegistry,
    mut launcher: Launcher<D>,
) -> Result<ExitCode, Box<dyn Error>> {
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            println!("Ctrl+C received, stopping after the current executable");
            running.store(false, Ordering::SeqCst);
        }) {
            warn!(event = "cli.ctrlc_install_failed", error = %e);
        }
    }

    let outcomes = registry.perform_start_while(&mut launcher, || running.load(Ordering::SeqCst));
    let mut failed = false;
    for (id, outcome) in &outcomes {
        failed |= outcome.is_failure();
        match outcome {
            LaunchOutcome::Started { pid } => println!("[{}] started (pid {})", id, pid),
            LaunchOutcome::StartFailed { error } => println!("[{}] failed: {}", id, error),
            LaunchOutcome::ResolutionTimedOut { pid } => {
                println!("[{}] started (pid {}), no window found", id, pid)
            }
            LaunchOutcome::Placed {
                pid,
                handle,
                positioned,
            } => println!(
                "[{}] started (pid {}), window {} {}",
                id,
                pid,
                handle,
                if *positioned { "placed" } else { "styled" }
            ),
        }
    }
    info!(
        event = "cli.run_completed",
        started = outcomes.len(),
        registered = registry.len(),
        interrupted = !running.load(Ordering::SeqCst)
    );

    registry.close()?;
    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

#[cfg(windows)]
mod native {
    use super::*;
    use startm::{Rect, Win32Desktop, move_and_resize_by_process_name};

    pub fn move_window(process: &str, rect: Rect) -> Result<ExitCode, Box<dyn Error>> {
        let handle = move_and_resize_by_process_name(&Win32Desktop::new(), process, rect)?;
        println!("Moved {} ({})", process, handle);
        Ok(ExitCode::SUCCESS)
    }

    pub fn start_all(
        registry: ExecutableRegistry,
        config: LauncherConfig,
    ) -> Result<ExitCode, Box<dyn Error>> {
        start_all_with(registry, Launcher::new(Win32Desktop::new(), config))
    }
}

#[cfg(not(windows))]
mod native {
    use super::*;
    use startm::{LaunchError, Rect};

    pub fn move_window(_process: &str, _rect: Rect) -> Result<ExitCode, Box<dyn Error>> {
        Err(LaunchError::Unsupported.into())
    }

    pub fn start_all(
        _registry: ExecutableRegistry,
        _config: LauncherConfig,
    ) -> Result<ExitCode, Box<dyn Error>> {
        Err(LaunchError::Unsupported.into())
    }
}

fn print_version() {
    let exe = std::env::args().next().unwrap_or_else(|| "startm".to_string());
    let exe = std::path::Path::new(&exe)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or(exe);
    println!(
        "{} {} (built {}-{:0>2}-{:0>2})",
        exe,
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_YEAR"),
        env!("BUILD_MONTH"),
        env!("BUILD_DAY")
    );
}

fn print_usage() {
    eprintln!(
        "usage: startm [--config <file>] [--timeout <secs>] [--poll <ms>] [--verbose]
              [--list | --remove <id> | --version
               | --add <path> [--args <s>] [--style normal|hidden|minimized|maximized]
                              [--skip <n>] [--style-skipped] [--place <screen>,<x>,<y>,<w>,<h>]
               | --move <process> <x> <y> <w> <h>]"
    );
}
