//! Process entry point: CLI parsing, logging init, signal plumbing, and
//! running the event loop to completion.

use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use log::{error, info};
use nix::sys::signal::{self, SigHandler, Signal};

use waltham_receiver::cli::Args;
use waltham_receiver::Server;

/// The run flag the signal handler clears on first SIGINT. Stashed in a
/// `OnceLock` since a signal handler has no other way to reach the
/// `Server`'s owned `Arc<AtomicBool>`.
static RUN_FLAG: OnceLock<Arc<std::sync::atomic::AtomicBool>> = OnceLock::new();
static SIGINT_COUNT: AtomicUsize = AtomicUsize::new(0);

extern "C" fn on_sigint(_signum: libc::c_int) {
    // Async-signal-safe: only atomic stores/loads, no allocation or logging.
    let count = SIGINT_COUNT.fetch_add(1, Ordering::SeqCst) + 1;
    if count >= 2 {
        // Second SIGINT: abort immediately.
        std::process::abort();
    }
    if let Some(flag) = RUN_FLAG.get() {
        flag.store(false, Ordering::SeqCst);
    }
}

fn install_sigint_handler(run_flag: Arc<std::sync::atomic::AtomicBool>) -> Result<(), nix::Error> {
    RUN_FLAG.set(run_flag).ok();
    unsafe {
        signal::signal(Signal::SIGINT, SigHandler::Handler(on_sigint))?;
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse_or_exit();

    let mut server = match Server::new(("0.0.0.0", args.port), args.port, args.app_id.clone()) {
        Ok(s) => s,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = install_sigint_handler(server.run_flag()) {
        error!("failed to install SIGINT handler: {e}");
        return ExitCode::from(1);
    }

    info!("waltham-receiver starting, app_id_override={:?}", args.app_id);

    match server.run() {
        Ok(()) => {
            info!("shut down cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("server loop failed: {e}");
            ExitCode::from(1)
        }
    }
}
