//! Worker process lifecycle: fork a child per IVI surface, signal it on
//! teardown, and reap it from the main loop.

use nix::sys::signal::{self, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{fork, ForkResult, Pid};

use crate::protocol::Window;

/// Everything a spawned worker needs to start up.
#[derive(Debug, Clone)]
pub struct WorkerArgs {
    pub window: Window,
    pub app_id: String,
    pub tcp_port: u16,
}

/// Forks a worker for the given window/app-id/port. A failed fork is fatal
/// to the server (conservative: the original treats it the same way).
pub fn spawn(args: WorkerArgs) -> Result<Pid, nix::Error> {
    match unsafe { fork() }? {
        ForkResult::Parent { child } => Ok(child),
        ForkResult::Child => {
            run_stub(args);
            std::process::exit(0);
        }
    }
}

/// Stand-in for the real rendering worker: proves the fork/exec/signal
/// contract without depending on a host compositor. A real implementation
/// would create a window on the host compositor here and never return.
fn run_stub(args: WorkerArgs) {
    log::info!(
        "worker: started for app_id={:?} port={} (window ivi_id={})",
        args.app_id,
        args.tcp_port,
        args.window.ivi_id
    );
    loop {
        std::thread::sleep(std::time::Duration::from_secs(3600));
    }
}

/// Sends the termination signal (SIGINT-equivalent) to a worker pid. A
/// delivery failure is logged by the caller, not fatal.
pub fn signal_terminate(pid: Pid) -> Result<(), nix::Error> {
    signal::kill(pid, Signal::SIGINT)
}

/// Blocking wait for a specific pid to exit or be signalled, matching the
/// original's `wait_for_children` semantics for a client actively being
/// torn down.
pub fn reap_blocking(pid: Pid) -> Result<(), nix::Error> {
    loop {
        match waitpid(pid, None)? {
            WaitStatus::Exited(_, _) | WaitStatus::Signaled(_, _, _) => return Ok(()),
            WaitStatus::Stopped(_, _) | WaitStatus::Continued(_) => continue,
            _ => return Ok(()),
        }
    }
}

/// Non-blocking sweep for any exited child, whether or not its client was
/// already destroying it, closing the "child died without destroy" gap
/// noted in the design notes. Returns the pid if one was reaped this pass.
pub fn reap_any_nonblocking() -> Option<Pid> {
    match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
        Ok(WaitStatus::Exited(pid, _)) | Ok(WaitStatus::Signaled(pid, _, _)) => Some(pid),
        _ => None,
    }
}
