//! Per-connection client session: owns the Connection and every protocol
//! object bound on it.

use std::collections::HashMap;
use std::os::fd::RawFd;

use nix::unistd::Pid;

use crate::connection::Connection;
use crate::error::ClientError;
use crate::protocol::{self, Display, Object, Window};
use crate::wire::Message;
use crate::worker::{self, WorkerArgs};

/// The implicit display object is always wire id 1, matching the original's
/// convention of binding it eagerly at `client_create`.
pub const DISPLAY_ID: u32 = 1;

pub struct Client {
    pub id: u32,
    connection: Connection,
    pub objects: HashMap<u32, Object>,
    /// "Latest seat" as an explicit pointer, not a linked-list scan.
    pub latest_seat: Option<u32>,
    pub pid: Option<Pid>,
    pub pid_destroying: bool,
    tcp_port: u16,
    pub app_id_override: Option<String>,
}

impl Client {
    pub fn new(id: u32, connection: Connection, tcp_port: u16, app_id_override: Option<String>) -> Self {
        let mut objects = HashMap::new();
        objects.insert(DISPLAY_ID, Object::Display(Display));
        Client {
            id,
            connection,
            objects,
            latest_seat: None,
            pid: None,
            pid_destroying: false,
            tcp_port,
            app_id_override,
        }
    }

    pub fn as_raw_fd(&self) -> RawFd {
        use std::os::fd::AsRawFd;
        self.connection.as_raw_fd()
    }

    pub fn has_pending_writes(&self) -> bool {
        self.connection.has_pending_writes()
    }

    pub fn queue_event(&mut self, msg: Message) {
        self.connection.queue_event(&msg);
    }

    pub fn release_object(&mut self, id: u32) {
        self.objects.remove(&id);
    }

    pub fn bind_registry(&mut self, registry_id: u32) {
        self.objects
            .insert(registry_id, Object::Registry(protocol::Registry::default()));
        protocol::announce_globals(self, registry_id);
    }

    /// Forwards surface state to the worker. The worker's own rendering
    /// loop lives out-of-process; this records the causal event for
    /// observability and for the stub worker's test harness to assert
    /// against.
    pub fn notify_worker(&mut self, surface_id: u32, what: &str) {
        log::debug!("client {}: forwarding '{what}' for surface {surface_id} to worker", self.id);
    }

    pub fn spawn_worker(&mut self, window: &Window, app_id: &str) -> Result<Pid, nix::Error> {
        worker::spawn(WorkerArgs {
            window: window.clone(),
            app_id: app_id.to_string(),
            tcp_port: self.tcp_port,
        })
    }

    pub fn signal_worker(&mut self) -> Result<(), nix::Error> {
        match self.pid {
            Some(pid) => worker::signal_terminate(pid),
            None => Ok(()),
        }
    }

    /// Reads whatever is available non-blocking and dispatches every
    /// complete message found. Protocol-level decode errors are logged and
    /// non-fatal; anything from `on read` is the caller's job to interpret.
    pub fn read_and_dispatch(&mut self) -> Result<(), ClientError> {
        loop {
            match self.connection.read_more() {
                Ok(0) => return Err(ClientError::PeerShutdown),
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(ClientError::Io(e)),
            }
        }
        let objects = &self.objects;
        let sig_of = |object_id: u32, opcode: u16| {
            objects.get(&object_id).and_then(|o| protocol::signature_for(o, opcode))
        };
        let mut ready = Vec::new();
        let decode_result = self.connection.dispatch_ready(sig_of, |msg| ready.push(msg));
        if let Err(e) = decode_result {
            log::warn!("client {}: malformed message ignored: {e}", self.id);
        }
        for msg in ready {
            if let Err(e) = protocol::dispatch(self, msg) {
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> std::io::Result<bool> {
        self.connection.flush()
    }

    /// Clears worker bookkeeping once the reaper collects the pid, keeping
    /// the client itself live so the peer can spawn another surface later.
    ///
    /// Also drops any `ivi_surface` object bound to a surface whose ivi-id
    /// is being reset: a worker that exits without a matching
    /// `ivi_surface.destroy` (§4.5/§9's "lost child" gap) would otherwise
    /// leave that object alive, so a later `ivi_surface.destroy` on the
    /// stale id would still find it present and signal whatever pid a
    /// subsequently spawned worker now occupies.
    pub fn clear_worker(&mut self) {
        self.pid = None;
        self.pid_destroying = false;
        let mut cleared_surfaces = Vec::new();
        for (id, obj) in self.objects.iter_mut() {
            if let Object::Surface(s) = obj {
                if s.ivi_id != 0 {
                    s.ivi_id = 0;
                    cleared_surfaces.push(*id);
                }
            }
        }
        self.objects.retain(|_, obj| {
            !matches!(obj, Object::IviSurface(ivi) if cleared_surfaces.contains(&ivi.surface_id))
        });
    }
}
