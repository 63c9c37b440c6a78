//! The server: owns the listener, the epoll set, and the client table, and
//! runs the single-threaded readiness loop.

use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::os::fd::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::client::Client;
use crate::epoll::{Interest, PeerRole, Poller};
use crate::error::CoreError;
use crate::worker;

pub struct Server {
    listener: TcpListener,
    poller: Poller,
    next_client_id: u32,
    clients: HashMap<u32, Client>,
    run: Arc<AtomicBool>,
    tcp_port: u16,
    app_id_override: Option<String>,
}

impl Server {
    pub fn new<A: ToSocketAddrs>(addr: A, tcp_port: u16, app_id_override: Option<String>) -> Result<Self, CoreError> {
        let listener = bind_reuseaddr(addr)?;
        let poller = Poller::new()?;
        Ok(Server {
            listener,
            poller,
            next_client_id: 1,
            clients: HashMap::new(),
            run: Arc::new(AtomicBool::new(true)),
            tcp_port,
            app_id_override,
        })
    }

    /// A shared handle the signal handler can clear to request graceful
    /// shutdown.
    pub fn run_flag(&self) -> Arc<AtomicBool> {
        self.run.clone()
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn run(&mut self) -> Result<(), CoreError> {
        info!("listening on {}", self.local_addr()?);
        self.poller
            .register(self.listener.as_raw_fd(), PeerRole::Listener, Interest::READ)?;

        while self.run.load(Ordering::SeqCst) {
            self.idle_pass();
            let events = self.poller.wait()?;
            for ev in events {
                match ev.role {
                    PeerRole::Listener => {
                        if let Err(e) = self.accept_new_client() {
                            warn!("accept failed: {e}");
                        }
                    }
                    PeerRole::Client(id) => {
                        if let Err(reason) = self.handle_client_event(id, ev.events) {
                            error!("{reason}; aborting server (worker spawn failure is fatal)");
                            self.shutdown_all_clients();
                            return Err(reason);
                        }
                    }
                }
            }
        }
        self.shutdown_all_clients();
        Ok(())
    }

    /// Flush pass + worker reaper, run once per loop iteration before
    /// blocking in `epoll_wait`.
    fn idle_pass(&mut self) {
        self.flush_all_clients();
        self.reap_lost_children();
        self.reap_destroying_clients();
    }

    fn flush_all_clients(&mut self) {
        let ids: Vec<u32> = self.clients.keys().copied().collect();
        for id in ids {
            let Some(client) = self.clients.get_mut(&id) else {
                continue;
            };
            match client.flush() {
                Ok(true) => {
                    let fd = client.as_raw_fd();
                    let _ = self.poller.modify(fd, PeerRole::Client(id), Interest::READ);
                }
                Ok(false) => {
                    let fd = client.as_raw_fd();
                    let _ = self
                        .poller
                        .modify(fd, PeerRole::Client(id), Interest::READ | Interest::WRITE);
                }
                Err(e) => {
                    warn!("client {id}: flush failed fatally: {e}");
                    self.destroy_client(id);
                }
            }
        }
    }

    /// Non-blocking sweep for children that have already exited, whether or
    /// not `ivi_surface.destroy` was the one to signal them. Must clear the
    /// worker regardless of `pid_destroying`: a destroying child can exit
    /// before `reap_destroying_clients` runs its blocking wait, and if this
    /// sweep ignored it the pid would already be gone by the time that
    /// blocking wait ran, which would just get `ECHILD` and leave the
    /// client stuck destroying forever.
    fn reap_lost_children(&mut self) {
        while let Some(pid) = worker::reap_any_nonblocking() {
            let owner = self
                .clients
                .iter()
                .find(|(_, c)| c.pid == Some(pid))
                .map(|(id, _)| *id);
            let Some(id) = owner else { continue };
            let Some(client) = self.clients.get_mut(&id) else {
                continue;
            };
            if client.pid_destroying {
                debug!("client {id}: worker {pid} reaped while destroying");
            } else {
                debug!("client {id}: worker {pid} exited without destroy, reaping");
            }
            client.clear_worker();
        }
    }

    fn reap_destroying_clients(&mut self) {
        let pending: Vec<(u32, nix::unistd::Pid)> = self
            .clients
            .iter()
            .filter_map(|(id, c)| {
                if c.pid_destroying {
                    c.pid.map(|pid| (*id, pid))
                } else {
                    None
                }
            })
            .collect();
        for (id, pid) in pending {
            if let Err(e) = worker::reap_blocking(pid) {
                warn!("client {id}: waitpid on {pid} failed: {e}");
                continue;
            }
            if let Some(client) = self.clients.get_mut(&id) {
                client.clear_worker();
            }
        }
    }

    fn accept_new_client(&mut self) -> std::io::Result<()> {
        let (socket, addr) = self.listener.accept()?;
        info!("new client connection from {addr}");
        let connection = crate::connection::Connection::new(socket)?;
        let id = self.next_client_id;
        self.next_client_id += 1;

        let fd = connection.as_raw_fd();
        let client = Client::new(id, connection, self.tcp_port, self.app_id_override.clone());
        self.poller.register(fd, PeerRole::Client(id), Interest::READ)?;
        self.clients.insert(id, client);
        Ok(())
    }

    fn handle_client_event(&mut self, id: u32, events: Interest) -> Result<(), CoreError> {
        if events.contains(Interest::ERROR) || events.contains(Interest::HANGUP) {
            self.destroy_client(id);
            return Ok(());
        }
        if events.contains(Interest::WRITE) {
            if let Some(client) = self.clients.get_mut(&id) {
                match client.flush() {
                    Ok(true) => {
                        let fd = client.as_raw_fd();
                        let _ = self.poller.modify(fd, PeerRole::Client(id), Interest::READ);
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("client {id}: flush failed: {e}");
                        self.destroy_client(id);
                        return Ok(());
                    }
                }
            }
        }
        if events.contains(Interest::READ) {
            if let Some(client) = self.clients.get_mut(&id) {
                match client.read_and_dispatch() {
                    Ok(()) => {}
                    Err(crate::error::ClientError::Fatal(nix_err)) => {
                        return Err(CoreError::WorkerSpawn(nix_err));
                    }
                    Err(e) => {
                        debug!("client {id}: destroyed ({e})");
                        self.destroy_client(id);
                    }
                }
            }
        }
        Ok(())
    }

    fn destroy_client(&mut self, id: u32) {
        if let Some(client) = self.clients.remove(&id) {
            let fd = client.as_raw_fd();
            let _ = self.poller.unregister(fd);
            if let Some(pid) = client.pid {
                let _ = worker::signal_terminate(pid);
                let _ = worker::reap_blocking(pid);
            }
        }
    }

    fn shutdown_all_clients(&mut self) {
        let ids: Vec<u32> = self.clients.keys().copied().collect();
        for id in ids {
            self.destroy_client(id);
        }
    }
}

/// Binds a `SOCK_STREAM` listener with `SO_REUSEADDR` and a backlog of 1024,
/// matching `receiver_listen`'s socket setup rather than
/// `TcpListener::bind`'s (which offers no hook to set `SO_REUSEADDR`
/// before `bind`).
fn bind_reuseaddr<A: ToSocketAddrs>(addr: A) -> std::io::Result<TcpListener> {
    use std::net::SocketAddr;
    use std::os::fd::FromRawFd;

    let addr = addr
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "no socket address"))?;
    let SocketAddr::V4(v4) = addr else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "only IPv4 is supported",
        ));
    };

    unsafe {
        let fd = libc::socket(libc::AF_INET, libc::SOCK_STREAM, 0);
        if fd < 0 {
            return Err(std::io::Error::last_os_error());
        }
        let one: libc::c_int = 1;
        if libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            &one as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        ) < 0
        {
            let e = std::io::Error::last_os_error();
            libc::close(fd);
            return Err(e);
        }

        let mut sockaddr: libc::sockaddr_in = std::mem::zeroed();
        sockaddr.sin_family = libc::AF_INET as libc::sa_family_t;
        sockaddr.sin_port = v4.port().to_be();
        sockaddr.sin_addr.s_addr = u32::from_ne_bytes(v4.ip().octets());

        let rc = libc::bind(
            fd,
            &sockaddr as *const _ as *const libc::sockaddr,
            std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        );
        if rc < 0 {
            let e = std::io::Error::last_os_error();
            libc::close(fd);
            return Err(e);
        }

        if libc::listen(fd, 1024) < 0 {
            let e = std::io::Error::last_os_error();
            libc::close(fd);
            return Err(e);
        }

        let listener = TcpListener::from_raw_fd(fd);
        listener.set_nonblocking(true)?;
        Ok(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{IviSurface, Object, Surface, Window};
    use std::net::{TcpListener as StdTcpListener, TcpStream};
    use std::time::Duration;

    #[test]
    fn binds_and_reports_local_addr() {
        let server = Server::new("127.0.0.1:0", 0, None).unwrap();
        assert!(server.local_addr().unwrap().port() > 0);
    }

    /// Reproduces the "lost child" gap called out in SPEC_FULL.md §4.5/§9:
    /// a worker exits on its own, with no `ivi_surface.destroy` ever sent.
    /// `reap_lost_children` must clear the pid *and* drop the now-stale
    /// `ivi_surface` object, so that a later destroy on the same id (or a
    /// signal meant for it) can never reach a subsequently spawned worker.
    #[test]
    fn reap_lost_children_clears_pid_and_drops_the_stale_ivi_surface() {
        let mut server = Server::new("127.0.0.1:0", 0, None).unwrap();

        let child = match unsafe { nix::unistd::fork() }.expect("fork") {
            nix::unistd::ForkResult::Child => std::process::exit(0),
            nix::unistd::ForkResult::Parent { child } => child,
        };

        let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let _keep_alive = TcpStream::connect(addr).unwrap();
        let (sock, _) = listener.accept().unwrap();
        let mut client = Client::new(1, crate::connection::Connection::new(sock).unwrap(), 0, None);
        client.pid = Some(child);
        client.objects.insert(
            10,
            Object::Surface(Surface {
                ivi_id: 11,
                frame_callback: None,
                window: Window {
                    ivi_id: 11,
                    ready: false,
                    seat: None,
                    surface_id: 10,
                },
            }),
        );
        client.objects.insert(
            11,
            Object::IviSurface(IviSurface {
                surface_id: 10,
                app_id_obj: 4,
            }),
        );
        server.clients.insert(1, client);

        // The forked child exits essentially immediately, but scheduling
        // means it may not be reapable on the very first non-blocking
        // sweep; retry instead of sleeping a fixed, possibly-too-short
        // amount.
        for _ in 0..100 {
            server.reap_lost_children();
            if server.clients.get(&1).unwrap().pid.is_none() {
                break;
            }
            std::thread::sleep(Duration::from_millis(20));
        }

        let client = server.clients.get(&1).expect("client still live");
        assert!(client.pid.is_none(), "lost child must be reaped");
        assert!(!client.pid_destroying);
        assert!(
            client.objects.get(&11).is_none(),
            "stale ivi_surface object must be dropped"
        );
        match client.objects.get(&10) {
            Some(Object::Surface(s)) => assert_eq!(s.ivi_id, 0),
            _ => panic!("surface missing"),
        }
    }
}
