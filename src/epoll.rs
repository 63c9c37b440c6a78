//! Thin epoll wrapper used by the event-loop driver.
//!
//! Built directly on `libc`'s `epoll_event`/`epoll_create1`/`epoll_ctl`/
//! `epoll_wait` bindings rather than a hand-declared `#[repr(C)]` struct,
//! since the kernel's `epoll_event` layout is not guaranteed to match a
//! manually written one on every target.

use std::io;
use std::os::fd::{AsRawFd, RawFd};

/// Identifies which registered fd a readiness event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerRole {
    Listener,
    Client(u32),
}

impl From<PeerRole> for u64 {
    fn from(role: PeerRole) -> u64 {
        match role {
            PeerRole::Listener => 0,
            PeerRole::Client(id) => (1u64 << 32) | id as u64,
        }
    }
}

impl From<u64> for PeerRole {
    fn from(tag: u64) -> PeerRole {
        if tag == 0 {
            PeerRole::Listener
        } else {
            PeerRole::Client((tag & 0xffff_ffff) as u32)
        }
    }
}

/// Readiness/interest bitmask, a thin newtype over the raw `libc::EPOLL*`
/// flags this crate actually dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Interest(u32);

impl Interest {
    pub const READ: Interest = Interest(libc::EPOLLIN as u32);
    pub const WRITE: Interest = Interest(libc::EPOLLOUT as u32);
    pub const ERROR: Interest = Interest(libc::EPOLLERR as u32);
    pub const HANGUP: Interest = Interest(libc::EPOLLHUP as u32);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn from_bits(bits: u32) -> Self {
        Interest(bits)
    }

    pub fn contains(self, other: Interest) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: Interest) -> Interest {
        Interest(self.0 | other.0)
    }
}

impl std::ops::BitOr for Interest {
    type Output = Interest;
    fn bitor(self, rhs: Interest) -> Interest {
        self.union(rhs)
    }
}

/// One readiness notification handed back from a `wait` call.
#[derive(Debug, Clone, Copy)]
pub struct ReadyEvent {
    pub role: PeerRole,
    pub events: Interest,
}

pub struct Poller {
    epfd: RawFd,
}

impl Poller {
    pub fn new() -> io::Result<Self> {
        let epfd = unsafe { libc::epoll_create1(0) };
        if epfd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Poller { epfd })
    }

    pub fn register(&self, fd: RawFd, role: PeerRole, interest: Interest) -> io::Result<()> {
        self.ctl(libc::EPOLL_CTL_ADD, fd, role, interest)
    }

    pub fn modify(&self, fd: RawFd, role: PeerRole, interest: Interest) -> io::Result<()> {
        self.ctl(libc::EPOLL_CTL_MOD, fd, role, interest)
    }

    pub fn unregister(&self, fd: RawFd) -> io::Result<()> {
        let mut ev: libc::epoll_event = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::epoll_ctl(self.epfd, libc::EPOLL_CTL_DEL, fd, &mut ev) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn ctl(&self, op: i32, fd: RawFd, role: PeerRole, interest: Interest) -> io::Result<()> {
        let mut ev = libc::epoll_event {
            events: interest.bits(),
            u64: role.into(),
        };
        let rc = unsafe { libc::epoll_ctl(self.epfd, op, fd, &mut ev) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Blocks with an infinite timeout, matching the event-loop driver's
    /// contract, until at least one fd is ready. Returns the collected
    /// readiness events as an owned `Vec` so dispatch is free to mutate the
    /// watch set (register/unregister) while iterating them.
    pub fn wait(&self) -> io::Result<Vec<ReadyEvent>> {
        let mut raw: [libc::epoll_event; 32] = unsafe { std::mem::zeroed() };
        let n = unsafe { libc::epoll_wait(self.epfd, raw.as_mut_ptr(), raw.len() as i32, -1) };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(Vec::new());
            }
            return Err(err);
        }
        let mut out = Vec::with_capacity(n as usize);
        for ev in &raw[..n as usize] {
            out.push(ReadyEvent {
                role: PeerRole::from(ev.u64),
                events: Interest::from_bits(ev.events),
            });
        }
        Ok(out)
    }
}

impl AsRawFd for Poller {
    fn as_raw_fd(&self) -> RawFd {
        self.epfd
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.epfd);
        }
    }
}
