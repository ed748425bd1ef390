//! TCP listener/stream facade.
//!
//! Grounded on `cmd/ksvc-echo`'s setup/accept/recv/send shape, but the
//! raw syscall plumbing (listener setup, `accept4`) is ordinary
//! synchronous `libc` calls — bind/listen setup stays out of the async
//! core entirely, left as thin wrappers producing file descriptors for a
//! facade like this one to own.

use crate::io;
use ringrt_core::error::{RingError, Result};

use std::net::SocketAddr;
use std::os::unix::io::{FromRawFd, RawFd};

fn check(ret: i32) -> Result<i32> {
    if ret < 0 {
        Err(RingError::Os(unsafe { *libc::__errno_location() }))
    } else {
        Ok(ret)
    }
}

/// A bound, listening TCP socket.
pub struct TcpListener {
    fd: RawFd,
}

impl TcpListener {
    /// Bind and listen synchronously (setup stays out of the async core)
    /// and return a listener ready for async accepts.
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let address: ringrt_core::address::Address = addr.into();
        let family = match address.family() {
            ringrt_core::address::Family::Inet => libc::AF_INET,
            ringrt_core::address::Family::Inet6 => libc::AF_INET6,
        };
        unsafe {
            let fd = libc::socket(family, libc::SOCK_STREAM | libc::SOCK_CLOEXEC, 0);
            check(fd)?;

            let opt: i32 = 1;
            libc::setsockopt(
                fd,
                libc::SOL_SOCKET,
                libc::SO_REUSEADDR,
                &opt as *const _ as *const libc::c_void,
                std::mem::size_of::<i32>() as u32,
            );

            let bind_ret = libc::bind(
                fd,
                address.as_bytes().as_ptr() as *const libc::sockaddr,
                address.as_bytes().len() as u32,
            );
            if let Err(e) = check(bind_ret) {
                libc::close(fd);
                return Err(e);
            }

            let listen_ret = libc::listen(fd, 1024);
            if let Err(e) = check(listen_ret) {
                libc::close(fd);
                return Err(e);
            }

            Ok(Self { fd })
        }
    }

    pub fn as_raw_fd(&self) -> RawFd {
        self.fd
    }

    /// The address actually bound, useful when `bind` was called with
    /// port `0` and the kernel picked one.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
        let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
        let ret = unsafe {
            libc::getsockname(self.fd, &mut storage as *mut _ as *mut libc::sockaddr, &mut len)
        };
        check(ret)?;
        sockaddr_storage_to_std(&storage)
    }

    /// Accept one connection asynchronously.
    pub async fn accept(&self) -> Result<TcpStream> {
        let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
        let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
        let ret = io::accept(self.fd, &mut storage, &mut len).await;
        check(ret).map(|fd| TcpStream { fd })
    }
}

impl Drop for TcpListener {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

/// A connected TCP socket, read and written through the ring.
pub struct TcpStream {
    fd: RawFd,
}

impl TcpStream {
    /// Connect asynchronously to `addr`.
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let address: ringrt_core::address::Address = addr.into();
        let family = match address.family() {
            ringrt_core::address::Family::Inet => libc::AF_INET,
            ringrt_core::address::Family::Inet6 => libc::AF_INET6,
        };
        let fd = unsafe { libc::socket(family, libc::SOCK_STREAM | libc::SOCK_CLOEXEC, 0) };
        check(fd)?;

        let sockaddr = address.as_bytes().as_ptr() as *const libc::sockaddr;
        let addr_len = address.as_bytes().len() as libc::socklen_t;
        // Safety: `sockaddr`/`addr_len` must outlive the `.await` below —
        // they borrow from `address`, which this function keeps alive for
        // its whole body.
        let ret = io::connect(fd, unsafe { &*sockaddr }, addr_len).await;
        if let Err(e) = check(ret) {
            unsafe {
                libc::close(fd);
            }
            return Err(e);
        }
        Ok(Self { fd })
    }

    pub fn as_raw_fd(&self) -> RawFd {
        self.fd
    }

    pub async fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        let ret = io::recv(self.fd, buf, 0).await;
        check(ret).map(|n| n as usize)
    }

    pub async fn send(&self, buf: &[u8]) -> Result<usize> {
        let ret = io::send(self.fd, buf, 0).await;
        check(ret).map(|n| n as usize)
    }
}

impl Drop for TcpStream {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

impl FromRawFd for TcpStream {
    /// Take ownership of an already-connected socket fd — used to hand an
    /// accepted connection off to a different context's worker task.
    /// Safety: `fd` must be a valid, open socket fd this process
    /// exclusively owns from this point on.
    unsafe fn from_raw_fd(fd: RawFd) -> Self {
        Self { fd }
    }
}

fn sockaddr_storage_to_std(storage: &libc::sockaddr_storage) -> Result<SocketAddr> {
    match storage.ss_family as i32 {
        libc::AF_INET => {
            let sin = unsafe { &*(storage as *const _ as *const libc::sockaddr_in) };
            let ip = std::net::Ipv4Addr::from(u32::from_ne_bytes(sin.sin_addr.s_addr.to_ne_bytes()));
            let port = u16::from_be(sin.sin_port);
            Ok(SocketAddr::new(ip.into(), port))
        }
        libc::AF_INET6 => {
            let sin6 = unsafe { &*(storage as *const _ as *const libc::sockaddr_in6) };
            let ip = std::net::Ipv6Addr::from(sin6.sin6_addr.s6_addr);
            let port = u16::from_be(sin6.sin6_port);
            Ok(SocketAddr::new(ip.into(), port))
        }
        _ => Err(RingError::Os(libc::EAFNOSUPPORT)),
    }
}
