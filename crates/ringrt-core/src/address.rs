//! The `Address` value type consumed at the socket facade boundary.
//!
//! DNS resolution and full BSD sockaddr parsing stay out of this crate;
//! it only consumes addresses through this value type: a family tag
//! plus the raw bytes the kernel wants. `ringrt::net` builds one of
//! these from a `std::net::SocketAddr` (which the standard library
//! already parses) rather than reimplementing address parsing.

/// Address family, mirroring `AF_INET` / `AF_INET6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Inet,
    Inet6,
}

/// A resolved socket address: family plus raw `sockaddr` bytes.
///
/// Construct via `From<std::net::SocketAddr>`; this type itself does no
/// parsing or resolution — the standard library already did that to
/// produce the `SocketAddr` in the first place.
#[derive(Debug, Clone)]
pub struct Address {
    pub family: Family,
    pub raw: Vec<u8>,
}

impl Address {
    pub fn family(&self) -> Family {
        self.family
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

impl From<std::net::SocketAddrV4> for Address {
    fn from(addr: std::net::SocketAddrV4) -> Self {
        let sin = libc::sockaddr_in {
            sin_family: libc::AF_INET as libc::sa_family_t,
            sin_port: addr.port().to_be(),
            sin_addr: libc::in_addr {
                s_addr: u32::from_ne_bytes(addr.ip().octets()),
            },
            sin_zero: [0; 8],
        };
        let raw = unsafe {
            std::slice::from_raw_parts(
                &sin as *const _ as *const u8,
                std::mem::size_of::<libc::sockaddr_in>(),
            )
        }
        .to_vec();
        Address {
            family: Family::Inet,
            raw,
        }
    }
}

impl From<std::net::SocketAddrV6> for Address {
    fn from(addr: std::net::SocketAddrV6) -> Self {
        let sin6 = libc::sockaddr_in6 {
            sin6_family: libc::AF_INET6 as libc::sa_family_t,
            sin6_port: addr.port().to_be(),
            sin6_flowinfo: addr.flowinfo(),
            sin6_addr: libc::in6_addr {
                s6_addr: addr.ip().octets(),
            },
            sin6_scope_id: addr.scope_id(),
        };
        let raw = unsafe {
            std::slice::from_raw_parts(
                &sin6 as *const _ as *const u8,
                std::mem::size_of::<libc::sockaddr_in6>(),
            )
        }
        .to_vec();
        Address {
            family: Family::Inet6,
            raw,
        }
    }
}

impl From<std::net::SocketAddr> for Address {
    fn from(addr: std::net::SocketAddr) -> Self {
        match addr {
            std::net::SocketAddr::V4(v4) => v4.into(),
            std::net::SocketAddr::V6(v6) => v6.into(),
        }
    }
}
