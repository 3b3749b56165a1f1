//! Hostname, FQDN and local address enumeration.

use crate::sentinel;
use std::ffi::{CStr, CString};
use std::fmt;
use std::net::{IpAddr, Ipv6Addr, SocketAddrV4, SocketAddrV6, ToSocketAddrs};

/// Separates hostname, FQDN and each address entry.
pub const HOST_SEPARATOR: &str = "//";
/// Separates the parts of one address entry.
pub const IP_PART_SEPARATOR: &str = "%%";

const NI_MAXHOST: usize = 1025;

/// One local address: `IPv4%%eth0%%10.0.0.2`, or `IPv4%%10.0.0.2` when
/// the interface is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpEntry {
    pub interface: Option<String>,
    pub addr: IpAddr,
    /// IPv6 zone, rendered as `%iface` after link-local addresses
    pub scope: Option<String>,
}

impl IpEntry {
    fn version(&self) -> &'static str {
        match self.addr {
            IpAddr::V4(_) => "IPv4",
            IpAddr::V6(_) => "IPv6",
        }
    }
}

impl fmt::Display for IpEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.version())?;
        f.write_str(IP_PART_SEPARATOR)?;
        if let Some(iface) = &self.interface {
            f.write_str(iface)?;
            f.write_str(IP_PART_SEPARATOR)?;
        }
        write!(f, "{}", self.addr)?;
        if let Some(scope) = &self.scope {
            write!(f, "%{}", scope)?;
        }
        Ok(())
    }
}

/// `hostname//FQDN//addr//addr...`
#[derive(Debug, Clone)]
pub struct HostInfo {
    pub hostname: String,
    pub fqdn: String,
    /// `None` when neither interface enumeration nor DNS produced a list
    pub addresses: Option<Vec<IpEntry>>,
}

impl HostInfo {
    pub fn collect() -> Self {
        let hostname = match nix::unistd::gethostname() {
            Ok(name) => name.to_string_lossy().into_owned(),
            Err(_) => {
                return Self {
                    hostname: sentinel::HOSTNAME_ERROR.to_string(),
                    fqdn: sentinel::FQHN_ERROR.to_string(),
                    addresses: None,
                }
            }
        };

        let addresses = interface_addresses().or_else(|| resolved_addresses(&hostname));

        Self {
            fqdn: fqdn(&hostname),
            addresses,
            hostname,
        }
    }
}

impl fmt::Display for HostInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}{}", self.hostname, HOST_SEPARATOR, self.fqdn, HOST_SEPARATOR)?;
        match &self.addresses {
            Some(entries) => {
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(HOST_SEPARATOR)?;
                    }
                    write!(f, "{}", entry)?;
                }
                Ok(())
            }
            None => f.write_str(sentinel::IP_ADDRESS_ERROR),
        }
    }
}

/// Reverse-resolve the first address of `hostname` that has a name.
pub fn fqdn(hostname: &str) -> String {
    let Ok(c_host) = CString::new(hostname) else {
        return sentinel::FQHN_ERROR.to_string();
    };

    // SAFETY: zeroed addrinfo is a valid "no hints" value.
    let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
    hints.ai_family = libc::AF_UNSPEC;
    hints.ai_socktype = libc::SOCK_STREAM;

    let mut res: *mut libc::addrinfo = std::ptr::null_mut();
    // SAFETY: c_host and hints outlive the call; res is freed below.
    let rc = unsafe { libc::getaddrinfo(c_host.as_ptr(), std::ptr::null(), &hints, &mut res) };
    if rc != 0 {
        tracing::trace!(component = "CONTEXT", rc = rc, "getaddrinfo failed");
        return sentinel::FQHN_ERROR.to_string();
    }

    let mut found = None;
    let mut cursor = res;
    while !cursor.is_null() {
        // SAFETY: cursor walks the list getaddrinfo returned.
        let info = unsafe { &*cursor };
        let mut buf = [0 as libc::c_char; NI_MAXHOST];
        // SAFETY: ai_addr/ai_addrlen describe a valid sockaddr; buf is writable.
        let rc = unsafe {
            libc::getnameinfo(
                info.ai_addr,
                info.ai_addrlen,
                buf.as_mut_ptr(),
                buf.len() as libc::socklen_t,
                std::ptr::null_mut(),
                0,
                libc::NI_NAMEREQD,
            )
        };
        if rc == 0 {
            // SAFETY: getnameinfo NUL-terminates on success.
            let name = unsafe { CStr::from_ptr(buf.as_ptr()) };
            found = Some(name.to_string_lossy().into_owned());
            break;
        }
        cursor = info.ai_next;
    }

    // SAFETY: res came from a successful getaddrinfo.
    unsafe { libc::freeaddrinfo(res) };

    found.unwrap_or_else(|| sentinel::FQHN_NOT_RESOLVED_ERROR.to_string())
}

/// Addresses of every local interface, loopback included.
pub fn interface_addresses() -> Option<Vec<IpEntry>> {
    let addrs = match nix::ifaddrs::getifaddrs() {
        Ok(addrs) => addrs,
        Err(e) => {
            tracing::trace!(component = "CONTEXT", error = %e, "getifaddrs failed");
            return None;
        }
    };

    let mut entries = Vec::new();
    for ifa in addrs {
        let Some(storage) = ifa.address else {
            continue;
        };
        if let Some(sin) = storage.as_sockaddr_in() {
            let v4 = SocketAddrV4::from(*sin);
            entries.push(IpEntry {
                interface: Some(ifa.interface_name),
                addr: IpAddr::V4(*v4.ip()),
                scope: None,
            });
        } else if let Some(sin6) = storage.as_sockaddr_in6() {
            let v6 = SocketAddrV6::from(*sin6);
            let scope = (is_link_local(v6.ip()) && v6.scope_id() != 0)
                .then(|| ifa.interface_name.clone());
            entries.push(IpEntry {
                interface: Some(ifa.interface_name),
                addr: IpAddr::V6(*v6.ip()),
                scope,
            });
        }
    }
    Some(entries)
}

/// DNS fallback used only when interface enumeration is unavailable.
pub fn resolved_addresses(hostname: &str) -> Option<Vec<IpEntry>> {
    let addrs = (hostname, 0).to_socket_addrs().ok()?;
    Some(
        addrs
            .map(|sa| IpEntry {
                interface: None,
                addr: sa.ip(),
                scope: None,
            })
            .collect(),
    )
}

fn is_link_local(addr: &Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xffc0) == 0xfe80
}
