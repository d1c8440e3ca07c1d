//! Environment probes used during validation.
//!
//! Each probe is a function value so tests can swap in a fake network
//! topology, hostname or resource ceiling without touching the host.

use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

/// OS resources whose ceilings can be queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Open file descriptors (`RLIMIT_NOFILE`).
    OpenFiles,
}

pub type HostnameFn = Arc<dyn Fn() -> io::Result<String> + Send + Sync>;
pub type AddrsFn = Arc<dyn Fn() -> io::Result<Vec<IpAddr>> + Send + Sync>;
pub type ResourceLimitFn = Arc<dyn Fn(ResourceKind) -> io::Result<u64> + Send + Sync>;

/// Injectable environment lookups.
#[derive(Clone)]
pub struct Probes {
    hostname: HostnameFn,
    private_ipv4: AddrsFn,
    public_ipv6: AddrsFn,
    resource_limit: ResourceLimitFn,
}

impl Probes {
    /// Probes backed by the real host.
    pub fn system() -> Self {
        Self {
            hostname: Arc::new(system::hostname),
            private_ipv4: Arc::new(system::private_ipv4),
            public_ipv6: Arc::new(system::public_ipv6),
            resource_limit: Arc::new(system::resource_limit),
        }
    }

    pub fn with_hostname(
        mut self,
        f: impl Fn() -> io::Result<String> + Send + Sync + 'static,
    ) -> Self {
        self.hostname = Arc::new(f);
        self
    }

    pub fn with_private_ipv4(
        mut self,
        f: impl Fn() -> io::Result<Vec<IpAddr>> + Send + Sync + 'static,
    ) -> Self {
        self.private_ipv4 = Arc::new(f);
        self
    }

    pub fn with_public_ipv6(
        mut self,
        f: impl Fn() -> io::Result<Vec<IpAddr>> + Send + Sync + 'static,
    ) -> Self {
        self.public_ipv6 = Arc::new(f);
        self
    }

    pub fn with_resource_limit(
        mut self,
        f: impl Fn(ResourceKind) -> io::Result<u64> + Send + Sync + 'static,
    ) -> Self {
        self.resource_limit = Arc::new(f);
        self
    }

    pub fn hostname(&self) -> io::Result<String> {
        (self.hostname)()
    }

    pub fn private_ipv4(&self) -> io::Result<Vec<IpAddr>> {
        (self.private_ipv4)()
    }

    pub fn public_ipv6(&self) -> io::Result<Vec<IpAddr>> {
        (self.public_ipv6)()
    }

    pub fn resource_limit(&self, kind: ResourceKind) -> io::Result<u64> {
        (self.resource_limit)(kind)
    }
}

impl Default for Probes {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for Probes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Probes").finish_non_exhaustive()
    }
}

/// RFC 1918 and shared address space (100.64.0.0/10), excluding loopback.
pub fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    let octets = ip.octets();
    let shared = octets[0] == 100 && (octets[1] & 0xc0) == 64;
    !ip.is_loopback() && (ip.is_private() || shared)
}

/// Global unicast (2000::/3), excluding the documentation prefix.
pub fn is_public_ipv6(ip: &Ipv6Addr) -> bool {
    let segments = ip.segments();
    let global_unicast = (segments[0] & 0xe000) == 0x2000;
    let documentation = segments[0] == 0x2001 && segments[1] == 0x0db8;
    global_unicast && !documentation
}

#[cfg_attr(not(unix), allow(dead_code))]
fn dedup(addrs: impl IntoIterator<Item = IpAddr>) -> Vec<IpAddr> {
    let mut out = Vec::new();
    for addr in addrs {
        if !out.contains(&addr) {
            out.push(addr);
        }
    }
    out
}

#[cfg(unix)]
mod system {
    use super::{ResourceKind, dedup, is_private_ipv4, is_public_ipv6};
    use nix::ifaddrs::getifaddrs;
    use nix::sys::resource::{Resource, getrlimit};
    use std::io;
    use std::net::{IpAddr, SocketAddrV4, SocketAddrV6};
    use tracing::debug;

    pub fn hostname() -> io::Result<String> {
        let name = nix::unistd::gethostname().map_err(io::Error::from)?;
        name.into_string()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "hostname is not valid UTF-8"))
    }

    fn interface_addrs() -> io::Result<Vec<IpAddr>> {
        let mut addrs = Vec::new();
        for ifaddr in getifaddrs().map_err(io::Error::from)? {
            let Some(storage) = ifaddr.address else {
                continue;
            };
            if let Some(sin) = storage.as_sockaddr_in() {
                addrs.push(IpAddr::V4(*SocketAddrV4::from(*sin).ip()));
            } else if let Some(sin6) = storage.as_sockaddr_in6() {
                addrs.push(IpAddr::V6(*SocketAddrV6::from(*sin6).ip()));
            }
        }
        debug!("Found {} interface addresses", addrs.len());
        Ok(addrs)
    }

    pub fn private_ipv4() -> io::Result<Vec<IpAddr>> {
        let addrs = interface_addrs()?
            .into_iter()
            .filter(|ip| matches!(ip, IpAddr::V4(v4) if is_private_ipv4(v4)));
        Ok(dedup(addrs))
    }

    pub fn public_ipv6() -> io::Result<Vec<IpAddr>> {
        let addrs = interface_addrs()?
            .into_iter()
            .filter(|ip| matches!(ip, IpAddr::V6(v6) if is_public_ipv6(v6)));
        Ok(dedup(addrs))
    }

    pub fn resource_limit(kind: ResourceKind) -> io::Result<u64> {
        match kind {
            ResourceKind::OpenFiles => {
                let (soft, _hard) = getrlimit(Resource::RLIMIT_NOFILE).map_err(io::Error::from)?;
                Ok(u64::from(soft))
            }
        }
    }
}

#[cfg(not(unix))]
mod system {
    use super::ResourceKind;
    use std::io;
    use std::net::IpAddr;

    fn unsupported<T>() -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "environment probe not supported on this platform",
        ))
    }

    pub fn hostname() -> io::Result<String> {
        unsupported()
    }

    pub fn private_ipv4() -> io::Result<Vec<IpAddr>> {
        unsupported()
    }

    pub fn public_ipv6() -> io::Result<Vec<IpAddr>> {
        unsupported()
    }

    pub fn resource_limit(_kind: ResourceKind) -> io::Result<u64> {
        unsupported()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_ipv4_ranges() {
        for ip in ["10.0.0.1", "172.16.4.2", "192.168.1.10", "100.64.0.1"] {
            assert!(is_private_ipv4(&ip.parse().unwrap()), "{}", ip);
        }
        for ip in ["127.0.0.1", "8.8.8.8", "100.128.0.1", "169.254.1.1"] {
            assert!(!is_private_ipv4(&ip.parse().unwrap()), "{}", ip);
        }
    }

    #[test]
    fn test_public_ipv6_ranges() {
        assert!(is_public_ipv6(&"2a00:1450::1".parse().unwrap()));
        for ip in ["::1", "fe80::1", "fd00::1", "2001:db8::1", "ff02::1", "::"] {
            assert!(!is_public_ipv6(&ip.parse().unwrap()), "{}", ip);
        }
    }

    #[test]
    fn test_replaced_probes_are_used() {
        let probes = Probes::system()
            .with_hostname(|| Ok("thehostname".to_string()))
            .with_private_ipv4(|| Ok(vec!["10.0.0.1".parse().unwrap()]))
            .with_public_ipv6(|| Ok(vec!["dead:beef::1".parse().unwrap()]))
            .with_resource_limit(|_| Ok(4096));

        assert_eq!(probes.hostname().unwrap(), "thehostname");
        assert_eq!(
            probes.private_ipv4().unwrap(),
            vec!["10.0.0.1".parse::<IpAddr>().unwrap()]
        );
        assert_eq!(probes.public_ipv6().unwrap().len(), 1);
        assert_eq!(probes.resource_limit(ResourceKind::OpenFiles).unwrap(), 4096);
    }

    #[test]
    fn test_dedup_keeps_first_occurrence_order() {
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();
        assert_eq!(dedup([a, b, a]), vec![a, b]);
    }
}
