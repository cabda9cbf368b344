use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};

use sysinfo::{Networks, System};

use crate::models::NetworkIdentity;

const ENABLE_LOGS: bool = true;

use crate::log_warn;

/// Produces the network fingerprint for a time report.
///
/// Implementations may block on OS queries; callers run them off the async
/// workers.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self) -> NetworkIdentity;
}

/// Reads the host name and interface hardware addresses from the OS on every
/// call. Nothing is cached: the device may have moved networks since the
/// last session.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemIdentityResolver;

impl IdentityResolver for SystemIdentityResolver {
    fn resolve(&self) -> NetworkIdentity {
        NetworkIdentity {
            ip: host_address().to_string(),
            mac: format_mac(hardware_address()),
        }
    }
}

fn host_address() -> IpAddr {
    let Some(host) = System::host_name() else {
        log_warn!("host name unavailable, reporting loopback address");
        return IpAddr::V4(Ipv4Addr::LOCALHOST);
    };

    match (host.as_str(), 0).to_socket_addrs() {
        Ok(addrs) => pick_address(addrs.map(|addr| addr.ip())),
        Err(err) => {
            log_warn!("failed to resolve host '{host}': {err}");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

/// First IPv4 address if any, else the first address, else loopback.
fn pick_address(addrs: impl IntoIterator<Item = IpAddr>) -> IpAddr {
    let mut first = None;
    for addr in addrs {
        if addr.is_ipv4() {
            return addr;
        }
        first.get_or_insert(addr);
    }
    first.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn hardware_address() -> [u8; 6] {
    let networks = Networks::new_with_refreshed_list();
    let candidates = networks
        .list()
        .iter()
        .map(|(name, data)| (name.as_str(), data.mac_address().0));
    match pick_hardware_address(candidates) {
        Some(octets) => octets,
        None => {
            log_warn!("no interface with a hardware address found");
            [0; 6]
        }
    }
}

/// Lowest interface name with a non-zero address, so repeated calls on the
/// same attachment agree.
fn pick_hardware_address<'a>(
    candidates: impl IntoIterator<Item = (&'a str, [u8; 6])>,
) -> Option<[u8; 6]> {
    candidates
        .into_iter()
        .filter(|(_, octets)| octets.iter().any(|b| *b != 0))
        .min_by_key(|(name, _)| *name)
        .map(|(_, octets)| octets)
}

/// Six two-digit lowercase hex octets joined by `:`, most significant first.
pub fn format_mac(octets: [u8; 6]) -> String {
    octets
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}
