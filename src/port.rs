//! Listening port acquisition and LAN address discovery
//!
//! Port probing binds and immediately releases a socket, so another process
//! can still take the port before the real listener binds. The real bind
//! therefore gets one more attempt on a random port before giving up.

use std::{
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket},
    ops::RangeInclusive,
};

use rand::Rng;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, warn};

/// Probed sequentially after the preferred port is taken.
pub const MID_RANGE: RangeInclusive<u16> = 8001..=9000;
/// Unverified last resort once probing is exhausted.
pub const DYNAMIC_RANGE: RangeInclusive<u16> = 49152..=65535;
/// Used when the real listen fails on the acquired port.
pub const RETRY_RANGE: RangeInclusive<u16> = 10000..=65000;

#[derive(Debug, Error)]
pub enum BindError {
    #[error("unable to listen on port {port} or on fallback port {retry_port}: {source}")]
    Exhausted {
        port: u16,
        retry_port: u16,
        #[source]
        source: io::Error,
    },
}

/// Returns true when `port` could be bound on `ip` right now.
pub fn probe(ip: IpAddr, port: u16) -> bool {
    std::net::TcpListener::bind((ip, port)).is_ok()
}

pub fn acquire(ip: IpAddr, preferred: u16, max_attempts: u32) -> u16 {
    acquire_with(preferred, max_attempts, &mut rand::thread_rng(), |port| {
        probe(ip, port)
    })
}

/// Probes `preferred`, then a random mid-range port, then its successors.
///
/// Never fails: after `max_attempts` unsuccessful probes a random port from
/// the dynamic range is returned without being checked.
pub fn acquire_with<R, P>(preferred: u16, max_attempts: u32, rng: &mut R, mut probe: P) -> u16
where
    R: Rng + ?Sized,
    P: FnMut(u16) -> bool,
{
    let mut port = preferred;

    for attempt in 0..max_attempts {
        if probe(port) {
            return port;
        }
        debug!(port, attempt, "port unavailable");

        port = if attempt == 0 {
            rng.gen_range(MID_RANGE)
        } else {
            next_port(port)
        };
    }

    let fallback = rng.gen_range(DYNAMIC_RANGE);
    warn!(
        preferred,
        max_attempts,
        port = fallback,
        "port probing exhausted, using unverified random port"
    );
    fallback
}

fn next_port(port: u16) -> u16 {
    port.checked_add(1).unwrap_or(*MID_RANGE.start())
}

/// Acquires a port and binds the server listener on it.
pub async fn bind_listener(
    ip: IpAddr,
    preferred: u16,
    max_attempts: u32,
) -> Result<TcpListener, BindError> {
    let port = acquire(ip, preferred, max_attempts);

    match TcpListener::bind((ip, port)).await {
        Ok(listener) => Ok(listener),
        Err(err) => {
            let retry_port = rand::thread_rng().gen_range(RETRY_RANGE);
            warn!(
                port,
                retry_port,
                error = %err,
                "listen failed, retrying on a random port"
            );

            TcpListener::bind((ip, retry_port))
                .await
                .map_err(|source| BindError::Exhausted {
                    port,
                    retry_port,
                    source,
                })
        }
    }
}

/// Best guess at the address other LAN devices can reach this host on.
///
/// Connecting a UDP socket sends nothing; it only selects the outbound
/// interface. Anything other than a private IPv4 address falls back to
/// loopback.
pub fn local_ip() -> IpAddr {
    let detected = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))
        .and_then(|socket| {
            socket.connect(SocketAddr::from(([8, 8, 8, 8], 80)))?;
            socket.local_addr()
        })
        .map(|address| address.ip());

    match detected {
        Ok(IpAddr::V4(ip)) if ip.is_private() => IpAddr::V4(ip),
        Ok(other) => {
            debug!(ip = %other, "detected address is not a private IPv4 address");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
        Err(err) => {
            debug!(error = %err, "local address detection failed");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    const LOOPBACK: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[test]
    fn free_preferred_port_is_used() {
        let mut rng = StdRng::seed_from_u64(7);
        let port = acquire_with(8000, 10, &mut rng, |_| true);
        assert_eq!(port, 8000);
    }

    #[test]
    fn second_probe_is_mid_range_then_sequential() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut probed = Vec::new();
        let port = acquire_with(8000, 4, &mut rng, |port| {
            probed.push(port);
            probed.len() == 4
        });

        assert_eq!(probed[0], 8000);
        assert!(MID_RANGE.contains(&probed[1]));
        assert_eq!(probed[2], probed[1] + 1);
        assert_eq!(probed[3], probed[2] + 1);
        assert_eq!(port, probed[3]);
    }

    #[test]
    fn exhausted_probing_returns_dynamic_port() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut attempts = 0;
        let port = acquire_with(8000, 10, &mut rng, |_| {
            attempts += 1;
            false
        });

        assert_eq!(attempts, 10);
        assert!(DYNAMIC_RANGE.contains(&port));
    }

    #[test]
    fn sequential_probing_wraps_at_top_of_range() {
        assert_eq!(next_port(65535), 8001);
        assert_eq!(next_port(8500), 8501);
    }

    #[test]
    fn occupied_port_fails_probe() {
        let listener = std::net::TcpListener::bind((LOOPBACK, 0)).expect("bind ephemeral port");
        let port = listener.local_addr().expect("local addr").port();

        assert!(!probe(LOOPBACK, port));
    }

    #[tokio::test]
    async fn bind_listener_skips_occupied_preferred_port() {
        let occupied = std::net::TcpListener::bind((LOOPBACK, 0)).expect("bind ephemeral port");
        let preferred = occupied.local_addr().expect("local addr").port();

        let listener = bind_listener(LOOPBACK, preferred, 10)
            .await
            .expect("listener should bind");
        let bound = listener.local_addr().expect("local addr").port();

        assert_ne!(bound, preferred);
    }

    #[test]
    fn local_ip_is_private_or_loopback() {
        match local_ip() {
            IpAddr::V4(ip) => assert!(ip.is_private() || ip.is_loopback()),
            IpAddr::V6(ip) => panic!("unexpected IPv6 address {ip}"),
        }
    }
}
