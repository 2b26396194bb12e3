//! Recursive upstream forwarder (spec §4.8): UDP by default, TCP retry on
//! a truncated UDP response, round-robin across configured upstreams with
//! per-attempt retries. Grounded directly on the teacher's
//! `dns/transport/udp.rs` (ephemeral-port bind, paired send/recv timeouts)
//! and `dns/transport/tcp.rs` (2-byte length-prefix framing, RFC 1035
//! §4.2.2) — generalized from a single fixed server into a rotating pool.

use async_trait::async_trait;
use glory_hole_application::ports::{ForwardedResponse, UpstreamForwarderPort};
use glory_hole_domain::DnsError;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};

/// The socket timeout for one attempt: never longer than the forwarder's
/// own per-upstream timeout, and never longer than what's left until the
/// request's overall deadline (spec §5 "Cancellation").
fn attempt_timeout(configured: Duration, deadline: Instant) -> Option<Duration> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        None
    } else {
        Some(remaining.min(configured))
    }
}

const MAX_UDP_RESPONSE_SIZE: usize = 4096;
const MAX_TCP_MESSAGE_SIZE: usize = 65535;

fn is_truncated(wire: &[u8]) -> bool {
    // TC bit is bit 1 (0x02) of the second header byte.
    wire.len() > 3 && wire[2] & 0x02 != 0
}

pub struct UpstreamForwarder {
    upstreams: Vec<SocketAddr>,
    timeout: Duration,
    retries: u32,
    next: AtomicUsize,
}

impl UpstreamForwarder {
    pub fn new(servers: &[String], timeout: Duration, retries: u32) -> Result<Self, DnsError> {
        let upstreams = servers
            .iter()
            .map(|s| s.parse::<SocketAddr>().map_err(|e| DnsError::Config(format!("invalid upstream address '{s}': {e}"))))
            .collect::<Result<Vec<_>, _>>()?;
        if upstreams.is_empty() {
            return Err(DnsError::Config("at least one upstream server is required".to_string()));
        }
        Ok(Self {
            upstreams,
            timeout,
            retries,
            next: AtomicUsize::new(0),
        })
    }

    /// Round-robins the starting point each call, returning the full pool
    /// rotated so a failed attempt falls through to the next upstream.
    fn rotation(&self) -> Vec<SocketAddr> {
        let start = self.next.fetch_add(1, Ordering::Relaxed) % self.upstreams.len();
        let mut rotated = self.upstreams[start..].to_vec();
        rotated.extend_from_slice(&self.upstreams[..start]);
        rotated
    }

    async fn send_udp(&self, addr: SocketAddr, wire: &[u8], timeout: Duration) -> Result<Vec<u8>, DnsError> {
        let bind_addr: SocketAddr = if addr.is_ipv4() { "0.0.0.0:0".parse().unwrap() } else { "[::]:0".parse().unwrap() };
        let socket = UdpSocket::bind(bind_addr).await.map_err(|e| DnsError::UpstreamRefused(format!("{addr}: bind failed: {e}")))?;

        tokio::time::timeout(timeout, socket.send_to(wire, addr))
            .await
            .map_err(|_| DnsError::UpstreamTimeout)?
            .map_err(|e| DnsError::UpstreamRefused(format!("{addr}: {e}")))?;

        let mut buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
        let (n, from) = tokio::time::timeout(timeout, socket.recv_from(&mut buf))
            .await
            .map_err(|_| DnsError::UpstreamTimeout)?
            .map_err(|e| DnsError::UpstreamRefused(format!("{addr}: {e}")))?;

        if from.ip() != addr.ip() {
            tracing::warn!(expected = %addr, received_from = %from, "UDP response from unexpected source");
        }

        buf.truncate(n);
        Ok(buf)
    }

    async fn send_tcp(&self, addr: SocketAddr, wire: &[u8], timeout: Duration) -> Result<Vec<u8>, DnsError> {
        let mut stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| DnsError::UpstreamTimeout)?
            .map_err(|e| DnsError::UpstreamRefused(format!("{addr}: {e}")))?;

        let len = wire.len() as u16;
        tokio::time::timeout(timeout, async {
            stream.write_all(&len.to_be_bytes()).await?;
            stream.write_all(wire).await?;
            stream.flush().await
        })
        .await
        .map_err(|_| DnsError::UpstreamTimeout)?
        .map_err(|e| DnsError::UpstreamRefused(format!("{addr}: {e}")))?;

        let response = tokio::time::timeout(timeout, async {
            let mut len_buf = [0u8; 2];
            stream.read_exact(&mut len_buf).await?;
            let response_len = u16::from_be_bytes(len_buf) as usize;
            if response_len > MAX_TCP_MESSAGE_SIZE {
                return Err(std::io::Error::other(format!("TCP response too large ({response_len} bytes)")));
            }
            let mut response = vec![0u8; response_len];
            stream.read_exact(&mut response).await?;
            Ok(response)
        })
        .await
        .map_err(|_| DnsError::UpstreamTimeout)?
        .map_err(|e| DnsError::UpstreamRefused(format!("{addr}: {e}")))?;

        Ok(response)
    }
}

#[async_trait]
impl UpstreamForwarderPort for UpstreamForwarder {
    async fn forward(&self, query_wire: &[u8], deadline: Instant) -> Result<ForwardedResponse, DnsError> {
        let rotation = self.rotation();
        let mut last_err = DnsError::UpstreamsExhausted;

        for addr in rotation {
            for _attempt in 0..=self.retries {
                let Some(timeout) = attempt_timeout(self.timeout, deadline) else {
                    return Err(DnsError::UpstreamTimeout);
                };
                let start = Instant::now();
                match self.send_udp(addr, query_wire, timeout).await {
                    Ok(wire) if is_truncated(&wire) => {
                        let Some(tcp_timeout) = attempt_timeout(self.timeout, deadline) else {
                            return Err(DnsError::UpstreamTimeout);
                        };
                        match self.send_tcp(addr, query_wire, tcp_timeout).await {
                            Ok(tcp_wire) => {
                                return Ok(ForwardedResponse {
                                    wire: tcp_wire,
                                    upstream: addr.to_string(),
                                    latency_ms: start.elapsed().as_millis() as u64,
                                });
                            }
                            Err(e) => {
                                last_err = e;
                                continue;
                            }
                        }
                    }
                    // Any well-formed reply — including a SERVFAIL rcode —
                    // is passed straight through; only a transport failure
                    // triggers a retry or upstream failover (spec §4.8).
                    Ok(wire) => {
                        return Ok(ForwardedResponse {
                            wire,
                            upstream: addr.to_string(),
                            latency_ms: start.elapsed().as_millis() as u64,
                        });
                    }
                    Err(e) => {
                        last_err = e;
                        continue;
                    }
                }
            }
        }

        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unparseable_upstream_addresses() {
        let result = UpstreamForwarder::new(&["not-an-address".to_string()], Duration::from_millis(100), 1);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_empty_upstream_list() {
        let result = UpstreamForwarder::new(&[], Duration::from_millis(100), 1);
        assert!(result.is_err());
    }

    #[test]
    fn rotation_cycles_through_every_upstream() {
        let forwarder = UpstreamForwarder::new(
            &["1.1.1.1:53".to_string(), "8.8.8.8:53".to_string(), "9.9.9.9:53".to_string()],
            Duration::from_millis(100),
            0,
        )
        .unwrap();
        let first = forwarder.rotation();
        let second = forwarder.rotation();
        assert_ne!(first[0], second[0]);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn detects_truncated_responses_via_tc_bit() {
        let mut wire = vec![0u8; 12];
        wire[2] = 0x02;
        assert!(is_truncated(&wire));
        wire[2] = 0x00;
        assert!(!is_truncated(&wire));
    }

    #[tokio::test]
    async fn forward_exhausts_all_upstreams_on_unreachable_servers() {
        // Ports 1-1023 below an ephemeral bind with nothing listening will
        // refuse the connection quickly rather than hang for the full
        // timeout, keeping this test fast.
        let forwarder = UpstreamForwarder::new(&["127.0.0.1:1".to_string()], Duration::from_millis(200), 0).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        let result = forwarder.forward(&[0u8; 12], deadline).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn forward_fails_fast_once_deadline_has_passed() {
        let forwarder = UpstreamForwarder::new(&["127.0.0.1:53".to_string()], Duration::from_secs(5), 3).unwrap();
        let deadline = Instant::now() - Duration::from_millis(1);
        let result = forwarder.forward(&[0u8; 12], deadline).await;
        assert!(matches!(result, Err(DnsError::UpstreamTimeout)));
    }
}
