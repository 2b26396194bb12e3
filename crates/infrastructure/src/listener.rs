//! UDP/TCP listener pair (spec §4.11): two concurrent servers on the same
//! address, both dispatching to the same handler. Per datagram and per TCP
//! connection, a task is spawned; the call into [`HandleQueryUseCase`] is
//! wrapped in [`FutureExt::catch_unwind`] so a handler panic degrades to
//! SERVFAIL (spec §7) instead of taking down the listener task. Shutdown is
//! broadcast through a [`CancellationToken`]: listeners stop accepting,
//! in-flight tasks are given `shutdown_grace_secs` to finish, then aborted.

use crate::wire_codec::parse_query_request;
use futures::FutureExt;
use glory_hole_application::ports::ResponseEncoderPort;
use glory_hole_application::HandleQueryUseCase;
use glory_hole_domain::config::ServerConfig;
use glory_hole_domain::{DnsError, Rcode};
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

const MAX_UDP_DATAGRAM: usize = 4096;
const MAX_TCP_MESSAGE_SIZE: usize = 65535;

/// Runs the configured listeners until `shutdown` is cancelled, then waits
/// up to `shutdown_grace_secs` for in-flight handlers before aborting them.
pub async fn run(config: &ServerConfig, handler: Arc<HandleQueryUseCase>, shutdown: CancellationToken) -> Result<(), DnsError> {
    let addr: SocketAddr = config.listen_address.parse().map_err(|e| DnsError::Config(format!("invalid listen_address '{}': {e}", config.listen_address)))?;

    let grace = Duration::from_secs(config.shutdown_grace_secs);
    let request_deadline = Duration::from_millis(config.request_deadline_ms);
    let mut join_set: JoinSet<()> = JoinSet::new();

    if config.udp_enabled {
        let socket = UdpSocket::bind(addr).await.map_err(|e| DnsError::Io(format!("failed to bind UDP {addr}: {e}")))?;
        tracing::info!(%addr, "UDP listener bound");
        let handler = Arc::clone(&handler);
        let shutdown = shutdown.clone();
        join_set.spawn(async move { run_udp(socket, handler, shutdown, grace, request_deadline).await });
    }

    if config.tcp_enabled {
        let listener = TcpListener::bind(addr).await.map_err(|e| DnsError::Io(format!("failed to bind TCP {addr}: {e}")))?;
        tracing::info!(%addr, "TCP listener bound");
        let handler = Arc::clone(&handler);
        let shutdown = shutdown.clone();
        join_set.spawn(async move { run_tcp(listener, handler, shutdown, grace, request_deadline).await });
    }

    while join_set.join_next().await.is_some() {}
    Ok(())
}

async fn dispatch(handler: &HandleQueryUseCase, wire: Vec<u8>, client_ip: std::net::IpAddr, request_deadline: Duration) -> Vec<u8> {
    let deadline = Instant::now() + request_deadline;
    let request = match parse_query_request(wire, client_ip, deadline) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, %client_ip, "dropping unparseable query");
            return Vec::new();
        }
    };

    match AssertUnwindSafe(handler.execute(&request)).catch_unwind().await {
        Ok(response) => response,
        Err(_) => {
            tracing::error!(%client_ip, domain = %request.qname, "handler panicked, degrading to SERVFAIL");
            crate::wire_codec::HickoryWireCodec::new().encode_rcode(&request.wire, Rcode::ServFail).unwrap_or_default()
        }
    }
}

async fn run_udp(socket: UdpSocket, handler: Arc<HandleQueryUseCase>, shutdown: CancellationToken, grace: Duration, request_deadline: Duration) {
    let socket = Arc::new(socket);
    let mut tasks: JoinSet<()> = JoinSet::new();
    let mut buf = vec![0u8; MAX_UDP_DATAGRAM];

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            result = socket.recv_from(&mut buf) => {
                let (n, from) = match result {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!(error = %e, "UDP recv error");
                        continue;
                    }
                };
                let wire = buf[..n].to_vec();
                let handler = Arc::clone(&handler);
                let socket = Arc::clone(&socket);
                tasks.spawn(async move {
                    let response = dispatch(&handler, wire, from.ip(), request_deadline).await;
                    if !response.is_empty() {
                        if let Err(e) = socket.send_to(&response, from).await {
                            tracing::warn!(error = %e, %from, "UDP send error");
                        }
                    }
                });
            }
        }
    }

    drain(tasks, grace).await;
}

async fn run_tcp(listener: TcpListener, handler: Arc<HandleQueryUseCase>, shutdown: CancellationToken, grace: Duration, request_deadline: Duration) {
    let mut connections: JoinSet<()> = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!(error = %e, "TCP accept error");
                        continue;
                    }
                };
                let handler = Arc::clone(&handler);
                let conn_shutdown = shutdown.clone();
                connections.spawn(async move {
                    if let Err(e) = serve_tcp_connection(stream, peer, handler, conn_shutdown, request_deadline).await {
                        tracing::debug!(error = %e, %peer, "TCP connection closed");
                    }
                });
            }
        }
    }

    drain(connections, grace).await;
}

async fn serve_tcp_connection(mut stream: TcpStream, peer: SocketAddr, handler: Arc<HandleQueryUseCase>, shutdown: CancellationToken, request_deadline: Duration) -> Result<(), DnsError> {
    loop {
        let mut len_buf = [0u8; 2];
        tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            result = stream.read_exact(&mut len_buf) => {
                match result {
                    Ok(_) => {}
                    Err(_) => return Ok(()),
                }
            }
        }

        let msg_len = u16::from_be_bytes(len_buf) as usize;
        if msg_len == 0 || msg_len > MAX_TCP_MESSAGE_SIZE {
            return Err(DnsError::MalformedRequest(format!("invalid TCP message length {msg_len}")));
        }

        let mut msg = vec![0u8; msg_len];
        stream.read_exact(&mut msg).await.map_err(|e| DnsError::Io(e.to_string()))?;

        let response = dispatch(&handler, msg, peer.ip(), request_deadline).await;
        if response.is_empty() {
            continue;
        }

        let len = response.len() as u16;
        stream.write_all(&len.to_be_bytes()).await.map_err(|e| DnsError::Io(e.to_string()))?;
        stream.write_all(&response).await.map_err(|e| DnsError::Io(e.to_string()))?;
        stream.flush().await.map_err(|e| DnsError::Io(e.to_string()))?;
    }
}

async fn drain(mut tasks: JoinSet<()>, grace: Duration) {
    if tokio::time::timeout(grace, async {
        while tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        tracing::warn!(remaining = tasks.len(), "shutdown grace period elapsed, aborting in-flight handlers");
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
    }
}
