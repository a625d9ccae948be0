//! Single-address latency probes
//!
//! A probe opens a TCP connection to `address:port`, completes a TLS client
//! handshake using the endpoint's domain as SNI and reports the wall-clock
//! time from connect to handshake completion. Timeouts and refusals are
//! ordinary outcomes, never errors.

pub mod tls;

use crate::error::Result;
use crate::types::FailureKind;
use async_trait::async_trait;
use rustls::pki_types::ServerName;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};
use tokio_rustls::TlsConnector;

/// Raw result of one handshake attempt, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Success { elapsed: Duration },
    Failure { kind: FailureKind, detail: String },
}

impl ProbeOutcome {
    pub fn failure(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            detail: detail.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            Self::Success { elapsed } => Some(*elapsed),
            Self::Failure { .. } => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }
}

/// Measures one (domain, address) pair
///
/// Implementations hold no per-call state and must be safe to share across
/// concurrently running probes.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, domain: &str, address: IpAddr) -> ProbeOutcome;
}

#[async_trait]
impl<P: Prober + ?Sized> Prober for Arc<P> {
    async fn probe(&self, domain: &str, address: IpAddr) -> ProbeOutcome {
        (**self).probe(domain, address).await
    }
}

/// TCP connect plus TLS handshake, bounded by a single timeout
#[derive(Clone)]
pub struct TlsHandshakeProber {
    connector: TlsConnector,
    port: u16,
    timeout: Duration,
}

impl TlsHandshakeProber {
    pub fn new(port: u16, timeout: Duration) -> Result<Self> {
        let config = tls::probe_client_config()?;
        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            port,
            timeout,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn handshake(
        &self,
        server_name: ServerName<'static>,
        target: SocketAddr,
    ) -> std::result::Result<(), (FailureKind, String)> {
        let tcp = TcpStream::connect(target).await.map_err(|e| connect_failure(target, e))?;
        // Latency measurement only; ignore if the platform refuses.
        let _ = tcp.set_nodelay(true);

        self.connector
            .connect(server_name, tcp)
            .await
            .map(drop)
            .map_err(|e| (FailureKind::Handshake, format!("TLS handshake with {} failed: {}", target, e)))
    }
}

#[async_trait]
impl Prober for TlsHandshakeProber {
    async fn probe(&self, domain: &str, address: IpAddr) -> ProbeOutcome {
        let server_name = match ServerName::try_from(domain.to_string()) {
            Ok(name) => name,
            Err(e) => {
                return ProbeOutcome::failure(
                    FailureKind::InvalidTarget,
                    format!("'{}' cannot be used as a TLS server name: {}", domain, e),
                )
            }
        };

        let target = SocketAddr::new(address, self.port);
        let start = Instant::now();

        match timeout(self.timeout, self.handshake(server_name, target)).await {
            Ok(Ok(())) => ProbeOutcome::Success {
                elapsed: start.elapsed(),
            },
            Ok(Err((kind, detail))) => ProbeOutcome::failure(kind, detail),
            Err(_) => ProbeOutcome::failure(
                FailureKind::Timeout,
                format!("no handshake from {} within {:?}", target, self.timeout),
            ),
        }
    }
}

fn connect_failure(target: SocketAddr, error: io::Error) -> (FailureKind, String) {
    let kind = match error.kind() {
        io::ErrorKind::ConnectionRefused => FailureKind::ConnectionRefused,
        io::ErrorKind::TimedOut => FailureKind::Timeout,
        _ => FailureKind::Connection,
    };
    (kind, format!("connect to {} failed: {}", target, error))
}
