//! Address resolution for catalog domains
//!
//! `DnsResolver` wraps a trust-dns `TokioAsyncResolver` (A records only).
//! `CatalogResolver` expands a whole catalog into probe targets, resolving
//! each distinct domain once per run.

use crate::{
    error::{AppError, Result},
    models::{Endpoint, ProbeTarget, ResolvedAddress},
};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::{
    collections::{HashMap, HashSet},
    net::IpAddr,
    sync::Arc,
    time::Duration,
};
use trust_dns_resolver::{
    config::{LookupIpStrategy, ResolverConfig, ResolverOpts},
    error::ResolveErrorKind,
    system_conf,
    TokioAsyncResolver,
};

/// Forward resolution of a domain to its advertised addresses
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Resolve `domain`; an empty answer is reported as an error
    async fn resolve(&self, domain: &str) -> Result<Vec<IpAddr>>;
}

/// Reverse (PTR) lookup of an address
#[async_trait]
pub trait PtrLookup: Send + Sync {
    /// First PTR name for `address`, if any
    async fn reverse(&self, address: IpAddr) -> Option<String>;
}

#[async_trait]
impl<R: AddressResolver + ?Sized> AddressResolver for Arc<R> {
    async fn resolve(&self, domain: &str) -> Result<Vec<IpAddr>> {
        (**self).resolve(domain).await
    }
}

#[async_trait]
impl<R: PtrLookup + ?Sized> PtrLookup for Arc<R> {
    async fn reverse(&self, address: IpAddr) -> Option<String> {
        (**self).reverse(address).await
    }
}

/// trust-dns backed resolver, safe to share between tasks
#[derive(Clone)]
pub struct DnsResolver {
    inner: TokioAsyncResolver,
    timeout: Duration,
}

impl DnsResolver {
    /// Resolver built from the system configuration, falling back to
    /// Google and Cloudflare public resolvers when it cannot be read
    pub fn system(timeout: Duration) -> Self {
        match system_conf::read_system_conf() {
            Ok((config, opts)) if !config.name_servers().is_empty() => Self::with_options(config, opts, timeout),
            _ => Self::with_config(public_fallback_config(), timeout),
        }
    }

    /// Resolver using an explicit configuration and default options
    pub fn with_config(config: ResolverConfig, timeout: Duration) -> Self {
        Self::with_options(config, ResolverOpts::default(), timeout)
    }

    /// Resolver keeping `opts` (ndots, search behaviour) but with the
    /// per-query timeout, a single attempt and A records only
    pub fn with_options(config: ResolverConfig, opts: ResolverOpts, timeout: Duration) -> Self {
        let opts = probe_resolver_opts(opts, timeout);
        Self {
            inner: TokioAsyncResolver::tokio(config, opts),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl AddressResolver for DnsResolver {
    async fn resolve(&self, domain: &str) -> Result<Vec<IpAddr>> {
        let lookup = tokio::time::timeout(self.timeout, self.inner.lookup_ip(domain))
            .await
            .map_err(|_| {
                AppError::dns_resolution(format!("DNS lookup for {} timed out after {:?}", domain, self.timeout))
            })?;

        let response = lookup.map_err(|e| match e.kind() {
            ResolveErrorKind::NoRecordsFound { .. } => {
                AppError::dns_resolution(format!("No A records for {}", domain))
            }
            _ => AppError::dns_resolution(format!("DNS lookup failed for {}: {}", domain, e)),
        })?;

        let addresses = normalize_addresses(response.iter());
        if addresses.is_empty() {
            return Err(AppError::dns_resolution(format!("No A records for {}", domain)));
        }

        Ok(addresses)
    }
}

#[async_trait]
impl PtrLookup for DnsResolver {
    async fn reverse(&self, address: IpAddr) -> Option<String> {
        let lookup = tokio::time::timeout(self.timeout, self.inner.reverse_lookup(address))
            .await
            .ok()?
            .ok()?;
        lookup.iter().next().map(|name| name.to_string())
    }
}

fn probe_resolver_opts(mut opts: ResolverOpts, timeout: Duration) -> ResolverOpts {
    opts.timeout = timeout;
    opts.attempts = 1;
    opts.ip_strategy = LookupIpStrategy::Ipv4Only;
    opts
}

/// Google plus Cloudflare name servers
pub fn public_fallback_config() -> ResolverConfig {
    let mut config = ResolverConfig::new();
    for name_server in ResolverConfig::google()
        .name_servers()
        .iter()
        .chain(ResolverConfig::cloudflare().name_servers().iter())
    {
        config.add_name_server(name_server.clone());
    }
    config
}

/// IPv4 addresses only, sorted ascending, without duplicates
pub fn normalize_addresses<I>(addresses: I) -> Vec<IpAddr>
where
    I: IntoIterator<Item = IpAddr>,
{
    let mut addresses: Vec<IpAddr> = addresses.into_iter().filter(IpAddr::is_ipv4).collect();
    addresses.sort();
    addresses.dedup();
    addresses
}

/// Outcome of expanding a catalog into probe targets
#[derive(Debug, Clone)]
pub struct CatalogResolution {
    /// One target per (endpoint, address), plus one sentinel per unresolved endpoint
    pub targets: Vec<ProbeTarget>,
    /// Distinct domains that failed, with the reason
    pub failures: Vec<(String, String)>,
    pub stats: ResolutionStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    pub endpoints: usize,
    pub domains: usize,
    pub resolved_domains: usize,
    pub failed_domains: usize,
    pub addresses: usize,
    pub sentinels: usize,
}

/// Expands a catalog into probe targets, querying each distinct domain once
pub struct CatalogResolver<R> {
    resolver: R,
    concurrency: usize,
}

impl<R: AddressResolver> CatalogResolver<R> {
    pub fn new(resolver: R, concurrency: usize) -> Self {
        Self {
            resolver,
            concurrency: concurrency.max(1),
        }
    }

    /// Resolve every endpoint and expand the catalog in its original order
    pub async fn expand(&self, endpoints: &[Endpoint]) -> CatalogResolution {
        let mut seen = HashSet::new();
        let domains: Vec<&str> = endpoints
            .iter()
            .map(|endpoint| endpoint.domain.as_str())
            .filter(|domain| seen.insert(*domain))
            .collect();

        let resolver = &self.resolver;
        let answers: HashMap<&str, Result<Vec<IpAddr>>> = stream::iter(domains.iter().copied())
            .map(|domain| async move { (domain, resolver.resolve(domain).await.map(normalize_addresses)) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut stats = ResolutionStats {
            endpoints: endpoints.len(),
            domains: domains.len(),
            ..Default::default()
        };
        let mut failures = Vec::new();
        for domain in &domains {
            match answers.get(domain) {
                Some(Ok(addresses)) if !addresses.is_empty() => stats.resolved_domains += 1,
                Some(Ok(_)) => {
                    stats.failed_domains += 1;
                    failures.push((domain.to_string(), "no addresses returned".to_string()));
                }
                Some(Err(e)) => {
                    stats.failed_domains += 1;
                    failures.push((domain.to_string(), e.to_string()));
                }
                None => {
                    stats.failed_domains += 1;
                    failures.push((domain.to_string(), "resolution did not complete".to_string()));
                }
            }
        }

        let mut targets = Vec::new();
        for endpoint in endpoints {
            let endpoint = Arc::new(endpoint.clone());
            match answers.get(endpoint.domain.as_str()) {
                Some(Ok(addresses)) if !addresses.is_empty() => {
                    for address in addresses {
                        targets.push(ProbeTarget::from(ResolvedAddress::new(endpoint.clone(), *address)));
                        stats.addresses += 1;
                    }
                }
                other => {
                    let reason = match other {
                        Some(Err(e)) => e.to_string(),
                        _ => format!("No addresses resolved for {}", endpoint.domain),
                    };
                    targets.push(ProbeTarget::Unresolved { endpoint, reason });
                    stats.sentinels += 1;
                }
            }
        }

        CatalogResolution {
            targets,
            failures,
            stats,
        }
    }
}
