//! Tenant resolution from multiple sources.
//!
//! Provides the [`TenantResolver`] which picks the host a request was sent to
//! and looks up the tenant serving it.

use axum::http::{HeaderName, header::HOST, request::Parts};
use tracing::debug;
use wayfarer_persistence::{DomainMatch, StorageResult, Tenant, TenantDirectory};

use crate::config::ServerConfig;

use super::source::TenantSource;

/// Header that names the tenant domain directly.
pub static X_TENANT_DOMAIN: HeaderName = HeaderName::from_static("x-tenant-domain");

/// Trait for extracting a host from a specific part of the request.
pub trait TenantSourceExtractor: Send + Sync {
    /// Attempts to extract a host value from the request.
    fn extract(&self, parts: &Parts) -> Option<String>;

    /// Returns the source type this extractor handles.
    fn source_type(&self) -> TenantSource;
}

fn header_str<'a>(parts: &'a Parts, name: &HeaderName) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Extracts the host from the `X-Tenant-Domain` header.
#[derive(Debug, Default)]
pub struct DomainHeaderTenantExtractor;

impl TenantSourceExtractor for DomainHeaderTenantExtractor {
    fn extract(&self, parts: &Parts) -> Option<String> {
        header_str(parts, &X_TENANT_DOMAIN).map(String::from)
    }

    fn source_type(&self) -> TenantSource {
        TenantSource::DomainHeader
    }
}

/// Extracts the host from the `Host` header.
#[derive(Debug, Default)]
pub struct HostHeaderTenantExtractor;

impl TenantSourceExtractor for HostHeaderTenantExtractor {
    fn extract(&self, parts: &Parts) -> Option<String> {
        header_str(parts, &HOST).map(String::from)
    }

    fn source_type(&self) -> TenantSource {
        TenantSource::Host
    }
}

/// Extracts the host from the request URI authority.
#[derive(Debug, Default)]
pub struct AuthorityTenantExtractor;

impl TenantSourceExtractor for AuthorityTenantExtractor {
    fn extract(&self, parts: &Parts) -> Option<String> {
        parts.uri.host().map(String::from)
    }

    fn source_type(&self) -> TenantSource {
        TenantSource::Authority
    }
}

/// Resolves the tenant of a request from its host.
pub struct TenantResolver {
    extractors: Vec<Box<dyn TenantSourceExtractor>>,
}

impl TenantResolver {
    /// Creates a resolver for the given configuration.
    pub fn new(config: &ServerConfig) -> Self {
        let mut extractors: Vec<Box<dyn TenantSourceExtractor>> = Vec::new();

        // Highest priority first
        if config.allow_domain_header {
            extractors.push(Box::new(DomainHeaderTenantExtractor));
        }
        extractors.push(Box::new(HostHeaderTenantExtractor));
        extractors.push(Box::new(AuthorityTenantExtractor));

        Self { extractors }
    }

    /// Returns the host to resolve and where it came from.
    ///
    /// Only the highest priority source that provides a value is used; a
    /// host that matches no tenant does not fall through to the next source.
    pub fn host(&self, parts: &Parts) -> Option<(TenantSource, String)> {
        self.extractors
            .iter()
            .find_map(|e| e.extract(parts).map(|host| (e.source_type(), host)))
    }

    /// Resolves the tenant serving the request, if any.
    pub async fn resolve<S>(
        &self,
        storage: &S,
        parts: &Parts,
        mode: DomainMatch,
    ) -> StorageResult<Option<Tenant>>
    where
        S: TenantDirectory + ?Sized,
    {
        let Some((source, host)) = self.host(parts) else {
            debug!("request carries no host");
            return Ok(None);
        };

        let tenant = storage.resolve_host(&host, mode).await?;
        match &tenant {
            Some(tenant) => {
                debug!(host = %host, source = %source, tenant = %tenant.id, "tenant resolved")
            }
            None => debug!(host = %host, source = %source, "no tenant serves host"),
        }
        Ok(tenant)
    }
}

impl Default for TenantResolver {
    fn default() -> Self {
        Self::new(&ServerConfig::default())
    }
}
