//! Tenant domain normalization and host matching.
//!
//! Hosts arrive from the HTTP layer in whatever shape the client sent
//! (`Demo.TravelCo:8000`, `[::1]:8080`, `demo.travelco.`). Both stored
//! domains and inbound hosts are reduced to the same canonical form before
//! they are compared.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Longest host name accepted, in bytes.
pub const MAX_HOST_LEN: usize = 253;

/// How an inbound host is matched against tenant domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainMatch {
    /// The host must equal the tenant domain.
    Exact,
    /// The host must equal the tenant domain or be a subdomain of it.
    #[default]
    Suffix,
}

impl fmt::Display for DomainMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainMatch::Exact => write!(f, "exact"),
            DomainMatch::Suffix => write!(f, "suffix"),
        }
    }
}

impl FromStr for DomainMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(DomainMatch::Exact),
            "suffix" => Ok(DomainMatch::Suffix),
            other => Err(format!("unknown domain match mode '{other}' (expected exact or suffix)")),
        }
    }
}

impl DomainMatch {
    /// Returns the domains that would match `host`, most specific first.
    ///
    /// `host` must already be normalized with [`normalize_host`]. The first
    /// entry is always the host itself. In suffix mode each parent domain
    /// follows, so `eu.demo.travelco` yields `eu.demo.travelco`,
    /// `demo.travelco`, `travelco`. IP literals never expand.
    pub fn candidates(&self, host: &str) -> Vec<String> {
        let mut out = vec![host.to_string()];
        if *self == DomainMatch::Exact || host.parse::<IpAddr>().is_ok() {
            return out;
        }
        let mut rest = host;
        while let Some(idx) = rest.find('.') {
            rest = &rest[idx + 1..];
            if rest.is_empty() {
                break;
            }
            out.push(rest.to_string());
        }
        out
    }
}

/// Reduces an inbound `Host` value to its canonical lowercase form.
///
/// Strips the port, IPv6 brackets, surrounding whitespace and a trailing dot.
/// Returns `None` when nothing usable is left, or when the result is not a
/// plausible DNS name: longer than [`MAX_HOST_LEN`] or with an empty label.
/// Suffix matching looks up one candidate per label, so a valid host never
/// costs more than 127 lookups.
pub fn normalize_host(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let host = if let Some(rest) = raw.strip_prefix('[') {
        // [v6]:port
        rest.split(']').next()?
    } else if raw.matches(':').count() == 1 {
        raw.split(':').next()?
    } else {
        // bare host or unbracketed IPv6
        raw
    };
    let host = host.strip_suffix('.').unwrap_or(host).to_ascii_lowercase();
    if host.is_empty() || host.len() > MAX_HOST_LEN {
        return None;
    }
    if host.split('.').any(str::is_empty) {
        return None;
    }
    Some(host)
}

/// Validates and canonicalizes a tenant domain for storage.
pub fn normalize_domain(raw: &str) -> Result<String, ValidationError> {
    let domain = raw.trim().trim_end_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        return Err(ValidationError::MissingRequiredField {
            field: "domain".to_string(),
        });
    }
    if domain.len() > 255 {
        return Err(ValidationError::invalid("domain", "longer than 255 characters"));
    }
    for label in domain.split('.') {
        if label.is_empty() {
            return Err(ValidationError::invalid("domain", "empty label"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(ValidationError::invalid(
                "domain",
                format!("label '{label}' may not start or end with '-'"),
            ));
        }
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(ValidationError::invalid(
                "domain",
                format!("label '{label}' contains invalid characters"),
            ));
        }
    }
    Ok(domain)
}
