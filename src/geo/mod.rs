//! Client address → country resolution
//!
//! Uses ipinfo.io's plain-text `/{ip}/country` endpoint and maps the returned
//! code through [`countries::country_name`]. Resolution never fails a request:
//! every problem collapses to "country unknown".

pub mod countries;

use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::GeoConfig;
use crate::error::{GatewayError, Result};

/// Public address substituted for local/private callers (a Cloudflare node in India)
pub const FALLBACK_IP: &str = "103.21.244.1";

/// Label rendered when the country could not be resolved
pub const UNKNOWN_COUNTRY: &str = "Unknown";

#[async_trait]
pub trait CountryResolver: Send + Sync {
    /// Country name for `address`, or `None` when it cannot be determined.
    async fn resolve_country(&self, address: &str) -> Option<String>;
}

/// Display form of an optional country
pub fn country_label(country: Option<&str>) -> &str {
    country.unwrap_or(UNKNOWN_COUNTRY)
}

/// True for empty, loopback, private, link-local and unspecified addresses.
pub fn is_local_address(address: &str) -> bool {
    let address = address.trim();
    if address.is_empty() || address.eq_ignore_ascii_case("localhost") {
        return true;
    }
    match address.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => {
            v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified()
        }
        Ok(IpAddr::V6(v6)) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_local_address(&mapped.to_string());
            }
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
        }
        Err(_) => false,
    }
}

/// Address actually sent to the lookup service
pub fn effective_address<'a>(address: &'a str, fallback: &'a str) -> &'a str {
    if is_local_address(address) {
        fallback
    } else {
        address.trim()
    }
}

/// ipinfo.io-backed resolver
#[derive(Debug, Clone)]
pub struct IpInfoResolver {
    client: reqwest::Client,
    endpoint: String,
    fallback_ip: String,
}

impl IpInfoResolver {
    pub fn new(endpoint: &str, fallback_ip: &str, timeout_ms: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| GatewayError::Config {
                message: format!("Failed to build geolocation HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            fallback_ip: fallback_ip.to_string(),
        })
    }

    pub fn from_config(config: &GeoConfig) -> Result<Self> {
        Self::new(&config.endpoint, &config.fallback_ip, config.timeout_ms)
    }

    /// Lookup URL for `address`; `None` when the address is not an IP.
    pub fn lookup_url(&self, address: &str) -> Option<String> {
        let ip: IpAddr = effective_address(address, &self.fallback_ip).parse().ok()?;
        Some(format!("{}/{}/country", self.endpoint, ip))
    }

    async fn fetch_code(&self, url: &str) -> Option<String> {
        let resp = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(url, error = %e, "geolocation lookup failed");
                return None;
            }
        };
        let status = resp.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "geolocation lookup returned non-success status");
            return None;
        }
        match resp.text().await {
            Ok(body) => Some(body.trim().to_string()),
            Err(e) => {
                warn!(url, error = %e, "failed to read geolocation response");
                None
            }
        }
    }
}

#[async_trait]
impl CountryResolver for IpInfoResolver {
    async fn resolve_country(&self, address: &str) -> Option<String> {
        let Some(url) = self.lookup_url(address) else {
            debug!(address, "caller address is not an IP, country unknown");
            return None;
        };
        let code = self.fetch_code(&url).await?;
        let name = countries::country_name(&code);
        if name.is_none() {
            debug!(code = %code, "unrecognized country code");
        }
        name.map(str::to_string)
    }
}

/// Resolver that always answers with a fixed country; used offline
#[derive(Debug, Clone, Default)]
pub struct StaticCountryResolver {
    country: Option<String>,
}

impl StaticCountryResolver {
    pub fn new(country: Option<String>) -> Self {
        Self { country }
    }
}

#[async_trait]
impl CountryResolver for StaticCountryResolver {
    async fn resolve_country(&self, _address: &str) -> Option<String> {
        self.country.clone()
    }
}
