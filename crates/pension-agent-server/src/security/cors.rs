use anyhow::{bail, Context, Result};
use axum::http::{request::Parts, HeaderValue, Method};
use regex::Regex;
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tracing::{info, warn};

const LOCAL_HOSTS: [&str; 2] = ["localhost", "127.0.0.1"];

/// Allowed origins and hosts, built once from `cors.origins`
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allow_any: bool,
    origins: Vec<String>,
    subdomain_patterns: Vec<Regex>,
    hosts: Vec<String>,
}

impl CorsPolicy {
    /// Accepts a JSON array (`["https://a.cl","*.b.cl"]`) or a comma
    /// separated list. An empty list is rejected.
    pub fn from_config(raw: &str) -> Result<Self> {
        let entries = parse_origins(raw);
        if entries.is_empty() {
            bail!("cors.origins must list at least one origin");
        }

        let mut origins = Vec::new();
        let mut subdomain_patterns = Vec::new();

        for entry in entries {
            if entry == "*" {
                info!("CORS open to any origin");
                return Ok(Self {
                    allow_any: true,
                    origins: vec!["*".to_string()],
                    subdomain_patterns: Vec::new(),
                    hosts: Vec::new(),
                });
            }

            if let Some(domain) = entry.strip_prefix("*.") {
                let pattern = format!(r"^https://[^.]+\.{}$", regex::escape(domain));
                let regex = Regex::new(&pattern)
                    .with_context(|| format!("Invalid subdomain origin '{}'", entry))?;
                info!("CORS subdomain pattern: {}", pattern);
                subdomain_patterns.push(regex);
            } else {
                origins.push(entry);
            }
        }

        let hosts = origins
            .iter()
            .map(|origin| {
                origin
                    .trim_start_matches("https://")
                    .trim_start_matches("http://")
                    .to_string()
            })
            .collect();

        info!("CORS allowed origins: {:?}", origins);

        Ok(Self {
            allow_any: false,
            origins,
            subdomain_patterns,
            hosts,
        })
    }

    pub fn allows_any(&self) -> bool {
        self.allow_any
    }

    pub fn origins(&self) -> &[String] {
        &self.origins
    }

    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allow_any
            || self.origins.iter().any(|o| o == origin)
            || self.subdomain_patterns.iter().any(|re| re.is_match(origin))
    }

    /// `host` is the raw Host header; any port is ignored
    pub fn is_host_allowed(&self, host: &str) -> bool {
        if self.allow_any {
            return true;
        }

        let name = host.split(':').next().unwrap_or_default();
        LOCAL_HOSTS.contains(&name) || self.hosts.iter().any(|h| h == name)
    }

    /// CORS response headers for browsers
    pub fn layer(&self) -> CorsLayer {
        let allow_origin = if self.allow_any {
            // Credentials rule out a literal `*`
            AllowOrigin::mirror_request()
        } else {
            let policy = self.clone();
            AllowOrigin::predicate(move |origin: &HeaderValue, _parts: &Parts| {
                origin
                    .to_str()
                    .map(|o| policy.is_origin_allowed(o))
                    .unwrap_or(false)
            })
        };

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true)
            .max_age(Duration::from_secs(3600))
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    let raw = raw.replace("\\\"", "\"");
    let trimmed = raw.trim();

    if trimmed.starts_with('[') {
        match serde_json::from_str::<Vec<String>>(trimmed) {
            Ok(list) => {
                return list
                    .into_iter()
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect();
            }
            Err(e) => warn!("cors.origins is not valid JSON ({}), splitting on commas", e),
        }
    }

    trimmed
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}
