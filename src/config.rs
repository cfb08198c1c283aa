// Copyright 2025 SpecHub (https://github.com/spechub)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// SpecHub Server Configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpServerConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpServerConfig {
    /// HTTP API listen address (e.g., "127.0.0.1:47200")
    #[serde(default = "default_http_addr")]
    pub listen_addr: String,

    /// Enable CORS
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistryConfig {
    /// Statically configured services (name -> base URL).
    ///
    /// Merged with the `SPECHUB_SERVICES` aggregate variable and any
    /// `<NAME>_SERVICE_URL` / `<NAME>_WORKER_URL` environment variables;
    /// environment entries win for the same derived name.
    #[serde(default)]
    pub services: BTreeMap<String, String>,

    /// How long a fetched spec (or fetch failure) stays cached, in seconds
    #[serde(default = "default_spec_ttl")]
    pub spec_ttl_secs: u64,

    /// Timeout for fetching a service's openapi.json, in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Timeout for proxied API calls, in seconds
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Shared secret required on inbound requests.
    ///
    /// Accepted via the `X-Registry-Token` header or `Authorization: Bearer`.
    /// When unset, the auth gate is disabled entirely.
    pub token: Option<String>,
}

// Default values
fn default_http_addr() -> String {
    "127.0.0.1:47200".to_string()
}

fn default_enable_cors() -> bool {
    true
}

fn default_spec_ttl() -> u64 {
    300
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_call_timeout() -> u64 {
    30
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_http_addr(),
            enable_cors: default_enable_cors(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            services: BTreeMap::new(),
            spec_ttl_secs: default_spec_ttl(),
            fetch_timeout_secs: default_fetch_timeout(),
            call_timeout_secs: default_call_timeout(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: HttpServerConfig::default(),
            registry: RegistryConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - SPECHUB_HTTP_ADDR: HTTP listen address (default: 127.0.0.1:47200)
    /// - SPECHUB_ENABLE_CORS: Enable CORS (default: true)
    /// - SPECHUB_AUTH_TOKEN: Shared secret for the auth gate
    /// - SPECHUB_SPEC_TTL_SECS: Spec cache TTL in seconds (default: 300)
    /// - SPECHUB_FETCH_TIMEOUT_SECS: Spec fetch timeout in seconds (default: 10)
    /// - SPECHUB_CALL_TIMEOUT_SECS: Proxied call timeout in seconds (default: 30)
    ///
    /// Service entries themselves come from `SPECHUB_SERVICES` and the
    /// `*_SERVICE_URL` / `*_WORKER_URL` patterns, resolved by the directory.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overlay environment variables onto an already-loaded configuration
    pub fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var("SPECHUB_HTTP_ADDR") {
            self.server.listen_addr = addr;
        }
        if let Ok(cors) = std::env::var("SPECHUB_ENABLE_CORS") {
            self.server.enable_cors = cors.parse().unwrap_or(true);
        }
        if let Ok(token) = std::env::var("SPECHUB_AUTH_TOKEN") {
            if !token.is_empty() {
                self.auth.token = Some(token);
            }
        }
        if let Ok(ttl) = std::env::var("SPECHUB_SPEC_TTL_SECS") {
            if let Ok(val) = ttl.parse() {
                self.registry.spec_ttl_secs = val;
            }
        }
        if let Ok(timeout) = std::env::var("SPECHUB_FETCH_TIMEOUT_SECS") {
            if let Ok(val) = timeout.parse() {
                self.registry.fetch_timeout_secs = val;
            }
        }
        if let Ok(timeout) = std::env::var("SPECHUB_CALL_TIMEOUT_SECS") {
            if let Ok(val) = timeout.parse() {
                self.registry.call_timeout_secs = val;
            }
        }
    }

    /// Load configuration: file if given, then environment overlay
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            anyhow::bail!("Invalid listen address: {}", self.server.listen_addr);
        }
        if self.registry.fetch_timeout_secs == 0 {
            anyhow::bail!("fetch_timeout_secs must be non-zero");
        }
        if self.registry.call_timeout_secs == 0 {
            anyhow::bail!("call_timeout_secs must be non-zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.server.listen_addr, "127.0.0.1:47200");
        assert_eq!(config.registry.spec_ttl_secs, 300);
        assert_eq!(config.registry.fetch_timeout_secs, 10);
        assert_eq!(config.registry.call_timeout_secs, 30);
        assert!(config.auth.token.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
listen_addr = "0.0.0.0:9000"

[registry]
spec_ttl_secs = 60

[registry.services]
billing = "http://billing.internal:8080"

[auth]
token = "s3cret"
"#
        )
        .unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.listen_addr, "0.0.0.0:9000");
        assert_eq!(config.registry.spec_ttl_secs, 60);
        assert_eq!(
            config.registry.services.get("billing").map(String::as_str),
            Some("http://billing.internal:8080")
        );
        assert_eq!(config.auth.token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_validate_rejects_bad_addr() {
        let mut config = ServerConfig::default();
        config.server.listen_addr = "not-an-addr".to_string();
        assert!(config.validate().is_err());
    }
}
