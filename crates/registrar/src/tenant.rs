//! Per-tenant registrar configuration.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use common::TenantId;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

/// Registrar credentials and endpoints for one tenant.
#[derive(Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    /// Tenant this configuration belongs to.
    pub tenant_id: TenantId,
    /// DOI prefix assigned to the tenant, e.g. `10.5072`.
    pub prefix: String,
    /// Registrar account (repository) name.
    pub username: String,
    /// Registrar account password.
    #[serde(skip_serializing)]
    pub password: String,
    /// Base URL of the legacy metadata API.
    pub mds_url: Url,
    /// Base URL of the REST API.
    pub rest_url: Url,
}

impl TenantConfig {
    /// Checks that every field needed to call the registrar is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let incomplete = |field: &'static str, reason: &str| ConfigError::Incomplete {
            tenant: self.tenant_id.clone(),
            field,
            reason: reason.to_string(),
        };

        if self.tenant_id.as_str().trim().is_empty() {
            return Err(incomplete("tenant_id", "is empty"));
        }
        if !self.prefix.starts_with("10.") || self.prefix.len() <= 3 || self.prefix.contains('/')
        {
            return Err(incomplete("prefix", "must look like 10.NNNN"));
        }
        if self.username.trim().is_empty() {
            return Err(incomplete("username", "is empty"));
        }
        if self.password.is_empty() {
            return Err(incomplete("password", "is empty"));
        }
        for (field, url) in [("mds_url", &self.mds_url), ("rest_url", &self.rest_url)] {
            if !matches!(url.scheme(), "http" | "https") || url.host().is_none() {
                return Err(incomplete(field, "must be an http(s) URL with a host"));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for TenantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantConfig")
            .field("tenant_id", &self.tenant_id)
            .field("prefix", &self.prefix)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("mds_url", &self.mds_url.as_str())
            .field("rest_url", &self.rest_url.as_str())
            .finish()
    }
}

/// Read-only lookup of tenant configuration.
///
/// Loaded once at process start and shared between concurrent saga runs.
/// Cloning is cheap.
#[derive(Debug, Clone, Default)]
pub struct TenantConfigProvider {
    tenants: Arc<HashMap<TenantId, TenantConfig>>,
}

impl TenantConfigProvider {
    /// Builds a provider from validated configurations.
    pub fn new(configs: impl IntoIterator<Item = TenantConfig>) -> Result<Self, ConfigError> {
        let mut tenants = HashMap::new();
        for config in configs {
            config.validate()?;
            let tenant_id = config.tenant_id.clone();
            if tenants.insert(tenant_id.clone(), config).is_some() {
                return Err(ConfigError::DuplicateTenant(tenant_id));
            }
        }
        Ok(Self {
            tenants: Arc::new(tenants),
        })
    }

    /// Parses a JSON array of tenant configurations.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let configs: Vec<TenantConfig> = serde_json::from_str(json)?;
        Self::new(configs)
    }

    /// Reads a JSON array of tenant configurations from a file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Returns the configuration for a tenant.
    pub fn get(&self, tenant_id: &TenantId) -> Result<&TenantConfig, ConfigError> {
        self.tenants
            .get(tenant_id)
            .ok_or_else(|| ConfigError::UnknownTenant(tenant_id.clone()))
    }

    /// Returns the number of configured tenants.
    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    /// Returns true if no tenants are configured.
    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(tenant: &str) -> TenantConfig {
        TenantConfig {
            tenant_id: TenantId::new(tenant),
            prefix: "10.5072".to_string(),
            username: "UNIT.REPO".to_string(),
            password: "secret".to_string(),
            mds_url: Url::parse("https://mds.test.datacite.org").unwrap(),
            rest_url: Url::parse("https://api.test.datacite.org").unwrap(),
        }
    }

    #[test]
    fn test_lookup_known_tenant() {
        let provider = TenantConfigProvider::new([config("a"), config("b")]).unwrap();
        assert_eq!(provider.len(), 2);
        let found = provider.get(&TenantId::new("a")).unwrap();
        assert_eq!(found.prefix, "10.5072");
    }

    #[test]
    fn test_unknown_tenant_is_configuration_error() {
        let provider = TenantConfigProvider::new([config("a")]).unwrap();
        let err = provider.get(&TenantId::new("missing")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTenant(t) if t.as_str() == "missing"));
    }

    #[test]
    fn test_incomplete_config_rejected() {
        let mut no_password = config("a");
        no_password.password.clear();
        assert!(matches!(
            TenantConfigProvider::new([no_password]),
            Err(ConfigError::Incomplete {
                field: "password",
                ..
            })
        ));

        let mut bad_prefix = config("a");
        bad_prefix.prefix = "5072".to_string();
        assert!(matches!(
            bad_prefix.validate(),
            Err(ConfigError::Incomplete { field: "prefix", .. })
        ));

        let mut bad_url = config("a");
        bad_url.mds_url = Url::parse("ftp://mds.example").unwrap();
        assert!(matches!(
            bad_url.validate(),
            Err(ConfigError::Incomplete {
                field: "mds_url",
                ..
            })
        ));
    }

    #[test]
    fn test_duplicate_tenant_rejected() {
        let result = TenantConfigProvider::new([config("a"), config("a")]);
        assert!(matches!(result, Err(ConfigError::DuplicateTenant(_))));
    }

    #[test]
    fn test_from_json_str() {
        let json = r#"[{
            "tenant_id": "unit",
            "prefix": "10.5072",
            "username": "UNIT.REPO",
            "password": "pw",
            "mds_url": "https://mds.test.datacite.org",
            "rest_url": "https://api.test.datacite.org"
        }]"#;
        let provider = TenantConfigProvider::from_json_str(json).unwrap();
        assert!(provider.get(&TenantId::new("unit")).is_ok());

        assert!(matches!(
            TenantConfigProvider::from_json_str("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", config("a"));
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("secret"));
    }
}
