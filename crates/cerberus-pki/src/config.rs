//! Certificate Authority configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default validity period for leaf certificates, in days.
pub const DEFAULT_LEAF_VALIDITY_DAYS: u32 = 365;

/// Configuration for the Certificate Authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaConfig {
    /// Directory holding `ca.crt` and `ca.key`; created if absent.
    pub ca_dir: PathBuf,
    /// Subject/issuer common name of the self-signed CA certificate.
    pub common_name: String,
    /// Subject organization of the CA certificate.
    pub organization: String,
    /// CA certificate lifetime in days.
    pub validity_days: u32,
}

impl Default for CaConfig {
    fn default() -> Self {
        Self {
            ca_dir: PathBuf::from("/data/ca"),
            common_name: "Cerberus Root CA".to_string(),
            organization: "Cerberus NGFW".to_string(),
            validity_days: 3650,
        }
    }
}

impl CaConfig {
    /// Creates a configuration rooted at `ca_dir` with default identity fields.
    #[must_use]
    pub fn new(ca_dir: impl Into<PathBuf>) -> Self {
        Self {
            ca_dir: ca_dir.into(),
            ..Self::default()
        }
    }

    /// Sets the CA common name.
    #[must_use]
    pub fn with_common_name(mut self, common_name: impl Into<String>) -> Self {
        self.common_name = common_name.into();
        self
    }

    /// Sets the CA organization.
    #[must_use]
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = organization.into();
        self
    }

    /// Sets the CA certificate validity in days.
    #[must_use]
    pub const fn with_validity_days(mut self, days: u32) -> Self {
        self.validity_days = days;
        self
    }

    /// Path to the CA certificate file.
    #[must_use]
    pub fn cert_path(&self) -> PathBuf {
        self.ca_dir.join("ca.crt")
    }

    /// Path to the CA private key file.
    #[must_use]
    pub fn key_path(&self) -> PathBuf {
        self.ca_dir.join("ca.key")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_service_defaults() {
        let config = CaConfig::default();
        assert_eq!(config.ca_dir, PathBuf::from("/data/ca"));
        assert_eq!(config.common_name, "Cerberus Root CA");
        assert_eq!(config.organization, "Cerberus NGFW");
        assert_eq!(config.validity_days, 3650);
    }

    #[test]
    fn file_paths_are_rooted_at_ca_dir() {
        let config = CaConfig::new("/tmp/pki-test");
        assert_eq!(config.cert_path(), PathBuf::from("/tmp/pki-test/ca.crt"));
        assert_eq!(config.key_path(), PathBuf::from("/tmp/pki-test/ca.key"));
    }

    #[test]
    fn builder_style_overrides() {
        let config = CaConfig::new("/tmp/ca")
            .with_common_name("Edge CA")
            .with_organization("Edge Org")
            .with_validity_days(730);
        assert_eq!(config.common_name, "Edge CA");
        assert_eq!(config.organization, "Edge Org");
        assert_eq!(config.validity_days, 730);
    }

    #[test]
    fn config_serialization_round_trip() {
        let config = CaConfig::new("/var/lib/cerberus/ca").with_validity_days(1825);
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: CaConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.ca_dir, config.ca_dir);
        assert_eq!(deserialized.validity_days, 1825);
    }
}
