//! PKI (Public Key Infrastructure) for Cerberus NGFW.
#![forbid(unsafe_code)]
//!
//! This crate provides the certificate authority backing the firewall's
//! VPN bundles and TLS inspection: self-signed CA issuance with on-disk
//! persistence and recovery, server/client leaf certificate signing, and
//! verification of arbitrary certificates against the current CA.
//!
//! # Overview
//!
//! The `cerberus-pki` crate enables:
//! - Creating, persisting, loading, and regenerating a Certificate
//!   Authority (4096-bit RSA, self-signed)
//! - Issuing 2048-bit RSA leaf certificates for TLS servers and clients
//! - Parsing arbitrary PEM certificates into structured info
//! - Verifying certificates against the current CA trust root
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cerberus_pki::{CaConfig, CertificateAuthority, CertificateInspector, CertificateIssuer};
//!
//! // Load or create the CA in the configured directory.
//! let config = CaConfig::new("/data/ca").with_common_name("Cerberus Root CA");
//! let ca = Arc::new(CertificateAuthority::initialize(config).unwrap());
//!
//! // Mint a server certificate for the VPN endpoint.
//! let issuer = CertificateIssuer::new(ca.clone());
//! let (cert_pem, key_pem) = issuer.issue_server_certificate("vpn.example.com", 365).unwrap();
//!
//! // Validate it against the CA.
//! let inspector = CertificateInspector::new(ca);
//! assert!(inspector.verify(&cert_pem));
//! # let _ = key_pem;
//! ```
//!
//! # Modules
//!
//! - [`ca`] - Certificate Authority lifecycle and persistence
//! - [`issuer`] - Leaf certificate issuance
//! - [`inspector`] - Certificate parsing and verification
//! - [`config`] - CA configuration
//! - [`types`] - Core types (`CertificateInfo`, `LeafRequest`, `PrivateKeyPem`)
//! - [`error`] - Error types

pub mod ca;
pub mod config;
pub mod error;
pub mod inspector;
pub mod issuer;
pub mod types;

mod keys;

// Re-export commonly used types at crate root
pub use ca::CertificateAuthority;
pub use config::{CaConfig, DEFAULT_LEAF_VALIDITY_DAYS};
pub use error::{Error, Result};
pub use inspector::{
    is_expired, is_not_yet_valid, is_valid_now, parse_certificate, remaining_validity,
    CertificateInspector,
};
pub use issuer::CertificateIssuer;
pub use types::{CertificateInfo, LeafProfile, LeafRequest, LeafRequestBuilder, PrivateKeyPem};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn full_workflow_test() {
        // 1. Initialize the CA
        let dir = tempfile::tempdir().unwrap();
        let config = CaConfig::new(dir.path())
            .with_common_name("Test Root CA")
            .with_validity_days(3650);
        let ca = Arc::new(CertificateAuthority::initialize(config).unwrap());

        let ca_info = ca.info().unwrap();
        assert!(ca_info.is_ca);
        assert_eq!(ca_info.subject_cn, "Test Root CA");

        // 2. Issue a server certificate
        let issuer = CertificateIssuer::new(ca.clone());
        let (server_cert, server_key) = issuer
            .issue_server_certificate("vpn.example.com", 90)
            .unwrap();
        assert!(server_key.pem().contains("PRIVATE KEY"));

        // 3. Issue a client certificate (for VPN client bundles)
        let (client_cert, _client_key) = issuer
            .issue_client_certificate("laptop-01", Some("admin@example.com"), 365)
            .unwrap();

        // 4. Inspect and verify
        let inspector = CertificateInspector::new(ca.clone());

        let server_info = inspector.parse(&server_cert).unwrap();
        assert_eq!(server_info.subject_cn, "vpn.example.com");
        assert_eq!(server_info.issuer_cn, "Test Root CA");
        assert!(!server_info.is_ca);

        assert!(inspector.verify(&server_cert));
        assert!(inspector.verify(&client_cert));

        // The CA certificate itself is not "issued by" the CA chain check
        // in the leaf sense, but it parses.
        let ca_parsed = inspector.parse(&ca.certificate_pem()).unwrap();
        assert_eq!(ca_parsed.fingerprint_sha256, ca.fingerprint());
    }
}
