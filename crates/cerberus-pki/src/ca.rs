//! Certificate Authority: load-or-create lifecycle, persistence, regeneration.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair, KeyUsagePurpose};
use sha2::{Digest, Sha256};
use ::time::OffsetDateTime;
use tracing::{debug, info, warn};
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::*;

use crate::config::CaConfig;
use crate::error::{Error, Result};
use crate::keys::{self, CA_KEY_BITS};
use crate::types::{CertificateInfo, PrivateKeyPem};

/// Subject country embedded alongside the configured organization and CN.
const SUBJECT_COUNTRY: &str = "US";

/// In-memory CA material. Replaced wholesale on regeneration; certificate
/// and key only ever travel together.
struct CaMaterial {
    /// Canonical PEM as written to `ca.crt`.
    cert_pem: String,
    /// DER encoding of the CA certificate.
    cert_der: Vec<u8>,
    /// rcgen certificate used as the issuer when signing leaves.
    signer: rcgen::Certificate,
    /// rcgen key pair for signing.
    key_pair: KeyPair,
    /// Private key PEM as written to `ca.key`.
    key_pem: PrivateKeyPem,
}

/// Certificate Authority owning the long-term keypair and self-signed
/// certificate.
///
/// Read operations (issuance, verification, accessors) run in parallel
/// against a stable CA state; [`CertificateAuthority::regenerate`] takes
/// the write half of the internal lock and replaces the state atomically.
pub struct CertificateAuthority {
    config: CaConfig,
    state: RwLock<CaMaterial>,
}

impl CertificateAuthority {
    /// Initializes the CA: ensures the configured directory exists, loads
    /// the existing material, or creates and persists a fresh CA when no
    /// material is present.
    ///
    /// Files that are present but unparsable are an error rather than a
    /// trigger for silent re-creation, so real corruption is surfaced
    /// instead of masked. An incomplete pair (only one of `ca.crt` /
    /// `ca.key` on disk) is treated as absent and both files are recreated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] if existing material cannot be parsed, or
    /// [`Error::Generation`] if creating a fresh CA fails. Either is a
    /// fatal startup condition for dependent components.
    pub fn initialize(config: CaConfig) -> Result<Self> {
        fs::create_dir_all(&config.ca_dir).map_err(|e| {
            Error::Generation(format!(
                "failed to create CA directory {}: {e}",
                config.ca_dir.display()
            ))
        })?;

        let cert_exists = config.cert_path().exists();
        let key_exists = config.key_path().exists();

        let material = if cert_exists && key_exists {
            info!("Loading CA material from {}", config.ca_dir.display());
            Self::load_material(&config)?
        } else {
            if cert_exists || key_exists {
                warn!(
                    "Incomplete CA material in {}, recreating both files",
                    config.ca_dir.display()
                );
            }
            info!("Creating new Certificate Authority: {}", config.common_name);
            let material = Self::generate_material(&config)?;
            Self::persist_material(&config, &material)?;
            material
        };

        Ok(Self {
            config,
            state: RwLock::new(material),
        })
    }

    /// Returns the CA configuration.
    #[must_use]
    pub const fn config(&self) -> &CaConfig {
        &self.config
    }

    /// Returns the CA certificate in PEM form.
    #[must_use]
    pub fn certificate_pem(&self) -> String {
        self.state.read().cert_pem.clone()
    }

    /// Returns the DER encoding of the CA certificate.
    #[must_use]
    pub fn certificate_der(&self) -> Vec<u8> {
        self.state.read().cert_der.clone()
    }

    /// Returns the SHA-256 fingerprint of the CA certificate as a
    /// lowercase hex string.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(&self.state.read().cert_der))
    }

    /// Returns structured information about the CA certificate.
    ///
    /// # Errors
    ///
    /// Returns an error if the held certificate cannot be parsed.
    pub fn info(&self) -> Result<CertificateInfo> {
        CertificateInfo::from_der(&self.state.read().cert_der)
    }

    /// Generates a new CA keypair and certificate, persists both files,
    /// and replaces the in-memory state.
    ///
    /// This is destructive: certificates signed by the previous CA are no
    /// longer verifiable afterwards. There is no rollover protocol.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation, certificate building, or
    /// persistence fails; the previous state is kept in that case.
    pub fn regenerate(&self) -> Result<CertificateInfo> {
        info!("Regenerating Certificate Authority: {}", self.config.common_name);

        let material = Self::generate_material(&self.config)?;
        Self::persist_material(&self.config, &material)?;
        let info = CertificateInfo::from_der(&material.cert_der)?;

        *self.state.write() = material;

        warn!("CA regenerated; previously issued certificates are no longer verifiable");
        Ok(info)
    }

    /// Signs prepared leaf parameters with the current CA key.
    ///
    /// The read lock is held for the whole signing operation so a
    /// concurrent regeneration can never produce a certificate from a
    /// half-replaced key.
    pub(crate) fn sign_leaf(&self, params: CertificateParams, leaf_key: &KeyPair) -> Result<String> {
        let state = self.state.read();
        let cert = params
            .signed_by(leaf_key, &state.signer, &state.key_pair)
            .map_err(|e| Error::Generation(format!("failed to sign certificate: {e}")))?;
        Ok(cert.pem())
    }

    /// Reads and validates CA material from disk.
    fn load_material(config: &CaConfig) -> Result<CaMaterial> {
        let cert_path = config.cert_path();
        let key_path = config.key_path();

        let cert_pem = fs::read_to_string(&cert_path)
            .map_err(|e| Error::Load(format!("failed to read {}: {e}", cert_path.display())))?;
        let key_pem = fs::read_to_string(&key_path)
            .map_err(|e| Error::Load(format!("failed to read {}: {e}", key_path.display())))?;

        let (_, pem) = parse_x509_pem(cert_pem.as_bytes())
            .map_err(|e| Error::Load(format!("CA certificate is not valid PEM: {e}")))?;
        let cert_der = pem.contents;

        let key_pair = KeyPair::from_pem(&key_pem)
            .map_err(|e| Error::Load(format!("CA private key is unparsable: {e}")))?;

        {
            let (_, cert) = X509Certificate::from_der(&cert_der)
                .map_err(|e| Error::Load(format!("CA certificate is not valid X.509: {e}")))?;
            if cert.public_key().raw != key_pair.public_key_der().as_slice() {
                return Err(Error::Load(
                    "CA private key does not match CA certificate".into(),
                ));
            }
        }

        // Rebuild rcgen signing state from the stored certificate so leaf
        // issuer names match the on-disk CA exactly.
        let params = CertificateParams::from_ca_cert_pem(&cert_pem)
            .map_err(|e| Error::Load(format!("failed to rebuild signing parameters: {e}")))?;
        let signer = params
            .self_signed(&key_pair)
            .map_err(|e| Error::Load(format!("failed to rebuild signing certificate: {e}")))?;

        debug!("CA material loaded successfully");

        Ok(CaMaterial {
            cert_pem,
            cert_der,
            signer,
            key_pair,
            key_pem: PrivateKeyPem::new(key_pem),
        })
    }

    /// Generates a fresh CA keypair and self-signed certificate.
    fn generate_material(config: &CaConfig) -> Result<CaMaterial> {
        let (key_pair, key_pem) = keys::generate_rsa_key(CA_KEY_BITS)?;

        let mut params = CertificateParams::default();
        params
            .distinguished_name
            .push(DnType::CountryName, SUBJECT_COUNTRY);
        params
            .distinguished_name
            .push(DnType::OrganizationName, &config.organization);
        params
            .distinguished_name
            .push(DnType::CommonName, &config.common_name);

        params.is_ca = IsCa::Ca(BasicConstraints::Constrained(1));
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
        params.serial_number = Some(keys::random_serial());

        let now = Utc::now();
        params.not_before = to_rcgen_time(now)?;
        params.not_after = to_rcgen_time(now + Duration::days(i64::from(config.validity_days)))?;

        let signer = params
            .self_signed(&key_pair)
            .map_err(|e| Error::Generation(format!("failed to self-sign CA certificate: {e}")))?;

        let cert_pem = signer.pem();
        let cert_der = signer.der().to_vec();

        debug!("CA root certificate created for {}", config.common_name);

        Ok(CaMaterial {
            cert_pem,
            cert_der,
            signer,
            key_pair,
            key_pem,
        })
    }

    /// Writes certificate and key to disk, restricting key permissions.
    fn persist_material(config: &CaConfig, material: &CaMaterial) -> Result<()> {
        let cert_path = config.cert_path();
        let key_path = config.key_path();

        fs::write(&cert_path, &material.cert_pem)
            .map_err(|e| Error::Generation(format!("failed to write {}: {e}", cert_path.display())))?;
        fs::write(&key_path, material.key_pem.pem())
            .map_err(|e| Error::Generation(format!("failed to write {}: {e}", key_path.display())))?;

        restrict_key_permissions(&key_path)?;

        info!("CA material persisted to {}", config.ca_dir.display());
        Ok(())
    }
}

impl std::fmt::Debug for CertificateAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateAuthority")
            .field("common_name", &self.config.common_name)
            .field("ca_dir", &self.config.ca_dir)
            .field("key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Converts a chrono `DateTime` to rcgen `OffsetDateTime`.
pub(crate) fn to_rcgen_time(dt: DateTime<Utc>) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(dt.timestamp())
        .map_err(|e| Error::Generation(format!("invalid timestamp: {e}")))
}

/// Sets `ca.key` to owner read/write only.
#[cfg(unix)]
fn restrict_key_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| {
        Error::Generation(format!(
            "failed to restrict permissions on {}: {e}",
            path.display()
        ))
    })
}

#[cfg(not(unix))]
fn restrict_key_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
