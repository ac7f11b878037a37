//! Certificate parsing and trust verification against the current CA.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::*;

use crate::ca::CertificateAuthority;
use crate::error::{Error, Result};
use crate::types::CertificateInfo;

/// Parses and validates arbitrary PEM certificates against the current CA.
#[derive(Debug, Clone)]
pub struct CertificateInspector {
    ca: Arc<CertificateAuthority>,
}

impl CertificateInspector {
    /// Creates an inspector backed by an initialized CA.
    #[must_use]
    pub fn new(ca: Arc<CertificateAuthority>) -> Self {
        Self { ca }
    }

    /// Parses a PEM certificate into structured information.
    ///
    /// Works on certificates from any issuer, not only this CA.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for malformed input or a subject without a
    /// common name.
    pub fn parse(&self, cert_pem: &str) -> Result<CertificateInfo> {
        parse_certificate(cert_pem)
    }

    /// Returns `true` iff the certificate was signed by the current CA,
    /// its issuer name equals the CA subject, and the current time falls
    /// within its validity window.
    ///
    /// Every failure mode, including unparsable input, is a `false`
    /// result; validating untrusted input never errors.
    #[must_use]
    pub fn verify(&self, cert_pem: &str) -> bool {
        let ca_der = self.ca.certificate_der();
        match verify_against(cert_pem, &ca_der) {
            Ok(trusted) => trusted,
            Err(e) => {
                debug!("Certificate verification failed: {e}");
                false
            }
        }
    }
}

/// Parses a PEM certificate into a [`CertificateInfo`] projection.
///
/// # Errors
///
/// Returns [`Error::Parse`] if the input is not valid PEM/X.509 or the
/// subject lacks a common name.
pub fn parse_certificate(cert_pem: &str) -> Result<CertificateInfo> {
    let (_, pem) = parse_x509_pem(cert_pem.as_bytes())
        .map_err(|e| Error::Parse(format!("not valid PEM: {e}")))?;
    CertificateInfo::from_der(&pem.contents)
}

/// Checks whether a certificate has expired.
#[must_use]
pub fn is_expired(info: &CertificateInfo) -> bool {
    info.not_after < Utc::now()
}

/// Checks whether a certificate is not yet valid.
#[must_use]
pub fn is_not_yet_valid(info: &CertificateInfo) -> bool {
    info.not_before > Utc::now()
}

/// Checks whether a certificate is currently within its validity window.
#[must_use]
pub fn is_valid_now(info: &CertificateInfo) -> bool {
    !is_expired(info) && !is_not_yet_valid(info)
}

/// Returns the duration until expiry, or `None` if already expired.
#[must_use]
pub fn remaining_validity(info: &CertificateInfo) -> Option<chrono::Duration> {
    let now = Utc::now();
    if info.not_after > now {
        Some(info.not_after - now)
    } else {
        None
    }
}

/// The actual trust decision: issuer match, signature, validity window.
fn verify_against(cert_pem: &str, ca_der: &[u8]) -> Result<bool> {
    let (_, pem) = parse_x509_pem(cert_pem.as_bytes())
        .map_err(|e| Error::Parse(format!("not valid PEM: {e}")))?;
    let (_, cert) = X509Certificate::from_der(&pem.contents)
        .map_err(|e| Error::Parse(format!("not a valid certificate: {e}")))?;
    let (_, ca_cert) = X509Certificate::from_der(ca_der)
        .map_err(|e| Error::Parse(format!("CA certificate unparsable: {e}")))?;

    // Issuer name must exactly equal the CA's current subject name.
    if cert.issuer() != ca_cert.subject() {
        debug!("Issuer does not match CA subject");
        return Ok(false);
    }

    if cert.verify_signature(Some(ca_cert.public_key())).is_err() {
        debug!("Signature verification failed");
        return Ok(false);
    }

    let now = Utc::now().timestamp();
    if now < cert.validity().not_before.timestamp()
        || now > cert.validity().not_after.timestamp()
    {
        debug!("Certificate outside its validity window");
        return Ok(false);
    }

    Ok(true)
}
