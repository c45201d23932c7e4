// Copyright 2024 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! X.509 certificates as seen by the validators.
//!
//! A [`Certificate`] is parsed once and never changes afterwards. Validators
//! share certificates through `Arc<Certificate>` and compare them by the
//! SHA-256 fingerprint of their DER encoding.

use std::{
    collections::BTreeSet,
    fmt,
    hash::{Hash, Hasher},
};

use chrono::{DateTime, Utc};
use thiserror::Error;

mod builder;
pub use builder::CertificateBuilder;

mod extension;
pub use extension::{key_usage, CertificateExtension};
pub(crate) use extension::default_required_extensions;

mod parse;

/// Describes errors that can occur when decoding a certificate.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum CertificateError {
    #[error("unable to parse certificate: {0}")]
    Parse(String),

    #[error("unable to decode PEM: {0}")]
    Pem(String),

    #[error("certificate validity date is out of range")]
    InvalidTime,
}

/// A distinguished name.
///
/// Names compare by their DER encoding. The display form is only used in
/// report messages.
#[derive(Clone, Debug)]
pub struct Name {
    der: Vec<u8>,
    display: String,
}

impl Name {
    pub fn new(der: Vec<u8>, display: impl Into<String>) -> Self {
        Self {
            der,
            display: display.into(),
        }
    }

    /// DER encoding of the name, including the outer SEQUENCE.
    pub fn der(&self) -> &[u8] {
        &self.der
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.der.hash(state);
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

/// Value of the basic constraints extension.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BasicConstraints {
    pub ca: bool,
    pub path_len: Option<u32>,
}

/// An immutable, parsed X.509 certificate.
#[derive(Clone, Debug)]
pub struct Certificate {
    pub(crate) der: Vec<u8>,
    pub(crate) fingerprint: Vec<u8>,
    pub(crate) subject: Name,
    pub(crate) issuer: Name,
    pub(crate) serial: Vec<u8>,
    pub(crate) not_before: DateTime<Utc>,
    pub(crate) not_after: DateTime<Utc>,
    pub(crate) key_usage: Option<u16>,
    pub(crate) basic_constraints: Option<BasicConstraints>,
    pub(crate) extended_key_usage: Option<Vec<String>>,
    pub(crate) extension_oids: BTreeSet<String>,
    pub(crate) ocsp_urls: Vec<String>,
    pub(crate) ca_issuer_urls: Vec<String>,
    pub(crate) crl_urls: Vec<String>,
    pub(crate) spki: Vec<u8>,
    pub(crate) public_key: Vec<u8>,
    pub(crate) tbs: Vec<u8>,
    pub(crate) signature_algorithm: String,
    pub(crate) signature: Vec<u8>,
}

impl Certificate {
    /// Parse a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self, CertificateError> {
        parse::certificate_from_der(der)
    }

    /// Parse every certificate in a PEM bundle.
    ///
    /// Blocks with a label other than `CERTIFICATE` are skipped.
    pub fn from_pem_bundle(pem: &[u8]) -> Result<Vec<Self>, CertificateError> {
        parse::certificates_from_pem(pem)
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// SHA-256 hash of the DER encoding.
    pub fn fingerprint(&self) -> &[u8] {
        &self.fingerprint
    }

    pub fn subject(&self) -> &Name {
        &self.subject
    }

    pub fn issuer(&self) -> &Name {
        &self.issuer
    }

    /// Serial number as big-endian bytes without leading zeros.
    pub fn serial(&self) -> &[u8] {
        &self.serial
    }

    /// Serial number as an upper case hex string, for messages.
    pub fn serial_hex(&self) -> String {
        hex::encode_upper(&self.serial)
    }

    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// Key usage bits as defined in [`key_usage`], if the extension is
    /// present.
    pub fn key_usage(&self) -> Option<u16> {
        self.key_usage
    }

    pub fn basic_constraints(&self) -> Option<BasicConstraints> {
        self.basic_constraints
    }

    /// Extended key usage OIDs, if the extension is present.
    pub fn extended_key_usage(&self) -> Option<&[String]> {
        self.extended_key_usage.as_deref()
    }

    /// Return `true` if an extension with this OID is present.
    pub fn has_extension(&self, oid: &str) -> bool {
        self.extension_oids.contains(oid)
    }

    pub fn ocsp_urls(&self) -> &[String] {
        &self.ocsp_urls
    }

    pub fn ca_issuer_urls(&self) -> &[String] {
        &self.ca_issuer_urls
    }

    pub fn crl_urls(&self) -> &[String] {
        &self.crl_urls
    }

    /// DER encoding of the subject public key info.
    pub fn spki(&self) -> &[u8] {
        &self.spki
    }

    /// Content of the subject public key BIT STRING.
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// DER encoding of the to-be-signed part of the certificate.
    pub fn tbs(&self) -> &[u8] {
        &self.tbs
    }

    pub fn signature_algorithm(&self) -> &str {
        &self.signature_algorithm
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Return `true` if subject and issuer are the same name.
    pub fn is_self_issued(&self) -> bool {
        self.subject == self.issuer
    }

    pub fn is_ca(&self) -> bool {
        self.basic_constraints.is_some_and(|bc| bc.ca)
    }

    /// Return `true` if `date` lies within the validity period.
    pub fn is_valid_at(&self, date: DateTime<Utc>) -> bool {
        self.not_before <= date && date <= self.not_after
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint
    }
}

impl Eq for Certificate {}

impl Hash for Certificate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fingerprint.hash(state);
    }
}

impl fmt::Display for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (serial {})", self.subject, self.serial_hex())
    }
}

/// Remove leading zero bytes from a big-endian integer, keeping at least one
/// byte.
pub(crate) fn trim_serial(serial: &[u8]) -> Vec<u8> {
    let start = serial
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(serial.len().saturating_sub(1));
    serial[start..].to_vec()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn trims_leading_zeros() {
        assert_eq!(trim_serial(&[0, 0, 0x80, 1]), vec![0x80, 1]);
        assert_eq!(trim_serial(&[0x20, 0x01]), vec![0x20, 0x01]);
        assert_eq!(trim_serial(&[0, 0]), vec![0]);
        assert!(trim_serial(&[]).is_empty());
    }
}
