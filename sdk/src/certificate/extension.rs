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

use std::fmt;

use crate::{certificate::Certificate, crypto::oids};

/// Key usage bits in the order used by [`Certificate::key_usage`].
pub mod key_usage {
    pub const DIGITAL_SIGNATURE: u16 = 1 << 0;
    pub const NON_REPUDIATION: u16 = 1 << 1;
    pub const KEY_ENCIPHERMENT: u16 = 1 << 2;
    pub const DATA_ENCIPHERMENT: u16 = 1 << 3;
    pub const KEY_AGREEMENT: u16 = 1 << 4;
    pub const KEY_CERT_SIGN: u16 = 1 << 5;
    pub const CRL_SIGN: u16 = 1 << 6;
    pub const ENCIPHER_ONLY: u16 = 1 << 7;
    pub const DECIPHER_ONLY: u16 = 1 << 8;
}

/// A certificate extension that a certificate must carry to be accepted in
/// a given role.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CertificateExtension {
    /// Every listed key usage bit must be set.
    KeyUsage(u16),

    /// Every listed extended key usage must be present, unless the
    /// certificate allows any extended key usage.
    ExtendedKeyUsage(Vec<String>),

    /// The certificate must be a CA when `ca` is set, and its path length
    /// constraint, if any, must be at least `path_len`.
    BasicConstraints { ca: bool, path_len: Option<u32> },

    /// The certificate must be a CA whose path length constraint covers the
    /// number of CA certificates below it in the chain being validated.
    DynamicBasicConstraints,
}

impl CertificateExtension {
    /// OID of the extension this requirement applies to.
    pub fn oid(&self) -> &'static str {
        match self {
            Self::KeyUsage(_) => oids::KEY_USAGE,
            Self::ExtendedKeyUsage(_) => oids::EXTENDED_KEY_USAGE,
            Self::BasicConstraints { .. } | Self::DynamicBasicConstraints => {
                oids::BASIC_CONSTRAINTS
            }
        }
    }

    /// Return `true` if `certificate` satisfies this requirement.
    ///
    /// `issuer_level` is zero for the certificate a chain walk started from,
    /// one for its issuer and so on.
    pub fn is_satisfied_by(&self, certificate: &Certificate, issuer_level: usize) -> bool {
        match self {
            Self::KeyUsage(bits) => certificate
                .key_usage()
                .is_some_and(|usage| usage & bits == *bits),

            Self::ExtendedKeyUsage(required) => {
                certificate.extended_key_usage().is_some_and(|usages| {
                    usages.iter().any(|u| u == oids::EKU_ANY)
                        || required.iter().all(|r| usages.contains(r))
                })
            }

            Self::BasicConstraints { ca, path_len } => {
                let Some(bc) = certificate.basic_constraints() else {
                    return !*ca && path_len.is_none();
                };
                if *ca && !bc.ca {
                    return false;
                }
                match (path_len, bc.path_len) {
                    (Some(required), Some(actual)) => actual >= *required,
                    _ => true,
                }
            }

            Self::DynamicBasicConstraints => {
                let Some(bc) = certificate.basic_constraints() else {
                    return false;
                };
                let below = issuer_level.saturating_sub(1);
                bc.ca && bc.path_len.map_or(true, |len| len as usize >= below)
            }
        }
    }
}

impl fmt::Display for CertificateExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyUsage(bits) => write!(f, "{} (key usage {bits:#06x})", self.oid()),
            Self::ExtendedKeyUsage(usages) => {
                write!(f, "{} ({})", self.oid(), usages.join(", "))
            }
            Self::BasicConstraints { ca, path_len } => match path_len {
                Some(len) => write!(f, "{} (CA={ca}, pathLen>={len})", self.oid()),
                None => write!(f, "{} (CA={ca})", self.oid()),
            },
            Self::DynamicBasicConstraints => write!(f, "{} (CA=true)", self.oid()),
        }
    }
}

/// Extensions every certificate playing `source` must carry unless the
/// caller configures otherwise.
pub(crate) fn default_required_extensions(
    source: crate::context::CertificateSource,
) -> Vec<CertificateExtension> {
    use crate::context::CertificateSource;

    match source {
        CertificateSource::CertIssuer => vec![
            CertificateExtension::KeyUsage(key_usage::KEY_CERT_SIGN),
            CertificateExtension::DynamicBasicConstraints,
        ],
        CertificateSource::OcspIssuer => vec![CertificateExtension::ExtendedKeyUsage(vec![
            oids::EKU_OCSP_SIGNING.to_owned(),
        ])],
        CertificateSource::CrlIssuer => {
            vec![CertificateExtension::KeyUsage(key_usage::CRL_SIGN)]
        }
        CertificateSource::Timestamp => vec![CertificateExtension::ExtendedKeyUsage(vec![
            oids::EKU_TIME_STAMPING.to_owned(),
        ])],
        _ => Vec::new(),
    }
}
