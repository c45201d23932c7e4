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

use std::{collections::HashMap, fmt, sync::Arc};

use crate::{
    certificate::Name,
    check_names::CERTIFICATE_CHECK,
    context::{CertificateSource, ValidationContext},
    report_item,
    trust::trust_scope_for_service_type,
    Certificate, ValidationReport,
};

/// What a trusted certificate may be relied upon for.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TrustScope {
    /// Trusted in every role.
    General,

    /// Trusted as an issuer of other certificates.
    Ca,

    /// Trusted to sign OCSP responses.
    Ocsp,

    /// Trusted to sign CRLs.
    Crl,

    /// Trusted to sign timestamps.
    Timestamp,
}

impl TrustScope {
    fn description(self) -> &'static str {
        match self {
            Self::General => "all purposes",
            Self::Ca => "certificate generation",
            Self::Ocsp => "OCSP response creation",
            Self::Crl => "CRL creation",
            Self::Timestamp => "timestamp creation",
        }
    }

    /// Return `true` if a certificate with this scope may be relied on in
    /// `context`.
    fn applies_in(self, context: &ValidationContext) -> bool {
        match self {
            Self::General => true,
            Self::Ca => context.certificate_source() == CertificateSource::CertIssuer,
            Self::Ocsp => context.has_certificate_source_in_chain(CertificateSource::OcspIssuer),
            Self::Crl => context.has_certificate_source_in_chain(CertificateSource::CrlIssuer),
            Self::Timestamp => {
                context.has_certificate_source_in_chain(CertificateSource::Timestamp)
            }
        }
    }
}

impl fmt::Display for TrustScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

const SCOPES: [TrustScope; 5] = [
    TrustScope::General,
    TrustScope::Ca,
    TrustScope::Ocsp,
    TrustScope::Crl,
    TrustScope::Timestamp,
];

/// Certificates trusted for one or more scopes, indexed by subject name.
///
/// Trust is always evaluated relative to a [`ValidationContext`]: a
/// certificate trusted only for OCSP signing is not trusted when it shows up
/// as the signer of a document.
#[derive(Clone, Debug, Default)]
pub struct TrustedCertificatesStore {
    scopes: HashMap<TrustScope, HashMap<Name, Vec<Arc<Certificate>>>>,
}

impl TrustedCertificatesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust `certificates` for `scope`.
    pub fn add_certificates<I>(&mut self, scope: TrustScope, certificates: I)
    where
        I: IntoIterator<Item = Arc<Certificate>>,
    {
        let by_subject = self.scopes.entry(scope).or_default();
        for certificate in certificates {
            let same_subject = by_subject.entry(certificate.subject().clone()).or_default();
            if !same_subject.iter().any(|c| **c == *certificate) {
                same_subject.push(certificate);
            }
        }
    }

    pub fn add_generally_trusted_certificates<I>(&mut self, certificates: I)
    where
        I: IntoIterator<Item = Arc<Certificate>>,
    {
        self.add_certificates(TrustScope::General, certificates);
    }

    pub fn add_ca_trusted_certificates<I>(&mut self, certificates: I)
    where
        I: IntoIterator<Item = Arc<Certificate>>,
    {
        self.add_certificates(TrustScope::Ca, certificates);
    }

    pub fn add_ocsp_trusted_certificates<I>(&mut self, certificates: I)
    where
        I: IntoIterator<Item = Arc<Certificate>>,
    {
        self.add_certificates(TrustScope::Ocsp, certificates);
    }

    pub fn add_crl_trusted_certificates<I>(&mut self, certificates: I)
    where
        I: IntoIterator<Item = Arc<Certificate>>,
    {
        self.add_certificates(TrustScope::Crl, certificates);
    }

    pub fn add_timestamp_trusted_certificates<I>(&mut self, certificates: I)
    where
        I: IntoIterator<Item = Arc<Certificate>>,
    {
        self.add_certificates(TrustScope::Timestamp, certificates);
    }

    /// Trust `certificates` for the scope implied by an ETSI trust-service
    /// type URI.
    ///
    /// Returns `false`, adding nothing, if the service type is not known.
    pub fn add_certificates_for_service_type<I>(
        &mut self,
        service_type: &str,
        certificates: I,
    ) -> bool
    where
        I: IntoIterator<Item = Arc<Certificate>>,
    {
        match trust_scope_for_service_type(service_type) {
            Some(scope) => {
                self.add_certificates(scope, certificates);
                true
            }
            None => {
                log::debug!("ignoring certificates for unknown service type {service_type}");
                false
            }
        }
    }

    /// Return `true` if `certificate` is trusted for `scope`.
    pub fn is_trusted_for(&self, certificate: &Certificate, scope: TrustScope) -> bool {
        self.scopes
            .get(&scope)
            .and_then(|by_subject| by_subject.get(certificate.subject()))
            .is_some_and(|certs| certs.iter().any(|c| **c == *certificate))
    }

    /// Return `true` if `certificate` is trusted for any scope.
    pub fn is_trusted(&self, certificate: &Certificate) -> bool {
        SCOPES
            .iter()
            .any(|scope| self.is_trusted_for(certificate, *scope))
    }

    /// Return every trusted certificate with the given subject, across all
    /// scopes.
    pub fn certificates_by_subject(&self, subject: &Name) -> Vec<Arc<Certificate>> {
        let mut found: Vec<Arc<Certificate>> = Vec::new();
        for scope in SCOPES {
            let Some(certs) = self.scopes.get(&scope).and_then(|s| s.get(subject)) else {
                continue;
            };
            for cert in certs {
                if !found.iter().any(|c| c == cert) {
                    found.push(cert.clone());
                }
            }
        }
        found
    }

    /// Return every certificate trusted for `scope`.
    pub fn certificates_for(&self, scope: TrustScope) -> Vec<Arc<Certificate>> {
        self.scopes
            .get(&scope)
            .map(|by_subject| by_subject.values().flatten().cloned().collect())
            .unwrap_or_default()
    }

    /// Decide whether `certificate` is trusted in `context`, recording the
    /// decision in `report`.
    ///
    /// A certificate trusted for a scope that does not apply in `context`
    /// gets an informational item and the next scope is tried.
    pub fn check_if_trusted(
        &self,
        report: &mut ValidationReport,
        context: &ValidationContext,
        certificate: &Certificate,
    ) -> bool {
        for scope in SCOPES {
            if !self.is_trusted_for(certificate, scope) {
                continue;
            }

            if scope.applies_in(context) {
                let message = match scope {
                    TrustScope::General => format!(
                        "Certificate {} is trusted, revocation data checks are not required.",
                        certificate.subject()
                    ),
                    _ => format!(
                        "Certificate {} is trusted for {scope}, revocation data checks are not required.",
                        certificate.subject()
                    ),
                };
                log::debug!("{message}");
                report_item!(CERTIFICATE_CHECK, message)
                    .with_certificate(certificate.subject().to_string())
                    .info(report);
                return true;
            }

            report_item!(
                CERTIFICATE_CHECK,
                format!(
                    "Certificate {} is trusted for {scope}, but it is not used in this context. Validation will continue as usual.",
                    certificate.subject()
                )
            )
            .with_certificate(certificate.subject().to_string())
            .info(report);
        }

        false
    }
}
