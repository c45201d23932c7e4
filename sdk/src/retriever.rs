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

//! Locates the certificates a validator needs but was not handed directly:
//! issuers, CRL issuers and delegated OCSP responders.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use crate::{
    certificate::Name,
    crypto::SignatureVerifier,
    http::ResourceRetriever,
    revocation::{BasicOcspResponse, Crl, ResponderId},
    trust::{TrustScope, TrustedCertificatesStore},
    Certificate,
};

/// Finds candidate issuer certificates among known certificates, trusted
/// certificates and, optionally, the issuer URLs in a certificate's
/// authority information access extension.
///
/// Known certificates are collected while a document is validated (from CMS
/// certificate bags and DSS dictionaries), so the set grows during a run.
pub struct IssuingCertificateRetriever {
    known: RwLock<HashMap<Name, Vec<Arc<Certificate>>>>,
    trust_store: Arc<TrustedCertificatesStore>,
    verifier: Arc<dyn SignatureVerifier>,
    resource_retriever: Option<Arc<dyn ResourceRetriever>>,
    max_candidates: usize,
}

impl IssuingCertificateRetriever {
    pub fn new(
        trust_store: Arc<TrustedCertificatesStore>,
        verifier: Arc<dyn SignatureVerifier>,
        max_candidates: usize,
    ) -> Self {
        Self {
            known: RwLock::new(HashMap::new()),
            trust_store,
            verifier,
            resource_retriever: None,
            max_candidates,
        }
    }

    /// Allow fetching missing issuers from AIA caIssuers URLs.
    pub fn with_resource_retriever(mut self, retriever: Arc<dyn ResourceRetriever>) -> Self {
        self.resource_retriever = Some(retriever);
        self
    }

    pub fn trust_store(&self) -> &TrustedCertificatesStore {
        &self.trust_store
    }

    /// Remember `certificates` as possible issuers.
    pub fn add_known_certificates<I>(&self, certificates: I)
    where
        I: IntoIterator<Item = Arc<Certificate>>,
    {
        let mut known = match self.known.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        for certificate in certificates {
            let same_subject = known.entry(certificate.subject().clone()).or_default();
            if !same_subject.iter().any(|c| **c == *certificate) {
                same_subject.push(certificate);
            }
        }
    }

    fn known_by_subject(&self, subject: &Name) -> Vec<Arc<Certificate>> {
        let known = match self.known.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        known.get(subject).cloned().unwrap_or_default()
    }

    fn all_known(&self) -> Vec<Arc<Certificate>> {
        let known = match self.known.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        known.values().flatten().cloned().collect()
    }

    /// Every known or trusted certificate whose subject is `subject`.
    pub fn certificates_by_subject(&self, subject: &Name) -> Vec<Arc<Certificate>> {
        let mut found = self.trust_store.certificates_by_subject(subject);
        for cert in self.known_by_subject(subject) {
            if !found.contains(&cert) {
                found.push(cert);
            }
        }
        found
    }

    /// Return `true` if `issuer`'s key verifies `certificate`'s signature.
    pub fn is_signed_by(&self, certificate: &Certificate, issuer: &Certificate) -> bool {
        self.verifier
            .verify(
                certificate.signature_algorithm(),
                certificate.tbs(),
                certificate.signature(),
                issuer.spki(),
            )
            .is_ok()
    }

    /// Candidate issuers of `certificate`.
    ///
    /// Candidates whose key verifies the certificate come first. The list is
    /// capped at the configured maximum and never contains `certificate`
    /// itself.
    pub fn issuer_candidates(&self, certificate: &Certificate) -> Vec<Arc<Certificate>> {
        let mut candidates: Vec<Arc<Certificate>> = self
            .certificates_by_subject(certificate.issuer())
            .into_iter()
            .filter(|c| **c != *certificate)
            .collect();

        if candidates.is_empty() {
            candidates = self
                .fetch_issuers(certificate)
                .into_iter()
                .filter(|c| c.subject() == certificate.issuer() && **c != *certificate)
                .collect();
        }

        if candidates.len() > 1 {
            // stable, so equally plausible candidates keep their lookup order
            candidates.sort_by_key(|c| !self.is_signed_by(certificate, c));
        }

        if candidates.len() > self.max_candidates {
            log::warn!(
                "{} issuer candidates found for {}, keeping {}",
                candidates.len(),
                certificate.subject(),
                self.max_candidates
            );
            candidates.truncate(self.max_candidates);
        }

        candidates
    }

    fn fetch_issuers(&self, certificate: &Certificate) -> Vec<Arc<Certificate>> {
        let Some(retriever) = &self.resource_retriever else {
            return Vec::new();
        };

        let mut fetched = Vec::new();
        for url in certificate.ca_issuer_urls() {
            log::info!("fetching issuer of {} from {url}", certificate.subject());

            let body = match retriever.get(url) {
                Ok(body) => body,
                Err(err) => {
                    log::warn!("unable to fetch issuer certificate from {url}: {err}");
                    continue;
                }
            };

            // caIssuers may point at a single DER certificate or a PEM bundle
            match Certificate::from_der(&body) {
                Ok(cert) => fetched.push(Arc::new(cert)),
                Err(_) => match Certificate::from_pem_bundle(&body) {
                    Ok(certs) => fetched.extend(certs.into_iter().map(Arc::new)),
                    Err(err) => log::warn!("unusable issuer certificate at {url}: {err}"),
                },
            }
        }

        self.add_known_certificates(fetched.iter().cloned());
        fetched
    }

    /// Candidate issuers of `crl`, capped at the configured maximum.
    pub fn crl_issuer_candidates(&self, crl: &Crl) -> Vec<Arc<Certificate>> {
        let mut candidates = self.certificates_by_subject(&crl.issuer);
        candidates.truncate(self.max_candidates);
        candidates
    }

    /// Certificates that may have signed `response` on behalf of an issuer.
    ///
    /// Certificates embedded in the response come first, followed by known
    /// and OCSP-trusted certificates. Only certificates matching the
    /// response's responder ID are returned.
    pub fn ocsp_responder_candidates(&self, response: &BasicOcspResponse) -> Vec<Arc<Certificate>> {
        let mut candidates: Vec<Arc<Certificate>> = Vec::new();

        let mut push = |cert: Arc<Certificate>| {
            if response.responder_id.matches(&cert) && !candidates.contains(&cert) {
                candidates.push(cert);
            }
        };

        for cert in &response.certificates {
            push(cert.clone());
        }

        match &response.responder_id {
            ResponderId::ByName(name) => {
                let name = Name::new(name.clone(), "");
                for cert in self.certificates_by_subject(&name) {
                    push(cert);
                }
            }
            ResponderId::ByKey(_) => {
                for cert in self
                    .trust_store
                    .certificates_for(TrustScope::Ocsp)
                    .into_iter()
                    .chain(self.all_known())
                {
                    push(cert);
                }
            }
        }

        candidates.truncate(self.max_candidates);
        candidates
    }

    /// Follow the first issuer candidate of each certificate upwards and
    /// return the topmost certificate reached.
    pub fn root_of(&self, certificate: &Arc<Certificate>, max_depth: usize) -> Arc<Certificate> {
        let mut current = certificate.clone();
        let mut seen = vec![current.clone()];

        for _ in 0..max_depth {
            if current.is_self_issued() {
                break;
            }

            let Some(issuer) = self.issuer_candidates(&current).into_iter().next() else {
                break;
            };

            if seen.contains(&issuer) {
                break;
            }

            seen.push(issuer.clone());
            current = issuer;
        }

        current
    }
}
