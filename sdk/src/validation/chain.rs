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

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};

use crate::{
    certificate::default_required_extensions,
    context::{CertificateSource, ValidationContext},
    crypto::{RustNativeVerifier, SignatureVerifier},
    http::{ResourceRetriever, UreqRetriever},
    pdf::RevisionedDocument,
    retriever::IssuingCertificateRetriever,
    revocation::{
        CrlClient, OcspClient, OnlineCrlClient, OnlineFetching, OnlineOcspClient,
        ValidationCrlClient, ValidationOcspClient,
    },
    settings::Trust,
    signature::SignatureInspector,
    trust::TrustScope,
    validation::{
        CertificateChainValidator, CertificateValidation, CrlValidation, CrlValidator,
        DocumentRevisionsValidator, OcspValidation, OcspValidator, RevocationDataValidator,
        RevocationValidation, SignatureValidator,
    },
    Certificate, CertificateExtension, Result, Settings, TrustedCertificatesStore,
    ValidationReport,
};

const ALL_SOURCES: [CertificateSource; 7] = [
    CertificateSource::Signer,
    CertificateSource::Timestamp,
    CertificateSource::OcspIssuer,
    CertificateSource::CrlIssuer,
    CertificateSource::CertIssuer,
    CertificateSource::Trusted,
    CertificateSource::LotlCert,
];

/// Everything one validation run needs, assembled by
/// [`ValidatorChainBuilder`].
///
/// The chain is immutable apart from the revocation evidence pools and the
/// set of known certificates, which grow as a document is validated. Build a
/// new chain for each independent validation run.
pub struct ValidatorChain {
    settings: Arc<Settings>,
    trust_store: Arc<TrustedCertificatesStore>,
    retriever: IssuingCertificateRetriever,
    verifier: Arc<dyn SignatureVerifier>,

    ocsp_pool: Arc<ValidationOcspClient>,
    crl_pool: Arc<ValidationCrlClient>,
    ocsp_clients: Vec<Arc<dyn OcspClient>>,
    crl_clients: Vec<Arc<dyn CrlClient>>,
    online_ocsp_client: Option<Arc<dyn OcspClient>>,
    online_crl_client: Option<Arc<dyn CrlClient>>,

    required_extensions: HashMap<CertificateSource, Vec<CertificateExtension>>,

    certificate_validator: Arc<dyn CertificateValidation>,
    revocation_validator: Arc<dyn RevocationValidation>,
    ocsp_validator: Arc<dyn OcspValidation>,
    crl_validator: Arc<dyn CrlValidation>,
}

impl ValidatorChain {
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn trust_store(&self) -> &TrustedCertificatesStore {
        &self.trust_store
    }

    pub fn retriever(&self) -> &IssuingCertificateRetriever {
        &self.retriever
    }

    pub fn verifier(&self) -> &dyn SignatureVerifier {
        self.verifier.as_ref()
    }

    /// OCSP responses collected during this run.
    pub fn ocsp_pool(&self) -> &ValidationOcspClient {
        &self.ocsp_pool
    }

    /// CRLs collected during this run.
    pub fn crl_pool(&self) -> &ValidationCrlClient {
        &self.crl_pool
    }

    /// Every offline OCSP source: the run's pool followed by caller-supplied
    /// clients.
    pub fn ocsp_clients(&self) -> Vec<Arc<dyn OcspClient>> {
        let pool: Arc<dyn OcspClient> = self.ocsp_pool.clone();
        std::iter::once(pool)
            .chain(self.ocsp_clients.iter().cloned())
            .collect()
    }

    /// Every offline CRL source: the run's pool followed by caller-supplied
    /// clients.
    pub fn crl_clients(&self) -> Vec<Arc<dyn CrlClient>> {
        let pool: Arc<dyn CrlClient> = self.crl_pool.clone();
        std::iter::once(pool)
            .chain(self.crl_clients.iter().cloned())
            .collect()
    }

    pub fn online_ocsp_client(&self) -> Option<&Arc<dyn OcspClient>> {
        self.online_ocsp_client.as_ref()
    }

    pub fn online_crl_client(&self) -> Option<&Arc<dyn CrlClient>> {
        self.online_crl_client.as_ref()
    }

    /// Extensions every certificate playing `source` must carry.
    pub fn required_extensions(&self, source: CertificateSource) -> &[CertificateExtension] {
        self.required_extensions
            .get(&source)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn certificate_validator(&self) -> &dyn CertificateValidation {
        self.certificate_validator.as_ref()
    }

    pub fn revocation_validator(&self) -> &dyn RevocationValidation {
        self.revocation_validator.as_ref()
    }

    pub fn ocsp_validator(&self) -> &dyn OcspValidation {
        self.ocsp_validator.as_ref()
    }

    pub fn crl_validator(&self) -> &dyn CrlValidation {
        self.crl_validator.as_ref()
    }

    /// Remember certificates that may be needed as issuers or OCSP
    /// responders.
    pub fn add_known_certificates<I>(&self, certificates: I)
    where
        I: IntoIterator<Item = Arc<Certificate>>,
    {
        self.retriever.add_known_certificates(certificates);
    }

    /// Validate `certificate` and its issuers as of `validation_date`.
    pub fn validate_certificate(
        &self,
        context: &ValidationContext,
        certificate: &Arc<Certificate>,
        validation_date: DateTime<Utc>,
    ) -> ValidationReport {
        self.validate_certificate_with_extensions(context, certificate, validation_date, &[])
    }

    /// Like [`validate_certificate`](Self::validate_certificate), also
    /// requiring `required_extensions` on `certificate`.
    pub fn validate_certificate_with_extensions(
        &self,
        context: &ValidationContext,
        certificate: &Arc<Certificate>,
        validation_date: DateTime<Utc>,
        required_extensions: &[CertificateExtension],
    ) -> ValidationReport {
        let mut report = ValidationReport::new();
        self.certificate_validator.validate(
            self,
            &mut report,
            context,
            certificate,
            validation_date,
            required_extensions,
        );
        report
    }

    pub fn document_revisions_validator(&self) -> DocumentRevisionsValidator {
        DocumentRevisionsValidator::new(self.settings.clone())
    }

    /// Create a validator for every signature in `document`.
    ///
    /// `inspector` decodes the CMS containers of the signatures.
    pub fn signature_validator<'a>(
        &'a self,
        document: &'a dyn RevisionedDocument,
        inspector: &'a dyn SignatureInspector,
    ) -> SignatureValidator<'a> {
        SignatureValidator::new(self, document, inspector)
    }
}

/// Assembles a [`ValidatorChain`].
///
/// Everything has a default: settings, the pure Rust signature verifier,
/// the `ureq` network client (unless online fetching is disabled) and the
/// validators in this module.
#[derive(Default)]
pub struct ValidatorChainBuilder {
    settings: Option<Settings>,
    trust_store: TrustedCertificatesStore,
    known_certificates: Vec<Arc<Certificate>>,
    verifier: Option<Arc<dyn SignatureVerifier>>,
    resource_retriever: Option<Arc<dyn ResourceRetriever>>,
    ocsp_clients: Vec<Arc<dyn OcspClient>>,
    crl_clients: Vec<Arc<dyn CrlClient>>,
    online_ocsp_client: Option<Arc<dyn OcspClient>>,
    online_crl_client: Option<Arc<dyn CrlClient>>,
    required_extensions: HashMap<CertificateSource, Vec<CertificateExtension>>,
    certificate_validator: Option<Arc<dyn CertificateValidation>>,
    revocation_validator: Option<Arc<dyn RevocationValidation>>,
    ocsp_validator: Option<Arc<dyn OcspValidation>>,
    crl_validator: Option<Arc<dyn CrlValidation>>,
}

impl ValidatorChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    fn with_trusted<I>(mut self, scope: TrustScope, certificates: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Arc<Certificate>>,
    {
        self.trust_store
            .add_certificates(scope, certificates.into_iter().map(Into::into));
        self
    }

    pub fn with_generally_trusted_certificates<I>(self, certificates: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Arc<Certificate>>,
    {
        self.with_trusted(TrustScope::General, certificates)
    }

    pub fn with_ca_trusted_certificates<I>(self, certificates: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Arc<Certificate>>,
    {
        self.with_trusted(TrustScope::Ca, certificates)
    }

    pub fn with_ocsp_trusted_certificates<I>(self, certificates: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Arc<Certificate>>,
    {
        self.with_trusted(TrustScope::Ocsp, certificates)
    }

    pub fn with_crl_trusted_certificates<I>(self, certificates: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Arc<Certificate>>,
    {
        self.with_trusted(TrustScope::Crl, certificates)
    }

    pub fn with_timestamp_trusted_certificates<I>(self, certificates: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Arc<Certificate>>,
    {
        self.with_trusted(TrustScope::Timestamp, certificates)
    }

    /// Use a trust store assembled elsewhere, for example from a trusted
    /// list. Certificates added through the other `with_*_trusted`
    /// methods are kept.
    pub fn with_trust_store(mut self, store: TrustedCertificatesStore) -> Self {
        for scope in [
            TrustScope::General,
            TrustScope::Ca,
            TrustScope::Ocsp,
            TrustScope::Crl,
            TrustScope::Timestamp,
        ] {
            self.trust_store
                .add_certificates(scope, store.certificates_for(scope));
        }
        self
    }

    /// Certificates that are not trusted but may serve as issuers.
    pub fn with_known_certificates<I>(mut self, certificates: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Arc<Certificate>>,
    {
        self.known_certificates
            .extend(certificates.into_iter().map(Into::into));
        self
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Network client used for online revocation data and AIA issuer
    /// fetching.
    pub fn with_resource_retriever(mut self, retriever: Arc<dyn ResourceRetriever>) -> Self {
        self.resource_retriever = Some(retriever);
        self
    }

    /// Add an offline source of OCSP responses.
    pub fn with_ocsp_client(mut self, client: Arc<dyn OcspClient>) -> Self {
        self.ocsp_clients.push(client);
        self
    }

    /// Add an offline source of CRLs.
    pub fn with_crl_client(mut self, client: Arc<dyn CrlClient>) -> Self {
        self.crl_clients.push(client);
        self
    }

    /// Replace the client used when revocation data is fetched online.
    pub fn with_online_ocsp_client(mut self, client: Arc<dyn OcspClient>) -> Self {
        self.online_ocsp_client = Some(client);
        self
    }

    /// Replace the client used when CRLs are fetched online.
    pub fn with_online_crl_client(mut self, client: Arc<dyn CrlClient>) -> Self {
        self.online_crl_client = Some(client);
        self
    }

    /// Replace the extensions required of certificates playing `source`.
    pub fn with_required_extensions(
        mut self,
        source: CertificateSource,
        extensions: Vec<CertificateExtension>,
    ) -> Self {
        self.required_extensions.insert(source, extensions);
        self
    }

    pub fn with_certificate_validator(mut self, validator: Arc<dyn CertificateValidation>) -> Self {
        self.certificate_validator = Some(validator);
        self
    }

    pub fn with_revocation_validator(mut self, validator: Arc<dyn RevocationValidation>) -> Self {
        self.revocation_validator = Some(validator);
        self
    }

    pub fn with_ocsp_validator(mut self, validator: Arc<dyn OcspValidation>) -> Self {
        self.ocsp_validator = Some(validator);
        self
    }

    pub fn with_crl_validator(mut self, validator: Arc<dyn CrlValidation>) -> Self {
        self.crl_validator = Some(validator);
        self
    }

    /// Check the settings and assemble the chain.
    pub fn build(self) -> Result<ValidatorChain> {
        let settings = self.settings.unwrap_or_default();
        settings.validate()?;

        let mut trust_store = self.trust_store;
        load_trust_bundles(&mut trust_store, &settings.trust)?;
        let trust_store = Arc::new(trust_store);

        let verifier = self
            .verifier
            .unwrap_or_else(|| Arc::new(RustNativeVerifier));

        let online = settings.revocation.online_fetching != OnlineFetching::NeverFetch;
        let resource_retriever = match self.resource_retriever {
            Some(retriever) => Some(retriever),
            None if online => {
                let retriever: Arc<dyn ResourceRetriever> =
                    Arc::new(UreqRetriever::from_settings(&settings));
                Some(retriever)
            }
            None => None,
        };

        let mut retriever = IssuingCertificateRetriever::new(
            trust_store.clone(),
            verifier.clone(),
            settings.limits.max_issuer_candidates,
        );
        if let (true, Some(resource_retriever)) = (online, &resource_retriever) {
            retriever = retriever.with_resource_retriever(resource_retriever.clone());
        }
        retriever.add_known_certificates(self.known_certificates);

        let online_ocsp_client = self.online_ocsp_client.or_else(|| {
            resource_retriever
                .clone()
                .map(|r| Arc::new(OnlineOcspClient::new(r)) as Arc<dyn OcspClient>)
        });
        let online_crl_client = self.online_crl_client.or_else(|| {
            resource_retriever
                .clone()
                .map(|r| Arc::new(OnlineCrlClient::new(r)) as Arc<dyn CrlClient>)
        });

        let mut required_extensions = self.required_extensions;
        for source in ALL_SOURCES {
            required_extensions
                .entry(source)
                .or_insert_with(|| default_required_extensions(source));
        }

        Ok(ValidatorChain {
            settings: Arc::new(settings),
            trust_store,
            retriever,
            verifier,
            ocsp_pool: Arc::new(ValidationOcspClient::new()),
            crl_pool: Arc::new(ValidationCrlClient::new()),
            ocsp_clients: self.ocsp_clients,
            crl_clients: self.crl_clients,
            online_ocsp_client,
            online_crl_client,
            required_extensions,
            certificate_validator: self
                .certificate_validator
                .unwrap_or_else(|| Arc::new(CertificateChainValidator)),
            revocation_validator: self
                .revocation_validator
                .unwrap_or_else(|| Arc::new(RevocationDataValidator)),
            ocsp_validator: self
                .ocsp_validator
                .unwrap_or_else(|| Arc::new(OcspValidator)),
            crl_validator: self.crl_validator.unwrap_or_else(|| Arc::new(CrlValidator)),
        })
    }
}

fn load_trust_bundles(store: &mut TrustedCertificatesStore, trust: &Trust) -> Result<()> {
    let bundles = [
        (TrustScope::General, &trust.generally_trusted),
        (TrustScope::Ca, &trust.ca_trusted),
        (TrustScope::Ocsp, &trust.ocsp_trusted),
        (TrustScope::Crl, &trust.crl_trusted),
        (TrustScope::Timestamp, &trust.timestamp_trusted),
    ];

    for (scope, bundle) in bundles {
        if let Some(pem) = bundle {
            let certs = Certificate::from_pem_bundle(pem.as_bytes())?;
            log::debug!("loaded {} certificates trusted for {scope}", certs.len());
            store.add_certificates(scope, certs.into_iter().map(Arc::new));
        }
    }

    Ok(())
}
