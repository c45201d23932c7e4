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

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use mockall::predicate::eq;

use crate::{
    check_names::REVOCATION_DATA_CHECK,
    context::{CertificateSource, TimeBasedContext, ValidationContext, ValidatorStage},
    http::{MockResourceRetriever, RetrieverError},
    revocation::{
        BasicOcspResponse, CertStatus, Crl, EvidenceOrigin, OcspClient, OcspEvidence,
        OnlineFetching, RevocationError,
    },
    settings::Settings,
    tests::helpers::{fake_ocsp, this_update, validation_date, FakePki},
    Certificate, ReportItemStatus, ValidationReport, ValidationResult, ValidatorChain,
    ValidatorChainBuilder,
};

/// Answers every request with the same responses and counts the calls.
struct CountingOcspClient {
    responses: Result<Vec<Arc<BasicOcspResponse>>, ()>,
    calls: AtomicUsize,
}

impl CountingOcspClient {
    fn new(responses: Vec<BasicOcspResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Ok(responses.into_iter().map(Arc::new).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            responses: Err(()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcspClient for CountingOcspClient {
    fn ocsp_responses(
        &self,
        _certificate: &Certificate,
        _issuer: Option<&Certificate>,
    ) -> Result<Vec<OcspEvidence>, RevocationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let responses = self.responses.as_ref().map_err(|_| {
            RevocationError::Fetch(RetrieverError::HttpStatus {
                url: "http://ocsp.example.com".to_owned(),
                status: 503,
            })
        })?;

        Ok(responses
            .iter()
            .map(|response| OcspEvidence {
                response: response.clone(),
                trusted_generation_date: validation_date(),
                time_context: TimeBasedContext::Present,
                origin: EvidenceOrigin::Fetched,
            })
            .collect())
    }
}

fn settings(policy: OnlineFetching) -> Settings {
    let mut settings = Settings::default();
    settings.revocation.online_fetching = policy;
    settings
}

/// A chain whose only network access goes through `online`.
fn chain(pki: &FakePki, policy: OnlineFetching, online: Arc<CountingOcspClient>) -> ValidatorChain {
    pki.chain_builder()
        .with_settings(settings(policy))
        // no expectations: any request fails the test
        .with_resource_retriever(Arc::new(MockResourceRetriever::new()))
        .with_online_ocsp_client(online)
        .build()
        .unwrap()
}

fn good_response(pki: &FakePki) -> BasicOcspResponse {
    fake_ocsp(&pki.leaf, &pki.int, &pki.int, CertStatus::Good, this_update())
}

fn check_leaf(chain: &ValidatorChain, pki: &FakePki) -> ValidationReport {
    let context = ValidationContext::new(
        ValidatorStage::CertificateChainValidator,
        CertificateSource::Signer,
        TimeBasedContext::Present,
    );
    let mut report = ValidationReport::new();
    chain.revocation_validator().validate(
        chain,
        &mut report,
        &context,
        &pki.leaf,
        validation_date(),
    );
    report
}

#[test]
fn fetches_when_nothing_else_is_available() {
    let pki = FakePki::new();
    let online = CountingOcspClient::new(vec![good_response(&pki)]);
    let chain = chain(&pki, OnlineFetching::FetchIfNoOtherDataAvailable, online.clone());

    let report = check_leaf(&chain, &pki);
    assert_eq!(report.validation_result(), ValidationResult::Valid, "{report}");
    assert_eq!(online.calls(), 1);

    // fetched evidence is kept for the rest of the run
    assert_eq!(chain.ocsp_pool().len(), 1);
    check_leaf(&chain, &pki);
    assert_eq!(online.calls(), 1);
}

#[test]
fn does_not_fetch_when_local_data_is_conclusive() {
    let pki = FakePki::new();
    let online = CountingOcspClient::new(vec![good_response(&pki)]);
    let chain = chain(&pki, OnlineFetching::FetchIfNoOtherDataAvailable, online.clone());
    chain.ocsp_pool().add_response(
        Arc::new(good_response(&pki)),
        validation_date(),
        TimeBasedContext::Present,
        EvidenceOrigin::External,
    );

    let report = check_leaf(&chain, &pki);
    assert_eq!(report.validation_result(), ValidationResult::Valid);
    assert_eq!(online.calls(), 0);
}

#[test]
fn never_fetch_ignores_online_clients() {
    let pki = FakePki::new();
    let online = CountingOcspClient::new(vec![good_response(&pki)]);
    let chain = chain(&pki, OnlineFetching::NeverFetch, online.clone());

    let report = check_leaf(&chain, &pki);
    assert_eq!(report.validation_result(), ValidationResult::Indeterminate);
    assert_eq!(online.calls(), 0);
}

#[test]
fn always_fetch_queries_online_alongside_local_data() {
    let pki = FakePki::new();
    let online = CountingOcspClient::new(vec![good_response(&pki)]);
    let chain = chain(&pki, OnlineFetching::AlwaysFetch, online.clone());
    chain.ocsp_pool().add_response(
        Arc::new(good_response(&pki)),
        validation_date(),
        TimeBasedContext::Present,
        EvidenceOrigin::External,
    );

    let report = check_leaf(&chain, &pki);
    assert_eq!(report.validation_result(), ValidationResult::Valid);
    assert_eq!(online.calls(), 1);
}

#[test]
fn fetch_failure_is_informational() {
    let pki = FakePki::new();
    let online = CountingOcspClient::failing();
    let chain = chain(&pki, OnlineFetching::FetchIfNoOtherDataAvailable, online.clone());

    let report = check_leaf(&chain, &pki);
    assert_eq!(online.calls(), 1);
    assert_eq!(report.validation_result(), ValidationResult::Indeterminate);

    let failure = report
        .items_for_check(REVOCATION_DATA_CHECK)
        .find(|item| item.message == "Unable to retrieve OCSP responses.")
        .unwrap();
    assert_eq!(failure.status, ReportItemStatus::Info);
    assert!(failure.cause.as_deref().unwrap().contains("503"));
}

#[test]
fn fetches_issuer_and_revocation_data_over_http() {
    const ROOT: &[u8] = include_bytes!("../../tests/fixtures/pki/root.der");
    const INT: &[u8] = include_bytes!("../../tests/fixtures/pki/int.der");
    const LEAF: &[u8] = include_bytes!("../../tests/fixtures/pki/leaf.der");
    const ROOT_EMPTY_CRL: &[u8] = include_bytes!("../../tests/fixtures/pki/root_empty.crl");

    let mut http = MockResourceRetriever::new();
    http.expect_get()
        .with(eq("http://ca.example.com/int.der"))
        .times(1)
        .returning(|_| Ok(INT.to_vec()));
    http.expect_get()
        .with(eq("http://crl.example.com/int.crl"))
        .returning(|_| Ok(include_bytes!("../../tests/fixtures/pki/int_empty.crl").to_vec()));
    http.expect_post()
        .withf(|url, _, _| url == "http://ocsp.example.com")
        .returning(|_, _, _| {
            Ok(include_bytes!("../../tests/fixtures/pki/ocsp_good_direct.der").to_vec())
        });

    let chain = ValidatorChainBuilder::new()
        .with_settings(settings(OnlineFetching::FetchIfNoOtherDataAvailable))
        .with_resource_retriever(Arc::new(http))
        .with_generally_trusted_certificates([Arc::new(Certificate::from_der(ROOT).unwrap())])
        .build()
        .unwrap();
    chain.crl_pool().add_crl(
        Arc::new(Crl::from_der(ROOT_EMPTY_CRL).unwrap()),
        validation_date(),
        TimeBasedContext::Present,
        EvidenceOrigin::External,
    );

    let leaf = Arc::new(Certificate::from_der(LEAF).unwrap());
    let context = ValidationContext::new(
        ValidatorStage::SignatureValidator,
        CertificateSource::Signer,
        TimeBasedContext::Present,
    );
    let report = chain.validate_certificate(&context, &leaf, validation_date());

    assert_eq!(report.validation_result(), ValidationResult::Valid, "{report}");
    assert_eq!(chain.ocsp_pool().len(), 1);
}
