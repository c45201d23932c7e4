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

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    check_names::{CRL_CHECK, OCSP_CHECK, REVOCATION_DATA_CHECK, VALIDATION_LIMITS},
    context::{CertificateSource, TimeBasedContext, ValidationContext, ValidatorStage},
    crypto::oids,
    revocation::{
        crl::REASON_REMOVE_FROM_CRL, BasicOcspResponse, CertStatus, Crl, EvidenceOrigin,
        RevokedEntry,
    },
    tests::helpers::{
        date, fake_crl, fake_key, fake_ocsp, fake_self_signed, fake_signed, keyed, name,
        offline_settings, revoked, this_update, validation_date, FakePki,
    },
    validation::{crl_validator::NO_COMMON_ROOT, ValidatorChain},
    Certificate, CertificateBuilder, ReportItemStatus, ValidationReport, ValidationResult,
};

enum Evidence {
    Ocsp(CertStatus, DateTime<Utc>),
    Crl(Vec<RevokedEntry>, DateTime<Utc>),
}

fn add(chain: &ValidatorChain, pki: &FakePki, evidence: &Evidence) {
    match evidence {
        Evidence::Ocsp(status, this_update) => chain.ocsp_pool().add_response(
            Arc::new(fake_ocsp(
                &pki.leaf,
                &pki.int,
                &pki.int,
                status.clone(),
                *this_update,
            )),
            validation_date(),
            TimeBasedContext::Present,
            EvidenceOrigin::External,
        ),
        Evidence::Crl(revoked, this_update) => chain.crl_pool().add_crl(
            Arc::new(fake_crl(&pki.int, revoked.clone(), *this_update)),
            validation_date(),
            TimeBasedContext::Present,
            EvidenceOrigin::External,
        ),
    }
}

fn chain_with(pki: &FakePki, evidence: &[&Evidence]) -> ValidatorChain {
    let chain = pki.chain_builder().build().unwrap();
    chain.crl_pool().add_crl(
        pki.root_crl(),
        validation_date(),
        TimeBasedContext::Present,
        EvidenceOrigin::External,
    );
    for item in evidence {
        add(&chain, pki, item);
    }
    chain
}

fn check(chain: &ValidatorChain, certificate: &Arc<Certificate>) -> ValidationReport {
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
        certificate,
        validation_date(),
    );
    report
}

#[test]
fn newest_evidence_decides_regardless_of_order() {
    let pki = FakePki::new();

    let good_ocsp = Evidence::Ocsp(CertStatus::Good, this_update());
    let older_revoking_crl = Evidence::Crl(
        vec![revoked(&pki.leaf, date("2026-10-10T00:00:00Z"))],
        date("2026-10-15T00:00:00Z"),
    );
    for evidence in [[&good_ocsp, &older_revoking_crl], [&older_revoking_crl, &good_ocsp]] {
        let report = check(&chain_with(&pki, &evidence), &pki.leaf);
        assert_eq!(report.validation_result(), ValidationResult::Valid, "{report}");
    }

    let older_good_ocsp = Evidence::Ocsp(CertStatus::Good, date("2026-10-15T00:00:00Z"));
    let revoking_crl = Evidence::Crl(
        vec![revoked(&pki.leaf, date("2026-10-10T00:00:00Z"))],
        this_update(),
    );
    for evidence in [[&older_good_ocsp, &revoking_crl], [&revoking_crl, &older_good_ocsp]] {
        let report = check(&chain_with(&pki, &evidence), &pki.leaf);
        assert_eq!(report.validation_result(), ValidationResult::Invalid, "{report}");
        assert!(report
            .failures()
            .any(|item| item.message.contains("according to the CRL of CN=Int")));
    }
}

#[test]
fn no_revocation_data_is_indeterminate() {
    let pki = FakePki::new();
    let report = check(&chain_with(&pki, &[]), &pki.leaf);

    assert_eq!(report.validation_result(), ValidationResult::Indeterminate);
    assert!(report.has_item(
        REVOCATION_DATA_CHECK,
        "Certificate CN=Leaf has no revocation data available that allows a conclusion."
    ));
}

#[test]
fn responses_for_other_certificates_are_informational() {
    let pki = FakePki::new();
    let chain = chain_with(&pki, &[]);
    chain.ocsp_pool().add_response(
        Arc::new(fake_ocsp(
            &pki.tsa,
            &pki.int,
            &pki.int,
            CertStatus::Good,
            this_update(),
        )),
        validation_date(),
        TimeBasedContext::Present,
        EvidenceOrigin::External,
    );

    let report = check(&chain, &pki.leaf);
    let mismatch = report.items_for_check(OCSP_CHECK).next().unwrap();
    assert_eq!(mismatch.status, ReportItemStatus::Info);
    assert_eq!(report.validation_result(), ValidationResult::Indeterminate);
}

#[test]
fn revocation_after_validation_date_is_not_a_failure() {
    let pki = FakePki::new();
    let status = CertStatus::Revoked {
        revocation_time: date("2026-10-25T00:00:00Z"),
        reason: None,
    };
    let evidence = Evidence::Ocsp(status, this_update());

    let report = check(&chain_with(&pki, &[&evidence]), &pki.leaf);
    assert_eq!(report.validation_result(), ValidationResult::Valid, "{report}");
    assert!(report
        .items()
        .iter()
        .any(|item| item.message.contains("after the validation date")));
}

#[test]
fn unknown_status_is_indeterminate() {
    let pki = FakePki::new();
    let evidence = Evidence::Ocsp(CertStatus::Unknown, this_update());

    let report = check(&chain_with(&pki, &[&evidence]), &pki.leaf);
    assert_eq!(report.validation_result(), ValidationResult::Indeterminate);
    assert!(report
        .failures()
        .any(|item| item.message.contains("as unknown")));
}

#[test]
fn stale_ocsp_is_not_conclusive() {
    let pki = FakePki::new();
    let evidence = Evidence::Ocsp(CertStatus::Good, date("2026-08-01T00:00:00Z"));

    let report = check(&chain_with(&pki, &[&evidence]), &pki.leaf);
    assert_eq!(report.validation_result(), ValidationResult::Indeterminate);
    assert!(report
        .failures()
        .any(|item| item.message.contains("is not fresh enough")));
}

#[test]
fn expired_crl_is_not_conclusive() {
    let pki = FakePki::new();
    // next update falls on 2026-10-17
    let evidence = Evidence::Crl(Vec::new(), date("2026-10-10T00:00:00Z"));

    let report = check(&chain_with(&pki, &[&evidence]), &pki.leaf);
    assert_eq!(report.validation_result(), ValidationResult::Indeterminate);
    assert!(report
        .failures()
        .any(|item| item.message.starts_with("nextUpdate field")));
}

#[test]
fn removed_from_crl_is_indeterminate() {
    let pki = FakePki::new();
    let mut entry = revoked(&pki.leaf, date("2026-10-10T00:00:00Z"));
    entry.reason = Some(REASON_REMOVE_FROM_CRL);
    let evidence = Evidence::Crl(vec![entry], this_update());

    let report = check(&chain_with(&pki, &[&evidence]), &pki.leaf);
    assert_eq!(report.validation_result(), ValidationResult::Indeterminate);
    assert!(report
        .failures()
        .any(|item| item.message.contains("was removed from the CRL")));
}

#[test]
fn exemptions() {
    let pki = FakePki::new();
    let chain = chain_with(&pki, &[]);

    let no_rev_avail = Arc::new(fake_signed(
        keyed("CN=Short Lived")
            .issuer(name("CN=Int"))
            .extension(oids::NO_REV_AVAIL),
        &pki.int,
    ));
    let report = check(&chain, &no_rev_avail);
    assert_eq!(report.validation_result(), ValidationResult::Valid);
    assert_eq!(report.items().len(), 1);

    let ca_with_no_rev_avail = Arc::new(fake_signed(
        keyed("CN=Odd CA")
            .issuer(name("CN=Root"))
            .basic_constraints(true, None)
            .extension(oids::NO_REV_AVAIL),
        &pki.root,
    ));
    let report = check(&chain, &ca_with_no_rev_avail);
    assert_eq!(report.validation_result(), ValidationResult::Indeterminate);

    let report = check(&chain, &pki.root);
    assert_eq!(report.validation_result(), ValidationResult::Valid);
    assert!(report.items()[0].message.contains("is self-signed"));
}

#[test]
fn nocheck_only_exempts_ocsp_responders() {
    let pki = FakePki::new();
    let chain = chain_with(&pki, &[]);

    let report = check(&chain, &pki.responder);
    assert_eq!(report.validation_result(), ValidationResult::Indeterminate);

    let context = ValidationContext::new(
        ValidatorStage::OcspValidator,
        CertificateSource::OcspIssuer,
        TimeBasedContext::Present,
    );
    let mut report = ValidationReport::new();
    chain.revocation_validator().validate(
        &chain,
        &mut report,
        &context,
        &pki.responder,
        validation_date(),
    );
    assert_eq!(report.validation_result(), ValidationResult::Valid);
}

#[test]
fn evidence_beyond_the_limit_is_skipped() {
    let pki = FakePki::new();
    let mut settings = offline_settings();
    settings.limits.max_revocation_responses = 1;
    let chain = pki.chain_builder().with_settings(settings).build().unwrap();

    add(&chain, &pki, &Evidence::Ocsp(CertStatus::Good, this_update()));
    add(
        &chain,
        &pki,
        &Evidence::Ocsp(CertStatus::Good, date("2026-10-18T00:00:00Z")),
    );

    let report = check(&chain, &pki.leaf);
    assert_eq!(report.validation_result(), ValidationResult::Valid, "{report}");
    let limit = report.items_for_check(VALIDATION_LIMITS).next().unwrap();
    assert_eq!(limit.status, ReportItemStatus::Info);
}

fn add_ocsp_response(chain: &ValidatorChain, response: BasicOcspResponse) {
    chain.ocsp_pool().add_response(
        Arc::new(response),
        validation_date(),
        TimeBasedContext::Present,
        EvidenceOrigin::External,
    );
}

#[test]
fn archive_cutoff_must_cover_expiry() {
    let pki = FakePki::new();
    let expired = Arc::new(fake_signed(
        keyed("CN=Expired")
            .issuer(name("CN=Int"))
            .serial(&[0x20, 0x09])
            .validity(date("2025-10-01T00:00:00Z"), date("2026-10-01T00:00:00Z")),
        &pki.int,
    ));
    let response = |archive_cutoff: Option<&str>| {
        let mut response =
            fake_ocsp(&expired, &pki.int, &pki.int, CertStatus::Good, this_update());
        response.archive_cutoff = archive_cutoff.map(date);
        response
    };

    for cutoff in [None, Some("2026-10-05T00:00:00Z")] {
        let chain = chain_with(&pki, &[]);
        add_ocsp_response(&chain, response(cutoff));

        let report = check(&chain, &expired);
        assert_eq!(report.validation_result(), ValidationResult::Indeterminate);
        assert!(
            report
                .items_for_check(OCSP_CHECK)
                .any(|item| item.message.contains("cutoff does not cover its expiry")),
            "{report}"
        );
    }

    let chain = chain_with(&pki, &[]);
    add_ocsp_response(&chain, response(Some("2026-09-01T00:00:00Z")));
    let report = check(&chain, &expired);
    assert_eq!(report.validation_result(), ValidationResult::Valid, "{report}");
}

fn check_crl(
    chain: &ValidatorChain,
    certificate: &Arc<Certificate>,
    crl: &Crl,
) -> ValidationReport {
    let context = ValidationContext::new(
        ValidatorStage::RevocationDataValidator,
        CertificateSource::Signer,
        TimeBasedContext::Present,
    );
    let mut report = ValidationReport::new();
    chain.crl_validator().validate(
        chain,
        &mut report,
        &context,
        certificate,
        crl,
        validation_date(),
        validation_date(),
    );
    report
}

#[test]
fn crl_with_unverifiable_signature_is_indeterminate() {
    let pki = FakePki::new();
    let chain = chain_with(&pki, &[]);

    // same name as the intermediate, different key, unknown to the chain
    let impostor = fake_signed(
        CertificateBuilder::new(name("CN=Int"))
            .public_key(fake_key("impostor"), fake_key("impostor"))
            .issuer(name("CN=Root")),
        &pki.root,
    );
    let revoked_leaf = revoked(&pki.leaf, date("2026-10-10T00:00:00Z"));
    let crl = fake_crl(&impostor, vec![revoked_leaf], this_update());

    let report = check_crl(&chain, &pki.leaf, &crl);
    assert_eq!(report.validation_result(), ValidationResult::Indeterminate);
    assert!(report.has_item(
        CRL_CHECK,
        "CRL signature could not be verified with issuer certificate CN=Int."
    ));
}

/// An issuer named like the intermediate that chains to another root, and
/// a CRL it signed revoking the leaf.
fn foreign_crl(pki: &FakePki, chain: &ValidatorChain) -> Crl {
    let other_root = Arc::new(fake_self_signed(
        keyed("CN=Other Root").basic_constraints(true, None)
    ));
    let other_int = Arc::new(fake_signed(
        CertificateBuilder::new(name("CN=Int"))
            .public_key(fake_key("other int"), fake_key("other int"))
            .issuer(name("CN=Other Root"))
            .serial(&[0x30, 0x01])
            .basic_constraints(true, Some(0)),
        &other_root,
    ));
    chain.add_known_certificates([other_root, other_int.clone()]);

    let revoked_leaf = revoked(&pki.leaf, date("2026-10-10T00:00:00Z"));
    fake_crl(&other_int, vec![revoked_leaf], this_update())
}

#[test]
fn crl_from_another_root_is_indeterminate() {
    let pki = FakePki::new();
    let chain = chain_with(&pki, &[]);
    let crl = foreign_crl(&pki, &chain);

    let report = check_crl(&chain, &pki.leaf, &crl);
    assert_eq!(report.validation_result(), ValidationResult::Indeterminate);
    let item = report
        .items()
        .iter()
        .find(|item| item.message == NO_COMMON_ROOT)
        .unwrap();
    assert_eq!(item.status, ReportItemStatus::Indeterminate);
}

#[test]
fn missing_common_root_is_informational_when_nothing_concludes() {
    let pki = FakePki::new();
    let chain = chain_with(&pki, &[]);
    let crl = foreign_crl(&pki, &chain);
    chain.crl_pool().add_crl(
        Arc::new(crl),
        validation_date(),
        TimeBasedContext::Present,
        EvidenceOrigin::External,
    );

    let report = check(&chain, &pki.leaf);
    assert_eq!(report.validation_result(), ValidationResult::Indeterminate);
    let item = report
        .items()
        .iter()
        .find(|item| item.message == NO_COMMON_ROOT)
        .unwrap();
    assert_eq!(item.status, ReportItemStatus::Info);
    assert!(report.has_item(
        REVOCATION_DATA_CHECK,
        "Certificate CN=Leaf has no revocation data available that allows a conclusion."
    ));
}
