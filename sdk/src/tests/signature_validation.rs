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
    check_names::{SIGNATURE_VERIFICATION, TIMESTAMP_VERIFICATION},
    context::TimeBasedContext,
    pdf::{
        MemoryDocument, MemoryRevisionedDocument, ObjectRef, PdfDictionary, PdfObject,
        PdfStream, RevisionedDocument, SignatureField,
    },
    revocation::{CertStatus, EvidenceOrigin},
    signature::{SignatureData, SignatureInspector, TimestampData},
    tests::helpers::{
        date, fake_ocsp, fake_signed, keyed, name, this_update, validation_date, FakePki,
    },
    Certificate, Error, ReportItemStatus, ValidationReport, ValidationResult, ValidatorChain,
};

/// Hands out prepared results by field name.
#[derive(Default)]
struct FakeInspector {
    results: HashMap<String, SignatureData>,
}

impl FakeInspector {
    fn with(mut self, field: &str, data: SignatureData) -> Self {
        self.results.insert(field.to_owned(), data);
        self
    }
}

impl SignatureInspector for FakeInspector {
    fn inspect(
        &self,
        field: &SignatureField,
        _document: &dyn RevisionedDocument,
    ) -> crate::Result<SignatureData> {
        self.results
            .get(&field.name)
            .cloned()
            .ok_or_else(|| Error::SignatureInspection(format!("no container in {}", field.name)))
    }
}

fn r(number: u32) -> ObjectRef {
    ObjectRef::new(number, 0)
}

fn signature_value(sub_filter: &str, byte_range: [i64; 4]) -> PdfDictionary {
    PdfDictionary::new()
        .with("Type", PdfObject::name("Sig"))
        .with("SubFilter", PdfObject::name(sub_filter))
        .with(
            "ByteRange",
            byte_range.into_iter().map(PdfObject::from).collect::<Vec<_>>(),
        )
        .with("Contents", PdfObject::string(vec![0u8; 8]))
}

/// A document whose fields are `(name, sub filter, byte range)`, each field
/// at objects 10 + 2i and 11 + 2i.
fn document_with_fields(fields: &[(&str, &str, [i64; 4])]) -> MemoryDocument {
    let mut document = MemoryDocument::new();
    document.set_trailer(PdfDictionary::new().with("Root", r(1)));

    let mut field_refs = Vec::new();
    for (i, (field_name, sub_filter, byte_range)) in fields.iter().enumerate() {
        let field = 10 + 2 * i as u32;
        document.insert(
            r(field),
            PdfDictionary::new()
                .with("FT", PdfObject::name("Sig"))
                .with("T", PdfObject::string(*field_name))
                .with("V", r(field + 1)),
        );
        document.insert(r(field + 1), signature_value(sub_filter, *byte_range));
        field_refs.push(PdfObject::from(r(field)));
    }

    document.insert(
        r(1),
        PdfDictionary::new()
            .with("Type", PdfObject::name("Catalog"))
            .with("AcroForm", PdfDictionary::new().with("Fields", field_refs)),
    );
    document
}

/// One revision ending at offset 100, signed by `Signer`.
fn signed_once() -> MemoryRevisionedDocument {
    let mut document = MemoryRevisionedDocument::new();
    document.push(
        document_with_fields(&[("Signer", "ETSI.CAdES.detached", [0, 40, 60, 40])]),
        100,
    );
    document
}

/// [`signed_once`] plus a document timestamp `DocTS` covering revision 1.
fn signed_and_timestamped() -> MemoryRevisionedDocument {
    let mut document = signed_once();
    document.push(
        document_with_fields(&[
            ("Signer", "ETSI.CAdES.detached", [0, 40, 60, 40]),
            ("DocTS", "ETSI.RFC3161", [0, 140, 160, 40]),
        ]),
        200,
    );
    document
}

fn timestamp_time() -> DateTime<Utc> {
    date("2026-10-19T12:00:00Z")
}

/// A chain with revocation data for the intermediate and the TSA.
fn chain(pki: &FakePki) -> ValidatorChain {
    let chain = pki.chain_builder().build().unwrap();
    chain.crl_pool().add_crl(
        pki.root_crl(),
        validation_date(),
        TimeBasedContext::Present,
        EvidenceOrigin::External,
    );
    chain.ocsp_pool().add_response(
        Arc::new(fake_ocsp(&pki.tsa, &pki.int, &pki.int, CertStatus::Good, this_update())),
        validation_date(),
        TimeBasedContext::Present,
        EvidenceOrigin::External,
    );
    chain
}

/// Signing data for `signer` carrying a good OCSP response from the
/// intermediate.
fn signed_by(pki: &FakePki, signer: &Arc<Certificate>, valid: bool) -> SignatureData {
    let mut data = SignatureData::new(signer.clone(), valid);
    data.ocsp_responses.push(Arc::new(fake_ocsp(
        signer,
        &pki.int,
        &pki.int,
        CertStatus::Good,
        this_update(),
    )));
    data
}

fn signer_valid_until(pki: &FakePki, not_after: &str) -> Arc<Certificate> {
    Arc::new(fake_signed(
        keyed("CN=Short Lived Signer")
            .issuer(name("CN=Int"))
            .serial(&[0x30, 0x01])
            .validity(date("2026-01-01T00:00:00Z"), date(not_after)),
        &pki.int,
    ))
}

fn validate(
    chain: &ValidatorChain,
    document: &dyn RevisionedDocument,
    inspector: &FakeInspector,
) -> ValidationReport {
    chain
        .signature_validator(document, inspector)
        .with_validation_date(validation_date())
        .validate_signatures()
}

#[test]
fn valid_signature() {
    let pki = FakePki::new();
    let chain = chain(&pki);
    let inspector = FakeInspector::default().with("Signer", signed_by(&pki, &pki.leaf, true));

    let report = validate(&chain, &signed_once(), &inspector);
    assert_eq!(report.validation_result(), ValidationResult::Valid, "{report}");
    assert!(report.has_item(SIGNATURE_VERIFICATION, "Signature Signer is cryptographically valid."));

    // embedded revocation data went into the pool
    assert_eq!(chain.ocsp_pool().len(), 2);
}

#[test]
fn broken_signature_is_invalid() {
    let pki = FakePki::new();
    let chain = chain(&pki);
    let inspector = FakeInspector::default().with("Signer", signed_by(&pki, &pki.leaf, false));

    let report = validate(&chain, &signed_once(), &inspector);
    assert_eq!(report.validation_result(), ValidationResult::Invalid);
    assert!(report.has_item(
        SIGNATURE_VERIFICATION,
        "Signature Signer is not cryptographically valid."
    ));
}

#[test]
fn signature_must_cover_its_revision() {
    let pki = FakePki::new();
    let chain = chain(&pki);
    let inspector = FakeInspector::default().with("Signer", signed_by(&pki, &pki.leaf, true));

    let mut document = MemoryRevisionedDocument::new();
    document.push(
        document_with_fields(&[("Signer", "ETSI.CAdES.detached", [0, 40, 60, 30])]),
        100,
    );
    let report = validate(&chain, &document, &inspector);
    assert_eq!(report.validation_result(), ValidationResult::Invalid);
    assert!(report.has_item(
        SIGNATURE_VERIFICATION,
        "Signature Signer doesn't cover the entire document revision."
    ));

    let mut document = MemoryRevisionedDocument::new();
    document.push(
        document_with_fields(&[("Signer", "ETSI.CAdES.detached", [0, 40, 60, 100])]),
        100,
    );
    let report = validate(&chain, &document, &inspector);
    assert_eq!(report.validation_result(), ValidationResult::Invalid);
    assert!(report.has_item(
        SIGNATURE_VERIFICATION,
        "Signature Signer covers bytes beyond the end of the document."
    ));
}

#[test]
fn unsigned_document() {
    let pki = FakePki::new();
    let mut document = MemoryRevisionedDocument::new();
    document.push(document_with_fields(&[]), 100);

    let report = validate(&chain(&pki), &document, &FakeInspector::default());
    assert_eq!(report.validation_result(), ValidationResult::Valid);
    assert!(report.has_item(SIGNATURE_VERIFICATION, "Document has no signatures."));
}

#[test]
fn unreadable_container_is_indeterminate() {
    let pki = FakePki::new();

    let report = validate(&chain(&pki), &signed_once(), &FakeInspector::default());
    assert_eq!(report.validation_result(), ValidationResult::Indeterminate);
    let item = report
        .items_for_check(SIGNATURE_VERIFICATION)
        .next()
        .unwrap();
    assert_eq!(item.message, "Unable to read signature Signer.");
    assert!(item.cause.as_deref().unwrap().contains("no container in Signer"));
}

#[test]
fn signature_timestamp_moves_validation_back() {
    let pki = FakePki::new();
    let signer = signer_valid_until(&pki, "2026-10-19T18:00:00Z");

    // expired by now
    let inspector = FakeInspector::default().with("Signer", signed_by(&pki, &signer, true));
    let report = validate(&chain(&pki), &signed_once(), &inspector);
    assert_eq!(report.validation_result(), ValidationResult::Invalid);

    // but valid when the timestamp was taken
    let mut data = signed_by(&pki, &signer, true);
    data.timestamp = Some(TimestampData::new(pki.tsa.clone(), timestamp_time(), true));
    let inspector = FakeInspector::default().with("Signer", data);
    let report = validate(&chain(&pki), &signed_once(), &inspector);
    assert_eq!(report.validation_result(), ValidationResult::Valid, "{report}");
}

#[test]
fn failed_validation_at_timestamp_falls_back_to_now() {
    let pki = FakePki::new();
    // not yet valid when the timestamp was taken
    let signer = Arc::new(fake_signed(
        keyed("CN=Late Signer")
            .issuer(name("CN=Int"))
            .serial(&[0x30, 0x02])
            .validity(date("2026-10-19T18:00:00Z"), date("2027-10-19T00:00:00Z")),
        &pki.int,
    ));

    let mut data = signed_by(&pki, &signer, true);
    data.timestamp = Some(TimestampData::new(pki.tsa.clone(), timestamp_time(), true));
    let inspector = FakeInspector::default().with("Signer", data);

    let report = validate(&chain(&pki), &signed_once(), &inspector);
    assert_eq!(report.validation_result(), ValidationResult::Valid, "{report}");

    let fallback = report
        .items_for_check(TIMESTAMP_VERIFICATION)
        .find(|item| item.message.contains("could not be validated at the signature timestamp"))
        .unwrap();
    assert_eq!(fallback.status, ReportItemStatus::Info);
}

#[test]
fn broken_signature_timestamp_is_invalid() {
    let pki = FakePki::new();
    let mut data = signed_by(&pki, &pki.leaf, true);
    data.timestamp = Some(TimestampData::new(pki.tsa.clone(), timestamp_time(), false));
    let inspector = FakeInspector::default().with("Signer", data);

    let report = validate(&chain(&pki), &signed_once(), &inspector);
    assert_eq!(report.validation_result(), ValidationResult::Invalid);
    assert!(report.has_item(
        TIMESTAMP_VERIFICATION,
        "Signature timestamp of Signer is not cryptographically valid."
    ));
}

#[test]
fn document_timestamp_moves_validation_back() {
    let pki = FakePki::new();
    let signer = signer_valid_until(&pki, "2026-10-19T18:00:00Z");

    let mut timestamp = SignatureData::new(pki.tsa.clone(), true);
    timestamp.signing_time = Some(timestamp_time());

    // evidence embedded at signing time must be fresh for the proven time
    let mut signature = SignatureData::new(signer.clone(), true);
    signature.ocsp_responses.push(Arc::new(fake_ocsp(
        &signer,
        &pki.int,
        &pki.int,
        CertStatus::Good,
        date("2026-10-19T11:59:30Z"),
    )));

    let inspector = FakeInspector::default()
        .with("Signer", signature)
        .with("DocTS", timestamp);

    let report = validate(&chain(&pki), &signed_and_timestamped(), &inspector);
    assert_eq!(report.validation_result(), ValidationResult::Valid, "{report}");
    assert!(report.has_item(
        TIMESTAMP_VERIFICATION,
        "Document timestamp DocTS proves the document existed at 2026-10-19 12:00:00 UTC."
    ));
}

#[test]
fn document_timestamp_without_time_is_indeterminate() {
    let pki = FakePki::new();
    let inspector = FakeInspector::default()
        .with("Signer", signed_by(&pki, &pki.leaf, true))
        .with("DocTS", SignatureData::new(pki.tsa.clone(), true));

    let report = validate(&chain(&pki), &signed_and_timestamped(), &inspector);
    assert_eq!(report.validation_result(), ValidationResult::Indeterminate);
    assert!(report.has_item(
        TIMESTAMP_VERIFICATION,
        "Document timestamp DocTS has no generation time."
    ));
}

#[test]
fn undecodable_dss_entries_are_ignored() {
    let pki = FakePki::new();
    let mut latest = document_with_fields(&[("Signer", "ETSI.CAdES.detached", [0, 40, 60, 40])]);
    latest.insert(r(2), PdfDictionary::new().with("Certs", vec![PdfObject::from(r(3))]));
    latest.insert(r(3), PdfStream::new(PdfDictionary::new(), b"not a certificate".to_vec()));
    let catalog = PdfDictionary::new()
        .with("Type", PdfObject::name("Catalog"))
        .with("DSS", r(2))
        .with(
            "AcroForm",
            PdfDictionary::new().with("Fields", vec![PdfObject::from(r(10))]),
        );
    latest.insert(r(1), catalog);

    let mut document = MemoryRevisionedDocument::new();
    document.push(latest, 100);

    let inspector = FakeInspector::default().with("Signer", signed_by(&pki, &pki.leaf, true));
    let report = validate(&chain(&pki), &document, &inspector);

    assert_eq!(report.validation_result(), ValidationResult::Valid, "{report}");
    assert!(report.has_item(
        SIGNATURE_VERIFICATION,
        "Unable to decode certificate from the latest DSS, it is ignored."
    ));
}
