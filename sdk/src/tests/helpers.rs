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

use std::{collections::BTreeMap, fmt::Write, sync::Arc};

use chrono::{DateTime, Duration, Utc};

use crate::{
    certificate::{key_usage, Name},
    crypto::{
        hash::{sha1, sha256},
        oids,
        raw_signature::RawSignatureValidationError,
        SignatureVerifier,
    },
    revocation::{BasicOcspResponse, CertStatus, Crl, ResponderId, RevokedEntry, SingleResponse},
    settings::OnlineFetching,
    Certificate, CertificateBuilder, Settings, ValidatorChainBuilder,
};

/// Signature algorithm understood only by [`FakeVerifier`].
pub(crate) const FAKE_ALG: &str = "1.3.6.1.4.1.55555.1";

pub(crate) const PKI_CHAIN_PEM: &str = include_str!("../../tests/fixtures/pki/chain.pem");

pub(crate) fn date(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .with_timezone(&Utc)
}

/// Send `log` output to the test harness. Set `RUST_LOG=debug` to see it.
pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// When the fake PKI's revocation data is checked.
pub(crate) fn validation_date() -> DateTime<Utc> {
    date("2026-10-20T00:00:00Z")
}

pub(crate) fn this_update() -> DateTime<Utc> {
    date("2026-10-19T00:00:00Z")
}

pub(crate) fn name(dn: &str) -> Name {
    Name::new(dn.as_bytes().to_vec(), dn)
}

pub(crate) fn fake_key(label: &str) -> Vec<u8> {
    sha256(label.as_bytes())
}

/// A builder for `subject` with a key derived from the subject.
pub(crate) fn keyed(subject: &str) -> CertificateBuilder {
    CertificateBuilder::new(name(subject)).public_key(fake_key(subject), fake_key(subject))
}

pub(crate) fn fake_signature(data: &[u8], signer: &Certificate) -> Vec<u8> {
    let mut input = signer.spki().to_vec();
    input.extend_from_slice(data);
    sha256(&input)
}

pub(crate) fn fake_signed(builder: CertificateBuilder, issuer: &Certificate) -> Certificate {
    let tbs = builder.clone().build().tbs().to_vec();
    let signature = fake_signature(&tbs, issuer);
    builder.tbs(tbs).signature(FAKE_ALG, signature).build()
}

pub(crate) fn fake_self_signed(builder: CertificateBuilder) -> Certificate {
    let unsigned = builder.clone().build();
    let signature = fake_signature(unsigned.tbs(), &unsigned);
    builder
        .tbs(unsigned.tbs().to_vec())
        .signature(FAKE_ALG, signature)
        .build()
}

/// Accepts exactly the signatures made by [`fake_signature`].
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct FakeVerifier;

impl SignatureVerifier for FakeVerifier {
    fn verify(
        &self,
        _algorithm_oid: &str,
        data: &[u8],
        signature: &[u8],
        spki: &[u8],
    ) -> Result<(), RawSignatureValidationError> {
        let mut input = spki.to_vec();
        input.extend_from_slice(data);
        if sha256(&input) == signature {
            Ok(())
        } else {
            Err(RawSignatureValidationError::SignatureMismatch)
        }
    }
}

/// Root, intermediate and end-entity certificates signed with fake keys.
pub(crate) struct FakePki {
    pub root: Arc<Certificate>,
    pub int: Arc<Certificate>,
    pub leaf: Arc<Certificate>,
    pub responder: Arc<Certificate>,
    pub tsa: Arc<Certificate>,
}

impl FakePki {
    pub fn new() -> Self {
        init_logging();

        let ca_usage = key_usage::KEY_CERT_SIGN | key_usage::CRL_SIGN;

        let root = Arc::new(fake_self_signed(
            keyed("CN=Root")
                .serial(&[0x10, 0x01])
                .key_usage(ca_usage)
                .basic_constraints(true, None),
        ));
        let int = Arc::new(fake_signed(
            keyed("CN=Int")
                .issuer(name("CN=Root"))
                .serial(&[0x10, 0x02])
                .key_usage(ca_usage)
                .basic_constraints(true, Some(0)),
            &root,
        ));
        let leaf = Arc::new(fake_signed(
            keyed("CN=Leaf")
                .issuer(name("CN=Int"))
                .serial(&[0x20, 0x01])
                .key_usage(key_usage::DIGITAL_SIGNATURE | key_usage::NON_REPUDIATION),
            &int,
        ));
        let responder = Arc::new(fake_signed(
            keyed("CN=Responder")
                .issuer(name("CN=Int"))
                .serial(&[0x20, 0x02])
                .extended_key_usage(oids::EKU_OCSP_SIGNING)
                .extension(oids::OCSP_NOCHECK),
            &int,
        ));
        let tsa = Arc::new(fake_signed(
            keyed("CN=TSA")
                .issuer(name("CN=Int"))
                .serial(&[0x20, 0x03])
                .extended_key_usage(oids::EKU_TIME_STAMPING),
            &int,
        ));

        Self {
            root,
            int,
            leaf,
            responder,
            tsa,
        }
    }

    /// An offline chain trusting the root generally and knowing the
    /// intermediate.
    pub fn chain_builder(&self) -> ValidatorChainBuilder {
        ValidatorChainBuilder::new()
            .with_settings(offline_settings())
            .with_verifier(Arc::new(FakeVerifier))
            .with_generally_trusted_certificates([self.root.clone()])
            .with_known_certificates([self.int.clone()])
    }

    /// An empty CRL for the intermediate, signed by the root.
    pub fn root_crl(&self) -> Arc<Crl> {
        Arc::new(fake_crl(&self.root, Vec::new(), this_update()))
    }
}

pub(crate) fn offline_settings() -> Settings {
    let mut settings = Settings::default();
    settings.revocation.online_fetching = OnlineFetching::NeverFetch;
    settings
}

/// An OCSP response about `certificate` signed by `signer`.
pub(crate) fn fake_ocsp(
    certificate: &Certificate,
    issuer: &Certificate,
    signer: &Certificate,
    status: CertStatus,
    this_update: DateTime<Utc>,
) -> BasicOcspResponse {
    let single = SingleResponse {
        hash_algorithm: oids::SHA256.to_owned(),
        issuer_name_hash: sha256(issuer.subject().der()),
        issuer_key_hash: sha256(issuer.public_key()),
        serial: certificate.serial().to_vec(),
        status,
        this_update,
        next_update: Some(this_update + Duration::days(7)),
    };

    let tbs = format!(
        "ocsp|{}|{}|{:?}|{this_update}",
        certificate.serial_hex(),
        signer.subject(),
        single.status
    )
    .into_bytes();
    let signature = fake_signature(&tbs, signer);
    let mut der = tbs.clone();
    der.extend_from_slice(&signature);

    BasicOcspResponse {
        der,
        tbs,
        responder_id: ResponderId::ByKey(sha1(signer.public_key())),
        produced_at: this_update,
        responses: vec![single],
        archive_cutoff: None,
        signature_algorithm: FAKE_ALG.to_owned(),
        signature,
        certificates: Vec::new(),
    }
}

/// A CRL issued and signed by `issuer`.
pub(crate) fn fake_crl(
    issuer: &Certificate,
    revoked: Vec<RevokedEntry>,
    this_update: DateTime<Utc>,
) -> Crl {
    let mut tbs = format!("crl|{}|{this_update}", issuer.subject()).into_bytes();
    for entry in &revoked {
        tbs.extend_from_slice(&entry.serial);
    }
    let signature = fake_signature(&tbs, issuer);
    let mut der = tbs.clone();
    der.extend_from_slice(&signature);

    Crl {
        der,
        tbs,
        issuer: issuer.subject().clone(),
        this_update,
        next_update: Some(this_update + Duration::days(7)),
        revoked,
        signature_algorithm: FAKE_ALG.to_owned(),
        signature,
    }
}

pub(crate) fn revoked(certificate: &Certificate, revocation_date: DateTime<Utc>) -> RevokedEntry {
    RevokedEntry {
        serial: certificate.serial().to_vec(),
        revocation_date,
        reason: None,
    }
}

/// Writes minimal PDF files with correct cross-reference tables.
pub(crate) struct PdfWriter {
    bytes: Vec<u8>,
    last_xref: Option<usize>,
}

impl PdfWriter {
    pub fn new() -> Self {
        Self {
            bytes: b"%PDF-1.7\n".to_vec(),
            last_xref: None,
        }
    }

    /// Append an update that writes `objects` and frees `freed`, then ends
    /// with an xref table, trailer and `%%EOF`.
    pub fn revision(mut self, objects: &[(u32, &str)], freed: &[(u32, u16)], size: u32) -> Self {
        let mut entries: BTreeMap<u32, String> = BTreeMap::new();
        entries.insert(0, "0000000000 65535 f \n".to_owned());

        for (number, body) in objects {
            let offset = self.bytes.len();
            self.bytes
                .extend_from_slice(format!("{number} 0 obj\n{body}\nendobj\n").as_bytes());
            entries.insert(*number, format!("{offset:010} 00000 n \n"));
        }
        for (number, generation) in freed {
            entries.insert(*number, format!("0000000000 {generation:05} f \n"));
        }

        let xref = self.bytes.len();
        let mut section = String::from("xref\n");
        let numbers: Vec<u32> = entries.keys().copied().collect();
        let mut start = 0;
        while start < numbers.len() {
            let mut end = start + 1;
            while end < numbers.len() && numbers[end] == numbers[end - 1] + 1 {
                end += 1;
            }
            let _ = writeln!(section, "{} {}", numbers[start], end - start);
            for number in &numbers[start..end] {
                section.push_str(&entries[number]);
            }
            start = end;
        }

        let prev = self
            .last_xref
            .map(|offset| format!(" /Prev {offset}"))
            .unwrap_or_default();
        let _ = write!(
            section,
            "trailer\n<< /Size {size} /Root 1 0 R{prev} >>\nstartxref\n{xref}\n%%EOF\n"
        );

        self.bytes.extend_from_slice(section.as_bytes());
        self.last_xref = Some(xref);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

fn simple_writer() -> PdfWriter {
    PdfWriter::new().revision(
        &[
            (1, "<< /Type /Catalog /Pages 2 0 R >>"),
            (2, "<< /Type /Pages /Kids [] /Count 0 >>"),
            (3, "<< /Producer (test) >>"),
        ],
        &[],
        4,
    )
}

pub(crate) fn simple_pdf() -> Vec<u8> {
    simple_writer().finish()
}

/// [`simple_pdf`] plus an update that adds a DSS and frees object 3.
pub(crate) fn incremental_pdf() -> Vec<u8> {
    simple_writer()
        .revision(
            &[
                (1, "<< /Type /Catalog /Pages 2 0 R /DSS 4 0 R >>"),
                (4, "<< /Type /DSS >>"),
            ],
            &[(3, 1)],
            5,
        )
        .finish()
}
