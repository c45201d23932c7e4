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
    check_names::{SIGNATURE_VERIFICATION, TIMESTAMP_VERIFICATION, VALIDATION_LIMITS},
    context::{CertificateSource, TimeBasedContext, ValidationContext, ValidatorStage},
    pdf::{signature_fields, DssData, RevisionedDocument, SignatureField},
    report_item,
    revocation::{BasicOcspResponse, Crl, EvidenceOrigin},
    signature::{SignatureData, SignatureInspector},
    validation::ValidatorChain,
    Certificate, ValidationReport, ValidationResult,
};

/// Proof of existence: the latest date everything still to be validated is
/// known to have existed at, and whether that date came from a timestamp.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Poe {
    date: DateTime<Utc>,
    time_context: TimeBasedContext,
}

/// Validates every signature of one document.
///
/// Signatures are processed newest first. Document and signature
/// timestamps that validate move the proof of existence back to their
/// generation time, and older signatures are then validated at that time.
/// Revocation data found along the way (DSS, signature containers) is added
/// to the chain's evidence pools.
///
/// The validator is consumed by [`validate_signatures`](Self::validate_signatures).
pub struct SignatureValidator<'a> {
    chain: &'a ValidatorChain,
    document: &'a dyn RevisionedDocument,
    inspector: &'a dyn SignatureInspector,
    validation_date: DateTime<Utc>,
}

impl<'a> SignatureValidator<'a> {
    pub fn new(
        chain: &'a ValidatorChain,
        document: &'a dyn RevisionedDocument,
        inspector: &'a dyn SignatureInspector,
    ) -> Self {
        Self {
            chain,
            document,
            inspector,
            validation_date: Utc::now(),
        }
    }

    /// Validate as of `date` instead of now.
    pub fn with_validation_date(mut self, date: DateTime<Utc>) -> Self {
        self.validation_date = date;
        self
    }

    pub fn validate_signatures(self) -> ValidationReport {
        let mut report = ValidationReport::new();

        let revisions = self.document.revisions().len();
        let max_revisions = self.chain.settings().limits.max_revisions;
        if revisions > max_revisions {
            report_item!(
                VALIDATION_LIMITS,
                format!("Document has {revisions} revisions, more than the limit of {max_revisions}.")
            )
            .indeterminate(&mut report);
            return report;
        }

        let latest = match self.document.latest() {
            Ok(latest) => latest,
            Err(err) => {
                report_item!(SIGNATURE_VERIFICATION, "Unable to read the document.")
                    .with_cause(err)
                    .indeterminate(&mut report);
                return report;
            }
        };

        report.merge(&self.chain.document_revisions_validator().validate(self.document));

        let mut poe = Poe {
            date: self.validation_date,
            time_context: TimeBasedContext::Present,
        };

        if let Some(dss) = DssData::from_document(latest.as_ref()) {
            self.add_dss(&mut report, &dss, EvidenceOrigin::LatestDss, poe);
        }

        let mut fields: Vec<(usize, SignatureField)> = Vec::new();
        for field in signature_fields(latest.as_ref()) {
            match field
                .covered_end()
                .and_then(|end| self.document.revision_covering(end))
            {
                Some(index) => fields.push((index, field)),
                None => {
                    report_item!(
                        SIGNATURE_VERIFICATION,
                        format!("Signature {} covers bytes beyond the end of the document.", field.name)
                    )
                    .invalid(&mut report);
                }
            }
        }

        if fields.is_empty() {
            report_item!(SIGNATURE_VERIFICATION, "Document has no signatures.").info(&mut report);
            return report;
        }

        // newest first
        fields.sort_by(|(a_index, a), (b_index, b)| {
            b_index
                .cmp(a_index)
                .then_with(|| b.covered_end().cmp(&a.covered_end()))
        });

        for (index, field) in &fields {
            log::debug!("validating signature {} from revision {index}", field.name);

            let data = match self.inspector.inspect(field, self.document) {
                Ok(data) => data,
                Err(err) => {
                    report_item!(
                        SIGNATURE_VERIFICATION,
                        format!("Unable to read signature {}.", field.name)
                    )
                    .with_cause(err)
                    .indeterminate(&mut report);
                    continue;
                }
            };

            self.check_integrity(&mut report, *index, field, &data);

            if field.is_document_timestamp() {
                poe = self.validate_document_timestamp(&mut report, *index, field, &data, poe);
            } else {
                poe = self.validate_signature(&mut report, field, &data, poe);
            }
        }

        report
    }

    fn check_integrity(
        &self,
        report: &mut ValidationReport,
        index: usize,
        field: &SignatureField,
        data: &SignatureData,
    ) {
        let revision_end = self.document.revisions()[index].eof_offset;
        if !field.covers_whole_revision(revision_end) {
            report_item!(
                SIGNATURE_VERIFICATION,
                format!("Signature {} doesn't cover the entire document revision.", field.name)
            )
            .invalid(report);
        }

        if data.signature_valid {
            report_item!(
                SIGNATURE_VERIFICATION,
                format!("Signature {} is cryptographically valid.", field.name)
            )
            .info(report);
        } else {
            report_item!(
                SIGNATURE_VERIFICATION,
                format!("Signature {} is not cryptographically valid.", field.name)
            )
            .with_certificate(data.signing_certificate.to_string())
            .invalid(report);
        }
    }

    fn validate_document_timestamp(
        &self,
        report: &mut ValidationReport,
        index: usize,
        field: &SignatureField,
        data: &SignatureData,
        poe: Poe,
    ) -> Poe {
        self.add_signature_material(
            &data.certificates,
            &data.ocsp_responses,
            &data.crls,
            poe,
        );

        let context = ValidationContext::new(
            ValidatorStage::SignatureValidator,
            CertificateSource::Timestamp,
            poe.time_context,
        );
        let chain_report = self
            .chain
            .validate_certificate(&context, &data.signing_certificate, poe.date);
        let chain_valid = chain_report.validation_result() == ValidationResult::Valid;
        report.merge(&chain_report);

        let Some(generation_time) = data.signing_time else {
            report_item!(
                TIMESTAMP_VERIFICATION,
                format!("Document timestamp {} has no generation time.", field.name)
            )
            .indeterminate(report);
            return poe;
        };

        if !(chain_valid && data.signature_valid) {
            return poe;
        }

        report_item!(
            TIMESTAMP_VERIFICATION,
            format!(
                "Document timestamp {} proves the document existed at {generation_time}.",
                field.name
            )
        )
        .info(report);

        let proven = Poe {
            date: generation_time.min(poe.date),
            time_context: TimeBasedContext::Historical,
        };

        // the DSS written before the timestamp is covered by it
        match self.document.document_at(index) {
            Ok(document) => {
                if let Some(dss) = DssData::from_document(document.as_ref()) {
                    self.add_dss(report, &dss, EvidenceOrigin::HistoricalDss, proven);
                }
            }
            Err(err) => {
                report_item!(
                    TIMESTAMP_VERIFICATION,
                    format!("Unable to read revision {index} for its validation data.")
                )
                .with_cause(err)
                .info(report);
            }
        }

        proven
    }

    fn validate_signature(
        &self,
        report: &mut ValidationReport,
        field: &SignatureField,
        data: &SignatureData,
        poe: Poe,
    ) -> Poe {
        let ocsp_snapshot = self.chain.ocsp_pool().snapshot();
        let crl_snapshot = self.chain.crl_pool().snapshot();

        self.add_signature_material(
            &data.certificates,
            &data.ocsp_responses,
            &data.crls,
            poe,
        );

        let mut signer_poe = poe;
        if let Some(timestamp) = &data.timestamp {
            self.add_signature_material(
                &timestamp.certificates,
                &timestamp.ocsp_responses,
                &timestamp.crls,
                poe,
            );

            let context = ValidationContext::new(
                ValidatorStage::SignatureValidator,
                CertificateSource::Timestamp,
                poe.time_context,
            );
            let timestamp_report = self.chain.validate_certificate(
                &context,
                &timestamp.signing_certificate,
                poe.date,
            );

            if !timestamp.signature_valid {
                report_item!(
                    TIMESTAMP_VERIFICATION,
                    format!("Signature timestamp of {} is not cryptographically valid.", field.name)
                )
                .invalid(report);
            }

            if timestamp.signature_valid
                && timestamp_report.validation_result() == ValidationResult::Valid
            {
                signer_poe = Poe {
                    date: timestamp.generation_time.min(poe.date),
                    time_context: TimeBasedContext::Historical,
                };
            }
            report.merge(&timestamp_report);
        }

        let signer_report = self.validate_signer(data, signer_poe);
        if signer_report.validation_result() == ValidationResult::Valid {
            report.merge(&signer_report);
            return signer_poe;
        }
        if signer_poe == poe {
            report.merge(&signer_report);
            return poe;
        }

        // the timestamp only counts for a signature that validates with it
        log::debug!(
            "signer of {} did not validate at {}, rolling back to {}",
            field.name,
            signer_poe.date,
            poe.date
        );
        report_item!(
            TIMESTAMP_VERIFICATION,
            format!(
                "Signer of {} could not be validated at the signature timestamp, validating at {} instead.",
                field.name, poe.date
            )
        )
        .info(report);

        self.chain.ocsp_pool().restore(ocsp_snapshot);
        self.chain.crl_pool().restore(crl_snapshot);
        self.add_signature_material(&data.certificates, &data.ocsp_responses, &data.crls, poe);

        let signer_report = self.validate_signer(data, poe);
        report.merge(&signer_report);
        poe
    }

    fn validate_signer(&self, data: &SignatureData, poe: Poe) -> ValidationReport {
        let context = ValidationContext::new(
            ValidatorStage::SignatureValidator,
            CertificateSource::Signer,
            poe.time_context,
        );
        self.chain
            .validate_certificate(&context, &data.signing_certificate, poe.date)
    }

    fn add_signature_material(
        &self,
        certificates: &[Arc<Certificate>],
        ocsp_responses: &[Arc<BasicOcspResponse>],
        crls: &[Arc<Crl>],
        poe: Poe,
    ) {
        self.chain.add_known_certificates(certificates.iter().cloned());

        for response in ocsp_responses {
            self.chain.ocsp_pool().add_response(
                response.clone(),
                poe.date,
                poe.time_context,
                EvidenceOrigin::SignatureEmbedded,
            );
        }
        for crl in crls {
            self.chain.crl_pool().add_crl(
                crl.clone(),
                poe.date,
                poe.time_context,
                EvidenceOrigin::SignatureEmbedded,
            );
        }
    }

    fn add_dss(
        &self,
        report: &mut ValidationReport,
        dss: &DssData,
        origin: EvidenceOrigin,
        poe: Poe,
    ) {
        let mut certificates = Vec::new();
        for der in &dss.certificates {
            match Certificate::from_der(der) {
                Ok(certificate) => certificates.push(Arc::new(certificate)),
                Err(err) => dss_item(report, "certificate", origin, err),
            }
        }
        self.chain.add_known_certificates(certificates);

        for der in &dss.ocsp_responses {
            match BasicOcspResponse::from_ocsp_response_der(der) {
                Ok(response) => self.chain.ocsp_pool().add_response(
                    Arc::new(response),
                    poe.date,
                    poe.time_context,
                    origin,
                ),
                Err(err) => dss_item(report, "OCSP response", origin, err),
            }
        }

        for der in &dss.crls {
            match Crl::from_der(der) {
                Ok(crl) => self.chain.crl_pool().add_crl(
                    Arc::new(crl),
                    poe.date,
                    poe.time_context,
                    origin,
                ),
                Err(err) => dss_item(report, "CRL", origin, err),
            }
        }
    }
}

fn dss_item(
    report: &mut ValidationReport,
    kind: &str,
    origin: EvidenceOrigin,
    err: impl std::fmt::Display,
) {
    let which = match origin {
        EvidenceOrigin::HistoricalDss => "timestamped",
        _ => "latest",
    };
    report_item!(
        SIGNATURE_VERIFICATION,
        format!("Unable to decode {kind} from the {which} DSS, it is ignored.")
    )
    .with_cause(err)
    .info(report);
}
