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
    check_names::OCSP_CHECK,
    context::{CertificateSource, ValidationContext, ValidatorStage},
    crypto::hash::hash_by_oid,
    report_item,
    revocation::{BasicOcspResponse, CertStatus, SingleResponse},
    trust::TrustScope,
    validation::{freshness_threshold, OcspValidation, ValidatorChain},
    Certificate, ValidationReport, ValidationResult,
};

pub(crate) const SERIAL_NUMBERS_DO_NOT_MATCH: &str =
    "Request and response serial numbers do not match.";

/// Default [`OcspValidation`].
#[derive(Clone, Copy, Debug, Default)]
pub struct OcspValidator;

impl OcspValidation for OcspValidator {
    fn validate(
        &self,
        chain: &ValidatorChain,
        report: &mut ValidationReport,
        context: &ValidationContext,
        certificate: &Arc<Certificate>,
        single_response: &SingleResponse,
        response: &BasicOcspResponse,
        validation_date: DateTime<Utc>,
        trusted_generation_date: DateTime<Utc>,
    ) {
        let context = context.with_stage(ValidatorStage::OcspValidator);

        if single_response.serial != certificate.serial() {
            report_item!(OCSP_CHECK, SERIAL_NUMBERS_DO_NOT_MATCH)
                .with_certificate(certificate.subject().to_string())
                .indeterminate(report);
            return;
        }

        let issuers = chain.retriever().issuer_candidates(certificate);
        if issuers.is_empty() {
            report_item!(
                OCSP_CHECK,
                format!(
                    "Issuer of certificate {} is not available, the OCSP response cannot be checked.",
                    certificate.subject()
                )
            )
            .with_certificate(certificate.subject().to_string())
            .indeterminate(report);
            return;
        }

        let mut candidate_reports = Vec::with_capacity(issuers.len());
        for issuer in issuers {
            let mut candidate_report = ValidationReport::new();
            validate_for_issuer(
                chain,
                &mut candidate_report,
                &context,
                certificate,
                &issuer,
                single_response,
                response,
                validation_date,
                trusted_generation_date,
            );

            if candidate_report.validation_result() != ValidationResult::Indeterminate {
                report.merge(&candidate_report);
                return;
            }
            candidate_reports.push(candidate_report);
        }

        for candidate_report in &candidate_reports {
            report.merge(candidate_report);
        }
    }
}

/// Return `true` if the response's CertID names `issuer` as the issuer.
fn cert_id_matches(single_response: &SingleResponse, issuer: &Certificate) -> bool {
    let name_hash = hash_by_oid(&single_response.hash_algorithm, issuer.subject().der());
    let key_hash = hash_by_oid(&single_response.hash_algorithm, issuer.public_key());

    name_hash.as_deref() == Some(single_response.issuer_name_hash.as_slice())
        && key_hash.as_deref() == Some(single_response.issuer_key_hash.as_slice())
}

#[allow(clippy::too_many_arguments)]
fn validate_for_issuer(
    chain: &ValidatorChain,
    report: &mut ValidationReport,
    context: &ValidationContext,
    certificate: &Certificate,
    issuer: &Arc<Certificate>,
    single_response: &SingleResponse,
    response: &BasicOcspResponse,
    validation_date: DateTime<Utc>,
    trusted_generation_date: DateTime<Utc>,
) {
    let subject = certificate.subject();

    if !cert_id_matches(single_response, issuer) {
        report_item!(
            OCSP_CHECK,
            format!("OCSP response does not refer to issuer {}.", issuer.subject())
        )
        .with_certificate(subject.to_string())
        .indeterminate(report);
        return;
    }

    let freshness = chain.settings().freshness(context.time_based_context());
    if single_response.this_update < freshness_threshold(validation_date, freshness) {
        report_item!(
            OCSP_CHECK,
            format!(
                "OCSP response is not fresh enough: thisUpdate {} is more than {}s before the validation date {validation_date}.",
                single_response.this_update,
                freshness.as_secs()
            )
        )
        .with_certificate(subject.to_string())
        .indeterminate(report);
        return;
    }

    if let Some(next_update) = single_response.next_update {
        if validation_date > next_update {
            report_item!(
                OCSP_CHECK,
                format!(
                    "OCSP response is no longer valid: nextUpdate {next_update} is before the validation date {validation_date}."
                )
            )
            .with_certificate(subject.to_string())
            .indeterminate(report);
            return;
        }
    }

    match &single_response.status {
        CertStatus::Good => {
            if certificate.not_after() < response.produced_at
                && response
                    .archive_cutoff
                    .map_or(true, |cutoff| certificate.not_after() < cutoff)
            {
                report_item!(
                    OCSP_CHECK,
                    format!(
                        "Certificate {subject} expired before the OCSP response was produced and the archive cutoff does not cover its expiry."
                    )
                )
                .with_certificate(subject.to_string())
                .indeterminate(report);
                return;
            }

            verify_responder(
                chain,
                report,
                context,
                response,
                issuer,
                trusted_generation_date,
            );
        }

        CertStatus::Revoked {
            revocation_time, ..
        } if validation_date < *revocation_time => {
            verify_responder(
                chain,
                report,
                context,
                response,
                issuer,
                trusted_generation_date,
            );

            report_item!(
                OCSP_CHECK,
                format!(
                    "Certificate {subject} is revoked on {revocation_time}, after the validation date {validation_date}."
                )
            )
            .with_certificate(subject.to_string())
            .info(report);
        }

        CertStatus::Revoked {
            revocation_time,
            reason,
        } => {
            let reason = reason.map(|r| format!(" (reason code {r})")).unwrap_or_default();
            log::info!("{subject} revoked on {revocation_time} according to OCSP");
            report_item!(
                OCSP_CHECK,
                format!(
                    "Certificate {subject} was revoked on {revocation_time}{reason} according to the OCSP response for issuer {}.",
                    issuer.subject()
                )
            )
            .with_certificate(subject.to_string())
            .invalid(report);
        }

        CertStatus::Unknown => {
            report_item!(
                OCSP_CHECK,
                format!("OCSP response reports the status of certificate {subject} as unknown.")
            )
            .with_certificate(subject.to_string())
            .indeterminate(report);
        }
    }
}

fn verify_signature(
    chain: &ValidatorChain,
    response: &BasicOcspResponse,
    signer: &Certificate,
) -> Result<(), crate::crypto::raw_signature::RawSignatureValidationError> {
    chain.verifier().verify(
        &response.signature_algorithm,
        &response.tbs,
        &response.signature,
        signer.spki(),
    )
}

/// Check that `response` was signed by `issuer` or by a responder the
/// issuer authorized.
fn verify_responder(
    chain: &ValidatorChain,
    report: &mut ValidationReport,
    context: &ValidationContext,
    response: &BasicOcspResponse,
    issuer: &Arc<Certificate>,
    trusted_generation_date: DateTime<Utc>,
) {
    if verify_signature(chain, response, issuer).is_ok() {
        log::debug!("OCSP response signed by issuer {}", issuer.subject());
        return;
    }

    let context = context.with_certificate_source(CertificateSource::OcspIssuer);
    let responders = chain.retriever().ocsp_responder_candidates(response);
    if responders.is_empty() {
        report_item!(
            OCSP_CHECK,
            "OCSP response could not be verified: it is not signed by the issuer and no responder certificate is available."
        )
        .indeterminate(report);
        return;
    }

    let mut candidate_reports = Vec::with_capacity(responders.len());
    for responder in responders {
        let mut candidate_report = ValidationReport::new();

        if let Err(err) = verify_signature(chain, response, &responder) {
            report_item!(
                OCSP_CHECK,
                format!(
                    "OCSP response signature could not be verified with responder certificate {}.",
                    responder.subject()
                )
            )
            .with_cause(err)
            .indeterminate(&mut candidate_report);
            candidate_reports.push(candidate_report);
            continue;
        }

        let trust_store = chain.trust_store();
        if trust_store.is_trusted_for(&responder, TrustScope::Ocsp)
            || trust_store.is_trusted_for(&responder, TrustScope::General)
        {
            report_item!(
                OCSP_CHECK,
                format!(
                    "Responder certificate {} is trusted for OCSP response signing.",
                    responder.subject()
                )
            )
            .with_certificate(responder.subject().to_string())
            .info(report);
            return;
        }

        if !chain.retriever().is_signed_by(&responder, issuer) {
            report_item!(
                OCSP_CHECK,
                format!(
                    "Authorized OCSP responder certificate {} is not issued by {}.",
                    responder.subject(),
                    issuer.subject()
                )
            )
            .with_certificate(responder.subject().to_string())
            .indeterminate(&mut candidate_report);
            candidate_reports.push(candidate_report);
            continue;
        }

        chain.certificate_validator().validate(
            chain,
            &mut candidate_report,
            &context,
            &responder,
            trusted_generation_date,
            &[],
        );

        if candidate_report.validation_result() == ValidationResult::Valid {
            report.merge(&candidate_report);
            return;
        }
        candidate_reports.push(candidate_report);
    }

    for candidate_report in &candidate_reports {
        report.merge_with_downgrade(candidate_report);
    }
}
