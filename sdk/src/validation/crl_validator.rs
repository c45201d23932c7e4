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
    check_names::CRL_CHECK,
    context::{CertificateSource, ValidationContext, ValidatorStage},
    report_item,
    revocation::{crl::REASON_REMOVE_FROM_CRL, Crl},
    validation::{freshness_threshold, CrlValidation, ValidatorChain},
    Certificate, ValidationReport, ValidationResult,
};

pub(crate) const NO_COMMON_ROOT: &str =
    "CRL issuer and the certificate being checked do not have a common root.";

/// Default [`CrlValidation`].
///
/// The CRL issuer is looked up by name, must chain to the same root as the
/// certificate being checked, must have signed the CRL and must itself
/// validate as a CRL issuer. Only then is the certificate looked up in the
/// CRL.
#[derive(Clone, Copy, Debug, Default)]
pub struct CrlValidator;

impl CrlValidation for CrlValidator {
    fn validate(
        &self,
        chain: &ValidatorChain,
        report: &mut ValidationReport,
        context: &ValidationContext,
        certificate: &Arc<Certificate>,
        crl: &Crl,
        validation_date: DateTime<Utc>,
        _trusted_generation_date: DateTime<Utc>,
    ) {
        let context = context.with_stage(ValidatorStage::CrlValidator);
        let subject = certificate.subject();

        let freshness = chain.settings().freshness(context.time_based_context());
        if crl.this_update < freshness_threshold(validation_date, freshness) {
            report_item!(
                CRL_CHECK,
                format!(
                    "CRL is not fresh enough: thisUpdate {} is more than {}s before the validation date {validation_date}.",
                    crl.this_update,
                    freshness.as_secs()
                )
            )
            .with_certificate(subject.to_string())
            .indeterminate(report);
            return;
        }

        if let Some(next_update) = crl.next_update {
            if next_update < validation_date {
                report_item!(
                    CRL_CHECK,
                    format!(
                        "nextUpdate field ({next_update}) is before requested validation date ({validation_date})."
                    )
                )
                .with_certificate(subject.to_string())
                .indeterminate(report);
                return;
            }
        }

        let issuers = chain.retriever().crl_issuer_candidates(crl);
        if issuers.is_empty() {
            report_item!(
                CRL_CHECK,
                format!("CRL issuer {} is not available.", crl.issuer)
            )
            .with_certificate(subject.to_string())
            .indeterminate(report);
            return;
        }

        let max_depth = chain.settings().limits.max_chain_depth;
        let subject_root = chain.retriever().root_of(certificate, max_depth);
        let mut candidate_reports = Vec::with_capacity(issuers.len());

        for issuer in issuers {
            let mut candidate_report = ValidationReport::new();

            if *chain.retriever().root_of(&issuer, max_depth) != *subject_root {
                report_item!(CRL_CHECK, NO_COMMON_ROOT)
                    .with_certificate(subject.to_string())
                    .indeterminate(&mut candidate_report);
                candidate_reports.push(candidate_report);
                continue;
            }

            if let Err(err) = chain.verifier().verify(
                &crl.signature_algorithm,
                &crl.tbs,
                &crl.signature,
                issuer.spki(),
            ) {
                report_item!(
                    CRL_CHECK,
                    format!(
                        "CRL signature could not be verified with issuer certificate {}.",
                        issuer.subject()
                    )
                )
                .with_cause(err)
                .with_certificate(subject.to_string())
                .indeterminate(&mut candidate_report);
                candidate_reports.push(candidate_report);
                continue;
            }

            let revocation_check_date = crl.next_update.unwrap_or(crl.this_update);
            chain.certificate_validator().validate(
                chain,
                &mut candidate_report,
                &context.with_certificate_source(CertificateSource::CrlIssuer),
                &issuer,
                revocation_check_date,
                &[],
            );

            if candidate_report.validation_result() == ValidationResult::Valid {
                report.merge(&candidate_report);
                check_revoked(report, certificate, crl, validation_date);
                return;
            }
            candidate_reports.push(candidate_report);
        }

        for candidate_report in &candidate_reports {
            report.merge_with_downgrade(candidate_report);
        }
    }
}

fn check_revoked(
    report: &mut ValidationReport,
    certificate: &Certificate,
    crl: &Crl,
    validation_date: DateTime<Utc>,
) {
    let Some(entry) = crl.revoked_entry(certificate.serial()) else {
        return;
    };

    let subject = certificate.subject();
    let revocation_date = entry.revocation_date;

    if validation_date < revocation_date {
        report_item!(
            CRL_CHECK,
            format!(
                "Certificate {subject} is revoked on {revocation_date}, after the validation date {validation_date}."
            )
        )
        .with_certificate(subject.to_string())
        .info(report);
    } else if entry.reason == Some(REASON_REMOVE_FROM_CRL) {
        report_item!(
            CRL_CHECK,
            format!("Certificate {subject} was removed from the CRL on {revocation_date}, its status is unknown.")
        )
        .with_certificate(subject.to_string())
        .indeterminate(report);
    } else {
        log::info!("{subject} revoked on {revocation_date} according to CRL");
        report_item!(
            CRL_CHECK,
            format!(
                "Certificate {subject} was revoked on {revocation_date} according to the CRL of {}.",
                crl.issuer
            )
        )
        .with_certificate(subject.to_string())
        .invalid(report);
    }
}
