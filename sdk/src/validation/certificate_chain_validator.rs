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
    check_names::{CERTIFICATE_CHECK, EXTENSIONS_CHECK, VALIDATION_LIMITS, VALIDITY_CHECK},
    context::{CertificateSource, ValidationContext, ValidatorStage},
    report_item,
    validation::{CertificateValidation, ValidatorChain},
    Certificate, CertificateExtension, ValidationReport, ValidationResult,
};

/// Default [`CertificateValidation`]: walks from a certificate up to a
/// trust anchor.
///
/// Each certificate goes through these checks in order: validity period,
/// required extensions, trust, revocation, then its issuer. A trusted
/// certificate ends the walk. With `continue_after_failure` turned off for
/// the certificate's source, the first failed check ends it too.
#[derive(Clone, Copy, Debug, Default)]
pub struct CertificateChainValidator;

impl CertificateValidation for CertificateChainValidator {
    fn validate(
        &self,
        chain: &ValidatorChain,
        report: &mut ValidationReport,
        context: &ValidationContext,
        certificate: &Arc<Certificate>,
        validation_date: DateTime<Utc>,
        required_extensions: &[CertificateExtension],
    ) {
        let context = context.with_stage(ValidatorStage::CertificateChainValidator);

        if context.is_validating(certificate) {
            log::debug!("validation loop at {}", certificate.subject());
            report_item!(
                CERTIFICATE_CHECK,
                format!(
                    "Certificate {} is already being validated. Validation loop detected.",
                    certificate.subject()
                )
            )
            .with_certificate(certificate.subject().to_string())
            .indeterminate(report);
            return;
        }

        let context = context.entering(certificate);
        let max_depth = chain.settings().limits.max_chain_depth;
        if context.certificates_on_path() > max_depth {
            report_item!(
                VALIDATION_LIMITS,
                format!(
                    "Certificate {} is nested more than {max_depth} levels deep. Validation stopped.",
                    certificate.subject()
                )
            )
            .with_certificate(certificate.subject().to_string())
            .indeterminate(report);
            return;
        }

        let fail_fast = !chain
            .settings()
            .continue_after_failure(context.certificate_source());

        check_validity_period(report, certificate, validation_date);
        check_required_extensions(chain, report, &context, certificate, required_extensions);
        if should_stop(fail_fast, report) {
            return;
        }

        if check_if_trusted(chain, report, &context, certificate) {
            return;
        }

        chain
            .revocation_validator()
            .validate(chain, report, &context, certificate, validation_date);
        if should_stop(fail_fast, report) {
            return;
        }

        validate_issuer(chain, report, &context, certificate, validation_date);
    }
}

fn should_stop(fail_fast: bool, report: &ValidationReport) -> bool {
    fail_fast && report.validation_result() != ValidationResult::Valid
}

fn check_validity_period(
    report: &mut ValidationReport,
    certificate: &Certificate,
    validation_date: DateTime<Utc>,
) {
    let message = if validation_date < certificate.not_before() {
        format!(
            "Certificate {} is not yet valid at {validation_date}: validity starts {}.",
            certificate.subject(),
            certificate.not_before()
        )
    } else if validation_date > certificate.not_after() {
        format!(
            "Certificate {} is expired at {validation_date}: validity ended {}.",
            certificate.subject(),
            certificate.not_after()
        )
    } else {
        return;
    };

    report_item!(VALIDITY_CHECK, message)
        .with_certificate(certificate.subject().to_string())
        .invalid(report);
}

fn check_required_extensions(
    chain: &ValidatorChain,
    report: &mut ValidationReport,
    context: &ValidationContext,
    certificate: &Certificate,
    required_extensions: &[CertificateExtension],
) {
    let issuer_level = context.issuer_level();

    for extension in chain
        .required_extensions(context.certificate_source())
        .iter()
        .chain(required_extensions)
    {
        if !extension.is_satisfied_by(certificate, issuer_level) {
            report_item!(
                EXTENSIONS_CHECK,
                format!(
                    "Required certificate extension {extension} is not present or allowed in certificate {}.",
                    certificate.subject()
                )
            )
            .with_certificate(certificate.subject().to_string())
            .invalid(report);
        }
    }
}

fn check_if_trusted(
    chain: &ValidatorChain,
    report: &mut ValidationReport,
    context: &ValidationContext,
    certificate: &Certificate,
) -> bool {
    if context.certificate_source() == CertificateSource::Trusted {
        report_item!(
            CERTIFICATE_CHECK,
            format!(
                "Certificate {} is trusted, revocation data checks are not required.",
                certificate.subject()
            )
        )
        .with_certificate(certificate.subject().to_string())
        .info(report);
        return true;
    }

    chain
        .trust_store()
        .check_if_trusted(report, context, certificate)
}

fn validate_issuer(
    chain: &ValidatorChain,
    report: &mut ValidationReport,
    context: &ValidationContext,
    certificate: &Certificate,
    validation_date: DateTime<Utc>,
) {
    let candidates = chain.retriever().issuer_candidates(certificate);
    if candidates.is_empty() {
        report_item!(
            CERTIFICATE_CHECK,
            format!(
                "Certificate {} isn't trusted and issuer certificate isn't provided.",
                certificate.subject()
            )
        )
        .with_certificate(certificate.subject().to_string())
        .indeterminate(report);
        return;
    }

    let issuer_context = context.with_certificate_source(CertificateSource::CertIssuer);
    let mut candidate_reports = Vec::with_capacity(candidates.len());

    for issuer in candidates {
        let mut candidate_report = ValidationReport::new();

        if let Err(err) = chain.verifier().verify(
            certificate.signature_algorithm(),
            certificate.tbs(),
            certificate.signature(),
            issuer.spki(),
        ) {
            report_item!(
                CERTIFICATE_CHECK,
                format!(
                    "Certificate {} is not signed by issuer candidate {}.",
                    certificate.subject(),
                    issuer
                )
            )
            .with_cause(err)
            .with_certificate(certificate.subject().to_string())
            .invalid(&mut candidate_report);
            candidate_reports.push(candidate_report);
            continue;
        }

        chain.certificate_validator().validate(
            chain,
            &mut candidate_report,
            &issuer_context,
            &issuer,
            validation_date,
            &[],
        );

        if candidate_report.validation_result() == ValidationResult::Valid {
            report.merge(&candidate_report);
            return;
        }

        log::debug!(
            "issuer candidate {issuer} of {} is {}",
            certificate.subject(),
            candidate_report.validation_result()
        );
        candidate_reports.push(candidate_report);
    }

    for candidate_report in &candidate_reports {
        report.merge(candidate_report);
    }
}
