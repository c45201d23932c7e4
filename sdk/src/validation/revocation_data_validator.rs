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

use std::{cmp::Ordering, collections::HashSet, sync::Arc};

use chrono::{DateTime, Utc};

use crate::{
    check_names::{REVOCATION_DATA_CHECK, VALIDATION_LIMITS},
    context::{CertificateSource, ValidationContext, ValidatorStage},
    crypto::oids,
    report_item,
    revocation::{
        preference, CrlClient, CrlEvidence, EvidenceOrigin, OcspClient, OcspEvidence,
        OnlineFetching, SingleResponse,
    },
    validation::{
        crl_validator::NO_COMMON_ROOT, ocsp_validator::SERIAL_NUMBERS_DO_NOT_MATCH,
        RevocationValidation, ValidatorChain,
    },
    Certificate, ReportItem, ReportItemStatus, ValidationReport, ValidationResult,
};

/// Default [`RevocationValidation`].
///
/// Collects every OCSP response and CRL available for a certificate, newest
/// first, and hands them one at a time to the OCSP and CRL validators. The
/// first piece of evidence that yields a conclusive answer decides. When no
/// evidence does, the certificate's revocation status is indeterminate.
#[derive(Clone, Copy, Debug, Default)]
pub struct RevocationDataValidator;

impl RevocationValidation for RevocationDataValidator {
    fn validate(
        &self,
        chain: &ValidatorChain,
        report: &mut ValidationReport,
        context: &ValidationContext,
        certificate: &Arc<Certificate>,
        validation_date: DateTime<Utc>,
    ) {
        let context = context.with_stage(ValidatorStage::RevocationDataValidator);

        if is_exempt(report, &context, certificate) {
            return;
        }

        let policy = chain.settings().revocation.online_fetching;
        let issuer = chain.retriever().issuer_candidates(certificate).into_iter().next();
        let mut attempts = ValidationReport::new();

        let mut ocsp_clients = chain.ocsp_clients();
        let mut crl_clients = chain.crl_clients();
        if policy == OnlineFetching::AlwaysFetch {
            ocsp_clients.extend(chain.online_ocsp_client().cloned());
            crl_clients.extend(chain.online_crl_client().cloned());
        }

        let candidates = collect(
            chain,
            &mut attempts,
            certificate,
            issuer.as_deref(),
            &ocsp_clients,
            &crl_clients,
        );
        let mut outcome = validate_candidates(
            chain,
            &mut attempts,
            &context,
            certificate,
            validation_date,
            candidates,
        );

        if outcome.is_none() && policy == OnlineFetching::FetchIfNoOtherDataAvailable {
            log::debug!(
                "no conclusive revocation data for {}, fetching online",
                certificate.subject()
            );

            let online_ocsp: Vec<_> = chain.online_ocsp_client().cloned().into_iter().collect();
            let online_crl: Vec<_> = chain.online_crl_client().cloned().into_iter().collect();
            let fetched = collect(
                chain,
                &mut attempts,
                certificate,
                issuer.as_deref(),
                &online_ocsp,
                &online_crl,
            );
            remember(chain, &fetched);

            outcome = validate_candidates(
                chain,
                &mut attempts,
                &context,
                certificate,
                validation_date,
                fetched,
            );
        }

        match outcome {
            Some(conclusive) => {
                // superseded attempts stay visible but no longer count
                report.merge_with(&attempts, |item| item.with_status(ReportItemStatus::Info));
                report.merge(&conclusive);
            }
            None => {
                report.merge_with(&attempts, suppress_noise);
                report_item!(
                    REVOCATION_DATA_CHECK,
                    format!(
                        "Certificate {} has no revocation data available that allows a conclusion.",
                        certificate.subject()
                    )
                )
                .with_certificate(certificate.subject().to_string())
                .indeterminate(report);
                log::info!("no revocation data for {}", certificate.subject());
            }
        }
    }
}

/// Record why `certificate` needs no revocation check, if it doesn't.
fn is_exempt(
    report: &mut ValidationReport,
    context: &ValidationContext,
    certificate: &Certificate,
) -> bool {
    let subject = certificate.subject();
    let item = |message: String| {
        report_item!(REVOCATION_DATA_CHECK, message).with_certificate(subject.to_string())
    };

    if context.certificate_source() == CertificateSource::OcspIssuer
        && certificate.has_extension(oids::OCSP_NOCHECK)
    {
        item(format!(
            "Revocation data check is not required for OCSP responder certificate {subject} carrying the id-pkix-ocsp-nocheck extension."
        ))
        .info(report);
        return true;
    }

    if certificate.is_self_issued() {
        item(format!(
            "Certificate {subject} is self-signed. Revocation data check is not required."
        ))
        .info(report);
        return true;
    }

    if certificate.has_extension(oids::VALIDITY_ASSURED_SHORT_TERM) {
        item(format!(
            "Revocation data check is not required for certificate {subject} carrying the validity assured short-term extension."
        ))
        .info(report);
        return true;
    }

    if certificate.has_extension(oids::NO_REV_AVAIL) {
        if certificate.is_ca() {
            item(format!(
                "CA certificate {subject} carries the noRevAvail extension, which is only allowed in end-entity certificates."
            ))
            .indeterminate(report);
        } else {
            item(format!(
                "Revocation data check is not required for certificate {subject} carrying the noRevAvail extension."
            ))
            .info(report);
        }
        return true;
    }

    false
}

fn suppress_noise(item: ReportItem) -> ReportItem {
    if item.message == SERIAL_NUMBERS_DO_NOT_MATCH || item.message == NO_COMMON_ROOT {
        item.with_status(ReportItemStatus::Info)
    } else {
        item
    }
}

enum Candidate {
    Ocsp { evidence: OcspEvidence, index: usize },
    Crl(CrlEvidence),
}

impl Candidate {
    fn this_update(&self) -> DateTime<Utc> {
        match self {
            Self::Ocsp { evidence, index } => evidence
                .response
                .responses
                .get(*index)
                .map_or(DateTime::<Utc>::MIN_UTC, |single| single.this_update),
            Self::Crl(evidence) => evidence.crl.this_update,
        }
    }

    // OCSP is preferred over a CRL issued at the same time
    fn kind(&self) -> u8 {
        match self {
            Self::Ocsp { .. } => 0,
            Self::Crl(_) => 1,
        }
    }

    fn provenance(&self) -> (EvidenceOrigin, DateTime<Utc>) {
        match self {
            Self::Ocsp { evidence, .. } => (evidence.origin, evidence.trusted_generation_date),
            Self::Crl(evidence) => (evidence.origin, evidence.trusted_generation_date),
        }
    }

    fn identity(&self) -> (u8, &[u8], usize) {
        match self {
            Self::Ocsp { evidence, index } => (0, &evidence.response.der, *index),
            Self::Crl(evidence) => (1, &evidence.crl.der, 0),
        }
    }

    /// Newest first, then OCSP before CRL, then better provenance. The
    /// encoding breaks any remaining tie, so the order never depends on the
    /// order evidence was supplied in.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .this_update()
            .cmp(&self.this_update())
            .then(self.kind().cmp(&other.kind()))
            .then(preference(self.provenance(), other.provenance()))
            .then(self.identity().cmp(&other.identity()))
    }
}

fn collect(
    chain: &ValidatorChain,
    attempts: &mut ValidationReport,
    certificate: &Certificate,
    issuer: Option<&Certificate>,
    ocsp_clients: &[Arc<dyn OcspClient>],
    crl_clients: &[Arc<dyn CrlClient>],
) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for client in ocsp_clients {
        match client.ocsp_responses(certificate, issuer) {
            Ok(responses) => {
                for evidence in responses {
                    for index in 0..evidence.response.responses.len() {
                        candidates.push(Candidate::Ocsp {
                            evidence: evidence.clone(),
                            index,
                        });
                    }
                }
            }
            Err(err) => {
                log::warn!("OCSP client failed for {}: {err}", certificate.subject());
                report_item!(REVOCATION_DATA_CHECK, "Unable to retrieve OCSP responses.")
                    .with_cause(err)
                    .with_certificate(certificate.subject().to_string())
                    .info(attempts);
            }
        }
    }

    for client in crl_clients {
        match client.crls(certificate) {
            Ok(crls) => candidates.extend(crls.into_iter().map(Candidate::Crl)),
            Err(err) => {
                log::warn!("CRL client failed for {}: {err}", certificate.subject());
                report_item!(REVOCATION_DATA_CHECK, "Unable to retrieve CRLs.")
                    .with_cause(err)
                    .with_certificate(certificate.subject().to_string())
                    .info(attempts);
            }
        }
    }

    candidates.sort_by(Candidate::cmp);

    // the same evidence may come from several clients; the best copy sorts first
    let mut seen = HashSet::new();
    candidates.retain(|candidate| {
        let (kind, der, index) = candidate.identity();
        seen.insert((kind, der.to_vec(), index))
    });

    let max = chain.settings().limits.max_revocation_responses;
    if candidates.len() > max {
        report_item!(
            VALIDATION_LIMITS,
            format!(
                "{} pieces of revocation data found for certificate {}, only the newest {max} are checked.",
                candidates.len(),
                certificate.subject()
            )
        )
        .indeterminate(attempts);
        candidates.truncate(max);
    }

    candidates
}

/// Add freshly fetched evidence to the run's pools so later checks can use
/// it without another fetch.
fn remember(chain: &ValidatorChain, candidates: &[Candidate]) {
    for candidate in candidates {
        match candidate {
            Candidate::Ocsp { evidence, .. } => chain.ocsp_pool().add_response(
                evidence.response.clone(),
                evidence.trusted_generation_date,
                evidence.time_context,
                evidence.origin,
            ),
            Candidate::Crl(evidence) => chain.crl_pool().add_crl(
                evidence.crl.clone(),
                evidence.trusted_generation_date,
                evidence.time_context,
                evidence.origin,
            ),
        }
    }
}

/// Validate candidates in order until one is conclusive, returning its
/// report. Reports of inconclusive candidates go to `attempts`.
fn validate_candidates(
    chain: &ValidatorChain,
    attempts: &mut ValidationReport,
    context: &ValidationContext,
    certificate: &Arc<Certificate>,
    validation_date: DateTime<Utc>,
    candidates: Vec<Candidate>,
) -> Option<ValidationReport> {
    for candidate in candidates {
        let mut candidate_report = ValidationReport::new();

        match &candidate {
            Candidate::Ocsp { evidence, index } => {
                let Some(single) = evidence.response.responses.get(*index) else {
                    continue;
                };
                validate_ocsp(
                    chain,
                    &mut candidate_report,
                    context,
                    certificate,
                    evidence,
                    single,
                    validation_date,
                );
            }
            Candidate::Crl(evidence) => {
                chain.crl_validator().validate(
                    chain,
                    &mut candidate_report,
                    &context.with_time_based_context(evidence.time_context),
                    certificate,
                    &evidence.crl,
                    validation_date,
                    evidence.trusted_generation_date,
                );
            }
        }

        if candidate_report.validation_result() != ValidationResult::Indeterminate {
            log::debug!(
                "revocation status of {} decided by {} evidence: {}",
                certificate.subject(),
                if candidate.kind() == 0 { "OCSP" } else { "CRL" },
                candidate_report.validation_result()
            );
            return Some(candidate_report);
        }

        attempts.merge(&candidate_report);
    }

    None
}

fn validate_ocsp(
    chain: &ValidatorChain,
    report: &mut ValidationReport,
    context: &ValidationContext,
    certificate: &Arc<Certificate>,
    evidence: &OcspEvidence,
    single: &SingleResponse,
    validation_date: DateTime<Utc>,
) {
    chain.ocsp_validator().validate(
        chain,
        report,
        &context.with_time_based_context(evidence.time_context),
        certificate,
        single,
        &evidence.response,
        validation_date,
        evidence.trusted_generation_date,
    );
}
