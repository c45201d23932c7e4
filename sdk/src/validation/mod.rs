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

//! The validators and the [`ValidatorChain`] that wires them together.
//!
//! Each validator is a trait with one default implementation. Every trait
//! method receives the [`ValidatorChain`] it runs in, so a validator reaches
//! its collaborators (settings, trust store, issuer retriever, the other
//! validators) through the chain instead of holding them itself. Swapping a
//! validator is a matter of handing a different trait object to
//! [`ValidatorChainBuilder`].

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    context::ValidationContext,
    revocation::{BasicOcspResponse, Crl, SingleResponse},
    Certificate, CertificateExtension, ValidationReport,
};

mod certificate_chain_validator;
pub use certificate_chain_validator::CertificateChainValidator;

mod chain;
pub use chain::{ValidatorChain, ValidatorChainBuilder};

pub(crate) mod crl_validator;
pub use crl_validator::CrlValidator;

pub(crate) mod document_revisions_validator;
pub use document_revisions_validator::{AccessPermissions, DocumentRevisionsValidator};

mod ocsp_validator;
pub use ocsp_validator::OcspValidator;

mod revocation_data_validator;
pub use revocation_data_validator::RevocationDataValidator;

mod signature_validator;
pub use signature_validator::SignatureValidator;

/// Validates one certificate and, recursively, its issuers.
pub trait CertificateValidation: Send + Sync {
    /// Validate `certificate` as of `validation_date`, appending findings to
    /// `report`.
    ///
    /// `required_extensions` are checked in addition to the ones configured
    /// for the context's certificate source.
    fn validate(
        &self,
        chain: &ValidatorChain,
        report: &mut ValidationReport,
        context: &ValidationContext,
        certificate: &Arc<Certificate>,
        validation_date: DateTime<Utc>,
        required_extensions: &[CertificateExtension],
    );
}

/// Decides whether a certificate was revoked as of a date.
pub trait RevocationValidation: Send + Sync {
    fn validate(
        &self,
        chain: &ValidatorChain,
        report: &mut ValidationReport,
        context: &ValidationContext,
        certificate: &Arc<Certificate>,
        validation_date: DateTime<Utc>,
    );
}

/// Validates one OCSP single response against one certificate.
pub trait OcspValidation: Send + Sync {
    #[allow(clippy::too_many_arguments)]
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
    );
}

/// Validates one CRL against one certificate.
pub trait CrlValidation: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    fn validate(
        &self,
        chain: &ValidatorChain,
        report: &mut ValidationReport,
        context: &ValidationContext,
        certificate: &Arc<Certificate>,
        crl: &Crl,
        validation_date: DateTime<Utc>,
        trusted_generation_date: DateTime<Utc>,
    );
}

/// Earliest `thisUpdate` that still counts as fresh for `validation_date`.
pub(crate) fn freshness_threshold(
    validation_date: DateTime<Utc>,
    freshness: std::time::Duration,
) -> DateTime<Utc> {
    chrono::Duration::from_std(freshness)
        .ok()
        .and_then(|freshness| validation_date.checked_sub_signed(freshness))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
