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

//! Revocation evidence: OCSP responses and CRLs, where they came from, and
//! the clients that supply them.

use std::{cmp::Ordering, sync::Arc};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{context::TimeBasedContext, http::RetrieverError};

mod clients;
pub use clients::{CrlClient, OcspClient, ValidationCrlClient, ValidationOcspClient};

pub mod crl;
pub use crl::{Crl, RevokedEntry};

pub mod ocsp;
pub use ocsp::{BasicOcspResponse, CertStatus, ResponderId, SingleResponse};

mod online;
pub use online::{OnlineCrlClient, OnlineOcspClient};

pub use crate::settings::OnlineFetching;

/// Describes errors that can occur when decoding or fetching revocation
/// data.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RevocationError {
    #[error("unable to decode OCSP response: {0}")]
    InvalidOcsp(String),

    #[error("OCSP responder returned status {0}")]
    OcspNotSuccessful(String),

    #[error("unable to decode CRL: {0}")]
    InvalidCrl(String),

    #[error("unable to build OCSP request: {0}")]
    OcspRequest(String),

    #[error(transparent)]
    Fetch(#[from] RetrieverError),
}

/// Where a piece of revocation evidence came from.
///
/// Variants are ordered from most to least preferred.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum EvidenceOrigin {
    /// Embedded in the signature's CMS container.
    SignatureEmbedded,

    /// Stored in the DSS of an earlier revision.
    HistoricalDss,

    /// Stored in the DSS of the latest revision.
    LatestDss,

    /// Supplied by the caller.
    External,

    /// Fetched from the network during validation.
    Fetched,
}

/// An OCSP response together with what is known about when it existed.
#[derive(Clone, Debug)]
pub struct OcspEvidence {
    pub response: Arc<BasicOcspResponse>,

    /// Latest date at which the response is known to have existed.
    pub trusted_generation_date: DateTime<Utc>,

    pub time_context: TimeBasedContext,

    pub origin: EvidenceOrigin,
}

/// A CRL together with what is known about when it existed.
#[derive(Clone, Debug)]
pub struct CrlEvidence {
    pub crl: Arc<Crl>,

    /// Latest date at which the CRL is known to have existed.
    pub trusted_generation_date: DateTime<Utc>,

    pub time_context: TimeBasedContext,

    pub origin: EvidenceOrigin,
}

/// Preference between two copies of the same evidence: better origin
/// first, then the earlier trusted date.
pub(crate) fn preference(
    a: (EvidenceOrigin, DateTime<Utc>),
    b: (EvidenceOrigin, DateTime<Utc>),
) -> Ordering {
    a.0.cmp(&b.0).then(a.1.cmp(&b.1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_order() {
        assert!(EvidenceOrigin::SignatureEmbedded < EvidenceOrigin::HistoricalDss);
        assert!(EvidenceOrigin::HistoricalDss < EvidenceOrigin::LatestDss);
        assert!(EvidenceOrigin::LatestDss < EvidenceOrigin::External);
        assert!(EvidenceOrigin::External < EvidenceOrigin::Fetched);
    }

    #[test]
    fn preference_prefers_origin_then_date() {
        let early = DateTime::from_timestamp(1_000, 0).unwrap_or_default();
        let late = DateTime::from_timestamp(2_000, 0).unwrap_or_default();

        assert_eq!(
            preference(
                (EvidenceOrigin::SignatureEmbedded, late),
                (EvidenceOrigin::LatestDss, early)
            ),
            Ordering::Less
        );
        assert_eq!(
            preference(
                (EvidenceOrigin::LatestDss, early),
                (EvidenceOrigin::LatestDss, late)
            ),
            Ordering::Less
        );
    }
}
