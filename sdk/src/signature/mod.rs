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

//! The boundary to CMS/PKCS #7 parsing.
//!
//! Decoding the signature container in `/Contents`, checking its message
//! digest against the signed byte ranges and verifying the signer's
//! signature are the job of a [`SignatureInspector`]. The validators only
//! consume the [`SignatureData`] it produces.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    pdf::{RevisionedDocument, SignatureField},
    revocation::{BasicOcspResponse, Crl},
    Certificate,
};

/// Interprets the signature container of a signature field.
pub trait SignatureInspector: Send + Sync {
    /// Decode and cryptographically check the signature in `field`.
    ///
    /// For a document timestamp the returned signing certificate is the TSA
    /// certificate and `signing_time` is the token's generation time.
    fn inspect(
        &self,
        field: &SignatureField,
        document: &dyn RevisionedDocument,
    ) -> crate::Result<SignatureData>;
}

/// What a [`SignatureInspector`] learned from one signature container.
#[derive(Clone, Debug)]
pub struct SignatureData {
    pub signing_certificate: Arc<Certificate>,

    /// Every certificate carried by the container, signer included or not.
    pub certificates: Vec<Arc<Certificate>>,

    /// True when the signed digest matches the covered bytes and the
    /// signature verifies with the signing certificate's key.
    pub signature_valid: bool,

    /// Claimed signing time, or the generation time of a document
    /// timestamp.
    pub signing_time: Option<DateTime<Utc>>,

    /// Revocation values embedded in the container
    /// (`adbe-revocationInfoArchival` or the CMS `crls` field).
    pub ocsp_responses: Vec<Arc<BasicOcspResponse>>,
    pub crls: Vec<Arc<Crl>>,

    /// Signature timestamp token from the unsigned attributes.
    pub timestamp: Option<TimestampData>,
}

impl SignatureData {
    pub fn new(signing_certificate: Arc<Certificate>, signature_valid: bool) -> Self {
        Self {
            certificates: vec![signing_certificate.clone()],
            signing_certificate,
            signature_valid,
            signing_time: None,
            ocsp_responses: Vec::new(),
            crls: Vec::new(),
            timestamp: None,
        }
    }
}

/// A timestamp token attached to a signature.
#[derive(Clone, Debug)]
pub struct TimestampData {
    pub signing_certificate: Arc<Certificate>,
    pub certificates: Vec<Arc<Certificate>>,
    pub generation_time: DateTime<Utc>,

    /// True when the token's signature verifies and its message imprint
    /// matches the signature value it timestamps.
    pub signature_valid: bool,

    pub ocsp_responses: Vec<Arc<BasicOcspResponse>>,
    pub crls: Vec<Arc<Crl>>,
}

impl TimestampData {
    pub fn new(
        signing_certificate: Arc<Certificate>,
        generation_time: DateTime<Utc>,
        signature_valid: bool,
    ) -> Self {
        Self {
            certificates: vec![signing_certificate.clone()],
            signing_certificate,
            generation_time,
            signature_valid,
            ocsp_responses: Vec::new(),
            crls: Vec::new(),
        }
    }
}
