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

//! The context a certificate is validated in.
//!
//! A [`ValidationContext`] records which validator is running, which role the
//! certificate under test plays, and whether validation happens at the present
//! time or at a point in the past proven by a timestamp. Contexts form a chain
//! from the outermost call inwards, so trust decisions can ask whether a given
//! role appears anywhere in the ancestry.
//!
//! The chain also records every certificate currently being validated. That
//! path doubles as the recursion guard for revocation loops: a certificate
//! that is already on the path is never entered a second time.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::Certificate;

/// The validator that created a context.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorStage {
    SignatureValidator,
    CertificateChainValidator,
    RevocationDataValidator,
    OcspValidator,
    CrlValidator,
    DocumentRevisionsValidator,
}

/// The role a certificate plays in the current validation.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateSource {
    /// Signer of a document signature.
    Signer,

    /// Signer of a timestamp token.
    Timestamp,

    /// Signer of an OCSP response.
    OcspIssuer,

    /// Signer of a CRL.
    CrlIssuer,

    /// Issuer of another certificate in the chain.
    CertIssuer,

    /// A certificate that is trusted by construction.
    Trusted,

    /// A certificate taken from a list of trusted lists.
    LotlCert,
}

/// Whether validation happens now or at a proven point in the past.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBasedContext {
    Present,
    Historical,
}

impl CertificateSource {
    /// Name used for this role in settings files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signer => "signer",
            Self::Timestamp => "timestamp",
            Self::OcspIssuer => "ocsp_issuer",
            Self::CrlIssuer => "crl_issuer",
            Self::CertIssuer => "cert_issuer",
            Self::Trusted => "trusted",
            Self::LotlCert => "lotl_cert",
        }
    }
}

impl fmt::Display for CertificateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

#[derive(Debug)]
struct ContextNode {
    stage: ValidatorStage,
    source: CertificateSource,
    time: TimeBasedContext,
    certificate: Option<Arc<Certificate>>,
    parent: Option<Arc<ContextNode>>,
}

/// Immutable `(stage, source, time)` triple linked to its parent context.
///
/// Every `with_*` method returns a new child context; the receiver is left
/// untouched, so a context can be handed to several sibling checks.
#[derive(Clone, Debug)]
pub struct ValidationContext {
    node: Arc<ContextNode>,
}

impl ValidationContext {
    /// Create a root context.
    pub fn new(stage: ValidatorStage, source: CertificateSource, time: TimeBasedContext) -> Self {
        Self {
            node: Arc::new(ContextNode {
                stage,
                source,
                time,
                certificate: None,
                parent: None,
            }),
        }
    }

    fn child(
        &self,
        stage: ValidatorStage,
        source: CertificateSource,
        time: TimeBasedContext,
        certificate: Option<Arc<Certificate>>,
    ) -> Self {
        Self {
            node: Arc::new(ContextNode {
                stage,
                source,
                time,
                certificate,
                parent: Some(self.node.clone()),
            }),
        }
    }

    pub fn stage(&self) -> ValidatorStage {
        self.node.stage
    }

    pub fn certificate_source(&self) -> CertificateSource {
        self.node.source
    }

    pub fn time_based_context(&self) -> TimeBasedContext {
        self.node.time
    }

    /// Return the context this one was derived from.
    pub fn parent(&self) -> Option<ValidationContext> {
        self.node
            .parent
            .as_ref()
            .map(|node| ValidationContext { node: node.clone() })
    }

    pub fn with_stage(&self, stage: ValidatorStage) -> Self {
        self.child(stage, self.node.source, self.node.time, None)
    }

    pub fn with_certificate_source(&self, source: CertificateSource) -> Self {
        self.child(self.node.stage, source, self.node.time, None)
    }

    pub fn with_time_based_context(&self, time: TimeBasedContext) -> Self {
        self.child(self.node.stage, self.node.source, time, None)
    }

    /// Return a child context recording that `certificate` is now being
    /// validated.
    pub fn entering(&self, certificate: &Arc<Certificate>) -> Self {
        self.child(
            self.node.stage,
            self.node.source,
            self.node.time,
            Some(certificate.clone()),
        )
    }

    fn ancestry(&self) -> impl Iterator<Item = &ContextNode> {
        std::iter::successors(Some(self.node.as_ref()), |node| node.parent.as_deref())
    }

    /// Return `true` if `source` is the certificate source of this context or
    /// of any of its ancestors.
    pub fn has_certificate_source_in_chain(&self, source: CertificateSource) -> bool {
        self.ancestry().any(|node| node.source == source)
    }

    /// Return `true` if `certificate` is already being validated further up
    /// the chain.
    pub fn is_validating(&self, certificate: &Certificate) -> bool {
        self.ancestry().any(|node| {
            node.certificate
                .as_ref()
                .is_some_and(|c| c.fingerprint() == certificate.fingerprint())
        })
    }

    /// Number of issuer steps between the certificate being validated and
    /// the certificate that started the current chain walk.
    ///
    /// Zero for the starting certificate, one for its issuer and so on.
    pub fn issuer_level(&self) -> usize {
        self.ancestry()
            .filter(|node| node.certificate.is_some())
            .take_while(|node| node.source == CertificateSource::CertIssuer)
            .count()
    }

    /// Number of certificates currently being validated along this path.
    pub fn certificates_on_path(&self) -> usize {
        self.ancestry()
            .filter(|node| node.certificate.is_some())
            .count()
    }
}
