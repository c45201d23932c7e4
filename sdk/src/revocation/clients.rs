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

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::{
    context::TimeBasedContext,
    revocation::{
        preference, BasicOcspResponse, Crl, CrlEvidence, EvidenceOrigin, OcspEvidence,
        RevocationError,
    },
    Certificate,
};

/// Supplies OCSP responses for a certificate.
pub trait OcspClient: Send + Sync {
    /// Return every OCSP response this client can offer for `certificate`.
    ///
    /// `issuer` is the issuer certificate when it is already known; clients
    /// that build OCSP requests need it.
    fn ocsp_responses(
        &self,
        certificate: &Certificate,
        issuer: Option<&Certificate>,
    ) -> Result<Vec<OcspEvidence>, RevocationError>;
}

/// Supplies CRLs for a certificate.
pub trait CrlClient: Send + Sync {
    /// Return every CRL this client can offer for `certificate`.
    fn crls(&self, certificate: &Certificate) -> Result<Vec<CrlEvidence>, RevocationError>;
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Pool of OCSP responses collected during a validation run.
///
/// Responses are identified by their DER encoding. When the same response is
/// added twice, the copy with the better origin wins, then the copy with the
/// earlier trusted generation date.
#[derive(Debug, Default)]
pub struct ValidationOcspClient {
    responses: RwLock<Vec<OcspEvidence>>,
}

impl ValidationOcspClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_response(
        &self,
        response: Arc<BasicOcspResponse>,
        trusted_generation_date: DateTime<Utc>,
        time_context: TimeBasedContext,
        origin: EvidenceOrigin,
    ) {
        let evidence = OcspEvidence {
            response,
            trusted_generation_date,
            time_context,
            origin,
        };

        let mut responses = write(&self.responses);
        match responses
            .iter_mut()
            .find(|existing| existing.response.der == evidence.response.der)
        {
            Some(existing) => {
                if preference(
                    (evidence.origin, evidence.trusted_generation_date),
                    (existing.origin, existing.trusted_generation_date),
                )
                .is_lt()
                {
                    *existing = evidence;
                }
            }
            None => responses.push(evidence),
        }
    }

    /// Copy of every response in the pool.
    pub fn responses(&self) -> Vec<OcspEvidence> {
        read(&self.responses).clone()
    }

    pub fn len(&self) -> usize {
        read(&self.responses).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.responses).is_empty()
    }

    /// Capture the pool contents so they can be put back with
    /// [`restore`](Self::restore).
    pub fn snapshot(&self) -> Vec<OcspEvidence> {
        self.responses()
    }

    pub fn restore(&self, snapshot: Vec<OcspEvidence>) {
        *write(&self.responses) = snapshot;
    }
}

impl OcspClient for ValidationOcspClient {
    fn ocsp_responses(
        &self,
        _certificate: &Certificate,
        _issuer: Option<&Certificate>,
    ) -> Result<Vec<OcspEvidence>, RevocationError> {
        Ok(self.responses())
    }
}

/// Pool of CRLs collected during a validation run.
///
/// Deduplicated the same way as [`ValidationOcspClient`].
#[derive(Debug, Default)]
pub struct ValidationCrlClient {
    crls: RwLock<Vec<CrlEvidence>>,
}

impl ValidationCrlClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_crl(
        &self,
        crl: Arc<Crl>,
        trusted_generation_date: DateTime<Utc>,
        time_context: TimeBasedContext,
        origin: EvidenceOrigin,
    ) {
        let evidence = CrlEvidence {
            crl,
            trusted_generation_date,
            time_context,
            origin,
        };

        let mut crls = write(&self.crls);
        match crls
            .iter_mut()
            .find(|existing| existing.crl.der == evidence.crl.der)
        {
            Some(existing) => {
                if preference(
                    (evidence.origin, evidence.trusted_generation_date),
                    (existing.origin, existing.trusted_generation_date),
                )
                .is_lt()
                {
                    *existing = evidence;
                }
            }
            None => crls.push(evidence),
        }
    }

    /// Copy of every CRL in the pool.
    pub fn all_crls(&self) -> Vec<CrlEvidence> {
        read(&self.crls).clone()
    }

    pub fn len(&self) -> usize {
        read(&self.crls).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.crls).is_empty()
    }

    pub fn snapshot(&self) -> Vec<CrlEvidence> {
        self.all_crls()
    }

    pub fn restore(&self, snapshot: Vec<CrlEvidence>) {
        *write(&self.crls) = snapshot;
    }
}

impl CrlClient for ValidationCrlClient {
    fn crls(&self, certificate: &Certificate) -> Result<Vec<CrlEvidence>, RevocationError> {
        // only CRLs from the certificate's issuer can say anything about it
        Ok(read(&self.crls)
            .iter()
            .filter(|evidence| &evidence.crl.issuer == certificate.issuer())
            .cloned()
            .collect())
    }
}
