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

//! Tools for working with OCSP responses.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rasn::prelude::*;
use rasn_ocsp::OcspResponseStatus;

use crate::{
    certificate::trim_serial,
    crypto::{hash::sha1, oids},
    revocation::RevocationError,
    Certificate,
};

/// How an OCSP response identifies its signer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ResponderId {
    /// DER encoding of the responder's subject name.
    ByName(Vec<u8>),

    /// SHA-1 hash of the responder's public key bits.
    ByKey(Vec<u8>),
}

impl ResponderId {
    /// Return `true` if `certificate` is the responder this ID names.
    pub fn matches(&self, certificate: &Certificate) -> bool {
        match self {
            Self::ByName(name) => certificate.subject().der() == name.as_slice(),
            Self::ByKey(key_hash) => sha1(certificate.public_key()) == *key_hash,
        }
    }
}

/// Revocation status reported for one certificate.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CertStatus {
    Good,
    Revoked {
        revocation_time: DateTime<Utc>,
        reason: Option<u8>,
    },
    Unknown,
}

/// One entry of an OCSP response.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SingleResponse {
    /// Digest algorithm used for the issuer hashes, in dotted-decimal form.
    pub hash_algorithm: String,
    pub issuer_name_hash: Vec<u8>,
    pub issuer_key_hash: Vec<u8>,

    /// Serial number as big-endian bytes without leading zeros.
    pub serial: Vec<u8>,

    pub status: CertStatus,
    pub this_update: DateTime<Utc>,
    pub next_update: Option<DateTime<Utc>>,
}

/// A decoded basic OCSP response.
#[derive(Clone, Debug)]
pub struct BasicOcspResponse {
    /// DER encoding of the whole basic response. Identifies the response.
    pub der: Vec<u8>,

    /// DER encoding of the signed `ResponseData`.
    pub tbs: Vec<u8>,

    pub responder_id: ResponderId,
    pub produced_at: DateTime<Utc>,
    pub responses: Vec<SingleResponse>,

    /// Value of the archive cutoff extension, if present.
    pub archive_cutoff: Option<DateTime<Utc>>,

    pub signature_algorithm: String,
    pub signature: Vec<u8>,

    /// Certificates embedded in the response.
    pub certificates: Vec<Arc<Certificate>>,
}

impl BasicOcspResponse {
    /// Decode a complete `OCSPResponse`, as returned by a responder or stored
    /// in a DSS.
    ///
    /// Responses whose status is not `successful` are rejected.
    pub fn from_ocsp_response_der(der: &[u8]) -> Result<Self, RevocationError> {
        let ocsp_response = rasn::der::decode::<rasn_ocsp::OcspResponse>(der)
            .map_err(|e| RevocationError::InvalidOcsp(e.to_string()))?;

        if ocsp_response.status != OcspResponseStatus::Successful {
            return Err(RevocationError::OcspNotSuccessful(format!(
                "{:?}",
                ocsp_response.status
            )));
        }

        let Some(response_bytes) = ocsp_response.bytes else {
            return Err(RevocationError::InvalidOcsp(
                "successful response without response bytes".into(),
            ));
        };

        Self::from_der(&response_bytes.response)
    }

    /// Decode a `BasicOCSPResponse`.
    pub fn from_der(der: &[u8]) -> Result<Self, RevocationError> {
        let basic = rasn::der::decode::<rasn_ocsp::BasicOcspResponse>(der)
            .map_err(|e| RevocationError::InvalidOcsp(e.to_string()))?;

        let response_data = &basic.tbs_response_data;

        let tbs = rasn::der::encode(response_data)
            .map_err(|e| RevocationError::InvalidOcsp(e.to_string()))?;

        let responder_id = match &response_data.responder_id {
            rasn_ocsp::ResponderId::ByName(name) => ResponderId::ByName(
                rasn::der::encode(name).map_err(|e| RevocationError::InvalidOcsp(e.to_string()))?,
            ),
            rasn_ocsp::ResponderId::ByKey(bytes) => ResponderId::ByKey(bytes.to_vec()),
        };

        let mut responses = Vec::with_capacity(response_data.responses.len());
        for single in &response_data.responses {
            let status = match &single.cert_status {
                rasn_ocsp::CertStatus::Good => CertStatus::Good,
                rasn_ocsp::CertStatus::Revoked(info) => CertStatus::Revoked {
                    revocation_time: info.revocation_time.with_timezone(&Utc),
                    reason: info.revocation_reason.map(|reason| reason as u8),
                },
                rasn_ocsp::CertStatus::Unknown(_) => CertStatus::Unknown,
            };

            responses.push(SingleResponse {
                hash_algorithm: oid_to_string(&single.cert_id.hash_algorithm.algorithm),
                issuer_name_hash: single.cert_id.issuer_name_hash.to_vec(),
                issuer_key_hash: single.cert_id.issuer_key_hash.to_vec(),
                serial: integer_bytes(&single.cert_id.serial_number)?,
                status,
                this_update: single.this_update.with_timezone(&Utc),
                next_update: single.next_update.map(|nu| nu.with_timezone(&Utc)),
            });
        }

        let mut archive_cutoff = None;
        if let Some(extensions) = &response_data.response_extensions {
            for ext in extensions.iter() {
                if oid_to_string(&ext.extn_id) == oids::OCSP_ARCHIVE_CUTOFF {
                    let cutoff = rasn::der::decode::<GeneralizedTime>(&ext.extn_value)
                        .map_err(|e| RevocationError::InvalidOcsp(e.to_string()))?;
                    archive_cutoff = Some(cutoff.with_timezone(&Utc));
                }
            }
        }

        let mut certificates = Vec::new();
        if let Some(certs) = &basic.certs {
            for cert in certs {
                let cert_der = rasn::der::encode(cert)
                    .map_err(|e| RevocationError::InvalidOcsp(e.to_string()))?;
                let cert = Certificate::from_der(&cert_der)
                    .map_err(|e| RevocationError::InvalidOcsp(e.to_string()))?;
                certificates.push(Arc::new(cert));
            }
        }

        Ok(Self {
            der: der.to_vec(),
            tbs,
            responder_id,
            produced_at: response_data.produced_at.with_timezone(&Utc),
            responses,
            archive_cutoff,
            signature_algorithm: oid_to_string(&basic.signature_algorithm.algorithm),
            signature: basic.signature.as_raw_slice().to_vec(),
            certificates,
        })
    }
}

pub(crate) fn oid_to_string(oid: &rasn::types::ObjectIdentifier) -> String {
    oid.iter()
        .map(|arc| arc.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

// Content octets of a DER INTEGER, without the sign padding.
fn integer_bytes(value: &Integer) -> Result<Vec<u8>, RevocationError> {
    let der = rasn::der::encode(value).map_err(|e| RevocationError::InvalidOcsp(e.to_string()))?;

    let content_start = match der.get(1) {
        Some(len) if *len < 0x80 => 2,
        Some(len) => 2 + (*len & 0x7f) as usize,
        None => return Err(RevocationError::InvalidOcsp("empty serial number".into())),
    };

    let content = der
        .get(content_start..)
        .ok_or_else(|| RevocationError::InvalidOcsp("truncated serial number".into()))?;

    Ok(trim_serial(content))
}

/// Build a DER-encoded OCSP request for `certificate` issued by `issuer`.
pub(crate) fn build_ocsp_request(
    certificate: &Certificate,
    issuer: &Certificate,
) -> Result<Vec<u8>, RevocationError> {
    let subject: rasn_pkix::Certificate = rasn::der::decode(certificate.der())
        .map_err(|e| RevocationError::OcspRequest(e.to_string()))?;

    let issuer_name_hash = OctetString::from(sha1(issuer.subject().der()));
    let issuer_key_hash = OctetString::from(sha1(issuer.public_key()));
    let serial_number = subject.tbs_certificate.serial_number;

    let sha1_oid = rasn::types::Oid::new(&[1, 3, 14, 3, 2, 26])
        .ok_or_else(|| RevocationError::OcspRequest("invalid SHA-1 OID".into()))?;
    let alg = rasn::types::ObjectIdentifier::from(sha1_oid);

    let null = rasn::der::encode(&()).map_err(|e| RevocationError::OcspRequest(e.to_string()))?;
    let sha1_ai = rasn_pkix::AlgorithmIdentifier {
        algorithm: alg,
        parameters: Some(Any::new(null)),
        // Many OCSP responders expect this to be NULL not None.
    };

    let req_cert = rasn_ocsp::CertId {
        hash_algorithm: sha1_ai,
        issuer_name_hash,
        issuer_key_hash,
        serial_number,
    };

    let tbs_request = rasn_ocsp::TbsRequest {
        version: rasn_ocsp::Version::from(0u8),
        requestor_name: None,
        request_list: vec![rasn_ocsp::Request {
            req_cert,
            single_request_extensions: None,
        }],
        request_extensions: None,
    };

    let ocsp_request = rasn_ocsp::OcspRequest {
        tbs_request,
        optional_signature: None,
    };

    rasn::der::encode(&ocsp_request).map_err(|e| RevocationError::OcspRequest(e.to_string()))
}
