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

use ecdsa::signature::hazmat::PrehashVerifier;

use super::parse_spki;
use crate::crypto::{
    hash::hash_by_oid,
    raw_signature::{RawSignatureValidationError, RawSignatureValidator},
};

const CURVE_P256: &str = "1.2.840.10045.3.1.7";
const CURVE_P384: &str = "1.3.132.0.34";

/// Checks DER-encoded ECDSA signatures on the P-256 and P-384 curves.
///
/// The curve comes from the named-curve parameter of the key. The digest is
/// fixed by the signature algorithm and need not match the curve size.
pub(crate) struct EcdsaValidator {
    digest_oid: &'static str,
}

impl EcdsaValidator {
    pub(crate) fn new(digest_oid: &'static str) -> Self {
        Self { digest_oid }
    }
}

impl RawSignatureValidator for EcdsaValidator {
    fn validate(
        &self,
        sig: &[u8],
        data: &[u8],
        public_key: &[u8],
    ) -> Result<(), RawSignatureValidationError> {
        let spki = parse_spki(public_key)?;
        let curve = spki
            .algorithm
            .parameters_oid()
            .map_err(|_| RawSignatureValidationError::InvalidPublicKey)?
            .to_string();
        let point = spki.subject_public_key.raw_bytes();

        let prehash = hash_by_oid(self.digest_oid, data)
            .ok_or(RawSignatureValidationError::UnsupportedAlgorithm)?;

        match curve.as_str() {
            CURVE_P256 => {
                let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(point)
                    .map_err(|_| RawSignatureValidationError::InvalidPublicKey)?;
                let sig = p256::ecdsa::Signature::from_der(sig)
                    .map_err(|_| RawSignatureValidationError::InvalidSignature)?;
                key.verify_prehash(&prehash, &sig)
            }
            CURVE_P384 => {
                let key = p384::ecdsa::VerifyingKey::from_sec1_bytes(point)
                    .map_err(|_| RawSignatureValidationError::InvalidPublicKey)?;
                let sig = p384::ecdsa::Signature::from_der(sig)
                    .map_err(|_| RawSignatureValidationError::InvalidSignature)?;
                key.verify_prehash(&prehash, &sig)
            }
            _ => return Err(RawSignatureValidationError::UnsupportedAlgorithm),
        }
        .map_err(|_| RawSignatureValidationError::SignatureMismatch)
    }
}
