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

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use super::parse_spki;
use crate::crypto::raw_signature::{RawSignatureValidationError, RawSignatureValidator};

/// Checks Ed25519 signatures. The message is signed as is, without a
/// separate digest step.
pub(crate) struct Ed25519Validator;

impl RawSignatureValidator for Ed25519Validator {
    fn validate(
        &self,
        sig: &[u8],
        data: &[u8],
        public_key: &[u8],
    ) -> Result<(), RawSignatureValidationError> {
        let spki = parse_spki(public_key)?;
        let key_bytes: &[u8; 32] = spki
            .subject_public_key
            .raw_bytes()
            .try_into()
            .map_err(|_| RawSignatureValidationError::InvalidPublicKey)?;
        let key = VerifyingKey::from_bytes(key_bytes)
            .map_err(|_| RawSignatureValidationError::InvalidPublicKey)?;

        let sig =
            Signature::from_slice(sig).map_err(|_| RawSignatureValidationError::InvalidSignature)?;

        key.verify(data, &sig)
            .map_err(|_| RawSignatureValidationError::SignatureMismatch)
    }
}
