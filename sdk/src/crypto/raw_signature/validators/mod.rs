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

//! Signature checks for the algorithms found in certificates, OCSP responses
//! and CRLs.
//!
//! A signature algorithm OID names a key family and a digest. The key family
//! picks the validator; the digest travels with it.

use spki::SubjectPublicKeyInfoRef;

use crate::crypto::{
    oids::*,
    raw_signature::{RawSignatureValidationError, RawSignatureValidator},
};

mod ecdsa_validator;
pub(crate) use ecdsa_validator::EcdsaValidator;

mod ed25519_validator;
pub(crate) use ed25519_validator::Ed25519Validator;

mod rsa_pkcs1_validator;
pub(crate) use rsa_pkcs1_validator::RsaPkcs1Validator;

/// Return a validator for the signature algorithm identified by `sig_alg`
/// in dotted-decimal form.
pub fn validator_for_sig_alg(sig_alg: &str) -> Option<Box<dyn RawSignatureValidator>> {
    let validator: Box<dyn RawSignatureValidator> = match sig_alg {
        ECDSA_WITH_SHA256 => Box::new(EcdsaValidator::new(SHA256)),
        ECDSA_WITH_SHA384 => Box::new(EcdsaValidator::new(SHA384)),
        ECDSA_WITH_SHA512 => Box::new(EcdsaValidator::new(SHA512)),
        SHA1_WITH_RSAENCRYPTION => Box::new(RsaPkcs1Validator::new(SHA1)),
        SHA256_WITH_RSAENCRYPTION => Box::new(RsaPkcs1Validator::new(SHA256)),
        SHA384_WITH_RSAENCRYPTION => Box::new(RsaPkcs1Validator::new(SHA384)),
        SHA512_WITH_RSAENCRYPTION => Box::new(RsaPkcs1Validator::new(SHA512)),
        ED25519 => Box::new(Ed25519Validator),
        _ => return None,
    };
    Some(validator)
}

/// Split a DER-encoded subject public key info into its algorithm
/// parameters and raw key bytes.
pub(crate) fn parse_spki(
    spki: &[u8],
) -> Result<SubjectPublicKeyInfoRef<'_>, RawSignatureValidationError> {
    SubjectPublicKeyInfoRef::try_from(spki)
        .map_err(|_| RawSignatureValidationError::InvalidPublicKey)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn unknown_algorithms_have_no_validator() {
        assert!(validator_for_sig_alg("1.2.3.4").is_none());
        assert!(validator_for_sig_alg(SHA256).is_none());
        assert!(validator_for_sig_alg(ECDSA_WITH_SHA256).is_some());
        assert!(validator_for_sig_alg(ED25519).is_some());
    }

    #[test]
    fn garbage_key_is_rejected() {
        let validator = validator_for_sig_alg(SHA256_WITH_RSAENCRYPTION).unwrap();
        assert_eq!(
            validator.validate(&[0; 16], b"data", b"not a key"),
            Err(RawSignatureValidationError::InvalidPublicKey)
        );

        let validator = validator_for_sig_alg(ECDSA_WITH_SHA256).unwrap();
        assert_eq!(
            validator.validate(&[0; 16], b"data", b"not a key"),
            Err(RawSignatureValidationError::InvalidPublicKey)
        );
    }
}
