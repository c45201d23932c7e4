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

use crate::crypto::raw_signature::{validator_for_sig_alg, RawSignatureValidationError};

/// Verifies a signature over a block of data with the key from a subject
/// public key info structure.
///
/// This is the seam through which every certificate, OCSP response and CRL
/// signature is checked. Replace it to use a different cryptography library
/// or a hardware module.
pub trait SignatureVerifier: Send + Sync {
    /// Return `Ok(())` if `signature` over `data` is valid under the key in
    /// the DER-encoded `spki`, using the signature algorithm identified by
    /// `algorithm_oid` in dotted-decimal form.
    fn verify(
        &self,
        algorithm_oid: &str,
        data: &[u8],
        signature: &[u8],
        spki: &[u8],
    ) -> Result<(), RawSignatureValidationError>;
}

/// Default [`SignatureVerifier`] built on pure Rust cryptography crates.
#[derive(Clone, Copy, Debug, Default)]
pub struct RustNativeVerifier;

impl SignatureVerifier for RustNativeVerifier {
    fn verify(
        &self,
        algorithm_oid: &str,
        data: &[u8],
        signature: &[u8],
        spki: &[u8],
    ) -> Result<(), RawSignatureValidationError> {
        let validator = validator_for_sig_alg(algorithm_oid)
            .ok_or(RawSignatureValidationError::UnsupportedAlgorithm)?;

        validator.validate(signature, data, spki)
    }
}
