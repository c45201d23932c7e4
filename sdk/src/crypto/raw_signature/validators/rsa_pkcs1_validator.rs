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

use rsa::{pkcs8::DecodePublicKey, Pkcs1v15Sign, RsaPublicKey};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};

use crate::crypto::{
    hash::hash_by_oid,
    oids,
    raw_signature::{RawSignatureValidationError, RawSignatureValidator},
};

/// Checks RSA PKCS #1 v1.5 signatures, still the usual choice of CAs, OCSP
/// responders and CRL issuers.
pub(crate) struct RsaPkcs1Validator {
    digest_oid: &'static str,
}

impl RsaPkcs1Validator {
    pub(crate) fn new(digest_oid: &'static str) -> Self {
        Self { digest_oid }
    }

    fn padding(&self) -> Result<Pkcs1v15Sign, RawSignatureValidationError> {
        Ok(match self.digest_oid {
            oids::SHA1 => Pkcs1v15Sign::new::<Sha1>(),
            oids::SHA256 => Pkcs1v15Sign::new::<Sha256>(),
            oids::SHA384 => Pkcs1v15Sign::new::<Sha384>(),
            oids::SHA512 => Pkcs1v15Sign::new::<Sha512>(),
            _ => return Err(RawSignatureValidationError::UnsupportedAlgorithm),
        })
    }
}

impl RawSignatureValidator for RsaPkcs1Validator {
    fn validate(
        &self,
        sig: &[u8],
        data: &[u8],
        public_key: &[u8],
    ) -> Result<(), RawSignatureValidationError> {
        let key = RsaPublicKey::from_public_key_der(public_key)
            .map_err(|_| RawSignatureValidationError::InvalidPublicKey)?;
        let hashed = hash_by_oid(self.digest_oid, data)
            .ok_or(RawSignatureValidationError::UnsupportedAlgorithm)?;

        key.verify(self.padding()?, &hashed, sig)
            .map_err(|_| RawSignatureValidationError::SignatureMismatch)
    }
}
