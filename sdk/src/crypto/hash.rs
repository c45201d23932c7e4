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

//! Hash convenience functions.

use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::crypto::oids;

/// Given a byte slice, return the SHA-1 hash of that content.
pub fn sha1(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha1::default();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Given a byte slice, return the SHA-256 hash of that content.
pub fn sha256(data: &[u8]) -> Vec<u8> {
    Sha256::digest(data).to_vec()
}

/// Hash `data` with the digest algorithm identified by `oid`.
///
/// Returns `None` if the algorithm is not supported.
pub fn hash_by_oid(oid: &str, data: &[u8]) -> Option<Vec<u8>> {
    match oid {
        oids::SHA1 => Some(sha1(data)),
        oids::SHA256 => Some(sha256(data)),
        oids::SHA384 => Some(Sha384::digest(data).to_vec()),
        oids::SHA512 => Some(Sha512::digest(data).to_vec()),
        _ => None,
    }
}
