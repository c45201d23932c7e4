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

//! Cryptography used by the validators.
//!
//! Signature math is never done here directly. Callers plug a
//! [`SignatureVerifier`] into the [`ValidatorChainBuilder`]; the default
//! [`RustNativeVerifier`] uses the pure Rust `p256`, `p384`, `rsa` and
//! `ed25519-dalek` crates.
//!
//! [`ValidatorChainBuilder`]: crate::ValidatorChainBuilder

pub mod hash;

pub(crate) mod oids;

pub mod raw_signature;

mod verifier;
pub use verifier::{RustNativeVerifier, SignatureVerifier};
