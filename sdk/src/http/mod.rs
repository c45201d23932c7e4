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

//! Network access for revocation data and missing issuer certificates.
//!
//! All outbound requests go through the [`ResourceRetriever`] trait so that
//! host applications can plug in their own HTTP client, restrict where the
//! engine may connect, or disable networking entirely.
//!
//! # When do outbound network requests occur?
//!
//! - Fetching OCSP responses from a certificate's AIA OCSP URL.
//! - Fetching CRLs from a certificate's CRL distribution points.
//! - Fetching issuer certificates from AIA caIssuers URLs.
//!
//! None of these happen when `revocation.online_fetching` is `never_fetch`
//! and no retriever is configured.

use thiserror::Error;

mod ureq;
pub use self::ureq::UreqRetriever;

/// Fetches raw bytes from a URL.
///
/// Implementations must time-box every request so that a single unreachable
/// server cannot stall validation.
#[cfg_attr(test, mockall::automock)]
pub trait ResourceRetriever: Send + Sync {
    /// Perform a GET request and return the response body.
    fn get(&self, url: &str) -> Result<Vec<u8>, RetrieverError>;

    /// Perform a POST request with the given body and return the response
    /// body.
    fn post(&self, url: &str, content_type: &str, body: &[u8]) -> Result<Vec<u8>, RetrieverError>;
}

/// Describes errors that can occur when fetching a resource.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RetrieverError {
    #[error("invalid URL {0}")]
    InvalidUrl(String),

    #[error("unexpected HTTP status {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("response from {0} is larger than allowed")]
    TooLarge(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
