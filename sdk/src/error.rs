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

use thiserror::Error;

use crate::{
    certificate::CertificateError, crypto::raw_signature::RawSignatureValidationError,
    http::RetrieverError, pdf::PdfError, revocation::RevocationError, settings::SettingsError,
};

/// `Error` enumerates errors returned by most operations of this crate.
///
/// Validators do not return these errors for expected validation outcomes.
/// Those are recorded as items in a [`ValidationReport`](crate::ValidationReport).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Certificate(#[from] CertificateError),

    #[error(transparent)]
    Revocation(#[from] RevocationError),

    #[error(transparent)]
    Retriever(#[from] RetrieverError),

    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error(transparent)]
    RawSignature(#[from] RawSignatureValidationError),

    /// The caller-supplied CMS inspector could not interpret a signature.
    #[error("unable to inspect signature: {0}")]
    SignatureInspection(String),
}

/// A specialized `Result` type for validation operations.
pub type Result<T> = std::result::Result<T, Error>;
