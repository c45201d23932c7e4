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

//! Read-only access to the parts of a PDF document the validators need:
//! the object graph of each revision, the cross-reference changes each
//! incremental update makes, signature fields and the document security
//! store.

use thiserror::Error;

mod document;
pub use document::{DocumentRevision, PdfDocument, RevisionedDocument};

mod dss;
pub use dss::DssData;

mod fields;
pub use fields::{signature_fields, SignatureField, DOCUMENT_TIMESTAMP_SUB_FILTER};

mod lopdf_reader;
pub use lopdf_reader::LopdfRevisionedDocument;

mod memory;
pub use memory::{MemoryDocument, MemoryRevisionedDocument};

mod object;
pub use object::{ObjectRef, PdfDictionary, PdfObject, PdfStream, MAX_GENERATION};

/// Describes errors that can occur when reading a PDF document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PdfError {
    /// Look into the wrapped `lopdf::Error` for the cause.
    #[error(transparent)]
    UnableToReadPdf(#[from] lopdf::Error),

    #[error("no PDF revisions found")]
    NoRevisions,

    #[error("document has {found} revisions, more than the limit of {limit}")]
    TooManyRevisions { found: usize, limit: usize },

    #[error("revision {0} does not exist")]
    NoSuchRevision(usize),

    #[error("malformed cross-reference section at offset {offset}: {reason}")]
    Xref { offset: usize, reason: String },
}
