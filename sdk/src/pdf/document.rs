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

use std::{collections::BTreeSet, sync::Arc};

use crate::{
    pdf::{ObjectRef, PdfDictionary, PdfError, PdfObject},
    Result,
};

// bounds reference chains such as `1 0 obj 2 0 R endobj 2 0 obj 1 0 R endobj`
const MAX_INDIRECTIONS: usize = 32;

static NULL: PdfObject = PdfObject::Null;

/// One snapshot of a PDF object graph.
pub trait PdfDocument: Send + Sync {
    fn trailer(&self) -> &PdfDictionary;

    /// The in-use object with this object number, whatever its generation.
    fn object_by_number(&self, number: u32) -> Option<(ObjectRef, &PdfObject)>;

    /// The in-use object `reference` points to.
    fn object(&self, reference: ObjectRef) -> Option<&PdfObject> {
        self.object_by_number(reference.number)
            .filter(|(found, _)| found.generation == reference.generation)
            .map(|(_, object)| object)
    }

    /// Follow references until a direct object is reached. Dangling
    /// references resolve to null, as PDF requires.
    fn resolve<'a>(&'a self, object: &'a PdfObject) -> &'a PdfObject {
        let mut current = object;
        for _ in 0..MAX_INDIRECTIONS {
            match current {
                PdfObject::Reference(reference) => match self.object(*reference) {
                    Some(target) => current = target,
                    None => return &NULL,
                },
                _ => return current,
            }
        }
        &NULL
    }

    /// Look up `key` in `dict` and resolve the value.
    fn get<'a>(&'a self, dict: &'a PdfDictionary, key: &str) -> Option<&'a PdfObject> {
        dict.get(key)
            .map(|value| self.resolve(value))
            .filter(|value| **value != PdfObject::Null)
    }

    fn catalog_ref(&self) -> Option<ObjectRef> {
        self.trailer().get("Root").and_then(PdfObject::as_reference)
    }

    fn catalog(&self) -> Option<&PdfDictionary> {
        self.get(self.trailer(), "Root").and_then(PdfObject::as_dict)
    }
}

/// The cross-reference changes made by one revision.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DocumentRevision {
    /// Offset just past the revision's `%%EOF` marker.
    pub eof_offset: u64,

    /// References the revision's cross-reference section marks in use.
    pub written: BTreeSet<ObjectRef>,

    /// References the revision's cross-reference section marks free.
    pub freed: BTreeSet<ObjectRef>,
}

impl DocumentRevision {
    pub fn new(eof_offset: u64) -> Self {
        Self {
            eof_offset,
            ..Default::default()
        }
    }
}

/// A PDF document read as a sequence of incremental updates.
pub trait RevisionedDocument: Send + Sync {
    /// Revisions, oldest first.
    fn revisions(&self) -> &[DocumentRevision];

    /// The document as it was after revision `index`.
    fn document_at(&self, index: usize) -> Result<Arc<dyn PdfDocument>>;

    /// The complete file, if it is available.
    fn bytes(&self) -> Option<&[u8]> {
        None
    }

    fn latest(&self) -> Result<Arc<dyn PdfDocument>> {
        match self.revisions().len() {
            0 => Err(PdfError::NoRevisions.into()),
            len => self.document_at(len - 1),
        }
    }

    /// Index of the first revision that contains everything up to
    /// `end_offset`.
    fn revision_covering(&self, end_offset: u64) -> Option<usize> {
        self.revisions()
            .iter()
            .position(|revision| revision.eof_offset >= end_offset)
    }
}
