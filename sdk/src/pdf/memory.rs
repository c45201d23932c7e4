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

use std::{collections::BTreeMap, sync::Arc};

use crate::{
    pdf::{
        DocumentRevision, ObjectRef, PdfDictionary, PdfDocument, PdfError, PdfObject,
        RevisionedDocument,
    },
    Result,
};

/// A PDF object graph held in memory.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryDocument {
    trailer: PdfDictionary,
    objects: BTreeMap<u32, (u16, PdfObject)>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_trailer(&mut self, trailer: PdfDictionary) {
        self.trailer = trailer;
    }

    /// Add or replace the object with `reference`'s object number.
    pub fn insert(&mut self, reference: ObjectRef, object: impl Into<PdfObject>) {
        self.objects
            .insert(reference.number, (reference.generation, object.into()));
    }

    pub fn remove(&mut self, number: u32) -> Option<PdfObject> {
        self.objects.remove(&number).map(|(_, object)| object)
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectRef, &PdfObject)> {
        self.objects
            .iter()
            .map(|(number, (generation, object))| (ObjectRef::new(*number, *generation), object))
    }

    /// An object number above every number in use.
    pub fn next_free_number(&self) -> u32 {
        self.objects.keys().next_back().map_or(1, |n| n + 1)
    }
}

impl PdfDocument for MemoryDocument {
    fn trailer(&self) -> &PdfDictionary {
        &self.trailer
    }

    fn object_by_number(&self, number: u32) -> Option<(ObjectRef, &PdfObject)> {
        self.objects
            .get(&number)
            .map(|(generation, object)| (ObjectRef::new(number, *generation), object))
    }
}

/// A sequence of in-memory snapshots.
#[derive(Clone, Debug, Default)]
pub struct MemoryRevisionedDocument {
    revisions: Vec<DocumentRevision>,
    documents: Vec<Arc<MemoryDocument>>,
}

impl MemoryRevisionedDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot, deriving its cross-reference changes from the
    /// difference with the previous snapshot.
    ///
    /// Changed and added objects count as written. Removed objects count as
    /// freed with their generation bumped, as a PDF writer would record them.
    pub fn push(&mut self, document: MemoryDocument, eof_offset: u64) {
        let mut revision = DocumentRevision::new(eof_offset);

        match self.documents.last() {
            Some(previous) => {
                for (reference, object) in document.objects() {
                    if previous.object(reference) != Some(object) {
                        revision.written.insert(reference);
                    }
                }
                for (reference, _) in previous.objects() {
                    if document.object_by_number(reference.number).is_none() {
                        revision.freed.insert(ObjectRef::new(
                            reference.number,
                            reference.generation.saturating_add(1),
                        ));
                    }
                }
            }
            None => revision.written = document.objects().map(|(r, _)| r).collect(),
        }

        self.push_revision(document, revision);
    }

    /// Append a snapshot with explicitly given cross-reference changes.
    pub fn push_revision(&mut self, document: MemoryDocument, revision: DocumentRevision) {
        self.revisions.push(revision);
        self.documents.push(Arc::new(document));
    }
}

impl RevisionedDocument for MemoryRevisionedDocument {
    fn revisions(&self) -> &[DocumentRevision] {
        &self.revisions
    }

    fn document_at(&self, index: usize) -> Result<Arc<dyn PdfDocument>> {
        let document = self
            .documents
            .get(index)
            .ok_or(PdfError::NoSuchRevision(index))?;
        Ok(document.clone())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn dict(kind: &str) -> PdfDictionary {
        PdfDictionary::new().with("Type", PdfObject::Name(kind.to_owned()))
    }

    #[test]
    fn derives_xref_changes() {
        let mut first = MemoryDocument::new();
        first.insert(ObjectRef::new(1, 0), dict("Catalog"));
        first.insert(ObjectRef::new(2, 0), dict("Pages"));
        first.insert(ObjectRef::new(3, 0), dict("Page"));

        let mut second = first.clone();
        second.insert(ObjectRef::new(1, 0), dict("Catalog").with("Extra", 1i64));
        second.remove(3);
        second.insert(ObjectRef::new(4, 0), dict("Annot"));

        let mut doc = MemoryRevisionedDocument::new();
        doc.push(first, 100);
        doc.push(second, 200);

        let revisions = doc.revisions();
        assert_eq!(revisions[0].written.len(), 3);
        assert_eq!(
            revisions[1].written.iter().copied().collect::<Vec<_>>(),
            vec![ObjectRef::new(1, 0), ObjectRef::new(4, 0)]
        );
        assert_eq!(
            revisions[1].freed.iter().copied().collect::<Vec<_>>(),
            vec![ObjectRef::new(3, 1)]
        );
        assert_eq!(doc.revision_covering(150), Some(1));
        assert!(doc.document_at(2).is_err());
    }

    #[test]
    fn resolves_references() {
        let mut document = MemoryDocument::new();
        document.set_trailer(PdfDictionary::new().with("Root", ObjectRef::new(1, 0)));
        document.insert(ObjectRef::new(1, 0), dict("Catalog").with("Pages", ObjectRef::new(2, 0)));
        document.insert(ObjectRef::new(2, 0), ObjectRef::new(3, 0));
        document.insert(ObjectRef::new(3, 0), ObjectRef::new(2, 0));

        let catalog = document.catalog().unwrap();
        assert_eq!(catalog.get_name("Type"), Some("Catalog"));

        // a reference cycle resolves to null instead of looping
        assert_eq!(document.get(catalog, "Pages"), None);
        assert_eq!(document.object(ObjectRef::new(1, 1)), None);
    }
}
