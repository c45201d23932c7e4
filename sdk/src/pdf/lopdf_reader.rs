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

use std::{collections::BTreeSet, str::FromStr, sync::Arc};

use lopdf::{Dictionary, Document, Object};

use crate::{
    pdf::{
        DocumentRevision, MemoryDocument, ObjectRef, PdfDictionary, PdfDocument, PdfError,
        PdfObject, PdfStream, RevisionedDocument,
    },
    Result,
};

const EOF_MARKER: &[u8] = b"%%EOF";
const STARTXREF: &[u8] = b"startxref";

/// A PDF file read with `lopdf`, one snapshot per incremental update.
///
/// The file is split after every `%%EOF` marker. Each prefix is loaded as a
/// document of its own, and the cross-reference section that prefix ends
/// with is read directly to learn which references the update wrote and
/// which it freed.
pub struct LopdfRevisionedDocument {
    bytes: Vec<u8>,
    revisions: Vec<DocumentRevision>,
    documents: Vec<Arc<MemoryDocument>>,
}

impl LopdfRevisionedDocument {
    /// Read `bytes`, refusing files with more than `max_revisions`
    /// incremental updates.
    pub fn from_bytes(bytes: Vec<u8>, max_revisions: usize) -> Result<Self> {
        let eof_offsets = eof_offsets(&bytes);
        if eof_offsets.is_empty() {
            return Err(PdfError::NoRevisions.into());
        }
        if eof_offsets.len() > max_revisions {
            return Err(PdfError::TooManyRevisions {
                found: eof_offsets.len(),
                limit: max_revisions,
            }
            .into());
        }

        let mut revisions = Vec::with_capacity(eof_offsets.len());
        let mut documents = Vec::with_capacity(eof_offsets.len());
        let mut start = 0;

        for eof_offset in eof_offsets {
            let prefix = &bytes[..eof_offset];
            let document = convert_document(&Document::load_mem(prefix).map_err(PdfError::from)?);

            let xref_offset = startxref(&bytes[start..eof_offset]).ok_or_else(|| PdfError::Xref {
                offset: start,
                reason: "missing startxref".into(),
            })?;
            let (written, freed) = read_xref_section(prefix, xref_offset, &document)?;

            log::debug!(
                "revision ending at {eof_offset}: {} written, {} freed",
                written.len(),
                freed.len()
            );

            revisions.push(DocumentRevision {
                eof_offset: eof_offset as u64,
                written,
                freed,
            });
            documents.push(Arc::new(document));
            start = eof_offset;
        }

        Ok(Self {
            bytes,
            revisions,
            documents,
        })
    }
}

impl RevisionedDocument for LopdfRevisionedDocument {
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

    fn bytes(&self) -> Option<&[u8]> {
        Some(&self.bytes)
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}

/// Offsets just past each `%%EOF` marker and its end-of-line.
fn eof_offsets(bytes: &[u8]) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut pos = 0;

    while let Some(found) = find(&bytes[pos..], EOF_MARKER) {
        let mut end = pos + found + EOF_MARKER.len();
        if bytes.get(end) == Some(&b'\r') {
            end += 1;
        }
        if bytes.get(end) == Some(&b'\n') {
            end += 1;
        }
        offsets.push(end);
        pos = end;
    }

    offsets
}

fn startxref(segment: &[u8]) -> Option<usize> {
    let pos = rfind(segment, STARTXREF)?;
    let mut tokens = Tokens::new(segment, pos + STARTXREF.len());
    tokens.number()
}

fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n' | b'\x0c' | b'\0')
}

struct Tokens<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn new(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    fn next_token(&mut self) -> Option<&'a [u8]> {
        while self.pos < self.bytes.len() && is_whitespace(self.bytes[self.pos]) {
            self.pos += 1;
        }
        let start = self.pos;
        while self.pos < self.bytes.len() && !is_whitespace(self.bytes[self.pos]) {
            self.pos += 1;
        }
        (self.pos > start).then(|| &self.bytes[start..self.pos])
    }

    fn number<T: FromStr>(&mut self) -> Option<T> {
        let token = self.next_token()?;
        std::str::from_utf8(token).ok()?.parse().ok()
    }
}

type XrefChanges = (BTreeSet<ObjectRef>, BTreeSet<ObjectRef>);

fn read_xref_section(
    bytes: &[u8],
    offset: usize,
    document: &MemoryDocument,
) -> Result<XrefChanges> {
    let xref_error = |reason: &str| PdfError::Xref {
        offset,
        reason: reason.to_owned(),
    };

    if offset >= bytes.len() {
        return Err(xref_error("offset beyond end of file").into());
    }

    let mut tokens = Tokens::new(bytes, offset);
    let first = tokens.next_token().ok_or_else(|| xref_error("empty"))?;

    if first == b"xref" {
        return Ok(read_xref_table(&mut tokens).ok_or_else(|| xref_error("malformed table"))?);
    }

    // otherwise a cross-reference stream: `N G obj << ... >> stream`
    let number: u32 = std::str::from_utf8(first)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| xref_error("neither a table nor a stream"))?;

    let stream = document
        .object_by_number(number)
        .and_then(|(_, object)| object.as_stream())
        .ok_or_else(|| xref_error("cross-reference stream not found"))?;

    Ok(read_xref_stream(stream).ok_or_else(|| xref_error("malformed stream"))?)
}

fn read_xref_table(tokens: &mut Tokens<'_>) -> Option<XrefChanges> {
    let mut written = BTreeSet::new();
    let mut freed = BTreeSet::new();

    loop {
        let token = tokens.next_token()?;
        if token.starts_with(b"trailer") {
            break;
        }

        let start: u32 = std::str::from_utf8(token).ok()?.parse().ok()?;
        let count: u32 = tokens.number()?;

        for k in 0..count {
            let _offset: u64 = tokens.number()?;
            let generation: u32 = tokens.number()?;
            let reference = ObjectRef::new(start.checked_add(k)?, u16::try_from(generation).ok()?);

            match tokens.next_token()? {
                b"n" => written.insert(reference),
                b"f" => freed.insert(reference),
                _ => return None,
            };
        }
    }

    Some((written, freed))
}

fn read_xref_stream(stream: &PdfStream) -> Option<XrefChanges> {
    let widths: Vec<usize> = stream
        .dict
        .get("W")?
        .as_array()?
        .iter()
        .map(|w| w.as_integer().and_then(|w| usize::try_from(w).ok()))
        .collect::<Option<_>>()?;
    if widths.len() != 3 || widths.iter().any(|w| *w > 8) {
        return None;
    }

    let entry_len: usize = widths.iter().sum();
    if entry_len == 0 {
        return None;
    }

    let size = stream.dict.get("Size")?.as_integer()?;
    let index: Vec<i64> = match stream.dict.get("Index").and_then(PdfObject::as_array) {
        Some(index) => index
            .iter()
            .map(PdfObject::as_integer)
            .collect::<Option<_>>()?,
        None => vec![0, size],
    };

    let mut entries = stream.content.chunks_exact(entry_len);
    let mut written = BTreeSet::new();
    let mut freed = BTreeSet::new();

    for range in index.chunks_exact(2) {
        let start = u32::try_from(range[0]).ok()?;
        let count = u32::try_from(range[1]).ok()?;

        for k in 0..count {
            let entry = entries.next()?;
            let (kind, rest) = entry.split_at(widths[0]);
            let (_second, third) = rest.split_at(widths[1]);

            let kind = if widths[0] == 0 { 1 } else { be_value(kind) };
            let number = start.checked_add(k)?;

            match kind {
                0 => {
                    freed.insert(ObjectRef::new(number, u16::try_from(be_value(third)).ok()?));
                }
                1 => {
                    written.insert(ObjectRef::new(number, u16::try_from(be_value(third)).ok()?));
                }
                2 => {
                    written.insert(ObjectRef::new(number, 0));
                }
                _ => {}
            }
        }
    }

    Some((written, freed))
}

fn be_value(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0, |value, byte| (value << 8) | u64::from(*byte))
}

fn convert_document(document: &Document) -> MemoryDocument {
    let mut converted = MemoryDocument::new();
    converted.set_trailer(convert_dictionary(&document.trailer));
    for ((number, generation), object) in &document.objects {
        converted.insert(ObjectRef::new(*number, *generation), convert_object(object));
    }
    converted
}

fn convert_dictionary(dict: &Dictionary) -> PdfDictionary {
    dict.iter()
        .map(|(key, value)| (String::from_utf8_lossy(key).into_owned(), convert_object(value)))
        .collect()
}

fn convert_object(object: &Object) -> PdfObject {
    match object {
        Object::Null => PdfObject::Null,
        Object::Boolean(b) => PdfObject::Boolean(*b),
        Object::Integer(i) => PdfObject::Integer(*i),
        Object::Real(r) => PdfObject::Real(f64::from(*r)),
        Object::Name(name) => PdfObject::Name(String::from_utf8_lossy(name).into_owned()),
        Object::String(bytes, _) => PdfObject::String(bytes.clone()),
        Object::Array(array) => PdfObject::Array(array.iter().map(convert_object).collect()),
        Object::Dictionary(dict) => PdfObject::Dictionary(convert_dictionary(dict)),
        Object::Stream(stream) => PdfObject::Stream(PdfStream::new(
            convert_dictionary(&stream.dict),
            // unfiltered streams have nothing to decompress
            stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone()),
        )),
        Object::Reference((number, generation)) => {
            PdfObject::Reference(ObjectRef::new(*number, *generation))
        }
    }
}
