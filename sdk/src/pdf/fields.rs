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

use std::collections::HashSet;

use crate::{
    pdf::{ObjectRef, PdfDictionary, PdfDocument, PdfObject},
    validation::AccessPermissions,
};

/// `/SubFilter` of a document timestamp signature.
pub const DOCUMENT_TIMESTAMP_SUB_FILTER: &str = "ETSI.RFC3161";

const MAX_FIELD_DEPTH: usize = 32;

/// A signed signature field.
#[derive(Clone, Debug, PartialEq)]
pub struct SignatureField {
    /// Fully qualified field name.
    pub name: String,
    pub field_ref: Option<ObjectRef>,
    /// Reference of the signature dictionary (`/V`), if it is indirect.
    pub signature_ref: Option<ObjectRef>,
    pub sub_filter: Option<String>,
    pub byte_range: Vec<(u64, u64)>,
    pub contents: Vec<u8>,
    /// Set for certification signatures.
    pub access_permissions: Option<AccessPermissions>,
    pub signature: PdfDictionary,
}

impl SignatureField {
    pub fn is_document_timestamp(&self) -> bool {
        self.sub_filter.as_deref() == Some(DOCUMENT_TIMESTAMP_SUB_FILTER)
            || self.signature.get_name("Type") == Some("DocTimeStamp")
    }

    /// The offset just past the last signed byte.
    pub fn covered_end(&self) -> Option<u64> {
        self.byte_range
            .last()
            .and_then(|(start, len)| start.checked_add(*len))
    }

    /// True when the byte range signs everything up to `revision_end` except
    /// a single gap for `/Contents`.
    pub fn covers_whole_revision(&self, revision_end: u64) -> bool {
        match self.byte_range.as_slice() {
            [(0, first_len), (second_start, second_len)] => {
                second_start >= first_len
                    && second_start.checked_add(*second_len) == Some(revision_end)
            }
            _ => false,
        }
    }
}

/// All signed signature fields reachable from the AcroForm, in the order
/// they are listed.
pub fn signature_fields(document: &dyn PdfDocument) -> Vec<SignatureField> {
    let mut fields = Vec::new();

    let Some(roots) = document
        .catalog()
        .and_then(|catalog| document.get(catalog, "AcroForm"))
        .and_then(PdfObject::as_dict)
        .and_then(|acro_form| document.get(acro_form, "Fields"))
        .and_then(PdfObject::as_array)
    else {
        return fields;
    };

    let mut visited = HashSet::new();
    for root in roots {
        collect_field(document, root, None, "", 0, &mut visited, &mut fields);
    }

    fields
}

fn collect_field<'a>(
    document: &'a dyn PdfDocument,
    object: &'a PdfObject,
    inherited_type: Option<&'a str>,
    parent_name: &str,
    depth: usize,
    visited: &mut HashSet<ObjectRef>,
    fields: &mut Vec<SignatureField>,
) {
    if depth > MAX_FIELD_DEPTH {
        return;
    }

    let field_ref = object.as_reference();
    if let Some(reference) = field_ref {
        if !visited.insert(reference) {
            return;
        }
    }

    let Some(field) = document.resolve(object).as_dict() else {
        return;
    };

    let partial_name = document
        .get(field, "T")
        .and_then(PdfObject::as_bytes)
        .map(text_string);
    let name = match partial_name {
        None => parent_name.to_owned(),
        Some(partial) if parent_name.is_empty() => partial,
        Some(partial) => format!("{parent_name}.{partial}"),
    };

    let field_type = document
        .get(field, "FT")
        .and_then(PdfObject::as_name)
        .or(inherited_type);

    if let Some(kids) = document.get(field, "Kids").and_then(PdfObject::as_array) {
        for kid in kids {
            collect_field(
                document,
                kid,
                field_type,
                &name,
                depth + 1,
                visited,
                fields,
            );
        }
    }

    if field_type != Some("Sig") {
        return;
    }

    let Some(value) = field.get("V") else {
        return;
    };
    let Some(signature) = document.resolve(value).as_dict() else {
        return;
    };

    fields.push(SignatureField {
        name,
        field_ref,
        signature_ref: value.as_reference(),
        sub_filter: document
            .get(signature, "SubFilter")
            .and_then(PdfObject::as_name)
            .map(str::to_owned),
        byte_range: byte_range(document, signature),
        contents: document
            .get(signature, "Contents")
            .and_then(PdfObject::as_bytes)
            .map(<[u8]>::to_vec)
            .unwrap_or_default(),
        access_permissions: doc_mdp_permissions(document, signature),
        signature: signature.clone(),
    });
}

fn byte_range(document: &dyn PdfDocument, signature: &PdfDictionary) -> Vec<(u64, u64)> {
    let Some(values) = document
        .get(signature, "ByteRange")
        .and_then(PdfObject::as_array)
    else {
        return Vec::new();
    };

    let numbers: Option<Vec<u64>> = values
        .iter()
        .map(|v| document.resolve(v).as_integer().and_then(|i| u64::try_from(i).ok()))
        .collect();

    match numbers {
        Some(numbers) if numbers.len() % 2 == 0 => numbers
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
            .collect(),
        _ => Vec::new(),
    }
}

fn doc_mdp_permissions(
    document: &dyn PdfDocument,
    signature: &PdfDictionary,
) -> Option<AccessPermissions> {
    document
        .get(signature, "Reference")
        .and_then(PdfObject::as_array)?
        .iter()
        .filter_map(|reference| document.resolve(reference).as_dict())
        .find(|reference| reference.get_name("TransformMethod") == Some("DocMDP"))
        .map(|reference| {
            let p = document
                .get(reference, "TransformParams")
                .and_then(PdfObject::as_dict)
                .and_then(|params| document.get(params, "P"))
                .and_then(PdfObject::as_integer)
                .unwrap_or(2);
            AccessPermissions::from_p(p)
        })
}

/// Decode a PDF text string. UTF-16BE when it carries a byte order mark,
/// single-byte otherwise.
fn text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xfe, 0xff, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|unit| u16::from_be_bytes([unit[0], unit[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => bytes.iter().map(|b| char::from(*b)).collect(),
    }
}
