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

use std::{collections::HashSet, fmt, sync::Arc};

use crate::{
    check_names::{DOC_MDP_CHECK, VALIDATION_LIMITS},
    pdf::{
        signature_fields, DocumentRevision, ObjectRef, PdfDictionary, PdfDocument, PdfObject,
        RevisionedDocument, SignatureField, MAX_GENERATION,
    },
    report_item,
    settings::Settings,
    ReportItemStatus, ValidationReport,
};

pub(crate) const NOT_ALLOWED_CATALOG_CHANGES: &str =
    "PDF document catalog contains changes other than DSS dictionary and DTS addition, which is not allowed.";
pub(crate) const DSS_REMOVED: &str = "DSS dictionary was removed from catalog.";

// catalog entries that are compared by their own rules
const STRIPPED_CATALOG_KEYS: [&str; 3] = ["DSS", "Extensions", "Metadata"];
const DSS_ARRAYS: [&str; 3] = ["Certs", "OCSPs", "CRLs"];
const VRI_ARRAYS: [&str; 3] = ["Cert", "OCSP", "CRL"];

/// The `/P` value of a certification signature's DocMDP transform.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum AccessPermissions {
    /// No changes to the document are permitted.
    NoChangesPermitted = 1,
    /// Filling in forms, instantiating page templates and signing.
    FormFieldsModification = 2,
    /// As level 2, plus annotation creation, deletion and modification.
    AnnotationModification = 3,
}

impl AccessPermissions {
    /// Values other than 1 and 3 mean the default, level 2.
    pub fn from_p(p: i64) -> Self {
        match p {
            1 => Self::NoChangesPermitted,
            3 => Self::AnnotationModification,
            _ => Self::FormFieldsModification,
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for AccessPermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

/// An indirect reference that a revision may change, paired with the
/// reference the same structure had in the previous revision.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
struct ReferencesPair {
    current: Option<ObjectRef>,
    previous: Option<ObjectRef>,
}

/// Checks that incremental updates made after a certification signature
/// stay within what its access permissions allow.
///
/// Appending validation data (DSS) and document timestamps is always
/// allowed. Everything else a revision touches must be explained by an
/// allow-list built from the DSS of both revisions.
#[derive(Clone, Debug)]
pub struct DocumentRevisionsValidator {
    settings: Arc<Settings>,
}

impl DocumentRevisionsValidator {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    /// Validate every revision added after the first certification
    /// signature of `document`.
    pub fn validate(&self, document: &dyn RevisionedDocument) -> ValidationReport {
        let mut report = ValidationReport::new();

        let revisions = document.revisions();
        let max_revisions = self.settings.limits.max_revisions;
        if revisions.len() > max_revisions {
            report_item!(
                VALIDATION_LIMITS,
                format!(
                    "Document has {} revisions, more than the limit of {max_revisions}.",
                    revisions.len()
                )
            )
            .indeterminate(&mut report);
            return report;
        }

        let latest = match document.latest() {
            Ok(latest) => latest,
            Err(err) => {
                report_item!(DOC_MDP_CHECK, "Unable to read the latest document revision.")
                    .with_cause(err)
                    .indeterminate(&mut report);
                return report;
            }
        };

        let fields = signature_fields(latest.as_ref());
        let signed: Vec<(usize, &SignatureField)> = fields
            .iter()
            .filter_map(|field| {
                let end = field.covered_end()?;
                Some((document.revision_covering(end)?, field))
            })
            .collect();

        let Some((certified_at, permissions)) = signed
            .iter()
            .filter_map(|(index, field)| field.access_permissions.map(|p| (*index, p)))
            .min_by_key(|(index, _)| *index)
        else {
            report_item!(
                DOC_MDP_CHECK,
                "Document is not certified, so no modification restrictions apply."
            )
            .info(&mut report);
            return report;
        };

        log::debug!(
            "certification signature in revision {certified_at} with access permissions {permissions}"
        );

        for index in certified_at + 1..revisions.len() {
            let added: Vec<&SignatureField> = signed
                .iter()
                .filter(|(at, _)| *at == index)
                .map(|(_, field)| *field)
                .collect();

            let timestamps_only =
                !added.is_empty() && added.iter().all(|field| field.is_document_timestamp());
            let sanctioned: &[&SignatureField] = if timestamps_only {
                report_item!(
                    DOC_MDP_CHECK,
                    format!("Revision {index} adds a document timestamp, which is always allowed.")
                )
                .info(&mut report);
                added.as_slice()
            } else if !added.is_empty() && permissions != AccessPermissions::NoChangesPermitted {
                report_item!(
                    DOC_MDP_CHECK,
                    format!(
                        "Revision {index} adds a signature, which access permissions level \
                         {permissions} allows."
                    )
                )
                .info(&mut report);
                added.as_slice()
            } else {
                &[]
            };

            let documents = document
                .document_at(index - 1)
                .and_then(|previous| Ok((previous, document.document_at(index)?)));
            match documents {
                Ok((previous, current)) => self.compare_revisions(
                    &mut report,
                    previous.as_ref(),
                    current.as_ref(),
                    &revisions[index],
                    permissions,
                    sanctioned,
                ),
                Err(err) => {
                    report_item!(DOC_MDP_CHECK, format!("Unable to read revision {index}."))
                        .with_cause(err)
                        .indeterminate(&mut report);
                }
            }
        }

        report
    }

    /// Compare one incremental update against the revision before it.
    ///
    /// `revision` describes the cross-reference entries the update wrote
    /// and freed.
    pub fn validate_revision(
        &self,
        report: &mut ValidationReport,
        previous: &dyn PdfDocument,
        current: &dyn PdfDocument,
        revision: &DocumentRevision,
        permissions: AccessPermissions,
    ) {
        self.compare_revisions(report, previous, current, revision, permissions, &[]);
    }

    /// As [`validate_revision`](Self::validate_revision), where the update
    /// also adds the `signatures` fields. Their field and value
    /// dictionaries, the form and page entries referring to them may change.
    fn compare_revisions(
        &self,
        report: &mut ValidationReport,
        previous: &dyn PdfDocument,
        current: &dyn PdfDocument,
        revision: &DocumentRevision,
        permissions: AccessPermissions,
        signatures: &[&SignatureField],
    ) {
        let signature_refs: HashSet<ObjectRef> = signatures
            .iter()
            .flat_map(|field| [field.field_ref, field.signature_ref])
            .flatten()
            .collect();

        // changes this validator cannot classify
        let unexpected_status = match permissions {
            AccessPermissions::NoChangesPermitted => ReportItemStatus::Invalid,
            _ => ReportItemStatus::Indeterminate,
        };

        let (Some(previous_catalog), Some(current_catalog)) =
            (previous.catalog(), current.catalog())
        else {
            report_item!(DOC_MDP_CHECK, "Document catalog is missing.").indeterminate(report);
            return;
        };

        let mut comparison = GraphComparison::new(previous, current, &signature_refs);
        if !comparison.dictionaries_equal(
            &strip_catalog(previous_catalog),
            &strip_catalog(current_catalog),
        ) {
            report.add(
                report_item!(DOC_MDP_CHECK, NOT_ALLOWED_CATALOG_CHANGES)
                    .with_status(unexpected_status),
            );
        }

        compare_extensions(report, previous, current, previous_catalog, current_catalog);

        let previous_dss = previous.get(previous_catalog, "DSS");
        let current_dss = current.get(current_catalog, "DSS");
        if previous_dss.is_some() && current_dss.is_none() {
            report_item!(DOC_MDP_CHECK, DSS_REMOVED).invalid(report);
        }

        let mut allowed = allowed_references(previous, current, previous_catalog, current_catalog);
        allowed.extend(signature_references(
            previous,
            current,
            previous_catalog,
            current_catalog,
            &signature_refs,
        ));

        for freed in &revision.freed {
            if freed.generation == MAX_GENERATION {
                continue;
            }
            let Some((existing, _)) = previous.object_by_number(freed.number) else {
                continue;
            };
            let relocated = allowed
                .iter()
                .any(|pair| pair.previous == Some(existing) && pair.current != Some(existing));
            if !relocated {
                report_item!(
                    DOC_MDP_CHECK,
                    format!(
                        "Object \"{existing}\", which is not allowed to be removed, was removed from the document through XREF table."
                    )
                )
                .invalid(report);
            }
        }

        for written in &revision.written {
            if is_cross_reference_structure(current, *written) {
                continue;
            }

            let listed = allowed.iter().any(|pair| pair.current == Some(*written));
            let replaces_allowed = match previous.object_by_number(written.number) {
                None => true,
                Some((existing, _)) => allowed.iter().any(|pair| pair.previous == Some(existing)),
            };

            if !(listed && replaces_allowed) {
                report.add(
                    report_item!(
                        DOC_MDP_CHECK,
                        format!("New PDF document revision contains unexpected entry \"{written}\" in XREF table.")
                    )
                    .with_status(unexpected_status),
                );
            }
        }
    }
}

fn strip_catalog(catalog: &PdfDictionary) -> PdfDictionary {
    let mut stripped = catalog.clone();
    for key in STRIPPED_CATALOG_KEYS {
        stripped.remove(key);
    }
    stripped
}

/// Cross-reference streams and object streams are rewritten by every
/// update that uses them.
fn is_cross_reference_structure(document: &dyn PdfDocument, reference: ObjectRef) -> bool {
    document
        .object(reference)
        .and_then(PdfObject::as_stream)
        .and_then(|stream| stream.dict.get_name("Type"))
        .is_some_and(|kind| kind == "XRef" || kind == "ObjStm")
}

/// Developer extensions may be added and their level raised. Removing or
/// otherwise changing an existing one is not allowed.
fn compare_extensions(
    report: &mut ValidationReport,
    previous: &dyn PdfDocument,
    current: &dyn PdfDocument,
    previous_catalog: &PdfDictionary,
    current_catalog: &PdfDictionary,
) {
    let Some(previous_extensions) = previous
        .get(previous_catalog, "Extensions")
        .and_then(PdfObject::as_dict)
    else {
        return;
    };
    let current_extensions = current
        .get(current_catalog, "Extensions")
        .and_then(PdfObject::as_dict);

    for (prefix, previous_value) in previous_extensions.iter() {
        if prefix == "Type" {
            continue;
        }

        let current_entries = current_extensions
            .and_then(|extensions| current.get(extensions, prefix))
            .map(|value| extension_entries(current, value))
            .unwrap_or_default();

        for previous_entry in extension_entries(previous, previous_value) {
            let matching = current_entries.iter().find(|current_entry| {
                same_extension(previous, current, previous_entry, current_entry)
            });

            match matching {
                None => {
                    report_item!(
                        DOC_MDP_CHECK,
                        format!("Developer extension \"{prefix}\" dictionary was removed or unexpectedly modified.")
                    )
                    .invalid(report);
                }
                Some(current_entry) => {
                    let level = |document: &dyn PdfDocument, entry: &PdfDictionary| {
                        document
                            .get(entry, "ExtensionLevel")
                            .and_then(PdfObject::as_integer)
                            .unwrap_or(0)
                    };
                    if level(current, current_entry) < level(previous, previous_entry) {
                        report_item!(
                            DOC_MDP_CHECK,
                            format!("Extension level number in developer extension \"{prefix}\" dictionary was reduced.")
                        )
                        .invalid(report);
                    }
                }
            }
        }
    }
}

/// A developer extension value is a dictionary or an array of them.
fn extension_entries<'a>(
    document: &'a dyn PdfDocument,
    value: &'a PdfObject,
) -> Vec<&'a PdfDictionary> {
    match document.resolve(value) {
        PdfObject::Dictionary(entry) => vec![entry],
        PdfObject::Array(entries) => entries
            .iter()
            .filter_map(|entry| document.resolve(entry).as_dict())
            .collect(),
        _ => Vec::new(),
    }
}

fn same_extension(
    previous: &dyn PdfDocument,
    current: &dyn PdfDocument,
    previous_entry: &PdfDictionary,
    current_entry: &PdfDictionary,
) -> bool {
    let keys = |entry: &PdfDictionary| {
        entry
            .iter()
            .map(|(key, _)| key.to_owned())
            .filter(|key| key != "ExtensionLevel")
            .collect::<HashSet<_>>()
    };
    let previous_keys = keys(previous_entry);
    previous_keys == keys(current_entry)
        && previous_keys.iter().all(|key| {
            previous.get(previous_entry, key) == current.get(current_entry, key)
        })
}

/// References the DSS structures of `current` may use, each paired with
/// its counterpart in `previous`.
fn allowed_references(
    previous: &dyn PdfDocument,
    current: &dyn PdfDocument,
    previous_catalog: &PdfDictionary,
    current_catalog: &PdfDictionary,
) -> Vec<ReferencesPair> {
    let mut allowed = AllowList::new(previous, current);

    allowed.push_references(current.catalog_ref(), previous.catalog_ref());

    let current_dss = current_catalog.get("DSS");
    let previous_dss = previous_catalog.get("DSS");
    allowed.push(current_dss, previous_dss);

    let current_dss = current_dss.and_then(|dss| current.resolve(dss).as_dict());
    let previous_dss = previous_dss.and_then(|dss| previous.resolve(dss).as_dict());
    let Some(current_dss) = current_dss else {
        return allowed.pairs;
    };

    for key in DSS_ARRAYS {
        allowed.push_array(current_dss.get(key), previous_dss.and_then(|dss| dss.get(key)));
    }

    let current_vri = current_dss.get("VRI");
    let previous_vri = previous_dss.and_then(|dss| dss.get("VRI"));
    allowed.push(current_vri, previous_vri);

    let current_vri = current_vri.and_then(|vri| current.resolve(vri).as_dict());
    let previous_vri = previous_vri.and_then(|vri| previous.resolve(vri).as_dict());
    if let Some(current_vri) = current_vri {
        for (key, current_entry) in current_vri.iter() {
            let previous_entry = previous_vri.and_then(|vri| vri.get(key));
            allowed.push(Some(current_entry), previous_entry);

            let Some(current_entry) = current.resolve(current_entry).as_dict() else {
                continue;
            };
            let previous_entry = previous_entry.and_then(|entry| previous.resolve(entry).as_dict());

            for array in VRI_ARRAYS {
                allowed.push_array(
                    current_entry.get(array),
                    previous_entry.and_then(|entry| entry.get(array)),
                );
            }
            allowed.push(
                current_entry.get("TS"),
                previous_entry.and_then(|entry| entry.get("TS")),
            );
        }
    }

    allowed.pairs
}

/// References an added signature may touch: its field and value
/// dictionaries, the form's field list and the annotations of the page
/// holding its widget.
fn signature_references(
    previous: &dyn PdfDocument,
    current: &dyn PdfDocument,
    previous_catalog: &PdfDictionary,
    current_catalog: &PdfDictionary,
    signature_refs: &HashSet<ObjectRef>,
) -> Vec<ReferencesPair> {
    let mut allowed = AllowList::new(previous, current);
    if signature_refs.is_empty() {
        return allowed.pairs;
    }

    for reference in signature_refs {
        let existing = previous.object(*reference).map(|_| *reference);
        allowed.push_references(Some(*reference), existing);

        let page = current
            .object(*reference)
            .and_then(|field| current.resolve(field).as_dict())
            .and_then(|field| field.get("P"));
        let previous_page = page
            .and_then(PdfObject::as_reference)
            .and_then(|page| previous.object(page));
        allowed.push(page, page.filter(|_| previous_page.is_some()));

        let annotations = |document: &dyn PdfDocument| {
            page.and_then(PdfObject::as_reference)
                .and_then(|page| document.object(page))
                .and_then(|page| document.resolve(page).as_dict())
                .and_then(|page| page.get("Annots"))
                .and_then(PdfObject::as_reference)
        };
        allowed.push_references(annotations(current), annotations(previous));
    }

    let form = current_catalog.get("AcroForm");
    let previous_form = previous_catalog.get("AcroForm");
    allowed.push(form, previous_form);
    let fields = |document: &dyn PdfDocument, form: Option<&PdfObject>| {
        form.and_then(|form| document.resolve(form).as_dict())
            .and_then(|form| form.get("Fields"))
            .and_then(PdfObject::as_reference)
    };
    allowed.push_references(fields(current, form), fields(previous, previous_form));

    allowed.pairs
}

struct AllowList<'a> {
    previous: &'a dyn PdfDocument,
    current: &'a dyn PdfDocument,
    pairs: Vec<ReferencesPair>,
}

impl<'a> AllowList<'a> {
    fn new(previous: &'a dyn PdfDocument, current: &'a dyn PdfDocument) -> Self {
        Self {
            previous,
            current,
            pairs: Vec::new(),
        }
    }

    fn push(&mut self, current: Option<&PdfObject>, previous: Option<&PdfObject>) {
        self.push_references(
            current.and_then(PdfObject::as_reference),
            previous.and_then(PdfObject::as_reference),
        );
    }

    fn push_references(&mut self, current: Option<ObjectRef>, previous: Option<ObjectRef>) {
        if current.is_some() || previous.is_some() {
            self.pairs.push(ReferencesPair { current, previous });
        }
    }

    /// The array itself and each of its elements, paired by position.
    fn push_array(&mut self, current: Option<&PdfObject>, previous: Option<&PdfObject>) {
        self.push(current, previous);

        let current_elements = current
            .and_then(|array| self.current.resolve(array).as_array())
            .unwrap_or_default();
        let previous_elements = previous
            .and_then(|array| self.previous.resolve(array).as_array())
            .unwrap_or_default();

        for (index, element) in current_elements.iter().enumerate() {
            self.push(Some(element), previous_elements.get(index));
        }
    }
}

/// Structural equality of two object graphs.
///
/// Reference pairs already under comparison are assumed equal, which makes
/// the walk terminate on cyclic graphs. References to `added` objects are
/// left out of arrays on both sides, and a key only `current` has is
/// ignored when it holds nothing but such references.
struct GraphComparison<'a> {
    previous: &'a dyn PdfDocument,
    current: &'a dyn PdfDocument,
    added: &'a HashSet<ObjectRef>,
    visited: HashSet<(ObjectRef, ObjectRef)>,
}

impl<'a> GraphComparison<'a> {
    fn new(
        previous: &'a dyn PdfDocument,
        current: &'a dyn PdfDocument,
        added: &'a HashSet<ObjectRef>,
    ) -> Self {
        Self {
            previous,
            current,
            added,
            visited: HashSet::new(),
        }
    }

    fn is_added(&self, object: &PdfObject) -> bool {
        object
            .as_reference()
            .is_some_and(|reference| self.added.contains(&reference))
    }

    fn objects_equal(&mut self, previous: &PdfObject, current: &PdfObject) -> bool {
        if let (PdfObject::Reference(p), PdfObject::Reference(c)) = (previous, current) {
            if !self.visited.insert((*p, *c)) {
                return true;
            }
        }

        let (previous_doc, current_doc) = (self.previous, self.current);
        match (previous_doc.resolve(previous), current_doc.resolve(current)) {
            (PdfObject::Dictionary(p), PdfObject::Dictionary(c)) => self.dictionaries_equal(p, c),
            (PdfObject::Stream(p), PdfObject::Stream(c)) => {
                p.content == c.content && self.dictionaries_equal(&p.dict, &c.dict)
            }
            (PdfObject::Array(p), PdfObject::Array(c)) => {
                let p: Vec<&PdfObject> = p.iter().filter(|o| !self.is_added(o)).collect();
                let c: Vec<&PdfObject> = c.iter().filter(|o| !self.is_added(o)).collect();
                p.len() == c.len()
                    && p.into_iter().zip(c).all(|(p, c)| self.objects_equal(p, c))
            }
            (p, c) => p == c,
        }
    }

    fn dictionaries_equal(&mut self, previous: &PdfDictionary, current: &PdfDictionary) -> bool {
        let only_added = |this: &Self, value: &PdfObject| {
            this.current
                .resolve(value)
                .as_array()
                .is_some_and(|array| {
                    !array.is_empty() && array.iter().all(|o| this.is_added(o))
                })
        };

        previous.iter().all(|(key, value)| {
            current
                .get(key)
                .is_some_and(|other| self.objects_equal(value, other))
        }) && current
            .iter()
            .filter(|(key, _)| !previous.contains_key(key))
            .all(|(_, value)| !self.added.is_empty() && only_added(self, value))
    }
}
