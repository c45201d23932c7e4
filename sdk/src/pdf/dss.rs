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

use crate::pdf::{PdfDictionary, PdfDocument, PdfObject};

/// The contents of a document security store (`/DSS`).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DssData {
    /// DER-encoded certificates.
    pub certificates: Vec<Vec<u8>>,
    /// DER-encoded `OCSPResponse` structures.
    pub ocsp_responses: Vec<Vec<u8>>,
    /// DER-encoded CRLs.
    pub crls: Vec<Vec<u8>>,
}

impl DssData {
    /// Read the DSS of `document`, or `None` if it has none.
    pub fn from_document(document: &dyn PdfDocument) -> Option<Self> {
        let catalog = document.catalog()?;
        let dss = document.get(catalog, "DSS")?.as_dict()?;

        Some(Self {
            certificates: stream_contents(document, dss, "Certs"),
            ocsp_responses: stream_contents(document, dss, "OCSPs"),
            crls: stream_contents(document, dss, "CRLs"),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty() && self.ocsp_responses.is_empty() && self.crls.is_empty()
    }
}

fn stream_contents(document: &dyn PdfDocument, dss: &PdfDictionary, key: &str) -> Vec<Vec<u8>> {
    document
        .get(dss, key)
        .and_then(PdfObject::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| document.resolve(entry).as_stream())
                .map(|stream| stream.content.clone())
                .collect()
        })
        .unwrap_or_default()
}
