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

use crate::trust::TrustScope;

/// Trust scopes implied by ETSI trust-service types, as found in the
/// `ServiceTypeIdentifier` of an EU trusted list.
pub static SERVICE_TYPES: &[(&str, TrustScope)] = &[
    ("http://uri.etsi.org/TrstSvc/Svctype/CA/QC", TrustScope::Ca),
    ("http://uri.etsi.org/TrstSvc/Svctype/CA/PKC", TrustScope::Ca),
    (
        "http://uri.etsi.org/TrstSvc/Svctype/Certstatus/OCSP/QC",
        TrustScope::Ocsp,
    ),
    ("http://uri.etsi.org/TrstSvc/Svctype/Certstatus/OCSP", TrustScope::Ocsp),
    (
        "http://uri.etsi.org/TrstSvc/Svctype/Certstatus/CRL/QC",
        TrustScope::Crl,
    ),
    ("http://uri.etsi.org/TrstSvc/Svctype/Certstatus/CRL", TrustScope::Crl),
    ("http://uri.etsi.org/TrstSvc/Svctype/TSA/QTST", TrustScope::Timestamp),
    ("http://uri.etsi.org/TrstSvc/Svctype/TSA", TrustScope::Timestamp),
    (
        "http://uri.etsi.org/TrstSvc/Svctype/TSA/TSS-QC",
        TrustScope::Timestamp,
    ),
    (
        "http://uri.etsi.org/TrstSvc/Svctype/TSA/TSS-AdESQCandQES",
        TrustScope::Timestamp,
    ),
];

/// Return the trust scope implied by an ETSI service type URI.
pub fn trust_scope_for_service_type(service_type: &str) -> Option<TrustScope> {
    SERVICE_TYPES
        .iter()
        .find(|(uri, _)| *uri == service_type)
        .map(|(_, scope)| *scope)
}
