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

//! Names of the checks that produce [`ReportItem`](crate::ReportItem)s.
//!
//! Every item carries one of these names so that callers can group and
//! filter findings without parsing messages.

/// Trust and chain checks on a certificate.
pub const CERTIFICATE_CHECK: &str = "Certificate check.";

/// Validity period check on a certificate.
pub const VALIDITY_CHECK: &str = "Certificate validity period check.";

/// Required certificate extensions check.
pub const EXTENSIONS_CHECK: &str = "Required certificate extensions check.";

/// Revocation data collection and selection.
pub const REVOCATION_DATA_CHECK: &str = "Revocation data check.";

/// Validation of a single OCSP response.
pub const OCSP_CHECK: &str = "OCSP response check.";

/// Validation of a single CRL.
pub const CRL_CHECK: &str = "CRL response check.";

/// Cryptographic verification of a document signature.
pub const SIGNATURE_VERIFICATION: &str = "Signature verification check.";

/// Validation of a timestamp token.
pub const TIMESTAMP_VERIFICATION: &str = "Timestamp verification check.";

/// Document revision integrity (doc-MDP) check.
pub const DOC_MDP_CHECK: &str = "DocMDP check.";

/// Bounds placed on untrusted input.
pub const VALIDATION_LIMITS: &str = "Validation limits check.";
