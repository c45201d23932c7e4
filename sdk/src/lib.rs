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

#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]
#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod certificate;
pub use certificate::{Certificate, CertificateBuilder, CertificateExtension};

pub mod context;

pub mod crypto;

mod error;
pub use error::{Error, Result};

pub mod http;

pub mod pdf;

pub mod retriever;

pub mod revocation;

pub mod settings;
pub use settings::Settings;

pub mod signature;

pub mod trust;
pub use trust::{TrustScope, TrustedCertificatesStore};

pub mod validation;
pub use validation::{
    DocumentRevisionsValidator, SignatureValidator, ValidatorChain, ValidatorChainBuilder,
};

pub use pdf_sigval_report::{
    check_names, report_item, ReportItem, ReportItemStatus, ValidationReport, ValidationResult,
};

#[cfg(test)]
pub(crate) mod tests;
