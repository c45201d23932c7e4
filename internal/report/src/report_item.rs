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

use std::{
    borrow::Cow,
    fmt::{self, Display, Formatter},
};

use serde::Serialize;

use crate::ValidationReport;

/// Status attached to a single [`ReportItem`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportItemStatus {
    /// The check passed, or the item is purely informational.
    Info,

    /// The check could not reach a conclusion.
    Indeterminate,

    /// The check definitively failed.
    Invalid,
}

impl ReportItemStatus {
    /// Returns the [`ValidationResult`] this status contributes to a report.
    pub fn result(self) -> ValidationResult {
        match self {
            Self::Info => ValidationResult::Valid,
            Self::Indeterminate => ValidationResult::Indeterminate,
            Self::Invalid => ValidationResult::Invalid,
        }
    }
}

/// Overall outcome of a [`ValidationReport`].
///
/// Variants are ordered from best to worst, so combining results is `max`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationResult {
    /// Every check passed.
    Valid,

    /// At least one check was inconclusive and none failed.
    Indeterminate,

    /// At least one check failed.
    Invalid,
}

impl Display for ValidationResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => write!(f, "VALID"),
            Self::Indeterminate => write!(f, "INDETERMINATE"),
            Self::Invalid => write!(f, "INVALID"),
        }
    }
}

/// A single finding produced by a validator.
///
/// Use the [`report_item`](crate::report_item) macro to create a
/// `ReportItem`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ReportItem {
    /// Name of the check that produced this item.
    pub check_name: Cow<'static, str>,

    /// Human-readable description of the finding.
    pub message: Cow<'static, str>,

    /// Underlying error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<Cow<'static, str>>,

    /// Subject of the certificate this item concerns, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<Cow<'static, str>>,

    /// Status of the finding.
    pub status: ReportItemStatus,

    /// Source file where the item was produced.
    #[serde(skip)]
    pub file: Cow<'static, str>,

    /// Source line number where the item was produced.
    #[serde(skip)]
    pub line: u32,
}

impl ReportItem {
    /// Create a new informational `ReportItem`.
    pub fn new<S1, S2, S3>(check_name: S1, message: S2, file: S3, line: u32) -> Self
    where
        S1: Into<Cow<'static, str>>,
        S2: Into<Cow<'static, str>>,
        S3: Into<Cow<'static, str>>,
    {
        ReportItem {
            check_name: check_name.into(),
            message: message.into(),
            cause: None,
            certificate: None,
            status: ReportItemStatus::Info,
            file: file.into(),
            line,
        }
    }

    /// Captures the [`Display`] form of an error as the cause of this item.
    ///
    /// ## Example
    ///
    /// ```
    /// # use std::borrow::Cow;
    /// # use pdf_sigval_report::report_item;
    /// let item = report_item!("OCSP response check.", "OCSP response is stale.")
    ///     .with_cause("thisUpdate is too old");
    ///
    /// assert_eq!(item.cause, Some(Cow::Borrowed("thisUpdate is too old")));
    /// ```
    pub fn with_cause<E: Display>(self, err: E) -> Self {
        ReportItem {
            cause: Some(err.to_string().into()),
            ..self
        }
    }

    /// Records which certificate this item is about.
    pub fn with_certificate<S: Into<Cow<'static, str>>>(self, subject: S) -> Self {
        ReportItem {
            certificate: Some(subject.into()),
            ..self
        }
    }

    /// Replaces the status of this item.
    pub fn with_status(self, status: ReportItemStatus) -> Self {
        ReportItem { status, ..self }
    }

    /// Adds this item to `report` as an informational item.
    pub fn info(self, report: &mut ValidationReport) {
        report.add(self.with_status(ReportItemStatus::Info));
    }

    /// Adds this item to `report` as an inconclusive finding.
    pub fn indeterminate(self, report: &mut ValidationReport) {
        report.add(self.with_status(ReportItemStatus::Indeterminate));
    }

    /// Adds this item to `report` as a failed check.
    pub fn invalid(self, report: &mut ValidationReport) {
        report.add(self.with_status(ReportItemStatus::Invalid));
    }
}

impl Display for ReportItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let status = match self.status {
            ReportItemStatus::Info => "INFO",
            ReportItemStatus::Indeterminate => "INDETERMINATE",
            ReportItemStatus::Invalid => "INVALID",
        };

        write!(f, "{status} {}: {}", self.check_name, self.message)?;

        if let Some(certificate) = &self.certificate {
            write!(f, " [{certificate}]")?;
        }

        if let Some(cause) = &self.cause {
            write!(f, " ({cause})")?;
        }

        Ok(())
    }
}

/// Creates a [`ReportItem`] struct that is annotated with the source file and
/// line number where the finding was produced.
///
/// Takes two parameters, each of which may be a `'static str` or `String`:
///
/// * `check_name`: name of the check producing this item
/// * `message`: human-readable description of the finding
///
/// ## Example
///
/// ```
/// # use std::borrow::Cow;
/// # use pdf_sigval_report::{report_item, ReportItem, ReportItemStatus};
/// let item = report_item!("Certificate check.", "Certificate is trusted.");
///
/// assert_eq!(
///     item,
///     ReportItem {
///         check_name: Cow::Borrowed("Certificate check."),
///         message: Cow::Borrowed("Certificate is trusted."),
///         cause: None,
///         certificate: None,
///         status: ReportItemStatus::Info,
///         file: Cow::Borrowed(file!()),
///         line: item.line,
///     }
/// );
/// ```
#[macro_export]
macro_rules! report_item {
    ($check_name:expr, $message:expr) => {{
        $crate::ReportItem::new($check_name, $message, file!(), line!())
    }};
}
