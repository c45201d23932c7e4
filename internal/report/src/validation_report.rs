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

use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use crate::{ReportItem, ReportItemStatus, ValidationResult};

/// Ordered, append-only collection of [`ReportItem`]s.
///
/// The overall result of a report is the worst status among its items.
/// An empty report is [`ValidationResult::Valid`].
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ValidationReport {
    items: Vec<ReportItem>,
}

impl ValidationReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item.
    pub fn add(&mut self, item: ReportItem) {
        self.items.push(item);
    }

    /// Return the items in the order they were added.
    pub fn items(&self) -> &[ReportItem] {
        &self.items
    }

    /// Consume the report, returning its items.
    pub fn into_items(self) -> Vec<ReportItem> {
        self.items
    }

    /// Return `true` if no items were added.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Return the worst status among all items.
    pub fn validation_result(&self) -> ValidationResult {
        self.items
            .iter()
            .map(|item| item.status.result())
            .max()
            .unwrap_or(ValidationResult::Valid)
    }

    /// Iterate over items that are not informational.
    pub fn failures(&self) -> impl Iterator<Item = &ReportItem> {
        self.items
            .iter()
            .filter(|item| item.status != ReportItemStatus::Info)
    }

    /// Return `true` if an item with the given check name and message exists.
    pub fn has_item(&self, check_name: &str, message: &str) -> bool {
        self.items
            .iter()
            .any(|item| item.check_name == check_name && item.message == message)
    }

    /// Return the items produced by the named check.
    pub fn items_for_check<'a>(
        &'a self,
        check_name: &'a str,
    ) -> impl Iterator<Item = &'a ReportItem> + 'a {
        self.items
            .iter()
            .filter(move |item| item.check_name == check_name)
    }

    /// Append every item of `other`, unchanged.
    pub fn merge(&mut self, other: &ValidationReport) {
        self.items.extend(other.items.iter().cloned());
    }

    /// Append every item of `other`, rewriting [`ReportItemStatus::Invalid`]
    /// to [`ReportItemStatus::Indeterminate`].
    ///
    /// Used when the merged report comes from an advisory check whose failure
    /// makes the parent inconclusive rather than invalid.
    pub fn merge_with_downgrade(&mut self, other: &ValidationReport) {
        self.merge_with(other, |item| match item.status {
            ReportItemStatus::Invalid => item.with_status(ReportItemStatus::Indeterminate),
            _ => item,
        });
    }

    /// Append every item of `other` after passing it through `f`.
    pub fn merge_with<F>(&mut self, other: &ValidationReport, f: F)
    where
        F: FnMut(ReportItem) -> ReportItem,
    {
        self.items.extend(other.items.iter().cloned().map(f));
    }
}

impl Extend<ReportItem> for ValidationReport {
    fn extend<T: IntoIterator<Item = ReportItem>>(&mut self, iter: T) {
        self.items.extend(iter);
    }
}

impl FromIterator<ReportItem> for ValidationReport {
    fn from_iter<T: IntoIterator<Item = ReportItem>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Validation result: {}", self.validation_result())?;

        for item in &self.items {
            writeln!(f, "  {item}")?;
        }

        Ok(())
    }
}
