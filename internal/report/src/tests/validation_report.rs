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

use crate::{report_item, ReportItemStatus, ValidationReport, ValidationResult};

const ALL_STATUSES: [ReportItemStatus; 3] = [
    ReportItemStatus::Info,
    ReportItemStatus::Indeterminate,
    ReportItemStatus::Invalid,
];

fn report_with(statuses: &[ReportItemStatus]) -> ValidationReport {
    statuses
        .iter()
        .map(|status| report_item!("check", "message").with_status(*status))
        .collect()
}

#[test]
fn empty_report_is_valid() {
    let report = ValidationReport::new();
    assert!(report.is_empty());
    assert_eq!(report.validation_result(), ValidationResult::Valid);
}

#[test]
fn worst_status_wins() {
    let report = report_with(&[
        ReportItemStatus::Info,
        ReportItemStatus::Invalid,
        ReportItemStatus::Indeterminate,
    ]);
    assert_eq!(report.validation_result(), ValidationResult::Invalid);

    let report = report_with(&[ReportItemStatus::Info, ReportItemStatus::Indeterminate]);
    assert_eq!(report.validation_result(), ValidationResult::Indeterminate);

    let report = report_with(&[ReportItemStatus::Info, ReportItemStatus::Info]);
    assert_eq!(report.validation_result(), ValidationResult::Valid);
}

#[test]
fn merge_is_max_of_results() {
    for a in ALL_STATUSES {
        for b in ALL_STATUSES {
            let left = report_with(&[a]);
            let right = report_with(&[b]);

            let mut ab = left.clone();
            ab.merge(&right);

            let mut ba = right.clone();
            ba.merge(&left);

            assert_eq!(ab.validation_result(), a.result().max(b.result()));
            assert_eq!(ab.validation_result(), ba.validation_result());
        }
    }
}

#[test]
fn merge_is_associative() {
    for a in ALL_STATUSES {
        for b in ALL_STATUSES {
            for c in ALL_STATUSES {
                let (ra, rb, rc) = (report_with(&[a]), report_with(&[b]), report_with(&[c]));

                let mut left = ra.clone();
                left.merge(&rb);
                left.merge(&rc);

                let mut bc = rb.clone();
                bc.merge(&rc);
                let mut right = ra.clone();
                right.merge(&bc);

                assert_eq!(left, right);
            }
        }
    }
}

#[test]
fn merge_preserves_order() {
    let mut report = ValidationReport::new();
    report_item!("check", "first").info(&mut report);

    let mut other = ValidationReport::new();
    report_item!("check", "second").info(&mut other);
    report_item!("check", "third").info(&mut other);

    report.merge(&other);

    let messages: Vec<&str> = report.items().iter().map(|i| i.message.as_ref()).collect();
    assert_eq!(messages, vec!["first", "second", "third"]);
}

#[test]
fn merge_with_downgrade() {
    let other = report_with(&[ReportItemStatus::Invalid, ReportItemStatus::Info]);

    let mut report = ValidationReport::new();
    report.merge_with_downgrade(&other);

    assert_eq!(report.validation_result(), ValidationResult::Indeterminate);
    assert_eq!(report.items()[0].status, ReportItemStatus::Indeterminate);
    assert_eq!(report.items()[1].status, ReportItemStatus::Info);
}

#[test]
fn merge_with_mapping() {
    let other = report_with(&[ReportItemStatus::Indeterminate]);

    let mut report = ValidationReport::new();
    report.merge_with(&other, |item| item.with_status(ReportItemStatus::Info));

    assert_eq!(report.validation_result(), ValidationResult::Valid);
}

#[test]
fn failures_and_lookup() {
    let mut report = ValidationReport::new();
    report_item!("a", "ok").info(&mut report);
    report_item!("b", "bad").invalid(&mut report);

    assert_eq!(report.failures().count(), 1);
    assert!(report.has_item("b", "bad"));
    assert!(!report.has_item("a", "bad"));
    assert_eq!(report.items_for_check("a").count(), 1);
}

#[test]
fn display() {
    let mut report = ValidationReport::new();
    report_item!("check", "failed").invalid(&mut report);

    assert_eq!(
        report.to_string(),
        "Validation result: INVALID\n  INVALID check: failed\n"
    );
}
