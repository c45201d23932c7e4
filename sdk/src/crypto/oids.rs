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

//! Object identifiers in dotted-decimal form.

#![allow(dead_code)]

pub(crate) const SHA1: &str = "1.3.14.3.2.26";
pub(crate) const SHA256: &str = "2.16.840.1.101.3.4.2.1";
pub(crate) const SHA384: &str = "2.16.840.1.101.3.4.2.2";
pub(crate) const SHA512: &str = "2.16.840.1.101.3.4.2.3";

pub(crate) const SHA1_WITH_RSAENCRYPTION: &str = "1.2.840.113549.1.1.5";
pub(crate) const SHA256_WITH_RSAENCRYPTION: &str = "1.2.840.113549.1.1.11";
pub(crate) const SHA384_WITH_RSAENCRYPTION: &str = "1.2.840.113549.1.1.12";
pub(crate) const SHA512_WITH_RSAENCRYPTION: &str = "1.2.840.113549.1.1.13";

pub(crate) const ECDSA_WITH_SHA256: &str = "1.2.840.10045.4.3.2";
pub(crate) const ECDSA_WITH_SHA384: &str = "1.2.840.10045.4.3.3";
pub(crate) const ECDSA_WITH_SHA512: &str = "1.2.840.10045.4.3.4";

pub(crate) const ED25519: &str = "1.3.101.112";

// Certificate extensions
pub(crate) const KEY_USAGE: &str = "2.5.29.15";
pub(crate) const BASIC_CONSTRAINTS: &str = "2.5.29.19";
pub(crate) const EXTENDED_KEY_USAGE: &str = "2.5.29.37";
pub(crate) const NO_REV_AVAIL: &str = "2.5.29.56";
pub(crate) const OCSP_NOCHECK: &str = "1.3.6.1.5.5.7.48.1.5";
pub(crate) const VALIDITY_ASSURED_SHORT_TERM: &str = "0.4.0.194121.2.1";

// OCSP response extensions
pub(crate) const OCSP_ARCHIVE_CUTOFF: &str = "1.3.6.1.5.5.7.48.1.6";

// Extended key usages
pub(crate) const EKU_ANY: &str = "2.5.29.37.0";
pub(crate) const EKU_SERVER_AUTH: &str = "1.3.6.1.5.5.7.3.1";
pub(crate) const EKU_CLIENT_AUTH: &str = "1.3.6.1.5.5.7.3.2";
pub(crate) const EKU_CODE_SIGNING: &str = "1.3.6.1.5.5.7.3.3";
pub(crate) const EKU_EMAIL_PROTECTION: &str = "1.3.6.1.5.5.7.3.4";
pub(crate) const EKU_TIME_STAMPING: &str = "1.3.6.1.5.5.7.3.8";
pub(crate) const EKU_OCSP_SIGNING: &str = "1.3.6.1.5.5.7.3.9";
