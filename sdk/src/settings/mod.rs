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

//! Settings for configuring validation.
//!
//! Settings are loaded once from TOML or JSON with the `config` crate and are
//! read-only afterwards. A [`ValidatorChain`](crate::ValidatorChain) holds
//! them behind an `Arc` for the duration of a validation run.

use std::{collections::HashMap, time::Duration};

use config::{Config, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::CertificateSource;

const VERSION: u32 = 1;

/// Describes errors that can occur when loading or validating settings.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("unsupported settings format: {0}")]
    UnsupportedFormat(String),

    #[error("could not parse configuration: {0}")]
    Parse(String),

    #[error("settings version {0} is newer than supported")]
    VersionTooNew(u32),

    #[error("invalid setting `{name}`: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

// trait used to validate user input to make sure user supplied configurations are valid
pub(crate) trait SettingsValidate {
    // returns error if settings are invalid
    fn validate(&self) -> Result<(), SettingsError> {
        Ok(())
    }
}

/// When the engine may go to the network for revocation data.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OnlineFetching {
    /// Always query online OCSP responders and CRL distribution points in
    /// addition to the evidence already collected.
    AlwaysFetch,

    /// Only go online when no other evidence produced a conclusive answer.
    #[default]
    FetchIfNoOtherDataAvailable,

    /// Never go online.
    NeverFetch,
}

/// Settings that control how failures are handled.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Verify {
    /// Whether checks on a certificate continue after the first failed
    /// check.
    ///
    /// The default value is true.
    pub continue_after_failure: bool,

    /// Overrides of `continue_after_failure` for certificates playing a given
    /// role, keyed by the snake case role name (`signer`, `ocsp_issuer`, ...).
    pub continue_after_failure_for: HashMap<String, bool>,
}

impl Default for Verify {
    fn default() -> Self {
        Self {
            continue_after_failure: true,
            continue_after_failure_for: HashMap::new(),
        }
    }
}

impl SettingsValidate for Verify {}

/// Settings for revocation evidence.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Revocation {
    pub online_fetching: OnlineFetching,

    /// Maximum age, in seconds, of an OCSP response or CRL relative to the
    /// validation date when validating at the present time.
    ///
    /// The default is 30 days.
    pub freshness_present_secs: u64,

    /// Maximum age, in seconds, of revocation evidence relative to a date
    /// proven by a timestamp.
    ///
    /// The default is 60 seconds.
    pub freshness_historical_secs: u64,

    /// Timeout applied to each network request, in milliseconds.
    pub network_timeout_ms: u64,

    /// Largest response body accepted from the network, in bytes.
    pub max_response_size: u64,
}

impl Default for Revocation {
    fn default() -> Self {
        Self {
            online_fetching: OnlineFetching::default(),
            freshness_present_secs: 30 * 24 * 60 * 60,
            freshness_historical_secs: 60,
            network_timeout_ms: 5000,
            max_response_size: 10 * 1024 * 1024,
        }
    }
}

impl SettingsValidate for Revocation {
    fn validate(&self) -> Result<(), SettingsError> {
        if self.network_timeout_ms == 0 {
            return Err(SettingsError::InvalidValue {
                name: "revocation.network_timeout_ms",
                reason: "must be greater than zero".into(),
            });
        }
        if self.max_response_size == 0 {
            return Err(SettingsError::InvalidValue {
                name: "revocation.max_response_size",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

/// Bounds placed on untrusted input.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Limits {
    /// Deepest issuer chain that will be walked.
    pub max_chain_depth: usize,

    /// Largest number of document revisions that will be examined.
    pub max_revisions: usize,

    /// Largest number of issuer candidates tried for one certificate.
    pub max_issuer_candidates: usize,

    /// Largest number of revocation responses tried for one certificate.
    pub max_revocation_responses: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_chain_depth: 16,
            max_revisions: 1024,
            max_issuer_candidates: 8,
            max_revocation_responses: 64,
        }
    }
}

impl SettingsValidate for Limits {
    fn validate(&self) -> Result<(), SettingsError> {
        let limits = [
            ("limits.max_chain_depth", self.max_chain_depth),
            ("limits.max_revisions", self.max_revisions),
            ("limits.max_issuer_candidates", self.max_issuer_candidates),
            ("limits.max_revocation_responses", self.max_revocation_responses),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(SettingsError::InvalidValue {
                    name,
                    reason: "must be greater than zero".into(),
                });
            }
        }
        Ok(())
    }
}

/// Trusted certificates as PEM bundles, one per trust scope.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Trust {
    /// Certificates trusted for every purpose.
    pub generally_trusted: Option<String>,

    /// Certificates trusted only as certificate issuers.
    pub ca_trusted: Option<String>,

    /// Certificates trusted only to sign OCSP responses.
    pub ocsp_trusted: Option<String>,

    /// Certificates trusted only to sign CRLs.
    pub crl_trusted: Option<String>,

    /// Certificates trusted only to sign timestamps.
    pub timestamp_trusted: Option<String>,
}

impl Trust {
    fn bundles(&self) -> [(&'static str, Option<&String>); 5] {
        [
            ("trust.generally_trusted", self.generally_trusted.as_ref()),
            ("trust.ca_trusted", self.ca_trusted.as_ref()),
            ("trust.ocsp_trusted", self.ocsp_trusted.as_ref()),
            ("trust.crl_trusted", self.crl_trusted.as_ref()),
            ("trust.timestamp_trusted", self.timestamp_trusted.as_ref()),
        ]
    }
}

impl SettingsValidate for Trust {
    fn validate(&self) -> Result<(), SettingsError> {
        for (name, bundle) in self.bundles() {
            if let Some(bundle) = bundle {
                crate::Certificate::from_pem_bundle(bundle.as_bytes()).map_err(|e| {
                    SettingsError::InvalidValue {
                        name,
                        reason: e.to_string(),
                    }
                })?;
            }
        }
        Ok(())
    }
}

/// Top-level settings.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Settings {
    pub version: u32,
    pub verify: Verify,
    pub revocation: Revocation,
    pub limits: Limits,
    pub trust: Trust,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: VERSION,
            verify: Verify::default(),
            revocation: Revocation::default(),
            limits: Limits::default(),
            trust: Trust::default(),
        }
    }
}

impl SettingsValidate for Settings {
    fn validate(&self) -> Result<(), SettingsError> {
        if self.version > VERSION {
            return Err(SettingsError::VersionTooNew(self.version));
        }
        self.verify.validate()?;
        self.revocation.validate()?;
        self.limits.validate()?;
        self.trust.validate()
    }
}

fn file_format(format: &str) -> Result<FileFormat, SettingsError> {
    match format.to_lowercase().as_str() {
        "json" => Ok(FileFormat::Json),
        "toml" => Ok(FileFormat::Toml),
        _ => Err(SettingsError::UnsupportedFormat(format.to_owned())),
    }
}

impl Settings {
    /// Load settings from a TOML string. Unspecified values keep their
    /// defaults.
    pub fn from_toml(toml: &str) -> crate::Result<Self> {
        Self::from_string(toml, "toml")
    }

    /// Load settings from a JSON string. Unspecified values keep their
    /// defaults.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Self::from_string(json, "json")
    }

    /// Load settings from a string in the given format (`json` or `toml`).
    pub fn from_string(settings_str: &str, format: &str) -> crate::Result<Self> {
        let mut settings = Settings::default();
        settings.update_from_str(settings_str, format)?;
        Ok(settings)
    }

    /// Overlay the provided configuration on top of these settings.
    ///
    /// The settings are left unchanged if the result does not validate.
    ///
    /// # Example
    /// ```
    /// use pdf_sigval::settings::{OnlineFetching, Settings};
    ///
    /// let mut settings = Settings::default();
    /// settings
    ///     .update_from_str(
    ///         r#"
    ///     [revocation]
    ///     online_fetching = "never_fetch"
    /// "#,
    ///         "toml",
    ///     )
    ///     .unwrap();
    ///
    /// assert_eq!(settings.revocation.online_fetching, OnlineFetching::NeverFetch);
    /// ```
    pub fn update_from_str(&mut self, settings_str: &str, format: &str) -> crate::Result<()> {
        let format = file_format(format)?;

        let current_config =
            Config::try_from(&*self).map_err(|e| SettingsError::Parse(e.to_string()))?;

        // merge overrides, allows for partial changes
        let merged_config = Config::builder()
            .add_source(current_config)
            .add_source(config::File::from_str(settings_str, format))
            .build()
            .map_err(|e| SettingsError::Parse(e.to_string()))?;

        let updated = merged_config
            .try_deserialize::<Settings>()
            .map_err(|e| SettingsError::Parse(e.to_string()))?;

        updated.validate()?;

        *self = updated;
        Ok(())
    }

    /// Check that every value is within range.
    pub fn validate(&self) -> crate::Result<()> {
        Ok(SettingsValidate::validate(self)?)
    }

    /// Whether checks on a certificate playing `source` continue after the
    /// first failed check.
    pub fn continue_after_failure(&self, source: CertificateSource) -> bool {
        self.verify
            .continue_after_failure_for
            .get(source.as_str())
            .copied()
            .unwrap_or(self.verify.continue_after_failure)
    }

    /// Maximum age of revocation evidence in the given time context.
    pub fn freshness(&self, time: crate::context::TimeBasedContext) -> Duration {
        match time {
            crate::context::TimeBasedContext::Present => {
                Duration::from_secs(self.revocation.freshness_present_secs)
            }
            crate::context::TimeBasedContext::Historical => {
                Duration::from_secs(self.revocation.freshness_historical_secs)
            }
        }
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_millis(self.revocation.network_timeout_ms)
    }
}
