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

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::{
    certificate::{trim_serial, BasicConstraints, Certificate, Name},
    crypto::{hash::sha256, oids},
};

/// Builds a [`Certificate`] from already-decoded parts.
///
/// Useful for callers that parse X.509 with their own library. Unset
/// encodings (TBS bytes, DER) are derived from the other fields so that
/// distinct certificates still get distinct fingerprints.
#[derive(Clone, Debug)]
pub struct CertificateBuilder {
    subject: Name,
    issuer: Option<Name>,
    serial: Vec<u8>,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    key_usage: Option<u16>,
    basic_constraints: Option<BasicConstraints>,
    extended_key_usage: Option<Vec<String>>,
    extension_oids: BTreeSet<String>,
    ocsp_urls: Vec<String>,
    ca_issuer_urls: Vec<String>,
    crl_urls: Vec<String>,
    spki: Vec<u8>,
    public_key: Vec<u8>,
    tbs: Option<Vec<u8>>,
    der: Option<Vec<u8>>,
    signature_algorithm: String,
    signature: Vec<u8>,
}

impl CertificateBuilder {
    /// Start a self-issued certificate with the given subject, valid for all
    /// representable time.
    pub fn new(subject: Name) -> Self {
        Self {
            subject,
            issuer: None,
            serial: vec![1],
            not_before: DateTime::<Utc>::MIN_UTC,
            not_after: DateTime::<Utc>::MAX_UTC,
            key_usage: None,
            basic_constraints: None,
            extended_key_usage: None,
            extension_oids: BTreeSet::new(),
            ocsp_urls: Vec::new(),
            ca_issuer_urls: Vec::new(),
            crl_urls: Vec::new(),
            spki: Vec::new(),
            public_key: Vec::new(),
            tbs: None,
            der: None,
            signature_algorithm: oids::ECDSA_WITH_SHA256.to_owned(),
            signature: Vec::new(),
        }
    }

    pub fn issuer(mut self, issuer: Name) -> Self {
        self.issuer = Some(issuer);
        self
    }

    pub fn serial(mut self, serial: &[u8]) -> Self {
        self.serial = trim_serial(serial);
        self
    }

    pub fn validity(mut self, not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Self {
        self.not_before = not_before;
        self.not_after = not_after;
        self
    }

    pub fn key_usage(mut self, bits: u16) -> Self {
        self.key_usage = Some(bits);
        self.extension_oids.insert(oids::KEY_USAGE.to_owned());
        self
    }

    pub fn basic_constraints(mut self, ca: bool, path_len: Option<u32>) -> Self {
        self.basic_constraints = Some(BasicConstraints { ca, path_len });
        self.extension_oids.insert(oids::BASIC_CONSTRAINTS.to_owned());
        self
    }

    pub fn extended_key_usage(mut self, usage: &str) -> Self {
        self.extended_key_usage
            .get_or_insert_with(Vec::new)
            .push(usage.to_owned());
        self.extension_oids.insert(oids::EXTENDED_KEY_USAGE.to_owned());
        self
    }

    /// Mark an extension as present without giving it a decoded value.
    pub fn extension(mut self, oid: &str) -> Self {
        self.extension_oids.insert(oid.to_owned());
        self
    }

    pub fn ocsp_url(mut self, url: &str) -> Self {
        self.ocsp_urls.push(url.to_owned());
        self
    }

    pub fn ca_issuer_url(mut self, url: &str) -> Self {
        self.ca_issuer_urls.push(url.to_owned());
        self
    }

    pub fn crl_url(mut self, url: &str) -> Self {
        self.crl_urls.push(url.to_owned());
        self
    }

    /// Set the subject public key info and the key bits inside it.
    pub fn public_key(mut self, spki: Vec<u8>, public_key: Vec<u8>) -> Self {
        self.spki = spki;
        self.public_key = public_key;
        self
    }

    pub fn tbs(mut self, tbs: Vec<u8>) -> Self {
        self.tbs = Some(tbs);
        self
    }

    pub fn der(mut self, der: Vec<u8>) -> Self {
        self.der = Some(der);
        self
    }

    pub fn signature(mut self, algorithm: &str, signature: Vec<u8>) -> Self {
        self.signature_algorithm = algorithm.to_owned();
        self.signature = signature;
        self
    }

    pub fn build(self) -> Certificate {
        let issuer = self.issuer.unwrap_or_else(|| self.subject.clone());

        let tbs = self.tbs.unwrap_or_else(|| {
            let mut tbs = Vec::new();
            tbs.extend_from_slice(self.subject.der());
            tbs.push(0);
            tbs.extend_from_slice(issuer.der());
            tbs.push(0);
            tbs.extend_from_slice(&self.serial);
            tbs.extend_from_slice(&self.not_before.timestamp().to_be_bytes());
            tbs.extend_from_slice(&self.not_after.timestamp().to_be_bytes());
            tbs.extend_from_slice(&self.spki);
            tbs
        });

        let der = self.der.unwrap_or_else(|| {
            let mut der = tbs.clone();
            der.extend_from_slice(&self.signature);
            der
        });

        Certificate {
            fingerprint: sha256(&der),
            der,
            subject: self.subject,
            issuer,
            serial: self.serial,
            not_before: self.not_before,
            not_after: self.not_after,
            key_usage: self.key_usage,
            basic_constraints: self.basic_constraints,
            extended_key_usage: self.extended_key_usage,
            extension_oids: self.extension_oids,
            ocsp_urls: self.ocsp_urls,
            ca_issuer_urls: self.ca_issuer_urls,
            crl_urls: self.crl_urls,
            spki: self.spki,
            public_key: self.public_key,
            tbs,
            signature_algorithm: self.signature_algorithm,
            signature: self.signature,
        }
    }
}
