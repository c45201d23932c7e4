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

//! Tools for working with certificate revocation lists.

use chrono::{DateTime, Utc};
use x509_parser::{pem::Pem, revocation_list::CertificateRevocationList};

use crate::{
    certificate::{trim_serial, Name},
    revocation::RevocationError,
};

/// Reason code meaning a certificate was taken off hold.
pub const REASON_REMOVE_FROM_CRL: u8 = 8;

/// One revoked certificate listed in a CRL.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RevokedEntry {
    /// Serial number as big-endian bytes without leading zeros.
    pub serial: Vec<u8>,
    pub revocation_date: DateTime<Utc>,
    pub reason: Option<u8>,
}

/// A decoded certificate revocation list.
#[derive(Clone, Debug)]
pub struct Crl {
    /// DER encoding of the CRL. Identifies the CRL.
    pub der: Vec<u8>,

    /// DER encoding of the signed `TBSCertList`.
    pub tbs: Vec<u8>,

    pub issuer: Name,
    pub this_update: DateTime<Utc>,
    pub next_update: Option<DateTime<Utc>>,
    pub revoked: Vec<RevokedEntry>,
    pub signature_algorithm: String,
    pub signature: Vec<u8>,
}

impl Crl {
    /// Decode a DER-encoded CRL.
    pub fn from_der(der: &[u8]) -> Result<Self, RevocationError> {
        let (_rem, crl) = x509_parser::parse_x509_crl(der)
            .map_err(|e| RevocationError::InvalidCrl(e.to_string()))?;

        Self::from_parsed(der, &crl)
    }

    /// Decode a CRL that is either DER or PEM encoded.
    pub fn from_bytes(data: &[u8]) -> Result<Self, RevocationError> {
        if data.starts_with(b"-----BEGIN") {
            let pem = Pem::iter_from_buffer(data)
                .next()
                .ok_or_else(|| RevocationError::InvalidCrl("empty PEM input".into()))?
                .map_err(|e| RevocationError::InvalidCrl(e.to_string()))?;
            return Self::from_der(&pem.contents);
        }

        Self::from_der(data)
    }

    fn from_parsed(der: &[u8], crl: &CertificateRevocationList) -> Result<Self, RevocationError> {
        let to_utc = |time: x509_parser::time::ASN1Time| {
            DateTime::from_timestamp(time.timestamp(), 0)
                .ok_or_else(|| RevocationError::InvalidCrl("date out of range".into()))
        };

        let mut revoked = Vec::new();
        for entry in crl.iter_revoked_certificates() {
            revoked.push(RevokedEntry {
                serial: trim_serial(entry.raw_serial()),
                revocation_date: to_utc(entry.revocation_date)?,
                reason: entry.reason_code().map(|(_critical, code)| code.0),
            });
        }

        Ok(Self {
            der: der.to_vec(),
            tbs: crl.tbs_cert_list.as_ref().to_vec(),
            issuer: Name::new(crl.issuer().as_raw().to_vec(), crl.issuer().to_string()),
            this_update: to_utc(crl.last_update())?,
            next_update: crl.next_update().map(to_utc).transpose()?,
            revoked,
            signature_algorithm: crl.signature_algorithm.algorithm.to_id_string(),
            signature: crl.signature_value.data.to_vec(),
        })
    }

    /// Return the entry for `serial`, if the CRL lists it.
    pub fn revoked_entry(&self, serial: &[u8]) -> Option<&RevokedEntry> {
        self.revoked.iter().find(|entry| entry.serial == serial)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use chrono::TimeZone;

    use super::*;
    use crate::Certificate;

    #[test]
    fn decodes_revoked_list() {
        let crl = Crl::from_der(include_bytes!("../../tests/fixtures/pki/int_revoked.crl")).unwrap();
        let intermediate =
            Certificate::from_der(include_bytes!("../../tests/fixtures/pki/int.der")).unwrap();

        assert_eq!(&crl.issuer, intermediate.subject());
        assert_eq!(
            crl.this_update,
            Utc.with_ymd_and_hms(2026, 10, 19, 1, 47, 52).unwrap()
        );
        assert_eq!(
            crl.next_update,
            Some(Utc.with_ymd_and_hms(2026, 10, 26, 1, 47, 52).unwrap())
        );

        let entry = crl.revoked_entry(&[0x20, 0x01]).unwrap();
        assert_eq!(entry.reason, Some(1));
        assert!(crl.revoked_entry(&[0x20, 0x02]).is_none());
    }

    #[test]
    fn decodes_empty_list() {
        let crl = Crl::from_bytes(include_bytes!("../../tests/fixtures/pki/int_empty.crl")).unwrap();
        assert!(crl.revoked.is_empty());
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            Crl::from_bytes(b"garbage"),
            Err(RevocationError::InvalidCrl(_))
        ));
    }
}
