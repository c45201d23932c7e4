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
use x509_parser::{
    der_parser::{oid, Oid},
    extensions::{DistributionPointName, GeneralName, ParsedExtension},
    pem::Pem,
    prelude::*,
    time::ASN1Time,
};

use crate::{
    certificate::{trim_serial, BasicConstraints, Certificate, CertificateError, Name},
    crypto::{hash::sha256, oids},
};

const AD_OCSP_OID: Oid<'static> = oid!(1.3.6 .1 .5 .5 .7 .48 .1);
const AD_CA_ISSUERS_OID: Oid<'static> = oid!(1.3.6 .1 .5 .5 .7 .48 .2);

pub(crate) fn to_utc(time: ASN1Time) -> Result<DateTime<Utc>, CertificateError> {
    DateTime::from_timestamp(time.timestamp(), 0).ok_or(CertificateError::InvalidTime)
}

pub(super) fn certificate_from_der(der: &[u8]) -> Result<Certificate, CertificateError> {
    let (_rem, cert) =
        X509Certificate::from_der(der).map_err(|e| CertificateError::Parse(e.to_string()))?;

    let subject = Name::new(cert.subject().as_raw().to_vec(), cert.subject().to_string());
    let issuer = Name::new(cert.issuer().as_raw().to_vec(), cert.issuer().to_string());

    let key_usage = cert
        .key_usage()
        .map_err(|e| CertificateError::Parse(e.to_string()))?
        .map(|ku| ku.value.flags);

    let basic_constraints = cert
        .basic_constraints()
        .map_err(|e| CertificateError::Parse(e.to_string()))?
        .map(|bc| BasicConstraints {
            ca: bc.value.ca,
            path_len: bc.value.path_len_constraint,
        });

    let extended_key_usage = cert
        .extended_key_usage()
        .map_err(|e| CertificateError::Parse(e.to_string()))?
        .map(|eku| {
            let eku = eku.value;
            let mut usages = Vec::new();
            let known = [
                (eku.any, oids::EKU_ANY),
                (eku.server_auth, oids::EKU_SERVER_AUTH),
                (eku.client_auth, oids::EKU_CLIENT_AUTH),
                (eku.code_signing, oids::EKU_CODE_SIGNING),
                (eku.email_protection, oids::EKU_EMAIL_PROTECTION),
                (eku.time_stamping, oids::EKU_TIME_STAMPING),
                (eku.ocsp_signing, oids::EKU_OCSP_SIGNING),
            ];
            for (present, oid) in known {
                if present {
                    usages.push(oid.to_owned());
                }
            }
            usages.extend(eku.other.iter().map(|oid| oid.to_id_string()));
            usages
        });

    let mut extension_oids = BTreeSet::new();
    let mut ocsp_urls = Vec::new();
    let mut ca_issuer_urls = Vec::new();
    let mut crl_urls = Vec::new();

    for ext in cert.extensions() {
        extension_oids.insert(ext.oid.to_id_string());

        match ext.parsed_extension() {
            ParsedExtension::AuthorityInfoAccess(aia) => {
                for ad in &aia.accessdescs {
                    if let GeneralName::URI(uri) = ad.access_location {
                        if ad.access_method == AD_OCSP_OID {
                            ocsp_urls.push(uri.to_string());
                        } else if ad.access_method == AD_CA_ISSUERS_OID {
                            ca_issuer_urls.push(uri.to_string());
                        }
                    }
                }
            }
            ParsedExtension::CRLDistributionPoints(points) => {
                for point in &points.points {
                    if let Some(DistributionPointName::FullName(names)) = &point.distribution_point
                    {
                        for name in names {
                            if let GeneralName::URI(uri) = name {
                                crl_urls.push(uri.to_string());
                            }
                        }
                    }
                }
            }
            _ => (),
        }
    }

    Ok(Certificate {
        der: der.to_vec(),
        fingerprint: sha256(der),
        subject,
        issuer,
        serial: trim_serial(cert.raw_serial()),
        not_before: to_utc(cert.validity().not_before)?,
        not_after: to_utc(cert.validity().not_after)?,
        key_usage,
        basic_constraints,
        extended_key_usage,
        extension_oids,
        ocsp_urls,
        ca_issuer_urls,
        crl_urls,
        spki: cert.public_key().raw.to_vec(),
        public_key: cert.public_key().subject_public_key.data.to_vec(),
        tbs: cert.tbs_certificate.as_ref().to_vec(),
        signature_algorithm: cert.signature_algorithm.algorithm.to_id_string(),
        signature: cert.signature_value.data.to_vec(),
    })
}

pub(super) fn certificates_from_pem(pem: &[u8]) -> Result<Vec<Certificate>, CertificateError> {
    let mut certs = Vec::new();

    for maybe_pem in Pem::iter_from_buffer(pem) {
        // NOTE: `contents` holds the decoded DER bytes.
        let pem = maybe_pem.map_err(|e| CertificateError::Pem(e.to_string()))?;
        if pem.label == "CERTIFICATE" {
            certs.push(certificate_from_der(&pem.contents)?);
        }
    }

    Ok(certs)
}
