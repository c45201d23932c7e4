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

use std::sync::Arc;

use base64::Engine;
use chrono::Utc;

use crate::{
    context::TimeBasedContext,
    http::{ResourceRetriever, RetrieverError},
    revocation::{
        ocsp::build_ocsp_request, BasicOcspResponse, Crl, CrlClient, CrlEvidence,
        EvidenceOrigin, OcspClient, OcspEvidence, RevocationError,
    },
    Certificate,
};

const OCSP_REQUEST_CONTENT_TYPE: &str = "application/ocsp-request";

/// Fetches OCSP responses from the responders named in a certificate's
/// authority information access extension.
pub struct OnlineOcspClient {
    retriever: Arc<dyn ResourceRetriever>,
}

impl OnlineOcspClient {
    pub fn new(retriever: Arc<dyn ResourceRetriever>) -> Self {
        Self { retriever }
    }

    fn fetch(&self, url: &str, request: &[u8]) -> Result<Vec<u8>, RevocationError> {
        match self.retriever.post(url, OCSP_REQUEST_CONTENT_TYPE, request) {
            Ok(body) => Ok(body),
            Err(post_err) => {
                // some responders only answer GET requests
                log::debug!("OCSP POST to {url} failed ({post_err}), retrying with GET");

                let get_url = ocsp_get_url(url, request)?;
                Ok(self.retriever.get(&get_url)?)
            }
        }
    }
}

/// The GET form of an OCSP request: the responder URL, a slash and the
/// URL-encoded base64 of the DER request (RFC 6960, appendix A.1).
fn ocsp_get_url(responder: &str, request: &[u8]) -> Result<String, RetrieverError> {
    url::Url::parse(responder).map_err(|_| RetrieverError::InvalidUrl(responder.to_owned()))?;

    let encoded = base64::engine::general_purpose::STANDARD.encode(request);
    let encoded: String = url::form_urlencoded::byte_serialize(encoded.as_bytes()).collect();

    Ok(format!("{}/{encoded}", responder.trim_end_matches('/')))
}

impl OcspClient for OnlineOcspClient {
    fn ocsp_responses(
        &self,
        certificate: &Certificate,
        issuer: Option<&Certificate>,
    ) -> Result<Vec<OcspEvidence>, RevocationError> {
        let Some(issuer) = issuer else {
            return Ok(Vec::new());
        };

        if certificate.ocsp_urls().is_empty() {
            return Ok(Vec::new());
        }

        let request = build_ocsp_request(certificate, issuer)?;

        let mut last_err = None;
        for url in certificate.ocsp_urls() {
            log::info!("fetching OCSP response for {} from {url}", certificate.subject());

            let result = self
                .fetch(url, &request)
                .and_then(|body| BasicOcspResponse::from_ocsp_response_der(&body));

            match result {
                Ok(response) => {
                    return Ok(vec![OcspEvidence {
                        response: Arc::new(response),
                        trusted_generation_date: Utc::now(),
                        time_context: TimeBasedContext::Present,
                        origin: EvidenceOrigin::Fetched,
                    }]);
                }
                Err(err) => {
                    log::warn!("unable to fetch OCSP response from {url}: {err}");
                    last_err = Some(err);
                }
            }
        }

        match last_err {
            Some(err) => Err(err),
            None => Ok(Vec::new()),
        }
    }
}

/// Fetches CRLs from a certificate's CRL distribution points.
pub struct OnlineCrlClient {
    retriever: Arc<dyn ResourceRetriever>,
}

impl OnlineCrlClient {
    pub fn new(retriever: Arc<dyn ResourceRetriever>) -> Self {
        Self { retriever }
    }
}

impl CrlClient for OnlineCrlClient {
    fn crls(&self, certificate: &Certificate) -> Result<Vec<CrlEvidence>, RevocationError> {
        let mut crls = Vec::new();
        let mut last_err = None;

        for url in certificate.crl_urls() {
            log::info!("fetching CRL for {} from {url}", certificate.subject());

            let result = self
                .retriever
                .get(url)
                .map_err(RevocationError::from)
                .and_then(|body| Crl::from_bytes(&body));

            match result {
                Ok(crl) => crls.push(CrlEvidence {
                    crl: Arc::new(crl),
                    trusted_generation_date: Utc::now(),
                    time_context: TimeBasedContext::Present,
                    origin: EvidenceOrigin::Fetched,
                }),
                Err(err) => {
                    log::warn!("unable to fetch CRL from {url}: {err}");
                    last_err = Some(err);
                }
            }
        }

        match (crls.is_empty(), last_err) {
            (true, Some(err)) => Err(err),
            _ => Ok(crls),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use mockall::predicate::eq;

    use super::*;
    use crate::http::MockResourceRetriever;

    const LEAF: &[u8] = include_bytes!("../../tests/fixtures/pki/leaf.der");
    const INTERMEDIATE: &[u8] = include_bytes!("../../tests/fixtures/pki/int.der");

    #[test]
    fn fetches_crl_from_distribution_point() {
        let leaf = Certificate::from_der(LEAF).unwrap();

        let mut retriever = MockResourceRetriever::new();
        retriever
            .expect_get()
            .with(eq("http://crl.example.com/int.crl"))
            .times(1)
            .returning(|_| Ok(include_bytes!("../../tests/fixtures/pki/int_revoked.crl").to_vec()));

        let client = OnlineCrlClient::new(Arc::new(retriever));
        let crls = client.crls(&leaf).unwrap();

        assert_eq!(crls.len(), 1);
        assert_eq!(crls[0].origin, EvidenceOrigin::Fetched);
        assert!(crls[0].crl.revoked_entry(leaf.serial()).is_some());
    }

    #[test]
    fn posts_ocsp_request_then_falls_back_to_get() {
        let leaf = Certificate::from_der(LEAF).unwrap();
        let intermediate = Certificate::from_der(INTERMEDIATE).unwrap();

        let mut retriever = MockResourceRetriever::new();
        retriever
            .expect_post()
            .withf(|url, content_type, _| {
                url == "http://ocsp.example.com" && content_type == OCSP_REQUEST_CONTENT_TYPE
            })
            .times(1)
            .returning(|url, _, _| {
                Err(RetrieverError::HttpStatus {
                    url: url.to_owned(),
                    status: 405,
                })
            });
        retriever
            .expect_get()
            .withf(|url| url.starts_with("http://ocsp.example.com/"))
            .times(1)
            .returning(|_| {
                Ok(include_bytes!("../../tests/fixtures/pki/ocsp_good_direct.der").to_vec())
            });

        let client = OnlineOcspClient::new(Arc::new(retriever));
        let responses = client.ocsp_responses(&leaf, Some(&intermediate)).unwrap();

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].response.responses[0].serial, leaf.serial());
    }

    #[test]
    fn get_url_keeps_the_responder_path() {
        // base64 of these bytes is "+//+"
        let request = [0xfb, 0xff, 0xfe];

        assert_eq!(
            ocsp_get_url("http://ocsp.example.com/ocsp", &request).unwrap(),
            "http://ocsp.example.com/ocsp/%2B%2F%2F%2B"
        );
        assert_eq!(
            ocsp_get_url("http://ocsp.example.com/ocsp/", &request).unwrap(),
            "http://ocsp.example.com/ocsp/%2B%2F%2F%2B"
        );
        assert!(matches!(
            ocsp_get_url("not a url", &request),
            Err(RetrieverError::InvalidUrl(_))
        ));
    }

    #[test]
    fn no_request_without_issuer() {
        let leaf = Certificate::from_der(LEAF).unwrap();

        let retriever = MockResourceRetriever::new();
        let client = OnlineOcspClient::new(Arc::new(retriever));

        assert!(client.ocsp_responses(&leaf, None).unwrap().is_empty());
    }

    #[test]
    fn reports_fetch_failure() {
        let leaf = Certificate::from_der(LEAF).unwrap();

        let mut retriever = MockResourceRetriever::new();
        retriever.expect_get().returning(|url| {
            Err(RetrieverError::Transport {
                url: url.to_owned(),
                reason: "timed out".into(),
            })
        });

        let client = OnlineCrlClient::new(Arc::new(retriever));
        assert!(matches!(
            client.crls(&leaf),
            Err(RevocationError::Fetch(RetrieverError::Transport { .. }))
        ));
    }
}
