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

use std::{io::Read, time::Duration};

use crate::http::{ResourceRetriever, RetrieverError};

/// [`ResourceRetriever`] backed by a blocking `ureq` agent.
pub struct UreqRetriever {
    agent: ureq::Agent,
    max_response_size: u64,
}

impl UreqRetriever {
    /// Create a retriever whose requests time out after `timeout` and whose
    /// responses are capped at `max_response_size` bytes.
    pub fn new(timeout: Duration, max_response_size: u64) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .build();

        Self {
            agent,
            max_response_size,
        }
    }

    /// Create a retriever configured from `settings`.
    pub fn from_settings(settings: &crate::Settings) -> Self {
        Self::new(
            settings.network_timeout(),
            settings.revocation.max_response_size,
        )
    }

    fn read_body(&self, url: &str, response: ureq::Response) -> Result<Vec<u8>, RetrieverError> {
        if response.status() != 200 {
            return Err(RetrieverError::HttpStatus {
                url: url.to_owned(),
                status: response.status(),
            });
        }

        let len = response
            .header("Content-Length")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(10000);

        if len > self.max_response_size {
            return Err(RetrieverError::TooLarge(url.to_owned()));
        }

        let mut body: Vec<u8> = Vec::with_capacity(len as usize);

        // one extra byte tells an oversized body apart from one that fits
        response
            .into_reader()
            .take(self.max_response_size + 1)
            .read_to_end(&mut body)?;

        if body.len() as u64 > self.max_response_size {
            return Err(RetrieverError::TooLarge(url.to_owned()));
        }

        Ok(body)
    }
}

fn transport_error(url: &str, err: ureq::Error) -> RetrieverError {
    match err {
        ureq::Error::Status(status, _) => RetrieverError::HttpStatus {
            url: url.to_owned(),
            status,
        },
        ureq::Error::Transport(transport) => RetrieverError::Transport {
            url: url.to_owned(),
            reason: transport.to_string(),
        },
    }
}

impl ResourceRetriever for UreqRetriever {
    fn get(&self, url: &str) -> Result<Vec<u8>, RetrieverError> {
        let parsed = url::Url::parse(url).map_err(|_| RetrieverError::InvalidUrl(url.to_owned()))?;

        let response = self
            .agent
            .request_url("GET", &parsed)
            .call()
            .map_err(|e| transport_error(url, e))?;

        self.read_body(url, response)
    }

    fn post(&self, url: &str, content_type: &str, body: &[u8]) -> Result<Vec<u8>, RetrieverError> {
        let parsed = url::Url::parse(url).map_err(|_| RetrieverError::InvalidUrl(url.to_owned()))?;

        let response = self
            .agent
            .request_url("POST", &parsed)
            .set("Content-Type", content_type)
            .send_bytes(body)
            .map_err(|e| transport_error(url, e))?;

        self.read_body(url, response)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn rejects_invalid_url() {
        let retriever = UreqRetriever::new(Duration::from_millis(10), 1024);

        assert!(matches!(
            retriever.get("not a url"),
            Err(RetrieverError::InvalidUrl(_))
        ));
        assert!(matches!(
            retriever.post("::", "application/ocsp-request", b""),
            Err(RetrieverError::InvalidUrl(_))
        ));
    }
}
