/*
 *   Copyright (c) 2026 The quotecore Authors
 *   All rights reserved.
 *
 *   Licensed under the Apache License, Version 2.0 (the "License");
 *   you may not use this file except in compliance with the License.
 *   You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 *   Unless required by applicable law or agreed to in writing, software
 *   distributed under the License is distributed on an "AS IS" BASIS,
 *   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *   See the License for the specific language governing permissions and
 *   limitations under the License.
 */

//! Fetching a URL's body, and decoding a quote response out of it.

use std::collections::HashMap;

use crate::{config::Config, error::AppError};

/// Fetches the bytes at a URL. The production implementation is
/// [`HttpTransport`]; tests substitute a canned response instead of going to
/// the network (see [`crate::ticker::TestBehavior`]).
pub trait Transport: Send + Sync {
    fn fetch(&self, url: &str) -> Result<String, AppError>;
}

/// Turns a raw response body into a flat string map. The only two keys a
/// caller relies on today are `response` (the last trade price) and
/// `companyname`.
pub trait ResponseDecoder: Send + Sync {
    fn decode(&self, response: &str) -> Result<HashMap<String, String>, AppError>;
}

/// A `reqwest::blocking`-backed [`Transport`]. Built once per [`Config`] and
/// shared across every fetch the registry issues.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .build()
            .map_err(|e| AppError::abort(e.to_string()))?;
        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.client
            .get(url)
            .send()
            .and_then(|response| response.text())
            .map_err(|e| AppError::abort(e.to_string()))
    }
}

/// Decodes the Yahoo-style quote JSON used by the stock endpoint:
/// `{"query":{"results":{"quote":{"LastTradePriceOnly": "...", "Name": "..."}}}}`.
pub struct YahooQuoteDecoder;

impl ResponseDecoder for YahooQuoteDecoder {
    fn decode(&self, response: &str) -> Result<HashMap<String, String>, AppError> {
        let value: serde_json::Value =
            serde_json::from_str(response).map_err(|e| AppError::abort(e.to_string()))?;

        let quote = value
            .pointer("/query/results/quote")
            .ok_or_else(|| AppError::abort("No stock result found in response"))?;

        let price = quote
            .get("LastTradePriceOnly")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::abort("No stock result found in response"))?;

        let mut out = HashMap::new();
        out.insert("response".to_string(), price.to_string());

        if let Some(name) = quote.get("Name").and_then(|v| v.as_str()) {
            out.insert("companyname".to_string(), name.to_string());
        }

        Ok(out)
    }
}
