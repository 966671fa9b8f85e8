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

//! The contained problem that fetches and decodes one ticker's quote.

use std::{collections::HashMap, sync::Arc, time::Duration};

use crate::{
    problem::ContainedProblem,
    transport::{ResponseDecoder, Transport},
};

/// Controls what [`TickerProblem::do_work`] actually does, so the registry
/// can be exercised without a network. `None` means "really fetch"; the
/// other three are independent canned behaviors and never fall through to
/// each other or to a real request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TestBehavior {
    #[default]
    None,
    NormalRequest,
    GibberishRequest,
    HangingRequest,
}

const FAKE_RESPONSE: &str = r#"{"query":{"count":1,"created":"2015-03-09T21:03:53Z","lang":"en-US","results":{"quote":{"LastTradePriceOnly":"99.99","Name":"Test Inc."}}}}"#;

const NOTFOUND_RESPONSE: &str =
    r#"{"query":{"count":0,"created":"2015-03-06T11:53:00Z","lang":"en-US","results":null}}"#;

pub struct TickerProblem {
    ticker: String,
    behavior: TestBehavior,
    url_template: String,
    transport: Arc<dyn Transport>,
    decoder: Arc<dyn ResponseDecoder>,
}

impl TickerProblem {
    pub fn new(
        ticker: impl Into<String>,
        behavior: TestBehavior,
        url_template: impl Into<String>,
        transport: Arc<dyn Transport>,
        decoder: Arc<dyn ResponseDecoder>,
    ) -> Self {
        TickerProblem {
            ticker: ticker.into(),
            behavior,
            url_template: url_template.into(),
            transport,
            decoder,
        }
    }

    fn preprocess_url(&self) -> String { self.url_template.replacen("{STOCK}", &self.ticker, 1) }
}

impl ContainedProblem<(), HashMap<String, String>> for TickerProblem {
    fn do_work(&self, _input: &()) -> Result<HashMap<String, String>, String> {
        let response = match self.behavior {
            TestBehavior::NormalRequest => FAKE_RESPONSE.to_string(),
            TestBehavior::GibberishRequest => NOTFOUND_RESPONSE.to_string(),
            TestBehavior::HangingRequest => loop {
                std::thread::sleep(Duration::from_secs(3600));
            },
            TestBehavior::None => self.transport.fetch(&self.preprocess_url()).map_err(|e| e.to_string())?,
        };

        self.decoder.decode(&response).map_err(|e| e.to_string())
    }
}
