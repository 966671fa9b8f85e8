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

//! Runtime configuration for the registry's HTTP transport, with env var
//! overrides layered on top of built-in defaults.

use std::time::Duration;

/// The quote endpoint's URL template. `{STOCK}` is substituted with the
/// ticker symbol before the request is sent.
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://query.yahooapis.com/v1/public/yql?q=select%20Name,LastTradePriceOnly%20from%20yahoo.finance.quotes%20where%20symbol%20%3D%22{STOCK}%22&format=json&env=store%3A%2F%2Fdatatables.org%2Falltableswithkeys&callback=";

const DEFAULT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_USER_AGENT: &str = "quotecore/0.1";

/// - `STOCKLIB_URL_TEMPLATE` overrides [`Config::url_template`]
/// - `STOCKLIB_TIMEOUT_MS` overrides both [`Config::connect_timeout`] and
///   [`Config::read_timeout`]
/// - `STOCKLIB_USER_AGENT` overrides [`Config::user_agent`]
#[derive(Debug, Clone)]
pub struct Config {
    pub url_template: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            connect_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            read_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Config {
    /// Starts from [`Config::default`] and layers environment overrides on
    /// top. An unparsable `STOCKLIB_TIMEOUT_MS` is ignored, leaving the
    /// default in place, rather than failing startup over a malformed
    /// environment.
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(template) = std::env::var("STOCKLIB_URL_TEMPLATE") {
            config.url_template = template;
        }

        if let Ok(user_agent) = std::env::var("STOCKLIB_USER_AGENT") {
            config.user_agent = user_agent;
        }

        if let Ok(timeout_ms) = std::env::var("STOCKLIB_TIMEOUT_MS") {
            if let Ok(ms) = timeout_ms.parse::<u64>() {
                config.connect_timeout = Duration::from_millis(ms);
                config.read_timeout = Duration::from_millis(ms);
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn default_config_uses_the_built_in_url_template() {
        let config = Config::default();
        assert_eq!(config.url_template, DEFAULT_URL_TEMPLATE);
    }

    #[test]
    #[serial]
    fn env_overrides_are_layered_on_top_of_defaults() {
        // SAFETY: `#[serial]` ensures no other test reads or writes these
        // process-wide environment variables concurrently.
        unsafe {
            std::env::set_var("STOCKLIB_URL_TEMPLATE", "https://example.invalid/{STOCK}");
            std::env::set_var("STOCKLIB_TIMEOUT_MS", "1500");
        }

        let config = Config::from_env();
        assert_eq!(config.url_template, "https://example.invalid/{STOCK}");
        assert_eq!(config.connect_timeout, Duration::from_millis(1500));

        unsafe {
            std::env::remove_var("STOCKLIB_URL_TEMPLATE");
            std::env::remove_var("STOCKLIB_TIMEOUT_MS");
        }
    }

    #[test]
    #[serial]
    fn malformed_timeout_is_ignored() {
        unsafe {
            std::env::set_var("STOCKLIB_TIMEOUT_MS", "not-a-number");
        }

        let config = Config::from_env();
        assert_eq!(config.connect_timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));

        unsafe {
            std::env::remove_var("STOCKLIB_TIMEOUT_MS");
        }
    }
}
