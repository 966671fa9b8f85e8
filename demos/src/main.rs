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

//! Command-line demo exercising `quotecore`'s fetch and option-pricing API.
//!
//! `quote <TICKER> [--greeks]` performs a synchronous quote fetch, resolves
//! the company name through the namecache, and, with `--greeks`, prints a
//! small Black-Scholes price/Greeks table using the fetched price as the
//! spot and strike. This stands in for the original GUI chart, which this
//! port intentionally leaves out of scope.

use miette::{IntoDiagnostic, Result, miette};
use quotecore::registry::{self, OptionGreek, OptionKind};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_logging();

    let mut args = std::env::args().skip(1);
    let ticker = args.next().ok_or_else(|| miette!("usage: quote <TICKER> [--greeks]"))?;
    let show_greeks = args.any(|a| a == "--greeks");

    registry::init().into_diagnostic()?;

    let mut out = [0u8; 32];
    let result = registry::fetch_sync(&ticker, &mut out).into_diagnostic()?;
    if result != quotecore::result_slot::WorkResult::Success {
        return Err(miette!("fetch failed for ticker {ticker}"));
    }
    let nul = out.iter().position(|&b| b == 0).unwrap_or(out.len());
    let price: f64 = std::str::from_utf8(&out[..nul]).into_diagnostic()?.parse().into_diagnostic()?;

    let name = registry::ticker_to_name(&ticker).ok_or_else(|| miette!("could not resolve name for {ticker}"))?;
    println!("{ticker}: {price} ({name})");

    if show_greeks {
        print_greeks_table(price);
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}

/// A small Black-Scholes table at the money (`strike == spot`), for a fixed
/// rate and volatility, across a few expiries. Illustrative only: a real
/// pricing tool would take rate/vol/expiry from the caller.
fn print_greeks_table(spot: f64) {
    const RATE: f64 = 0.03;
    const VOL: f64 = 0.25;
    const EXPIRIES: [f64; 3] = [0.25, 0.5, 1.0];

    println!();
    println!("{:>8} {:>10} {:>10} {:>8} {:>8} {:>8}", "expiry", "call", "put", "delta", "vega", "theta");
    for expiry in EXPIRIES {
        let call = registry::option_price(OptionKind::Call, spot, spot, expiry, RATE, VOL);
        let put = registry::option_price(OptionKind::Put, spot, spot, expiry, RATE, VOL);
        let delta = registry::option_greek(OptionGreek::CallDelta, spot, spot, expiry, RATE, VOL);
        let vega = registry::option_greek(OptionGreek::Vega, spot, spot, expiry, RATE, VOL);
        let theta = registry::option_greek(OptionGreek::CallTheta, spot, spot, expiry, RATE, VOL);
        println!("{expiry:>8.2} {call:>10.4} {put:>10.4} {delta:>8.4} {vega:>8.4} {theta:>8.4}");
    }
}
