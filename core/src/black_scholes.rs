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

//! Black-Scholes option pricing and greeks.
//!
//! No input validation: callers are expected to pass a positive spot,
//! strike, volatility and time-to-expiry, matching the original's lack of
//! boundary guards.

use std::f64::consts::PI;

/// The probability density of `N(mean, std_dev)` at `x`. Direct port of
/// `bs_normal`.
pub fn normal_density(mean: f64, std_dev: f64, x: f64) -> f64 {
    let t1 = 1.0 / (std_dev * (2.0 * PI).sqrt());
    let t2 = -(x - mean).powi(2) / (2.0 * std_dev * std_dev);
    t1 * t2.exp()
}

/// The cumulative distribution function of `N(mean, std_dev)` at `z`. Direct
/// port of `bs_cndf`.
pub fn cumulative_normal(mean: f64, std_dev: f64, z: f64) -> f64 {
    0.5 * (1.0 + libm_erf((z - mean) / (std_dev * 2f64.sqrt())))
}

/// The standard normal cumulative distribution function, `N(0, 1)` at `z`.
/// Direct port of `bs_cndfn`.
pub fn standard_cumulative_normal(z: f64) -> f64 { cumulative_normal(0.0, 1.0, z) }

fn d1(asset_price: f64, strike_price: f64, expiry: f64, rate: f64, vol: f64) -> f64 {
    ((asset_price / strike_price).ln() + (rate + vol * vol / 2.0) * expiry) / (vol * expiry.sqrt())
}

fn d2(asset_price: f64, strike_price: f64, expiry: f64, rate: f64, vol: f64) -> f64 {
    d1(asset_price, strike_price, expiry, rate, vol) - vol * expiry.sqrt()
}

/// Direct port of `bs_call_price`.
pub fn call_price(asset_price: f64, strike_price: f64, expiry: f64, rate: f64, vol: f64) -> f64 {
    let d1 = d1(asset_price, strike_price, expiry, rate, vol);
    let d2 = d2(asset_price, strike_price, expiry, rate, vol);
    asset_price * standard_cumulative_normal(d1) - strike_price * (-rate * expiry).exp() * standard_cumulative_normal(d2)
}

/// Direct port of `bs_put_price`.
pub fn put_price(asset_price: f64, strike_price: f64, expiry: f64, rate: f64, vol: f64) -> f64 {
    let d1 = d1(asset_price, strike_price, expiry, rate, vol);
    let d2 = d2(asset_price, strike_price, expiry, rate, vol);
    strike_price * (-rate * expiry).exp() * standard_cumulative_normal(-d2) - asset_price * standard_cumulative_normal(-d1)
}

pub fn call_delta(asset_price: f64, strike_price: f64, expiry: f64, rate: f64, vol: f64) -> f64 {
    standard_cumulative_normal(d1(asset_price, strike_price, expiry, rate, vol))
}

pub fn put_delta(asset_price: f64, strike_price: f64, expiry: f64, rate: f64, vol: f64) -> f64 {
    standard_cumulative_normal(d1(asset_price, strike_price, expiry, rate, vol)) - 1.0
}

/// Sensitivity to a one-unit change in volatility, shared by calls and puts.
pub fn vega(asset_price: f64, strike_price: f64, expiry: f64, rate: f64, vol: f64) -> f64 {
    asset_price * normal_density(0.0, 1.0, d1(asset_price, strike_price, expiry, rate, vol)) * expiry.sqrt()
}

/// Sensitivity to the passage of time, for a call when `is_call` else a put.
pub fn theta(asset_price: f64, strike_price: f64, expiry: f64, rate: f64, vol: f64, is_call: bool) -> f64 {
    let d1 = d1(asset_price, strike_price, expiry, rate, vol);
    let d2 = d2(asset_price, strike_price, expiry, rate, vol);
    let diffusion = -(asset_price * normal_density(0.0, 1.0, d1) * vol) / (2.0 * expiry.sqrt());
    let carry = rate * strike_price * (-rate * expiry).exp();
    if is_call {
        diffusion - carry * standard_cumulative_normal(d2)
    } else {
        diffusion + carry * standard_cumulative_normal(-d2)
    }
}

/// `erf` isn't in `std`; this is the Abramowitz & Stegun 7.1.26
/// approximation, accurate to about 1.5e-7, which is ample for option
/// pricing at the precision this crate otherwise targets.
fn libm_erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}
