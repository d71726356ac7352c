//! services/api/src/adapters/exchange_rates.rs
//!
//! This module contains the adapter for the public exchange-rate API.
//! It implements the `ExchangeRateService` port from the `core` crate.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use subtrack_core::ports::{ExchangeRateService, PortError, PortResult, ReferenceRates};

/// The response of `https://open.er-api.com/v6/latest/<BASE>`.
#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    #[serde(default)]
    result: Option<String>,
    base_code: String,
    rates: HashMap<String, f64>,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// Fetches the latest rate table keyed by a reference currency.
#[derive(Clone)]
pub struct ErApiRatesAdapter {
    client: Client,
    url: String,
}

impl ErApiRatesAdapter {
    /// Creates a new `ErApiRatesAdapter` for the given endpoint.
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

//=========================================================================================
// `ExchangeRateService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ExchangeRateService for ErApiRatesAdapter {
    async fn fetch_reference_rates(&self) -> PortResult<ReferenceRates> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Rate request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| PortError::Unexpected(format!("Rate API returned an error: {}", e)))?;

        let body: LatestRatesResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Rate API response was not valid: {}", e)))?;

        if let Some(result) = body.result.as_deref() {
            if result != "success" {
                return Err(PortError::Unexpected(format!(
                    "Rate API reported result '{}'",
                    result
                )));
            }
        }

        Ok(ReferenceRates {
            base: body.base_code,
            rates: body.rates,
        })
    }
}
