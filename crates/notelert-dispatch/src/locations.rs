//! Saved locations stored on the backend (`list-locations`).

use std::sync::Arc;

use notelert_core::{NotelertError, Result, SavedLocation, is_valid_plugin_token};
use serde::Deserialize;

use crate::dispatcher::{Endpoint, RequestDispatcher};

#[derive(Debug, Deserialize)]
struct ListLocationsResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    locations: Vec<SavedLocation>,
    #[serde(default)]
    error: Option<String>,
}

pub struct LocationDirectory {
    dispatcher: Arc<RequestDispatcher>,
}

impl LocationDirectory {
    pub fn new(dispatcher: Arc<RequestDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Fetch the user's saved locations.
    pub async fn fetch(&self, token: &str) -> Result<Vec<SavedLocation>> {
        if !is_valid_plugin_token(token) {
            return Err(NotelertError::Validation(
                "Plugin token must be 64 hexadecimal characters".into(),
            ));
        }

        let value = self
            .dispatcher
            .call(Endpoint::ListLocations, token, None)
            .await?;
        let body: ListLocationsResponse = serde_json::from_value(value)?;

        if !body.success {
            return Err(NotelertError::Server {
                status: 200,
                message: body
                    .error
                    .unwrap_or_else(|| "list-locations reported failure".into()),
            });
        }

        tracing::info!("📍 Fetched {} saved locations", body.locations.len());
        Ok(body.locations)
    }
}
