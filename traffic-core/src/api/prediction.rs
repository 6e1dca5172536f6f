//! Prediction service client (`POST {base}/predict`).

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;

use super::{base_url, with_retry};
use crate::config::{ClientConfig, RetryPolicy};
use crate::error::{Result, TrafficError};
use crate::service::PredictionService;
use crate::wire::{ErrorBody, PredictionReply, PredictionRequest, PredictionResponse};

const PREDICTION: &str = "prediction service";

pub struct PredictionClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl PredictionClient {
    pub fn new(client: Client, config: &ClientConfig) -> Self {
        PredictionClient {
            client,
            base_url: base_url(&config.prediction_base_url).to_string(),
            retry: config.retry,
        }
    }

    fn predict_url(&self) -> String {
        format!("{}/predict", self.base_url)
    }

    async fn predict_once(&self, request: &PredictionRequest) -> Result<PredictionReply> {
        let response = self
            .client
            .post(self.predict_url())
            .json(request)
            .send()
            .await
            .map_err(|e| TrafficError::unavailable(PREDICTION, e))?;
        let status = response.status();
        if status.is_success() {
            let body: PredictionResponse = response.json().await.map_err(|e| {
                TrafficError::unavailable(PREDICTION, format!("malformed payload: {}", e))
            })?;
            return Ok(PredictionReply::Predicted {
                prediction: body.prediction,
            });
        }
        // The service answered; keep whatever explanation it gave.
        let detail = match response.text().await {
            Ok(text) => serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|body| body.detail_message()),
            Err(e) => {
                warn!("Failed to read prediction error body: {}", e);
                None
            }
        };
        Ok(PredictionReply::Rejected {
            status: status.as_u16(),
            detail,
        })
    }
}

#[async_trait]
impl PredictionService for PredictionClient {
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionReply> {
        debug!("Sending prediction payload {:?}", request);
        with_retry(&self.retry, PREDICTION, move || self.predict_once(request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_url_appends_path() {
        let config = ClientConfig {
            prediction_base_url: "http://127.0.0.1:8000/api/".into(),
            ..ClientConfig::default()
        };
        let client = PredictionClient::new(Client::new(), &config);
        assert_eq!(client.predict_url(), "http://127.0.0.1:8000/api/predict");
    }
}
