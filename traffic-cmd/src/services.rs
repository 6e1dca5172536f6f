//! Connection settings shared by all commands, and the clients built from
//! them.

use std::sync::Arc;

use clap::Args;
use traffic_core::api::{build_http_client, OrsClient, PredictionClient, TrafficApiClient};
use traffic_core::config::{
    ClientConfig, RetryPolicy, DEFAULT_API_BASE_URL, DEFAULT_ORS_BASE_URL, DEFAULT_ROUTING_PROFILE,
    DEFAULT_TIMEOUT_SECS,
};
use traffic_pipeline::config::PipelineConfig;

#[derive(Args, Debug, Clone)]
pub struct ServiceArgs {
    /// OpenRouteService API key
    #[arg(long, env = "ORS_API_KEY", default_value = "", hide_env_values = true, global = true)]
    pub ors_api_key: String,

    /// Geocoding and directions base URL
    #[arg(long, env = "ORS_BASE_URL", default_value = DEFAULT_ORS_BASE_URL, global = true)]
    pub ors_base_url: String,

    /// Directions profile
    #[arg(long, default_value = DEFAULT_ROUTING_PROFILE, global = true)]
    pub routing_profile: String,

    /// Prediction service base URL
    #[arg(long, env = "PREDICTION_URL", default_value = DEFAULT_API_BASE_URL, global = true)]
    pub prediction_url: String,

    /// Traffic API base URL
    #[arg(long, env = "TRAFFIC_API_URL", default_value = DEFAULT_API_BASE_URL, global = true)]
    pub traffic_api_url: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    pub timeout_secs: u64,

    /// Attempts per request for transport failures (1 = no retry)
    #[arg(long, env = "MAX_ATTEMPTS", default_value_t = 1, global = true)]
    pub max_attempts: u32,
}

impl ServiceArgs {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            ors_base_url: self.ors_base_url.clone(),
            ors_api_key: self.ors_api_key.clone(),
            routing_profile: self.routing_profile.clone(),
            prediction_base_url: self.prediction_url.clone(),
            traffic_base_url: self.traffic_api_url.clone(),
            timeout_secs: self.timeout_secs,
            retry: RetryPolicy {
                max_attempts: self.max_attempts.max(1),
                ..RetryPolicy::default()
            },
        }
    }

    /// Stage timeouts cover every attempt the clients may make plus the
    /// backoff sleeps between them, rounded up to whole seconds.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let retry = self.client_config().retry;
        let attempts = retry.max_attempts;
        let backoff_ms: u64 = (1..attempts)
            .map(|attempt| retry.backoff(attempt).as_millis() as u64)
            .sum();
        let requests_secs = self.timeout_secs.max(1).saturating_mul(u64::from(attempts));
        PipelineConfig {
            stage_timeout_secs: requests_secs.saturating_add(backoff_ms.div_ceil(1000)),
            ..PipelineConfig::default()
        }
    }

    pub fn clients(&self) -> anyhow::Result<Clients> {
        let config = self.client_config();
        if config.ors_api_key.is_empty() {
            log::warn!("ORS_API_KEY is not set; geocoding and routing requests will be rejected");
        }
        let http = build_http_client(&config)?;
        Ok(Clients {
            ors: Arc::new(OrsClient::new(http.clone(), &config)),
            prediction: Arc::new(PredictionClient::new(http.clone(), &config)),
            traffic: TrafficApiClient::new(http, &config),
        })
    }
}

pub struct Clients {
    pub ors: Arc<OrsClient>,
    pub prediction: Arc<PredictionClient>,
    pub traffic: TrafficApiClient,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        services: ServiceArgs,
    }

    #[test]
    fn flags_map_onto_client_config() {
        let args = Harness::parse_from([
            "test",
            "--ors-api-key",
            "secret",
            "--prediction-url",
            "http://models:9000/api/",
            "--timeout-secs",
            "5",
            "--max-attempts",
            "3",
        ])
        .services;
        let config = args.client_config();
        assert_eq!(config.ors_api_key, "secret");
        assert_eq!(config.prediction_base_url, "http://models:9000/api/");
        assert_eq!(config.routing_profile, DEFAULT_ROUTING_PROFILE);
        assert_eq!(config.retry.max_attempts, 3);
        // 3 x 5 s requests plus 0.5 s and 1 s of backoff.
        assert_eq!(args.pipeline_config().stage_timeout_secs, 17);
    }

    #[test]
    fn stage_timeout_outlasts_worst_case_retries() {
        let args = Harness::parse_from(["test", "--timeout-secs", "30", "--max-attempts", "3"]).services;
        let retry = args.client_config().retry;
        let worst = std::time::Duration::from_secs(90) + retry.backoff(1) + retry.backoff(2);
        assert!(args.pipeline_config().stage_timeout() >= worst);

        let single = Harness::parse_from(["test", "--timeout-secs", "30"]).services;
        assert_eq!(single.pipeline_config().stage_timeout_secs, 30);
    }

    #[test]
    fn zero_attempts_means_one() {
        let args = Harness::parse_from(["test", "--max-attempts", "0"]).services;
        assert_eq!(args.client_config().retry.max_attempts, 1);
    }
}
