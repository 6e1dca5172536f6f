//! Paged traffic query endpoint client (`GET {base}/traffic`).

use log::{info, warn};
use reqwest::Client;

use super::{base_url, send_json, with_retry};
use crate::config::{ClientConfig, RetryPolicy};
use crate::error::{Result, TrafficError};
use crate::observation::{DateFilter, TrafficObservation, TrafficPage};
use crate::wire::TrafficPageResponse;

const TRAFFIC: &str = "traffic endpoint";

pub struct TrafficApiClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl TrafficApiClient {
    pub fn new(client: Client, config: &ClientConfig) -> Self {
        TrafficApiClient {
            client,
            base_url: base_url(&config.traffic_base_url).to_string(),
            retry: config.retry,
        }
    }

    fn traffic_url(&self) -> String {
        format!("{}/traffic", self.base_url)
    }

    async fn get_once(&self, params: &[(&str, String)]) -> Result<TrafficPageResponse> {
        let request = self.client.get(self.traffic_url()).query(params);
        send_json(TRAFFIC, request).await
    }

    /// Fetch one page from the remote endpoint and validate it into a
    /// [`TrafficPage`].
    pub async fn query_page(
        &self,
        filter: &DateFilter,
        page_index: i64,
        page_size: i64,
    ) -> Result<TrafficPage> {
        let max = i64::from(u32::MAX);
        if page_index < 1 || page_size < 1 || page_index > max || page_size > max {
            return Err(TrafficError::InvalidPage {
                page_index,
                page_size,
            });
        }
        let params = query_params(filter, page_index, page_size);
        let params = params.as_slice();
        let response = with_retry(&self.retry, TRAFFIC, move || self.get_once(params)).await?;
        let page_size = page_size as u32;

        let total_pages = TrafficPage::total_pages_for(response.total, page_size);
        if response.pages != total_pages {
            warn!(
                "Traffic endpoint reported {} pages for {} records; using {}",
                response.pages, response.total, total_pages
            );
        }
        let records = response
            .data
            .into_iter()
            .map(TrafficObservation::try_from)
            .collect::<Result<Vec<_>>>()
            .map_err(|e| TrafficError::unavailable(TRAFFIC, format!("malformed record: {}", e)))?;
        info!(
            "Traffic endpoint returned {} records (page {}/{})",
            records.len(),
            page_index,
            total_pages
        );
        Ok(TrafficPage {
            records,
            page_index: page_index as u32,
            page_size,
            total_records: response.total,
            total_pages,
        })
    }
}

/// `page`, `limit`, and the date bounds that are present.
fn query_params(filter: &DateFilter, page_index: i64, page_size: i64) -> Vec<(&'static str, String)> {
    let mut params = vec![("page", page_index.to_string()), ("limit", page_size.to_string())];
    if let Some(start) = &filter.start_date {
        params.push(("start_date", traffic_utils::dates::format_date(start)));
    }
    if let Some(end) = &filter.end_date {
        params.push(("end_date", traffic_utils::dates::format_date(end)));
    }
    params
}
