//! API client for the infrastructure dashboard server

use anyhow::{Context, Result};
use dashboard_lib::{
    heatmap::ClusterHeatmapData,
    recent::{RecentHostsData, RecentVmsData},
    status::AggregateStatusData,
    utilization::EmsUtilizationData,
    Viewer,
};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

const USER_ID_HEADER: &str = "x-user-id";
const TIMEZONE_HEADER: &str = "x-user-timezone";

/// API client for the dashboard payload endpoints
pub struct ApiClient {
    client: Client,
    base_url: Url,
    viewer: Viewer,
}

impl ApiClient {
    /// Create a new API client acting on behalf of `viewer`
    pub fn new(base_url: &str, viewer: Viewer) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self {
            client,
            base_url,
            viewer,
        })
    }

    /// Make a GET request with the viewer headers
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .header(USER_ID_HEADER, self.viewer.user_id.to_string())
            .header(TIMEZONE_HEADER, &self.viewer.timezone)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn cluster_heatmap(&self, ems_id: Option<u64>) -> Result<ClusterHeatmapData> {
        self.get(&payload_path(ems_id, "cluster_heatmap_data")).await
    }

    pub async fn ems_utilization(&self, ems_id: Option<u64>) -> Result<EmsUtilizationData> {
        self.get(&payload_path(ems_id, "ems_utilization_data")).await
    }

    pub async fn recent_hosts(&self, ems_id: Option<u64>) -> Result<RecentHostsData> {
        self.get(&payload_path(ems_id, "recent_hosts_data")).await
    }

    pub async fn recent_vms(&self, ems_id: Option<u64>) -> Result<RecentVmsData> {
        self.get(&payload_path(ems_id, "recent_vms_data")).await
    }

    pub async fn aggregate_status(&self, ems_id: u64) -> Result<AggregateStatusData> {
        self.get(&payload_path(Some(ems_id), "aggregate_status_data"))
            .await
    }
}

/// Relative path of a payload, scoped to a manager when `ems_id` is set
pub fn payload_path(ems_id: Option<u64>, payload: &str) -> String {
    match ems_id {
        Some(id) => format!("api/ems_infra/{}/{}", id, payload),
        None => format!("api/ems_infra/{}", payload),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_path() {
        assert_eq!(
            payload_path(None, "recent_vms_data"),
            "api/ems_infra/recent_vms_data"
        );
        assert_eq!(
            payload_path(Some(4), "cluster_heatmap_data"),
            "api/ems_infra/4/cluster_heatmap_data"
        );
    }

    #[tokio::test]
    async fn test_sends_viewer_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/ems_infra/recent_hosts_data")
            .match_header("x-user-id", "7")
            .match_header("x-user-timezone", "Europe/Berlin")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"recentHosts":{"dataAvailable":false,"config":{"title":"Recent Hosts","label":"Hosts"}}}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), Viewer::new(7, "Europe/Berlin")).unwrap();
        let data = client.recent_hosts(None).await.unwrap();

        mock.assert_async().await;
        assert!(!data.recent_hosts.data_available);
        assert!(data.recent_hosts.x_data.is_none());
    }

    #[tokio::test]
    async fn test_error_message_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/ems_infra/9/aggregate_status_data")
            .with_status(404)
            .with_body(r#"{"error":"not_found","message":"manager 9 not found"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), Viewer::new(1, "UTC")).unwrap();

        let err = client.aggregate_status(9).await.unwrap_err();
        assert!(err.to_string().contains("manager 9 not found"));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_parses_heatmap_payload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/ems_infra/1/cluster_heatmap_data")
            .with_status(200)
            .with_body(
                r#"{"heatmaps":{"clusterCpuUsage":[{"clusterId":10,"clusterName":"prod","providerName":"vCenter","unit":"Cores","total":48,"percent":0.88}],"clusterMemoryUsage":null,"title":"Cluster Utilization"}}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), Viewer::new(1, "UTC")).unwrap();
        let data = client.cluster_heatmap(Some(1)).await.unwrap();

        let cpu = data.heatmaps.cluster_cpu_usage.unwrap();
        assert_eq!(cpu[0].cluster_name, "prod");
        assert_eq!(cpu[0].percent, Some(0.88));
        assert!(data.heatmaps.cluster_memory_usage.is_none());
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url", Viewer::new(1, "UTC")).is_err());
    }
}
