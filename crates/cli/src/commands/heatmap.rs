//! Cluster heatmap command

use anyhow::Result;
use dashboard_lib::heatmap::{ClusterUsageEntry, Heatmaps, UsageUnit};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_percent, format_total, print_heading, print_json, print_table, OutputFormat};

/// One cluster with its CPU and memory usage side by side
#[derive(Tabled)]
struct ClusterUsageRow {
    #[tabled(rename = "Cluster")]
    cluster: String,
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "CPU Total")]
    cpu_total: String,
    #[tabled(rename = "CPU Used")]
    cpu_percent: String,
    #[tabled(rename = "Memory Total")]
    memory_total: String,
    #[tabled(rename = "Memory Used")]
    memory_percent: String,
}

fn unit_label(entry: &ClusterUsageEntry) -> &'static str {
    match entry.unit {
        UsageUnit::Cores => "Cores",
        UsageUnit::Gb => "GB",
    }
}

/// Join the CPU and memory lists by cluster id
fn usage_rows(heatmaps: &Heatmaps) -> Vec<ClusterUsageRow> {
    let cpu = heatmaps.cluster_cpu_usage.as_deref().unwrap_or_default();
    let memory = heatmaps.cluster_memory_usage.as_deref().unwrap_or_default();

    cpu.iter()
        .map(|cpu_entry| {
            let memory_entry = memory.iter().find(|m| m.cluster_id == cpu_entry.cluster_id);
            ClusterUsageRow {
                cluster: cpu_entry.cluster_name.clone(),
                provider: cpu_entry.provider_name.clone(),
                cpu_total: format_total(cpu_entry.total, unit_label(cpu_entry)),
                cpu_percent: color_percent(cpu_entry.percent),
                memory_total: memory_entry
                    .map(|m| format_total(m.total, unit_label(m)))
                    .unwrap_or_else(|| "-".to_string()),
                memory_percent: color_percent(memory_entry.and_then(|m| m.percent)),
            }
        })
        .collect()
}

pub async fn show_heatmap(client: &ApiClient, ems_id: Option<u64>, format: OutputFormat) -> Result<()> {
    let data = client.cluster_heatmap(ems_id).await?;

    match format {
        OutputFormat::Json => print_json(&data)?,
        OutputFormat::Table => {
            print_heading(&data.heatmaps.title);
            print_table(usage_rows(&data.heatmaps), "No cluster utilization data");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(cluster_id: u64, unit: UsageUnit, total: Option<i64>, percent: Option<f64>) -> ClusterUsageEntry {
        ClusterUsageEntry {
            cluster_id,
            cluster_name: format!("cluster-{}", cluster_id),
            provider_name: "vCenter".to_string(),
            unit,
            total,
            percent,
        }
    }

    #[test]
    fn test_rows_join_cpu_and_memory() {
        let heatmaps = Heatmaps {
            cluster_cpu_usage: Some(vec![entry(10, UsageUnit::Cores, Some(48), Some(0.5))]),
            cluster_memory_usage: Some(vec![entry(10, UsageUnit::Gb, Some(256), None)]),
            title: "Cluster Utilization".to_string(),
        };

        let rows = usage_rows(&heatmaps);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cluster, "cluster-10");
        assert_eq!(rows[0].cpu_total, "48 Cores");
        assert_eq!(rows[0].memory_total, "256 GB");
    }

    #[test]
    fn test_no_data_has_no_rows() {
        let heatmaps = Heatmaps {
            cluster_cpu_usage: None,
            cluster_memory_usage: None,
            title: "Cluster Utilization".to_string(),
        };
        assert!(usage_rows(&heatmaps).is_empty());
    }
}
