//! Recently created hosts and VMs

use anyhow::Result;
use clap::ValueEnum;
use dashboard_lib::recent::RecentRecordsChart;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{format_day, print_heading, print_json, print_table, OutputFormat};

/// Inventory kind to chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecentKind {
    Hosts,
    Vms,
}

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Created")]
    count: u64,
}

fn count_rows(chart: &RecentRecordsChart) -> Vec<CountRow> {
    match (&chart.x_data, &chart.y_data) {
        (Some(days), Some(counts)) => days
            .iter()
            .zip(counts)
            .map(|(day, count)| CountRow {
                date: format_day(day),
                count: *count,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn print_chart(chart: &RecentRecordsChart) {
    print_heading(&chart.config.title);
    print_table(
        count_rows(chart),
        &format!("No {} created in the last 30 days", chart.config.label.to_lowercase()),
    );
}

pub async fn show_recent(
    client: &ApiClient,
    kind: RecentKind,
    ems_id: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    match kind {
        RecentKind::Hosts => {
            let data = client.recent_hosts(ems_id).await?;
            match format {
                OutputFormat::Json => print_json(&data)?,
                OutputFormat::Table => print_chart(&data.recent_hosts),
            }
        }
        RecentKind::Vms => {
            let data = client.recent_vms(ems_id).await?;
            match format {
                OutputFormat::Json => print_json(&data)?,
                OutputFormat::Table => print_chart(&data.recent_vms),
            }
        }
    }

    Ok(())
}
