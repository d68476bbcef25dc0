//! Fleet utilization command

use anyhow::Result;
use dashboard_lib::utilization::EmsUtilization;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{format_day, format_total, print_heading, print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct UtilizationRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "CPU Used")]
    used_cpu: String,
    #[tabled(rename = "CPU Total")]
    total_cpu: String,
    #[tabled(rename = "Memory Used")]
    used_mem: String,
    #[tabled(rename = "Memory Total")]
    total_mem: String,
}

fn value_at(series: &Option<Vec<Option<i64>>>, index: usize) -> Option<i64> {
    series.as_ref().and_then(|values| values.get(index).copied().flatten())
}

fn utilization_rows(utilization: &EmsUtilization) -> Vec<UtilizationRow> {
    let Some(dates) = &utilization.dates else {
        return Vec::new();
    };

    dates
        .iter()
        .enumerate()
        .map(|(i, date)| UtilizationRow {
            date: format_day(date),
            used_cpu: format_total(value_at(&utilization.used_cpu, i), "Cores"),
            total_cpu: format_total(value_at(&utilization.total_cpu, i), "Cores"),
            used_mem: format_total(value_at(&utilization.used_mem, i), "GB"),
            total_mem: format_total(value_at(&utilization.total_mem, i), "GB"),
        })
        .collect()
}

pub async fn show_utilization(
    client: &ApiClient,
    ems_id: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    let data = client.ems_utilization(ems_id).await?;

    match format {
        OutputFormat::Json => print_json(&data)?,
        OutputFormat::Table => {
            print_heading("Utilization (last 30 days)");
            print_table(
                utilization_rows(&data.ems_utilization),
                "No utilization data available",
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_keep_missing_values() {
        let utilization = EmsUtilization {
            data_available: true,
            dates: Some(vec!["2024-06-27".to_string(), "2024-06-28".to_string()]),
            used_cpu: Some(vec![Some(18), Some(22)]),
            total_cpu: Some(vec![Some(48), None]),
            used_mem: Some(vec![Some(176), Some(186)]),
            total_mem: Some(vec![Some(256), Some(256)]),
        };

        let rows = utilization_rows(&utilization);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, "2024-06-27 Thu");
        assert_eq!(rows[0].total_cpu, "48 Cores");
        assert_eq!(rows[1].total_cpu, "-");
        assert_eq!(rows[1].used_mem, "186 GB");
    }

    #[test]
    fn test_unavailable_has_no_rows() {
        let utilization = EmsUtilization {
            data_available: false,
            dates: None,
            used_cpu: None,
            total_cpu: None,
            used_mem: None,
            total_mem: None,
        };
        assert!(utilization_rows(&utilization).is_empty());
    }
}
