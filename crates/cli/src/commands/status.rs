//! Aggregate status command

use anyhow::Result;
use colored::Colorize;
use dashboard_lib::status::AggregateStatus;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{print_heading, print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct TileRow {
    #[tabled(rename = "Inventory")]
    title: String,
    #[tabled(rename = "Count")]
    count: u64,
    #[tabled(rename = "Errors")]
    errors: String,
    #[tabled(rename = "Link")]
    href: String,
}

fn tile_rows(status: &AggregateStatus) -> Vec<TileRow> {
    status
        .attr_data
        .iter()
        .map(|tile| TileRow {
            title: tile.title.clone(),
            count: tile.count,
            errors: if tile.notification.count > 0 {
                tile.notification.count.to_string().red().to_string()
            } else {
                "0".to_string()
            },
            href: tile.href.clone(),
        })
        .collect()
}

pub async fn show_status(client: &ApiClient, ems_id: u64, format: OutputFormat) -> Result<()> {
    let data = client.aggregate_status(ems_id).await?;

    match format {
        OutputFormat::Json => print_json(&data)?,
        OutputFormat::Table => {
            print_heading(&format!("Provider {}", ems_id));
            println!("Icon: {}", data.agg_status.status.icon_image.cyan());
            println!();
            print_table(tile_rows(&data.agg_status), "No inventory tiles");
        }
    }

    Ok(())
}
