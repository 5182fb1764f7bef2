//! Dashboard views: machines, weekly ON share and cumulative analysis.

use anyhow::Result;
use nmapp_core::api::CumulativeQuery;
use nmapp_core::config::Config;
use nmapp_core::telemetry::{
    filter_by_gfrid, format_last_seen, has_data, movement_shares, priority_slices,
};

use super::signed_in;

pub async fn machines(config: &Config, gfrid: Option<&str>) -> Result<()> {
    let (session, client) = signed_in(config)?;
    let machines = client.machines().await?;
    let shown = filter_by_gfrid(&machines, gfrid.unwrap_or_default());

    println!("Welcome, {}", session.user.display_name());
    if shown.is_empty() {
        println!("No machines found.");
        return Ok(());
    }
    for machine in shown {
        println!(
            "GFRID {:<8} {:<8} last seen {}",
            machine.gfrid,
            machine.status.as_deref().unwrap_or("-"),
            format_last_seen(machine.last_seen.as_deref()),
        );
    }
    Ok(())
}

pub async fn priority(config: &Config) -> Result<()> {
    let (_, client) = signed_in(config)?;
    let usage = client.priority_usage().await?;
    if usage.is_empty() {
        println!("No usage data for the past week.");
        return Ok(());
    }
    println!("Past 1 week ON % per GFRID");
    for slice in priority_slices(&usage) {
        println!("  {:<24} {:>7.2}", slice.label, slice.value);
    }
    Ok(())
}

pub async fn analysis(config: &Config, query: &CumulativeQuery) -> Result<()> {
    let (_, client) = signed_in(config)?;
    let analysis = client.cumulative_analysis(query).await?;
    if !has_data(&analysis) {
        println!("No data available for the selected period");
        return Ok(());
    }

    println!("ON time:  {:.2} hrs", analysis.on_time_hr);
    println!("OFF time: {:.2} hrs", analysis.off_time_hr);
    let shares = movement_shares(&analysis);
    if !shares.is_empty() {
        println!("Movements by alert:");
        for share in shares {
            println!(
                "  alert {:<5} {:>8.2} hrs {:>6.1}%",
                share.alert_notify_id, share.duration_hr, share.percent
            );
        }
    }
    Ok(())
}
