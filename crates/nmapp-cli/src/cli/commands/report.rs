use anyhow::{Result, bail};
use nmapp_core::api::NewHistoryRecord;
use nmapp_core::config::Config;
use nmapp_core::history::parse_bound;

use super::signed_in;

/// Records a downloaded report so it shows up in the history.
pub async fn record(config: &Config, kind: &str, from: &str, to: &str) -> Result<()> {
    let kind = kind.trim().to_ascii_lowercase();
    if kind.is_empty() {
        bail!("Report kind must not be empty");
    }
    let from_date = parse_bound(from)?;
    let to_date = parse_bound(to)?;
    if from_date > to_date {
        bail!("Start date {from} is after end date {to}");
    }

    let (session, client) = signed_in(config)?;
    let record = NewHistoryRecord {
        user_id: session.user.id,
        kind,
        from_date,
        to_date,
    };
    let entry = client.record_history(&record).await?;
    println!(
        "Recorded {} report #{} ({} to {})",
        entry.kind,
        entry.id,
        entry.from_date.format("%Y-%m-%d"),
        entry.to_date.format("%Y-%m-%d"),
    );
    Ok(())
}
