//! Read-only dashboard helpers over machine telemetry.

use chrono::NaiveDateTime;

use crate::api::{CumulativeAnalysis, Machine, PriorityUsage};

/// One slice of the weekly ON-share chart.
#[derive(Debug, Clone, PartialEq)]
pub struct PrioritySlice {
    pub label: String,
    pub value: f64,
}

/// One slice of the movement breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementShare {
    pub alert_notify_id: i64,
    pub duration_hr: f64,
    /// Share of the total movement duration, 0 to 100
    pub percent: f64,
}

/// Machines whose GFRID contains `query`. An empty query keeps everything.
pub fn filter_by_gfrid<'a>(machines: &'a [Machine], query: &str) -> Vec<&'a Machine> {
    let query = query.trim().to_ascii_lowercase();
    machines
        .iter()
        .filter(|machine| machine.gfrid.0.to_ascii_lowercase().contains(&query))
        .collect()
}

/// Chart slices labelled `GFRID<id>:<pct>%`.
///
/// A device with 0% gets a sliver of 0.01 so it still shows up.
pub fn priority_slices(usage: &[PriorityUsage]) -> Vec<PrioritySlice> {
    usage
        .iter()
        .map(|item| PrioritySlice {
            label: format!("GFRID{}:{:.1}%", item.gfrid, item.on_percent),
            value: if item.on_percent == 0.0 {
                0.01
            } else {
                (item.on_percent * 100.0).round() / 100.0
            },
        })
        .collect()
}

/// Whether an analysis has anything to show.
pub fn has_data(analysis: &CumulativeAnalysis) -> bool {
    analysis.on_time_hr != 0.0 || analysis.off_time_hr != 0.0
}

/// Each movement bucket with its share of the total duration.
pub fn movement_shares(analysis: &CumulativeAnalysis) -> Vec<MovementShare> {
    let total: f64 = analysis.movements.iter().map(|m| m.duration_hr).sum();
    analysis
        .movements
        .iter()
        .map(|m| MovementShare {
            alert_notify_id: m.alert_notify_id,
            duration_hr: m.duration_hr,
            percent: if total > 0.0 {
                m.duration_hr / total * 100.0
            } else {
                0.0
            },
        })
        .collect()
}

/// Formats a backend `YYYY-MM-DD HH:mm:ss` stamp as `05-Jan-2024, 08:30 AM`.
pub fn format_last_seen(raw: Option<&str>) -> String {
    raw.and_then(|raw| NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M:%S").ok())
        .map_or_else(
            || "Invalid".to_string(),
            |ts| ts.format("%d-%b-%Y, %I:%M %p").to_string(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Gfrid, Movement};

    fn machine(id: &str) -> Machine {
        Machine {
            gfrid: Gfrid(id.to_string()),
            status: None,
            last_seen: None,
        }
    }

    #[test]
    fn test_filter_by_gfrid_substring() {
        let machines = vec![machine("101"), machine("202"), machine("A10")];
        let hits: Vec<&str> = filter_by_gfrid(&machines, "10")
            .iter()
            .map(|m| m.gfrid.0.as_str())
            .collect();
        assert_eq!(hits, vec!["101", "A10"]);
        assert_eq!(filter_by_gfrid(&machines, "a1").len(), 1);
        assert_eq!(filter_by_gfrid(&machines, "").len(), 3);
    }

    #[test]
    fn test_priority_slices() {
        let usage = vec![
            PriorityUsage {
                gfrid: Gfrid("7".to_string()),
                on_percent: 42.456,
            },
            PriorityUsage {
                gfrid: Gfrid("8".to_string()),
                on_percent: 0.0,
            },
        ];
        let slices = priority_slices(&usage);
        assert_eq!(slices[0].label, "GFRID7:42.5%");
        assert!((slices[0].value - 42.46).abs() < 1e-9);
        assert_eq!(slices[1].label, "GFRID8:0.0%");
        assert!((slices[1].value - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_analysis_without_time_has_no_data() {
        let empty = CumulativeAnalysis {
            on_time_hr: 0.0,
            off_time_hr: 0.0,
            movements: Vec::new(),
        };
        assert!(!has_data(&empty));
        assert!(movement_shares(&empty).is_empty());
    }

    #[test]
    fn test_movement_shares() {
        let analysis = CumulativeAnalysis {
            on_time_hr: 5.0,
            off_time_hr: 1.0,
            movements: vec![
                Movement {
                    alert_notify_id: 1,
                    duration_hr: 1.0,
                    color: None,
                },
                Movement {
                    alert_notify_id: 2,
                    duration_hr: 3.0,
                    color: None,
                },
            ],
        };
        assert!(has_data(&analysis));
        let shares = movement_shares(&analysis);
        assert!((shares[0].percent - 25.0).abs() < 1e-9);
        assert!((shares[1].percent - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_format_last_seen() {
        assert_eq!(
            format_last_seen(Some("2024-01-05 08:30:00")),
            "05-Jan-2024, 08:30 AM"
        );
        assert_eq!(format_last_seen(Some("yesterday")), "Invalid");
        assert_eq!(format_last_seen(None), "Invalid");
    }
}
