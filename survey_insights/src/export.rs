//! Naming and triggering chart image captures.
//!
//! The capture itself (turning a rendered chart into an image) is done by an
//! external rendering utility, represented here by the [ChartCapture] trait.

use chrono::{DateTime, Utc};
use log::{info, warn};

use std::fmt::Display;

const MAX_SLUG_LEN: usize = 64;
const DEFAULT_SLUG: &str = "survey";

/// Something able to capture an already rendered chart to an image file.
pub trait ChartCapture {
    type Error: Display;

    fn capture(&mut self, filename: &str) -> Result<(), Self::Error>;
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ExportOutcome {
    Saved { filename: String },
    Failed { filename: String, reason: String },
}

impl ExportOutcome {
    pub fn filename(&self) -> &str {
        match self {
            ExportOutcome::Saved { filename } | ExportOutcome::Failed { filename, .. } => filename,
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, ExportOutcome::Saved { .. })
    }
}

/// A filesystem-safe name for a chart image.
///
/// ```
/// use survey_insights::export::generate_chart_filename;
/// # use chrono::{TimeZone, Utc};
///
/// let ts = Utc.with_ymd_and_hms(2024, 6, 30, 14, 5, 9).unwrap();
/// assert_eq!(
///     generate_chart_filename("Team Pulse / Q2", ts),
///     "team-pulse-q2-chart-20240630_140509.png"
/// );
/// ```
pub fn generate_chart_filename(instance: &str, timestamp: DateTime<Utc>) -> String {
    format!(
        "{}-chart-{}.png",
        slugify(instance),
        timestamp.format("%Y%m%d_%H%M%S")
    )
}

/// Captures the chart under a generated name. Failures of the capture are
/// reported in the outcome, never propagated.
pub fn export_chart<C: ChartCapture>(
    capture: &mut C,
    instance: &str,
    timestamp: DateTime<Utc>,
) -> ExportOutcome {
    let filename = generate_chart_filename(instance, timestamp);
    match capture.capture(&filename) {
        Ok(()) => {
            info!("export_chart: saved {}", filename);
            ExportOutcome::Saved { filename }
        }
        Err(e) => {
            warn!("export_chart: capture of {} failed: {}", filename, e);
            ExportOutcome::Failed {
                filename,
                reason: e.to_string(),
            }
        }
    }
}

fn slugify(instance: &str) -> String {
    let lowered = instance.to_lowercase();
    let slug: String = lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<&str>>()
        .join("-");
    let capped: String = slug.chars().take(MAX_SLUG_LEN).collect();
    let capped = capped.trim_end_matches('-');
    if capped.is_empty() {
        DEFAULT_SLUG.to_string()
    } else {
        capped.to_string()
    }
}
