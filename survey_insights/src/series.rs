// Attaching colors to finalized distributions.

use std::collections::HashMap;

use crate::colors::{hash_salt_from, ColorRequest, ColorResolver};
use crate::config::{FieldDistribution, ThemeMode};

pub const PROVIDED_LABEL: &str = "Provided";
pub const EMPTY_LABEL: &str = "Empty";

/// One point of a chart series, ready for a rendering library.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ChartPoint {
    pub label: String,
    pub value: u64,
    pub color: String,
}

/// The caller-side color settings for a chart.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SeriesOptions {
    pub overrides: HashMap<String, String>,
    pub theme: ThemeMode,
}

impl Default for SeriesOptions {
    fn default() -> Self {
        SeriesOptions {
            overrides: HashMap::new(),
            theme: ThemeMode::Light,
        }
    }
}

impl SeriesOptions {
    pub fn dark(self, is_dark_mode: bool) -> SeriesOptions {
        SeriesOptions {
            theme: ThemeMode::from_dark_flag(is_dark_mode),
            ..self
        }
    }
}

/// Maps a distribution to colored chart points, one per bucket.
///
/// The color salt comes from the field id, so that the same label in two
/// different fields does not always get the same palette slot. Free-text
/// distributions become two neutral points, provided and empty.
pub fn chart_series(
    dist: &FieldDistribution,
    resolver: &ColorResolver,
    options: &SeriesOptions,
) -> Vec<ChartPoint> {
    let salt = hash_salt_from(&dist.field_id);
    let dark = options.theme.is_dark();
    let color_of = |label: &str, neutral: bool| {
        resolver.resolve(
            &ColorRequest::new(label)
                .overrides(&options.overrides)
                .neutral(neutral)
                .salt(salt)
                .dark(dark),
        )
    };

    if let Some(text) = dist.free_text {
        return vec![
            ChartPoint {
                label: PROVIDED_LABEL.to_string(),
                value: text.provided,
                color: color_of(PROVIDED_LABEL, true),
            },
            ChartPoint {
                label: EMPTY_LABEL.to_string(),
                value: text.empty,
                color: color_of(EMPTY_LABEL, true),
            },
        ];
    }

    dist.buckets
        .iter()
        .map(|b| ChartPoint {
            label: b.label.clone(),
            value: b.count,
            color: color_of(&b.label, false),
        })
        .collect()
}

/// The label to color table of a legend, in the order of the labels.
pub fn color_table(
    labels: &[String],
    context: &str,
    resolver: &ColorResolver,
    options: &SeriesOptions,
) -> Vec<(String, String)> {
    let salt = hash_salt_from(context);
    labels
        .iter()
        .map(|label| {
            let req = ColorRequest::new(label)
                .overrides(&options.overrides)
                .salt(salt)
                .dark(options.theme.is_dark());
            (label.clone(), resolver.resolve(&req))
        })
        .collect()
}
