mod colors;
mod config;
mod palette;
mod series;

pub mod builder;
pub mod export;
pub mod manual;

use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};

use std::collections::{BTreeMap, HashMap};

pub use crate::colors::*;
pub use crate::config::*;
pub use crate::palette::*;
pub use crate::series::*;

// **** Private structures ****

// Running counts for one field.
#[derive(Eq, PartialEq, Debug, Clone)]
struct Tally {
    counts: Vec<u64>,
    counted: u64,
    invalid: u64,
}

impl Tally {
    fn new(num_options: usize) -> Tally {
        Tally {
            counts: vec![0; num_options],
            counted: 0,
            invalid: 0,
        }
    }

    fn into_distribution(self, field: &FieldSchema) -> FieldDistribution {
        let buckets = field
            .kind
            .options()
            .iter()
            .zip(self.counts)
            .map(|(opt, count)| Bucket {
                value: opt.value.clone(),
                label: opt.label.clone(),
                count,
            })
            .collect();
        FieldDistribution {
            field_id: field.id.clone(),
            kind: field.kind.name(),
            buckets,
            total_counted: self.counted,
            total_invalid: self.invalid,
            free_text: None,
        }
    }
}

// Finds the option matching a raw value.
struct OptionMatcher<'s> {
    options: &'s [FieldOption],
    exact: HashMap<&'s str, usize>,
}

impl<'s> OptionMatcher<'s> {
    fn new(options: &'s [FieldOption]) -> OptionMatcher<'s> {
        let mut exact: HashMap<&'s str, usize> = HashMap::new();
        for (idx, opt) in options.iter().enumerate() {
            // The first declaration wins if a value is repeated.
            exact.entry(opt.value.as_str()).or_insert(idx);
        }
        OptionMatcher { options, exact }
    }

    /// Exact value first, then a case-insensitive match on the value and
    /// then on the label.
    fn find(&self, raw: &str) -> Option<usize> {
        if let Some(idx) = self.exact.get(raw) {
            return Some(*idx);
        }
        let needle = raw.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.options
            .iter()
            .position(|o| o.value.trim().to_lowercase() == needle)
            .or_else(|| {
                self.options
                    .iter()
                    .position(|o| o.label.trim().to_lowercase() == needle)
            })
    }
}

/// Aggregates the responses for the current (UTC) day.
///
/// See [aggregate_on] for the details.
pub fn aggregate(
    schema: &SurveySchema,
    responses: &[ResponseRecord],
    filters: &ResponseFilters,
) -> Aggregation {
    aggregate_on(schema, responses, filters, Utc::now().date_naive())
}

/// Turns a set of responses into distributions and a daily series.
///
/// Arguments:
/// * `schema` the fields of the survey
/// * `responses` all the responses collected so far
/// * `filters` the restrictions to apply before counting
/// * `today` the day used to compute `today_count`. This count ignores the
///   date range, the other filters still apply.
///
/// This never fails: invalid values are reported in the `total_invalid` of
/// each distribution and degenerate inputs produce empty structures.
///
/// ```
/// use survey_insights::builder::Builder;
/// use survey_insights::{aggregate_on, ResponseFilters};
/// # use chrono::{NaiveDate, TimeZone, Utc};
///
/// let mut builder = Builder::new().categorical("priority", &["High", "Medium", "Low"])?;
/// let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
/// for answer in ["High", "Medium", "High"] {
///     builder.add_response_simple(at, &[("priority", answer)])?;
/// }
///
/// let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
/// let res = aggregate_on(&builder.schema(), builder.responses(), &ResponseFilters::NONE, today);
/// let counts: Vec<u64> = res.distributions[0].buckets.iter().map(|b| b.count).collect();
/// assert_eq!(counts, vec![2, 1, 0]);
/// assert_eq!(res.totals.today_count, 3);
/// # Ok::<(), survey_insights::SchemaError>(())
/// ```
pub fn aggregate_on(
    schema: &SurveySchema,
    responses: &[ResponseRecord],
    filters: &ResponseFilters,
    today: NaiveDate,
) -> Aggregation {
    info!(
        "aggregate: processing {:?} responses, {:?} fields, filters: {:?}",
        responses.len(),
        schema.fields.len(),
        filters
    );

    let searched = search_responses(schema, responses, filters);
    let filtered = restrict_to_range(&searched, filters.date_range);
    debug!("aggregate: {:?} responses after filtering", filtered.len());

    let distributions: Vec<FieldDistribution> = considered_fields(schema, filters)
        .into_iter()
        .map(|field| compute_distribution(field, &filtered))
        .collect();

    let daily_series = compute_daily_series(&filtered, filters.date_range);

    // The date range does not apply to the count of the day.
    let today_count = searched
        .iter()
        .filter(|r| r.submitted_at.date_naive() == today)
        .count() as u64;

    let totals = Totals {
        total_responses: responses.len() as u64,
        total_filtered: filtered.len() as u64,
        today_count,
    };
    info!(
        "aggregate: {:?} distributions, {:?} days, totals: {:?}",
        distributions.len(),
        daily_series.len(),
        totals
    );

    Aggregation {
        distributions,
        daily_series,
        totals,
    }
}

// Every filter but the date range.
fn search_responses<'a>(
    schema: &SurveySchema,
    responses: &'a [ResponseRecord],
    filters: &ResponseFilters,
) -> Vec<&'a ResponseRecord> {
    let query = match filters.search_query() {
        Some(q) => q,
        None => return responses.iter().collect(),
    };
    // The search looks at every free-text field, even outside of the selected section.
    let text_fields: Vec<&str> = schema
        .fields
        .iter()
        .filter(|f| f.kind == FieldKind::FreeText)
        .map(|f| f.id.as_str())
        .collect();

    responses
        .iter()
        .filter(|r| matches_search(r, &text_fields, &query))
        .collect()
}

fn restrict_to_range<'a>(
    responses: &[&'a ResponseRecord],
    date_range: Option<DateRange>,
) -> Vec<&'a ResponseRecord> {
    match date_range {
        None => responses.to_vec(),
        Some(range) if range.is_malformed() => {
            warn!(
                "restrict_to_range: start date {} is after end date {}, no response selected",
                range.start, range.end
            );
            Vec::new()
        }
        Some(range) => responses
            .iter()
            .filter(|r| range.contains(r.submitted_at.date_naive()))
            .copied()
            .collect(),
    }
}

fn matches_search(response: &ResponseRecord, text_fields: &[&str], query: &str) -> bool {
    text_fields
        .iter()
        .any(|fid| match response.value(fid) {
            Some(ResponseValue::Text(s)) => s.to_lowercase().contains(query),
            _ => false,
        })
}

// The fields in scope, in display order.
fn considered_fields<'s>(schema: &'s SurveySchema, filters: &ResponseFilters) -> Vec<&'s FieldSchema> {
    let section = filters.section_scope();
    let subsection = filters.subsection_scope();
    schema
        .ordered_fields()
        .into_iter()
        .filter(|f| in_scope(&f.section, section) && in_scope(&f.subsection, subsection))
        .collect()
}

fn in_scope(field_scope: &Option<String>, wanted: Option<&str>) -> bool {
    match wanted {
        None => true,
        Some(w) => field_scope.as_deref().map(|s| s.trim()) == Some(w),
    }
}

fn compute_distribution(field: &FieldSchema, responses: &[&ResponseRecord]) -> FieldDistribution {
    let dist = match &field.kind {
        FieldKind::Categorical { options } | FieldKind::Rating { options } => {
            count_single(field, options, responses)
        }
        FieldKind::MultiSelect { options } => count_multi(field, options, responses),
        FieldKind::FreeText => summarize_free_text(field, responses),
    };
    debug!(
        "compute_distribution: field {:?}: counted {:?} invalid {:?} buckets {:?}",
        dist.field_id, dist.total_counted, dist.total_invalid, dist.buckets
    );
    dist
}

fn count_single(
    field: &FieldSchema,
    options: &[FieldOption],
    responses: &[&ResponseRecord],
) -> FieldDistribution {
    let matcher = OptionMatcher::new(options);
    let mut tally = Tally::new(options.len());
    for r in responses.iter() {
        let idx = r
            .value(&field.id)
            .and_then(|v| v.as_scalar_text())
            .and_then(|s| matcher.find(&s));
        match idx {
            Some(i) => {
                tally.counts[i] += 1;
                tally.counted += 1;
            }
            None => {
                tally.invalid += 1;
            }
        }
    }
    tally.into_distribution(field)
}

fn count_multi(
    field: &FieldSchema,
    options: &[FieldOption],
    responses: &[&ResponseRecord],
) -> FieldDistribution {
    let matcher = OptionMatcher::new(options);
    let mut tally = Tally::new(options.len());
    for r in responses.iter() {
        let selections: Vec<String> = match r.value(&field.id) {
            Some(ResponseValue::List(items)) => items
                .iter()
                .filter(|s| !s.trim().is_empty())
                .cloned()
                .collect(),
            // A single scalar counts as a selection of one option.
            Some(v) => v
                .as_scalar_text()
                .filter(|s| !s.trim().is_empty())
                .map(|s| vec![s])
                .unwrap_or_default(),
            None => Vec::new(),
        };

        if selections.is_empty() {
            tally.invalid += 1;
            continue;
        }

        let mut seen = vec![false; options.len()];
        for s in selections.iter() {
            match matcher.find(s) {
                Some(i) if !seen[i] => {
                    seen[i] = true;
                    tally.counts[i] += 1;
                }
                Some(_) => {
                    // Same option selected twice in one response.
                }
                None => {
                    debug!(
                        "count_multi: response {:?}: unknown selection {:?} for field {:?}",
                        r.id, s, field.id
                    );
                    tally.invalid += 1;
                }
            }
        }
        if seen.iter().any(|b| *b) {
            tally.counted += 1;
        }
    }
    tally.into_distribution(field)
}

fn summarize_free_text(field: &FieldSchema, responses: &[&ResponseRecord]) -> FieldDistribution {
    let mut summary = FreeTextSummary::default();
    for r in responses.iter() {
        match r.value(&field.id) {
            Some(v) if !v.is_blank() => summary.provided += 1,
            _ => summary.empty += 1,
        }
    }
    FieldDistribution {
        field_id: field.id.clone(),
        kind: field.kind.name(),
        buckets: Vec::new(),
        total_counted: summary.provided,
        total_invalid: 0,
        free_text: Some(summary),
    }
}

fn compute_daily_series(
    responses: &[&ResponseRecord],
    range: Option<DateRange>,
) -> Vec<DailySeriesPoint> {
    let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for r in responses.iter() {
        *per_day.entry(r.submitted_at.date_naive()).or_insert(0) += 1;
    }

    let (start, end) = match range {
        Some(dr) if dr.is_malformed() => return Vec::new(),
        Some(dr) => (dr.start, dr.end),
        None => match (per_day.keys().next(), per_day.keys().next_back()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Vec::new(),
        },
    };

    start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|date| DailySeriesPoint {
            date,
            count: per_day.get(&date).cloned().unwrap_or(0),
        })
        .collect()
}
