// ********* Input data structures ***********

use std::collections::HashMap;
use std::error::Error;
use std::fmt::Display;

use chrono::{DateTime, NaiveDate, Utc};

/// One configured possible value of a field.
///
/// The `value` is what gets stored in responses, the `label` is what gets
/// displayed in charts and legends.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct FieldOption {
    pub value: String,
    pub label: String,
}

impl FieldOption {
    pub fn new(value: &str, label: &str) -> FieldOption {
        FieldOption {
            value: value.to_string(),
            label: label.to_string(),
        }
    }

    /// An option whose value is also its label.
    pub fn simple(value: &str) -> FieldOption {
        FieldOption::new(value, value)
    }
}

/// The kind of a field, with only the data relevant to each kind.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum FieldKind {
    /// A single choice among options (radio buttons, dropdowns).
    Categorical { options: Vec<FieldOption> },
    /// Any number of choices among options.
    MultiSelect { options: Vec<FieldOption> },
    /// A single choice on a scale. The options carry the order of the scale.
    Rating { options: Vec<FieldOption> },
    /// Free-form text. Never turned into label buckets.
    FreeText,
}

impl FieldKind {
    /// The configured options, empty for free text.
    pub fn options(&self) -> &[FieldOption] {
        match self {
            FieldKind::Categorical { options }
            | FieldKind::MultiSelect { options }
            | FieldKind::Rating { options } => options.as_slice(),
            FieldKind::FreeText => &[],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Categorical { .. } => "categorical",
            FieldKind::MultiSelect { .. } => "multiselect",
            FieldKind::Rating { .. } => "rating",
            FieldKind::FreeText => "free_text",
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FieldSchema {
    pub id: String,
    pub kind: FieldKind,
    /// Display order of the field in the survey.
    pub order: i32,
    pub section: Option<String>,
    pub subsection: Option<String>,
}

/// The ordered list of fields of a survey.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct SurveySchema {
    pub fields: Vec<FieldSchema>,
}

impl SurveySchema {
    pub fn new(fields: Vec<FieldSchema>) -> SurveySchema {
        SurveySchema { fields }
    }

    pub fn field(&self, id: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// The fields sorted by their `order`. Fields with the same order keep
    /// their position in the schema.
    pub fn ordered_fields(&self) -> Vec<&FieldSchema> {
        let mut res: Vec<&FieldSchema> = self.fields.iter().collect();
        res.sort_by_key(|f| f.order);
        res
    }
}

/// A raw value stored in a response. The expected shape depends on the field kind.
#[derive(PartialEq, Debug, Clone)]
pub enum ResponseValue {
    Text(String),
    Number(f64),
    Bool(bool),
    List(Vec<String>),
    Empty,
}

impl ResponseValue {
    /// The textual form used to match scalar values against option values.
    /// Lists and empty values have no scalar form.
    pub fn as_scalar_text(&self) -> Option<String> {
        match self {
            ResponseValue::Text(s) => Some(s.clone()),
            ResponseValue::Number(n) if n.is_finite() && n.fract() == 0.0 => {
                Some(format!("{}", *n as i64))
            }
            ResponseValue::Number(n) => Some(n.to_string()),
            ResponseValue::Bool(b) => Some(b.to_string()),
            ResponseValue::List(_) | ResponseValue::Empty => None,
        }
    }

    /// True for the empty marker, blank text and empty lists.
    pub fn is_blank(&self) -> bool {
        match self {
            ResponseValue::Empty => true,
            ResponseValue::Text(s) => s.trim().is_empty(),
            ResponseValue::List(l) => l.iter().all(|s| s.trim().is_empty()),
            ResponseValue::Number(_) | ResponseValue::Bool(_) => false,
        }
    }
}

/// One submission of the survey.
#[derive(PartialEq, Debug, Clone)]
pub struct ResponseRecord {
    pub id: String,
    pub field_values: HashMap<String, ResponseValue>,
    pub submitted_at: DateTime<Utc>,
}

impl ResponseRecord {
    pub fn value(&self, field_id: &str) -> Option<&ResponseValue> {
        self.field_values.get(field_id)
    }
}

/// An inclusive range of calendar days.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> DateRange {
        DateRange { start, end }
    }

    /// A range with the start after the end. It does not contain any day.
    pub fn is_malformed(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// The filters applied before aggregating. All the filters are combined.
///
/// The value `"all"`, a blank string or `None` means no restriction.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ResponseFilters {
    pub date_range: Option<DateRange>,
    pub section: Option<String>,
    pub subsection: Option<String>,
    pub search: Option<String>,
}

impl ResponseFilters {
    pub const NONE: ResponseFilters = ResponseFilters {
        date_range: None,
        section: None,
        subsection: None,
        search: None,
    };

    pub fn with_date_range(self, start: NaiveDate, end: NaiveDate) -> ResponseFilters {
        ResponseFilters {
            date_range: Some(DateRange::new(start, end)),
            ..self
        }
    }

    pub fn with_section(self, section: &str) -> ResponseFilters {
        ResponseFilters {
            section: Some(section.to_string()),
            ..self
        }
    }

    pub fn with_subsection(self, subsection: &str) -> ResponseFilters {
        ResponseFilters {
            subsection: Some(subsection.to_string()),
            ..self
        }
    }

    pub fn with_search(self, search: &str) -> ResponseFilters {
        ResponseFilters {
            search: Some(search.to_string()),
            ..self
        }
    }

    /// The section restriction, if any.
    pub fn section_scope(&self) -> Option<&str> {
        active_scope(&self.section)
    }

    /// The subsection restriction, if any.
    pub fn subsection_scope(&self) -> Option<&str> {
        active_scope(&self.subsection)
    }

    /// The lowercased, trimmed search query, if any.
    pub fn search_query(&self) -> Option<String> {
        match self.search.as_deref().map(|s| s.trim()) {
            Some(s) if !s.is_empty() => Some(s.to_lowercase()),
            _ => None,
        }
    }
}

fn active_scope(scope: &Option<String>) -> Option<&str> {
    match scope.as_deref().map(|s| s.trim()) {
        None => None,
        Some(s) if s.is_empty() || s.eq_ignore_ascii_case("all") => None,
        Some(s) => Some(s),
    }
}

// ******** Output data structures *********

/// One (label, count) pair of a distribution.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Bucket {
    pub value: String,
    pub label: String,
    pub count: u64,
}

/// The summary of a free-text field.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct FreeTextSummary {
    pub provided: u64,
    pub empty: u64,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FieldDistribution {
    pub field_id: String,
    pub kind: &'static str,
    /// One bucket per configured option, in the order of the configuration.
    pub buckets: Vec<Bucket>,
    pub total_counted: u64,
    pub total_invalid: u64,
    /// Only set for free-text fields.
    pub free_text: Option<FreeTextSummary>,
}

impl FieldDistribution {
    pub fn bucket_sum(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).sum()
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct DailySeriesPoint {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct Totals {
    pub total_responses: u64,
    pub total_filtered: u64,
    pub today_count: u64,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Aggregation {
    pub distributions: Vec<FieldDistribution>,
    pub daily_series: Vec<DailySeriesPoint>,
    pub totals: Totals,
}

impl Aggregation {
    pub fn distribution(&self, field_id: &str) -> Option<&FieldDistribution> {
        self.distributions.iter().find(|d| d.field_id == field_id)
    }
}

// ********* Theme **********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum ThemeMode {
    Light,
    Dark,
}

impl ThemeMode {
    pub fn from_dark_flag(is_dark_mode: bool) -> ThemeMode {
        if is_dark_mode {
            ThemeMode::Dark
        } else {
            ThemeMode::Light
        }
    }

    pub fn is_dark(&self) -> bool {
        *self == ThemeMode::Dark
    }
}

/// Errors when building custom theme tables.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum PaletteError {
    EmptyPalette,
    /// The light and dark palettes must have the same number of slots.
    MismatchedPalettes { light: usize, dark: usize },
    /// A table entry would not be visible.
    InvisibleColor { table: &'static str, color: String },
}

impl Error for PaletteError {}

impl Display for PaletteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaletteError::EmptyPalette => write!(f, "palette must contain at least one color"),
            PaletteError::MismatchedPalettes { light, dark } => write!(
                f,
                "light palette has {} colors but dark palette has {}",
                light, dark
            ),
            PaletteError::InvisibleColor { table, color } => {
                write!(f, "invisible color {:?} in table {}", color, table)
            }
        }
    }
}

/// Errors when assembling a schema or responses with the builder.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SchemaError {
    DuplicateField(String),
    UnknownField(String),
    /// A field setting was applied before any field was declared.
    NoField,
}

impl Error for SchemaError {}

impl Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaError::DuplicateField(id) => write!(f, "field {:?} is declared twice", id),
            SchemaError::UnknownField(id) => write!(f, "field {:?} is not in the schema", id),
            SchemaError::NoField => write!(f, "no field declared yet"),
        }
    }
}
