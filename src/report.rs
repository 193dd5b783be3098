use log::{debug, info, warn};

use survey_insights::export::generate_chart_filename;
use survey_insights::*;

use snafu::{prelude::*, Snafu};

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::report::config_reader::*;

mod io_common;
mod io_csv;
mod io_json;
mod io_msforms;

#[derive(Debug, Snafu)]
pub enum ReportError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing the summary"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Expected a positive number, got {content}"))]
    ParsingJsonNumber { content: String },
    #[snafu(display("Missing parent directory for {path}"))]
    MissingParentDir { path: String },

    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading CSV line"))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Line {lineno} is too short"))]
    CsvLineTooShort { lineno: usize },

    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Excel file {path} has no data"))]
    EmptyExcel { path: String },
    #[snafu(display("Excel file {path} has several worksheets, a worksheet name must be provided"))]
    AmbiguousWorksheet { path: String },
    #[snafu(display("Unexpected cell on line {lineno}: {content}"))]
    ExcelWrongCellType { lineno: usize, content: String },

    #[snafu(display("Cannot find the submission time column in {path}"))]
    MissingTimestampColumn { path: String },
    #[snafu(display("Cannot read the submission time {content:?} on line {lineno}"))]
    BadTimestamp { lineno: usize, content: String },
    #[snafu(display("Cannot read the date {content:?}, expected YYYY-MM-DD"))]
    BadDate { content: String },
    #[snafu(display("A date range needs both a start and an end day"))]
    IncompleteDateRange {},

    #[snafu(display("No schema provided"))]
    MissingSchema {},
    #[snafu(display("Unknown type {field_type:?} for field {field_id:?}"))]
    UnknownFieldType { field_id: String, field_type: String },
    #[snafu(display("Field {field_id:?} is declared more than once"))]
    DuplicateField { field_id: String },
    #[snafu(display("Cannot read option {content} of field {field_id:?}"))]
    BadOptionValue { field_id: String, content: String },
    #[snafu(display("No response source provided"))]
    MissingSources {},
    #[snafu(display("Unknown input type {provider:?}"))]
    UnknownProvider { provider: String },
    #[snafu(display("Invalid color palettes"))]
    InvalidPalette { source: PaletteError },

    #[snafu(display("Difference detected between calculated summary and reference summary"))]
    ReferenceMismatch {},

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type ReportResult<T> = Result<T, ReportError>;

pub mod config_reader {
    use crate::report::*;

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
    pub struct OutputSettings {
        #[serde(rename = "surveyName")]
        pub survey_name: String,
        #[serde(rename = "outputDirectory")]
        pub output_directory: Option<String>,
        #[serde(rename = "darkMode")]
        pub dark_mode: Option<bool>,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct SchemaOption {
        pub value: JSValue,
        pub label: Option<String>,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct SchemaField {
        pub id: String,
        #[serde(rename = "type")]
        pub field_type: String,
        pub order: Option<i32>,
        pub section: Option<String>,
        pub subsection: Option<String>,
        pub options: Option<Vec<SchemaOption>>,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
    pub struct ResponseSource {
        pub provider: String,
        #[serde(rename = "filePath")]
        pub file_path: String,
        #[serde(rename = "idColumnIndex")]
        pub id_column_index: Option<JSValue>,
        #[serde(rename = "submittedAtColumnIndex")]
        pub submitted_at_column_index: Option<JSValue>,
        #[serde(rename = "firstValueRowIndex")]
        pub first_value_row_index: Option<JSValue>,
        #[serde(rename = "multiselectDelimiter")]
        pub multiselect_delimiter: Option<String>,
        #[serde(rename = "excelWorksheetName")]
        pub excel_worksheet_name: Option<String>,
    }

    impl ResponseSource {
        /// The 0-based index of the identifier column, if any.
        pub fn id_column_index_int(&self) -> ReportResult<Option<usize>> {
            read_js_column(&self.id_column_index)
        }

        /// The 0-based index of the submission time column, if any.
        pub fn submitted_at_column_index_int(&self) -> ReportResult<Option<usize>> {
            read_js_column(&self.submitted_at_column_index)
        }

        /// The 0-based index of the first row with values. The default is the
        /// row after the header.
        pub fn first_value_row_index(&self) -> ReportResult<usize> {
            match &self.first_value_row_index {
                None => Ok(1),
                x => {
                    let idx = read_js_int(x)?;
                    ensure!(
                        idx >= 2,
                        ParsingJsonNumberSnafu {
                            content: idx.to_string()
                        }
                    );
                    Ok(idx - 1)
                }
            }
        }

        pub fn multiselect_delimiter(&self) -> String {
            match &self.multiselect_delimiter {
                Some(d) if !d.is_empty() => d.clone(),
                _ => ";".to_string(),
            }
        }
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
    pub struct FilterSettings {
        pub from: Option<String>,
        pub to: Option<String>,
        pub section: Option<String>,
        pub subsection: Option<String>,
        pub search: Option<String>,
        pub today: Option<String>,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
    pub struct ColorSettings {
        pub overrides: Option<HashMap<String, String>>,
        #[serde(rename = "lightPalette")]
        pub light_palette: Option<Vec<String>>,
        #[serde(rename = "darkPalette")]
        pub dark_palette: Option<Vec<String>>,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
    pub struct SurveyConfig {
        #[serde(rename = "outputSettings")]
        pub output_settings: OutputSettings,
        #[serde(default)]
        pub schema: Vec<SchemaField>,
        #[serde(rename = "responseSources", default)]
        pub response_sources: Vec<ResponseSource>,
        pub filters: Option<FilterSettings>,
        pub colors: Option<ColorSettings>,
    }

    pub fn read_config(path: &str) -> ReportResult<SurveyConfig> {
        let config_str = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
        serde_json::from_str(&config_str).context(ParsingJsonSnafu { path })
    }

    pub fn read_schema_fields(path: &str) -> ReportResult<Vec<SchemaField>> {
        let schema_str = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
        serde_json::from_str(&schema_str).context(ParsingJsonSnafu { path })
    }

    pub fn read_summary(path: &str) -> ReportResult<JSValue> {
        let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
        let js: JSValue =
            serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
        debug!("read_summary: {:?}", js);
        Ok(js)
    }

    pub fn read_js_int(x: &Option<JSValue>) -> ReportResult<usize> {
        match x {
            Some(JSValue::Number(n)) => n.as_u64().map(|x| x as usize).context(
                ParsingJsonNumberSnafu {
                    content: n.to_string(),
                },
            ),
            Some(JSValue::String(s)) => s
                .trim()
                .parse::<usize>()
                .ok()
                .context(ParsingJsonNumberSnafu { content: s.clone() }),
            other => None.context(ParsingJsonNumberSnafu {
                content: format!("{:?}", other),
            }),
        }
    }

    // Columns start at 1, or use the Excel letters (A, B, ..., AA, ...).
    fn read_js_column(x: &Option<JSValue>) -> ReportResult<Option<usize>> {
        match x {
            None => Ok(None),
            Some(JSValue::String(s))
                if !s.trim().is_empty() && s.trim().chars().all(|c| c.is_ascii_alphabetic()) =>
            {
                let idx = s
                    .trim()
                    .to_ascii_lowercase()
                    .chars()
                    .try_fold(0usize, |acc, c| {
                        acc.checked_mul(26)?
                            .checked_add(c as usize - 'a' as usize + 1)
                    })
                    .context(ParsingJsonNumberSnafu { content: s.clone() })?;
                Ok(Some(idx - 1))
            }
            _ => {
                let idx = read_js_int(x)?;
                ensure!(
                    idx >= 1,
                    ParsingJsonNumberSnafu {
                        content: idx.to_string()
                    }
                );
                Ok(Some(idx - 1))
            }
        }
    }
}

/// Converts the declared fields into a schema.
fn validate_schema(fields: &[SchemaField]) -> ReportResult<SurveySchema> {
    ensure!(!fields.is_empty(), MissingSchemaSnafu {});
    let mut seen: HashSet<String> = HashSet::new();
    let mut res: Vec<FieldSchema> = Vec::new();
    for (idx, sf) in fields.iter().enumerate() {
        ensure!(
            seen.insert(sf.id.clone()),
            DuplicateFieldSnafu {
                field_id: sf.id.clone()
            }
        );
        let options = validate_options(sf)?;
        let kind = match sf.field_type.to_lowercase().as_str() {
            "categorical" | "radio" | "select" | "dropdown" => FieldKind::Categorical { options },
            "multiselect" | "checkbox" | "checkboxes" => FieldKind::MultiSelect { options },
            "rating" | "scale" | "likert" => FieldKind::Rating { options },
            "free_text" | "text" | "textarea" => FieldKind::FreeText,
            _ => {
                return UnknownFieldTypeSnafu {
                    field_id: sf.id.clone(),
                    field_type: sf.field_type.clone(),
                }
                .fail();
            }
        };
        if kind != FieldKind::FreeText && kind.options().is_empty() {
            warn!("validate_schema: field {:?} has no options", sf.id);
        }
        res.push(FieldSchema {
            id: sf.id.clone(),
            kind,
            order: sf.order.unwrap_or(idx as i32 + 1),
            section: sf.section.clone(),
            subsection: sf.subsection.clone(),
        });
    }
    Ok(SurveySchema::new(res))
}

fn validate_options(sf: &SchemaField) -> ReportResult<Vec<FieldOption>> {
    let mut res: Vec<FieldOption> = Vec::new();
    for opt in sf.options.iter().flatten() {
        let value = match &opt.value {
            JSValue::String(s) => s.clone(),
            JSValue::Number(n) => n.to_string(),
            JSValue::Bool(b) => b.to_string(),
            x => {
                return BadOptionValueSnafu {
                    field_id: sf.id.clone(),
                    content: x.to_string(),
                }
                .fail();
            }
        };
        let label = opt.label.clone().unwrap_or_else(|| value.clone());
        res.push(FieldOption { value, label });
    }
    Ok(res)
}

fn parse_day(s: &str) -> ReportResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .ok()
        .context(BadDateSnafu { content: s })
}

/// The filters of the configuration, with the command line taking precedence.
fn validate_filters(settings: &FilterSettings, args: &Args) -> ReportResult<ResponseFilters> {
    let from = args.from.clone().or_else(|| settings.from.clone());
    let to = args.to.clone().or_else(|| settings.to.clone());
    let date_range = match (from, to) {
        (None, None) => None,
        (Some(f), Some(t)) => Some(DateRange::new(parse_day(&f)?, parse_day(&t)?)),
        _ => return IncompleteDateRangeSnafu {}.fail(),
    };
    Ok(ResponseFilters {
        date_range,
        section: args.section.clone().or_else(|| settings.section.clone()),
        subsection: args
            .subsection
            .clone()
            .or_else(|| settings.subsection.clone()),
        search: args.search.clone().or_else(|| settings.search.clone()),
    })
}

fn validate_tables(colors: &ColorSettings) -> ReportResult<Option<ThemeTables>> {
    match (&colors.light_palette, &colors.dark_palette) {
        (None, None) => Ok(None),
        (light, dark) => {
            let std_tables = ThemeTables::standard();
            let light = light
                .clone()
                .unwrap_or_else(|| std_tables.table(ThemeMode::Light).palette.clone());
            let dark = dark
                .clone()
                .unwrap_or_else(|| std_tables.table(ThemeMode::Dark).palette.clone());
            ThemeTables::with_palettes(&light, &dark)
                .map(Some)
                .context(InvalidPaletteSnafu {})
        }
    }
}

fn read_response_data(
    root_path: &Path,
    source: &ResponseSource,
    schema: &SurveySchema,
) -> ReportResult<Vec<ResponseRecord>> {
    let p: PathBuf = root_path.join(&source.file_path);
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read response file {:?}", p2);
    match source.provider.as_str() {
        "json" => io_json::read_json_responses(&p2, schema),
        "csv" => io_csv::read_csv_responses(&p2, source, schema),
        "msforms" | "googleforms" => io_msforms::read_msforms_responses(&p2, source, schema),
        x => UnknownProviderSnafu { provider: x }.fail(),
    }
}

/// Assembles the summary of an aggregation.
fn build_summary_js(
    survey_name: &str,
    generated_for: NaiveDate,
    theme: ThemeMode,
    agg: &Aggregation,
    resolver: &ColorResolver,
    options: &SeriesOptions,
    chart_filename: &str,
) -> JSValue {
    let distributions: Vec<JSValue> = agg
        .distributions
        .iter()
        .map(|dist| {
            let series: Vec<JSValue> = chart_series(dist, resolver, options)
                .iter()
                .map(|p| json!({"label": p.label, "value": p.value, "color": p.color}))
                .collect();
            json!({
                "fieldId": dist.field_id,
                "type": dist.kind,
                "totalCounted": dist.total_counted,
                "totalInvalid": dist.total_invalid,
                "series": series,
            })
        })
        .collect();

    let daily: Vec<JSValue> = agg
        .daily_series
        .iter()
        .map(|p| json!({"date": p.date.format("%Y-%m-%d").to_string(), "count": p.count}))
        .collect();

    json!({
        "config": {
            "surveyName": survey_name,
            "generatedFor": generated_for.format("%Y-%m-%d").to_string(),
            "theme": if theme.is_dark() { "dark" } else { "light" },
        },
        "totals": {
            "totalResponses": agg.totals.total_responses,
            "totalFiltered": agg.totals.total_filtered,
            "todayCount": agg.totals.today_count,
        },
        "distributions": distributions,
        "dailySeries": daily,
        "chartFilename": chart_filename,
    })
}

// The configuration when no configuration file is given.
fn config_from_args(args: &Args) -> ReportResult<(SurveyConfig, PathBuf)> {
    let input = args.input.clone().context(MissingSourcesSnafu {})?;
    let provider = args.input_type.clone().unwrap_or_else(|| "json".to_string());
    let config = SurveyConfig {
        output_settings: OutputSettings {
            survey_name: io_common::simplify_file_name(&input),
            ..OutputSettings::default()
        },
        response_sources: vec![ResponseSource {
            provider,
            file_path: input,
            excel_worksheet_name: args.excel_worksheet_name.clone(),
            ..ResponseSource::default()
        }],
        ..SurveyConfig::default()
    };
    Ok((config, PathBuf::new()))
}

fn load_config(args: &Args) -> ReportResult<(SurveyConfig, PathBuf)> {
    let config_path = match &args.config {
        Some(p) => p.clone(),
        None => return config_from_args(args),
    };
    let mut config = read_config(&config_path)?;
    let root_p = Path::new(&config_path)
        .parent()
        .context(MissingParentDirSnafu {
            path: config_path.clone(),
        })?
        .to_path_buf();
    // An input on the command line replaces the configured sources.
    if let Some(input) = &args.input {
        let provider = args.input_type.clone().unwrap_or_else(|| "json".to_string());
        config.response_sources = vec![ResponseSource {
            provider,
            file_path: input.clone(),
            excel_worksheet_name: args.excel_worksheet_name.clone(),
            ..ResponseSource::default()
        }];
        return Ok((config, PathBuf::new()));
    }
    Ok((config, root_p))
}

/// Runs the whole pipeline: reading the configuration and the responses,
/// aggregating, coloring, and writing (or checking) the summary.
pub fn run_report(args: &Args) -> ReportResult<()> {
    let (config, root_p) = load_config(args)?;
    info!("config: {:?}", config);

    let schema_fields = match &args.schema {
        Some(p) => read_schema_fields(p)?,
        None => config.schema.clone(),
    };
    let schema = validate_schema(&schema_fields)?;

    let filter_settings = config.filters.clone().unwrap_or_default();
    let filters = validate_filters(&filter_settings, args)?;
    let pinned_today = match args.today.clone().or_else(|| filter_settings.today.clone()) {
        Some(s) => Some(parse_day(&s)?),
        None => None,
    };

    let colors = config.colors.clone().unwrap_or_default();
    let custom_tables = validate_tables(&colors)?;
    let resolver = match &custom_tables {
        Some(tables) => ColorResolver::new(tables),
        None => ColorResolver::default(),
    };

    ensure!(!config.response_sources.is_empty(), MissingSourcesSnafu {});
    let mut data: Vec<ResponseRecord> = Vec::new();
    for source in config.response_sources.iter() {
        let mut file_data = read_response_data(&root_p, source, &schema)?;
        data.append(&mut file_data);
    }
    info!("run_report: {} responses read", data.len());

    // A pinned day also pins the generation time, so that summaries can be compared.
    let (today, generated_at): (NaiveDate, DateTime<Utc>) = match pinned_today {
        Some(day) => {
            let midnight = day.and_hms_opt(0, 0, 0).context(BadDateSnafu {
                content: day.to_string(),
            })?;
            (day, Utc.from_utc_datetime(&midnight))
        }
        None => {
            let now = Utc::now();
            (now.date_naive(), now)
        }
    };
    let agg = aggregate_on(&schema, &data, &filters, today);

    let dark = args.dark || config.output_settings.dark_mode.unwrap_or(false);
    let options = SeriesOptions {
        overrides: colors.overrides.clone().unwrap_or_default(),
        ..SeriesOptions::default()
    }
    .dark(dark);

    let survey_name = config.output_settings.survey_name.as_str();
    let chart_filename = generate_chart_filename(survey_name, generated_at);
    let summary_js = build_summary_js(
        survey_name,
        today,
        options.theme,
        &agg,
        &resolver,
        &options,
        &chart_filename,
    );
    let pretty_js_summary =
        serde_json::to_string_pretty(&summary_js).context(SerializingJsonSnafu {})?;

    let out_path = match (&args.out, &config.output_settings.output_directory) {
        (Some(p), _) => Some(p.clone()),
        (None, Some(dir)) => Some(
            root_p
                .join(dir)
                .join(format!("{}_summary.json", chart_stem(&chart_filename)))
                .display()
                .to_string(),
        ),
        (None, None) => None,
    };
    match out_path.as_deref() {
        None | Some("") | Some("stdout") => println!("{}", pretty_js_summary),
        Some(p) => {
            info!("run_report: writing summary to {:?}", p);
            fs::write(p, &pretty_js_summary).context(WritingSummarySnafu { path: p })?;
        }
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(SerializingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_summary {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_summary.as_str(),
                "\n",
            );
            return ReferenceMismatchSnafu {}.fail();
        }
        info!("run_report: summary matches the reference {:?}", summary_p);
    }

    Ok(())
}

fn chart_stem(chart_filename: &str) -> &str {
    chart_filename
        .strip_suffix(".png")
        .unwrap_or(chart_filename)
}
