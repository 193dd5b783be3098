use clap::Parser;

/// This is a survey response aggregation program. It produces chart-ready series, with colors.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The file containing the survey configuration (schema, sources, filters, colors)
    /// in JSON format. See the manual for the format.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A reference file containing a summary in JSON format. If provided, surveyviz will
    /// check that the produced summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary will be written in JSON format to the given
    /// location. Otherwise it is printed on the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) If specified, the responses are read from this file. Setting this option
    /// overrides the response sources of the configuration.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default json) The type of the input: json, csv or msforms.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (file path, optional) A JSON file with the list of fields. Overrides the schema of the configuration.
    #[clap(short, long, value_parser)]
    pub schema: Option<String>,

    /// When using an Excel file, indicates the name of the worksheet to use. Required when the
    /// workbook has several worksheets.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (YYYY-MM-DD) Only keep the responses submitted on or after this day.
    #[clap(long, value_parser)]
    pub from: Option<String>,

    /// (YYYY-MM-DD) Only keep the responses submitted on or before this day.
    #[clap(long, value_parser)]
    pub to: Option<String>,

    /// (section id or 'all') Only aggregate the fields of this section.
    #[clap(long, value_parser)]
    pub section: Option<String>,

    /// (subsection id or 'all') Only aggregate the fields of this subsection.
    #[clap(long, value_parser)]
    pub subsection: Option<String>,

    /// Only keep the responses with a free-text answer containing this text (case-insensitive).
    #[clap(long, value_parser)]
    pub search: Option<String>,

    /// (YYYY-MM-DD, default: the current UTC day) The day used for the 'today' count.
    #[clap(long, value_parser)]
    pub today: Option<String>,

    /// If passed as an argument, colors are picked for a dark theme.
    #[clap(long, takes_value = false)]
    pub dark: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
