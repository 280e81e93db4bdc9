use clap::Parser;

/// This is a survey tabulation program.
#[derive(Parser, Debug, Clone, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The file describing the survey and the location of its answers (JSON).
    /// For more information about the file format, read the manual of the survey_tally crate.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,
    /// (file path) A reference summary in JSON format. If provided, surveytab will
    /// check that the tabulated output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the survey will be written in JSON format to the given
    /// location. Setting this option overrides the output directory that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) The file containing the answers. Setting this option replaces the
    /// answer sources of the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (json, csv or xlsx) The type of the input. Inferred from the file extension if not provided.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (file path) A JSON list with the questions of the survey. Required for the csv and xlsx
    /// inputs when no configuration provides them.
    #[clap(short, long, value_parser)]
    pub questions: Option<String>,

    /// The title of the survey, used in the summary.
    #[clap(long, value_parser)]
    pub title: Option<String>,

    /// When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    // Other arguments
    /// If passed as an argument, the results are also printed as bar charts.
    #[clap(long, takes_value = false)]
    pub chart: bool,

    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
