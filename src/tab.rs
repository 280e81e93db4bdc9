use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};
use survey_tally::*;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::tab::chart::bar_color;
use crate::tab::config_reader::*;

pub mod chart;
pub mod config_reader;
mod io_common;
mod io_csv;
mod io_forms;
mod io_json;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TabError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON in {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing the summary"))]
    WritingJson { source: serde_json::Error },
    #[snafu(display("Error opening spreadsheet {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The spreadsheet {path} has no usable worksheet"))]
    EmptyExcel { path: String },
    #[snafu(display(
        "The spreadsheet {path} has several worksheets: choose one with excelWorksheetName"
    ))]
    AmbiguousWorksheet { path: String },
    #[snafu(display("Unexpected cell type at line {lineno}: {content}"))]
    ExcelWrongCellType { lineno: usize, content: String },
    #[snafu(display("No column of the header matches the question {question:?}"))]
    ExcelMissingQuestionColumn { question: String },
    #[snafu(display("The column {index} is not in the header"))]
    ExcelMissingIdColumn { index: usize },
    #[snafu(display("Could not understand the column index {value}"))]
    ParsingColumnIndex { value: String },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error parsing CSV line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Provider not implemented: {provider}"))]
    UnknownProvider { provider: String },
    #[snafu(display(
        "No questions: provide them in the configuration, with --questions or with a json export"
    ))]
    MissingQuestions {},
    #[snafu(display("The source {path} needs the questions of the survey before it can be read"))]
    QuestionsRequired { path: String },
    #[snafu(display("Could not read the current directory"))]
    CurrentDir { source: std::io::Error },
    #[snafu(display("No input: use --config or --input"))]
    MissingInput {},
    #[snafu(display("No answer source in the configuration"))]
    NoAnswerSources {},
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Difference detected between calculated summary and reference summary"))]
    ReferenceMismatch {},
}

pub type TabResult<T> = Result<T, TabError>;

/// What one answer source contributes to the tabulation.
///
/// Only the json exports carry their own questions.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct SourceData {
    pub questions: Option<Vec<Question>>,
    pub answers: Vec<Answer>,
}

/// The result of a complete run.
#[derive(Debug, Clone)]
pub struct Tabulation {
    pub title: String,
    pub tables: Vec<FrequencyTable>,
    pub summary: JSValue,
}

fn tables_to_json(tables: &[FrequencyTable]) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for table in tables {
        let data: Vec<JSValue> = table
            .entries
            .iter()
            .enumerate()
            .map(|(idx, e)| json!({"option": e.option, "count": e.count, "color": bar_color(idx)}))
            .collect();
        l.push(json!({
            "questionId": table.question_id,
            "question": table.question,
            "total": table.total(),
            "data": data
        }));
    }
    l
}

/// The number of distinct responses that answered at least one of the questions.
fn count_responses(questions: &[Question], answers: &[Answer]) -> usize {
    let known: HashSet<&str> = questions.iter().map(|q| q.id.as_str()).collect();
    answers
        .iter()
        .filter(|a| known.contains(a.question_id.as_str()))
        .map(|a| a.response_id.as_str())
        .collect::<HashSet<&str>>()
        .len()
}

fn build_summary_js(
    settings: &OutputSettings,
    tables: &[FrequencyTable],
    responses: usize,
) -> JSValue {
    let c = OutputConfig {
        survey: settings.survey_title.clone(),
        slug: settings.survey_slug.clone(),
        date: settings.survey_date.clone(),
    };
    json!({
        "config": c,
        "responses": responses,
        "results": tables_to_json(tables)
    })
}

fn read_answer_data(
    root_p: &Path,
    src: &AnswerSource,
    questions: Option<&[Question]>,
) -> TabResult<SourceData> {
    let p: PathBuf = root_p.join(&src.file_path);
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read answer file {:?}", p2);
    match src.provider.as_str() {
        "json" => io_json::read_json_export(&p2, src),
        "csv" => Ok(SourceData {
            questions: None,
            answers: io_csv::read_csv_answers(&p2)?,
        }),
        "xlsx" => {
            let qs = questions.context(QuestionsRequiredSnafu { path: p2.clone() })?;
            Ok(SourceData {
                questions: None,
                answers: io_forms::read_forms_answers(&p2, src, qs)?,
            })
        }
        x => UnknownProviderSnafu { provider: x }.fail(),
    }
}

/// Reads all the answer sources of a configuration and tabulates them.
///
/// `root_p` is the directory against which the paths of the sources are resolved.
pub fn run_tabulation(config: &SurveyConfig, root_p: &Path) -> TabResult<Tabulation> {
    if config.answer_sources.is_empty() {
        return NoAnswerSourcesSnafu {}.fail();
    }

    let mut questions: Option<Vec<Question>> =
        config.questions.as_deref().map(read_question_rows);

    let mut answers: Vec<Answer> = Vec::new();
    for src in config.answer_sources.iter() {
        let mut data = read_answer_data(root_p, src, questions.as_deref())?;
        if let Some(qs) = data.questions.take() {
            if questions.is_none() {
                info!(
                    "run_tabulation: using the {} questions of {}",
                    qs.len(),
                    src.file_path
                );
                questions = Some(qs);
            } else {
                debug!("run_tabulation: ignoring the questions of {}", src.file_path);
            }
        }
        debug!("run_tabulation: {} answers in {}", data.answers.len(), src.file_path);
        answers.append(&mut data.answers);
    }

    let questions = questions.context(MissingQuestionsSnafu {})?;
    info!(
        "run_tabulation: {} questions, {} answers",
        questions.len(),
        answers.len()
    );

    let tables = aggregate(&questions, &answers);
    let responses = count_responses(&questions, &answers);
    let summary = build_summary_js(&config.output_settings, &tables, responses);
    Ok(Tabulation {
        title: config.output_settings.survey_title.clone(),
        tables,
        summary,
    })
}

/// Builds a configuration with a single source from the command line flags.
fn config_from_args(args: &Args) -> TabResult<SurveyConfig> {
    let input = args.input.clone().context(MissingInputSnafu {})?;
    let provider = match &args.input_type {
        Some(x) => x.clone(),
        None => Path::new(&input)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default(),
    };
    let title = args
        .title
        .clone()
        .unwrap_or_else(|| io_common::simplify_file_name(&input));
    Ok(SurveyConfig {
        output_settings: OutputSettings {
            survey_title: title,
            survey_slug: None,
            survey_date: None,
            output_directory: None,
        },
        answer_sources: vec![AnswerSource {
            provider,
            file_path: input,
            survey_id: None,
            excel_worksheet_name: None,
            response_id_column_index: None,
        }],
        questions: None,
    })
}

fn summary_file_name(settings: &OutputSettings) -> String {
    let stem: String = settings
        .survey_slug
        .clone()
        .unwrap_or_else(|| settings.survey_title.clone())
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{}_summary.json", stem)
}

/// Where the summary goes. None stands for the standard output.
fn output_path(out: &Option<String>, settings: &OutputSettings, root_p: &Path) -> Option<PathBuf> {
    match out.as_deref() {
        Some("stdout") => None,
        Some(p) => Some(PathBuf::from(p)),
        None => settings
            .output_directory
            .as_ref()
            .map(|d| root_p.join(d).join(summary_file_name(settings))),
    }
}

fn write_summary(pretty_js: &str, dest: Option<PathBuf>) -> TabResult<()> {
    match dest {
        None => {
            println!("{}", pretty_js);
        }
        Some(p) => {
            let path = p.display().to_string();
            info!("write_summary: writing summary to {:?}", path);
            if let Some(parent) = p.parent().filter(|x| !x.as_os_str().is_empty()) {
                fs::create_dir_all(parent).context(WritingOutputSnafu { path: path.clone() })?;
            }
            fs::write(&p, pretty_js).context(WritingOutputSnafu { path })?;
        }
    }
    Ok(())
}

/// Compares the summary against a reference summary file.
fn check_reference(pretty_js_stats: &str, summary_p: &str) -> TabResult<()> {
    let summary_ref = read_summary(summary_p)?;
    debug!("check_reference: reference: {:?}", summary_ref);
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(WritingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference string");
        print_diff(pretty_js_summary_ref.as_str(), pretty_js_stats, "\n");
        return ReferenceMismatchSnafu {}.fail();
    }
    info!("check_reference: the summary matches {:?}", summary_p);
    Ok(())
}

/// Applies the command line flags on top of a configuration file.
///
/// A relative `--input` is resolved against the current directory, not the directory of the
/// configuration.
fn apply_overrides(config: &mut SurveyConfig, args: &Args) -> TabResult<()> {
    if args.input.is_some() {
        let cwd = std::env::current_dir().context(CurrentDirSnafu {})?;
        let mut from_args = config_from_args(args)?;
        for src in from_args.answer_sources.iter_mut() {
            src.file_path = cwd.join(&src.file_path).display().to_string();
        }
        config.answer_sources = from_args.answer_sources;
    }
    if let Some(qs_path) = &args.questions {
        config.questions = Some(read_questions(qs_path)?);
    }
    if let Some(title) = &args.title {
        config.output_settings.survey_title = title.clone();
    }
    if let Some(ws) = &args.excel_worksheet_name {
        for src in config.answer_sources.iter_mut() {
            if src.excel_worksheet_name.is_none() {
                src.excel_worksheet_name = Some(ws.clone());
            }
        }
    }
    Ok(())
}

/// Runs a complete tabulation as described by the command line.
pub fn run_survey(args: &Args) -> TabResult<Tabulation> {
    let (mut config, root_p) = match &args.config {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let root_p = Path::new(config_path)
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_default();
            (config, root_p)
        }
        None => (config_from_args(args)?, PathBuf::new()),
    };

    // Flags take precedence over the configuration file.
    apply_overrides(&mut config, args)?;
    info!("config: {:?}", config);

    let tabulation = run_tabulation(&config, &root_p)?;

    let pretty_js_stats =
        serde_json::to_string_pretty(&tabulation.summary).context(WritingJsonSnafu {})?;
    write_summary(
        &pretty_js_stats,
        output_path(&args.out, &config.output_settings, &root_p),
    )?;

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        check_reference(&pretty_js_stats, summary_p)?;
    }

    Ok(tabulation)
}

#[cfg(test)]
fn run_survey_test(test_name: &str, config_lpath: &str, summary_lpath: &str) -> TabResult<Tabulation> {
    let test_dir = option_env!("SURVEYTAB_TEST_DIR")
        .unwrap_or(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data"));
    info!("Running test {}", test_name);
    let args = Args {
        config: Some(format!("{}/{}/{}", test_dir, test_name, config_lpath)),
        reference: Some(format!("{}/{}/{}", test_dir, test_name, summary_lpath)),
        out: Some("stdout".to_string()),
        ..Default::default()
    };
    let res = run_survey(&args);
    if let Err(e) = &res {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured {}", e);
        if let Some(bt) = snafu::ErrorCompat::backtrace(e) {
            eprintln!("trace: {}", bt);
        } else {
            eprintln!("No trace found");
        }
    }
    res
}

#[cfg(test)]
pub fn test_wrapper(test_name: &str) -> TabResult<Tabulation> {
    run_survey_test(
        test_name,
        format!("{}_config.json", test_name).as_str(),
        format!("{}_expected_summary.json", test_name).as_str(),
    )
}
