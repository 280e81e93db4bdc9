use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use snafu::prelude::*;
use std::fs;

use survey_tally::Question;

use crate::tab::io_common::normalize_options;
use crate::tab::*;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "surveyTitle")]
    pub survey_title: String,
    #[serde(rename = "surveySlug")]
    pub survey_slug: Option<String>,
    #[serde(rename = "surveyDate")]
    pub survey_date: Option<String>,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
}

/// The `config` block of the summary.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub survey: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSource {
    /// json, csv or xlsx
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    /// Only for json exports: restricts the responses to this survey.
    #[serde(rename = "surveyId")]
    pub survey_id: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    /// A 1-based number or a column letter.
    #[serde(rename = "responseIdColumnIndex")]
    pub response_id_column_index: Option<JSValue>,
}

impl AnswerSource {
    /// The 0-based column holding the response identifiers, if any.
    pub fn response_id_column(&self) -> TabResult<Option<usize>> {
        match &self.response_id_column_index {
            None | Some(JSValue::Null) => Ok(None),
            Some(x) => read_js_column(x).map(Some),
        }
    }
}

/// A question, in the shape of a row of the `questions` table.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRow {
    pub id: String,
    pub question_text: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub options: Option<JSValue>,
    pub order: Option<i64>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SurveyConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "answerSources")]
    pub answer_sources: Vec<AnswerSource>,
    pub questions: Option<Vec<QuestionRow>>,
}

pub fn read_json_file(path: &str) -> TabResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read_json_file: {:?}: {} bytes", path, contents.len());
    serde_json::from_str(&contents).context(ParsingJsonSnafu { path })
}

pub fn read_config(path: &str) -> TabResult<SurveyConfig> {
    let js = read_json_file(path)?;
    serde_json::from_value(js).context(ParsingJsonSnafu { path })
}

pub fn read_summary(path: &str) -> TabResult<JSValue> {
    let js = read_json_file(path)?;
    debug!("read_summary: results: {:?}", js["results"]);
    Ok(js)
}

pub fn read_questions(path: &str) -> TabResult<Vec<QuestionRow>> {
    let js = read_json_file(path)?;
    serde_json::from_value(js).context(ParsingJsonSnafu { path })
}

/// Turns question rows into questions, sorted by their `order` field.
///
/// Rows without an order come last. The sort is stable.
pub fn read_question_rows(rows: &[QuestionRow]) -> Vec<Question> {
    let mut sorted: Vec<&QuestionRow> = rows.iter().collect();
    sorted.sort_by_key(|r| r.order.unwrap_or(i64::MAX));
    sorted
        .iter()
        .map(|r| Question {
            id: r.id.clone(),
            text: r.question_text.clone(),
            options: normalize_options(r.options.as_ref()),
            order: r.order.and_then(|o| u32::try_from(o).ok()).unwrap_or(0),
        })
        .collect()
}

/// Reads a column position: a 1-based number, or a spreadsheet column name (A, B, ..., AA).
/// The result is 0-based.
pub fn read_js_column(x: &JSValue) -> TabResult<usize> {
    let parsed: Option<usize> = match x {
        JSValue::Number(n) => n.as_u64().map(|x| x as usize),
        JSValue::String(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()) => {
            let mut acc: Option<usize> = Some(0);
            for c in s.to_ascii_lowercase().chars() {
                acc = acc
                    .and_then(|a| a.checked_mul(26))
                    .and_then(|a| a.checked_add(c as usize - 'a' as usize + 1));
            }
            acc
        }
        JSValue::String(s) => s.parse::<usize>().ok(),
        _ => None,
    };
    match parsed {
        Some(idx) if idx >= 1 => Ok(idx - 1),
        _ => ParsingColumnIndexSnafu {
            value: x.to_string(),
        }
        .fail(),
    }
}
