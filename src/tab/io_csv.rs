// Primitives for reading CSV files.

use log::debug;
use serde::Deserialize;
use snafu::prelude::*;
use survey_tally::Answer;

use crate::tab::*;

/// One line of the long format: `response_id,question_id,answer_value`.
#[derive(Debug, Clone, Deserialize)]
struct CsvAnswerRow {
    response_id: String,
    question_id: String,
    answer_value: Option<String>,
}

pub fn read_csv_answers(path: &str) -> TabResult<Vec<Answer>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    read_csv_records(rdr)
}

fn read_csv_records<R: std::io::Read>(mut rdr: csv::Reader<R>) -> TabResult<Vec<Answer>> {
    let mut res: Vec<Answer> = Vec::new();
    for (idx, line_r) in rdr.deserialize::<CsvAnswerRow>().enumerate() {
        // The header is the first line.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        debug!("read_csv_answers: lineno: {:?} row: {:?}", lineno, line);
        res.push(Answer {
            question_id: line.question_id,
            response_id: line.response_id,
            value: line.answer_value.filter(|s| !s.is_empty()),
        });
    }
    Ok(res)
}
