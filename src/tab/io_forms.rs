// Reading the spreadsheets exported by online forms.

use calamine::{open_workbook, DataType, Reader, Xlsx};
use log::debug;
use snafu::prelude::*;
use std::collections::HashMap;
use survey_tally::{Answer, Question};

use crate::tab::io_common::make_default_id_lineno;
use crate::tab::*;

pub fn read_forms_answers(
    path: &str,
    src: &AnswerSource,
    questions: &[Question],
) -> TabResult<Vec<Answer>> {
    let default_id = make_default_id_lineno(path);
    let wrange = get_range(path, src)?;
    let id_col = src.response_id_column()?;
    let rows: Vec<&[DataType]> = wrange.rows().collect();
    debug!(
        "read_forms_answers: {} rows, id column: {:?}",
        rows.len(),
        id_col
    );
    read_form_rows(&rows, questions, id_col, default_id, path)
}

fn read_form_rows(
    rows: &[&[DataType]],
    questions: &[Question],
    id_col: Option<usize>,
    default_id: impl Fn(usize) -> String,
    path: &str,
) -> TabResult<Vec<Answer>> {
    let header = rows.first().context(EmptyExcelSnafu { path })?;
    debug!("read_forms_answers: header: {:?}", header);
    let col_indexes = get_col_index(questions, header)?;
    if let Some(idx) = id_col {
        ensure!(idx < header.len(), ExcelMissingIdColumnSnafu { index: idx + 1 });
    }

    let mut res: Vec<Answer> = Vec::new();
    for (idx, row) in rows.iter().enumerate().skip(1) {
        // Spreadsheet rows start at 1.
        let lineno = idx + 1;
        let response_id = match id_col.and_then(|c| row.get(c)) {
            Some(cell) => read_cell(cell, lineno)?.unwrap_or_else(|| default_id(lineno)),
            None => default_id(lineno),
        };
        for (col_idx, question_id) in col_indexes.iter() {
            let value = match row.get(*col_idx) {
                Some(cell) => read_cell(cell, lineno)?,
                None => None,
            };
            res.push(Answer {
                question_id: question_id.clone(),
                response_id: response_id.clone(),
                value,
            });
        }
        debug!("read_forms_answers: lineno: {:?} id: {:?}", lineno, response_id);
    }
    Ok(res)
}

fn read_cell(cell: &DataType, lineno: usize) -> TabResult<Option<String>> {
    match cell {
        DataType::String(s) if s.is_empty() => Ok(None),
        DataType::String(s) => Ok(Some(s.clone())),
        DataType::Empty => Ok(None),
        DataType::Int(i) => Ok(Some(i.to_string())),
        DataType::Float(f) => Ok(Some(f.to_string())),
        DataType::Bool(b) => Ok(Some(b.to_string())),
        _ => ExcelWrongCellTypeSnafu {
            lineno,
            content: format!("{:?}", cell),
        }
        .fail(),
    }
}

/// Given the header of a file (names of each of the columns) and the questions,
/// finds the column of each question, as (column index, question id).
pub fn get_col_index_mapping(
    questions: &[Question],
    header: &[Option<String>],
) -> TabResult<Vec<(usize, String)>> {
    let mut col_names: HashMap<&str, usize> = HashMap::new();
    for (idx, name) in header.iter().enumerate() {
        if let Some(s) = name {
            col_names.entry(s.trim()).or_insert(idx);
        }
    }
    debug!("get_col_index_mapping: col_names: {:?}", col_names);

    let mut col_indexes: Vec<(usize, String)> = Vec::new();
    for q in questions {
        let idx = col_names
            .get(q.text.trim())
            .context(ExcelMissingQuestionColumnSnafu {
                question: q.text.clone(),
            })?;
        col_indexes.push((*idx, q.id.clone()));
    }
    Ok(col_indexes)
}

fn get_col_index(questions: &[Question], header: &[DataType]) -> TabResult<Vec<(usize, String)>> {
    let remapped: Vec<Option<String>> = header
        .iter()
        .map(|dt| match dt {
            DataType::String(s) => Some(s.clone()),
            _ => None,
        })
        .collect();
    get_col_index_mapping(questions, &remapped)
}

fn get_range(path: &str, src: &AnswerSource) -> TabResult<calamine::Range<DataType>> {
    let worksheet_name_o = src.excel_worksheet_name.clone();
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        &path, &worksheet_name_o
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(&worksheet_name)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => EmptyExcelSnafu { path }.fail(),
            [(worksheet_name, wrange)] => {
                debug!("get_range: path: {:?} worksheet: {:?}", &path, &worksheet_name);
                Ok(wrange.clone())
            }
            _ => AmbiguousWorksheetSnafu { path }.fail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(x: &str) -> DataType {
        DataType::String(x.to_string())
    }

    fn questions() -> Vec<Question> {
        vec![
            Question::new("q1", "Where?", &["Pizza", "Tacos"]),
            Question::new("q2", "How many?", &["1", "2", "3"]),
        ]
    }

    fn default_id(lineno: usize) -> String {
        format!("form.xlsx-{:08}", lineno)
    }

    #[test]
    fn rows_to_answers() {
        let data: Vec<Vec<DataType>> = vec![
            vec![s("Id"), s("How many?"), s("Where?")],
            vec![s("a1"), DataType::Float(2.0), s("Pizza")],
            vec![DataType::Empty, DataType::Empty, s("Tacos")],
        ];
        let rows: Vec<&[DataType]> = data.iter().map(|r| r.as_slice()).collect();
        let answers = read_form_rows(&rows, &questions(), Some(0), default_id, "form.xlsx").unwrap();
        assert_eq!(
            answers,
            vec![
                Answer::new("q1", "a1", Some("Pizza")),
                Answer::new("q2", "a1", Some("2")),
                Answer::new("q1", "form.xlsx-00000003", Some("Tacos")),
                Answer::new("q2", "form.xlsx-00000003", None),
            ]
        );
    }

    #[test]
    fn default_ids() {
        let data: Vec<Vec<DataType>> = vec![
            vec![s("Where?"), s("How many?")],
            vec![s("Pizza"), DataType::Int(3)],
        ];
        let rows: Vec<&[DataType]> = data.iter().map(|r| r.as_slice()).collect();
        let answers = read_form_rows(&rows, &questions(), None, default_id, "form.xlsx").unwrap();
        assert_eq!(answers[0].response_id, "form.xlsx-00000002");
        assert_eq!(answers[1].value, Some("3".to_string()));
    }

    #[test]
    fn missing_column() {
        let header = vec![s("Where?"), s("When?")];
        let res = get_col_index(&questions(), &header);
        assert!(matches!(
            res,
            Err(TabError::ExcelMissingQuestionColumn { question }) if question == "How many?"
        ));
    }

    #[test]
    fn wrong_cell() {
        let data: Vec<Vec<DataType>> = vec![
            vec![s("Where?"), s("How many?")],
            vec![s("Pizza"), DataType::DateTime(44000.0)],
        ];
        let rows: Vec<&[DataType]> = data.iter().map(|r| r.as_slice()).collect();
        let res = read_form_rows(&rows, &questions(), None, default_id, "form.xlsx");
        assert!(matches!(res, Err(TabError::ExcelWrongCellType { lineno: 2, .. })));
    }

    #[test]
    fn empty_sheet() {
        let res = read_form_rows(&[], &questions(), None, default_id, "form.xlsx");
        assert!(matches!(res, Err(TabError::EmptyExcel { .. })));
    }

    #[test]
    fn id_column_out_of_range() {
        let data: Vec<Vec<DataType>> = vec![vec![s("Where?"), s("How many?")]];
        let rows: Vec<&[DataType]> = data.iter().map(|r| r.as_slice()).collect();
        let res = read_form_rows(&rows, &questions(), Some(4), default_id, "form.xlsx");
        assert!(matches!(res, Err(TabError::ExcelMissingIdColumn { index: 5 })));
    }
}
