// Reading the exports of the survey database.

use std::collections::HashSet;

use log::{debug, info};
use serde::Deserialize;
use serde_json::Value as JSValue;
use snafu::prelude::*;
use survey_tally::Answer;

use crate::tab::io_common::scalar_text;
use crate::tab::*;

#[derive(Debug, Clone, Deserialize)]
struct ExportSurvey {
    id: Option<String>,
    title: Option<String>,
    public_slug: Option<String>,
    is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
struct ExportResponse {
    id: String,
    survey_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ExportAnswer {
    response_id: String,
    question_id: String,
    #[serde(default)]
    answer_value: JSValue,
}

#[derive(Debug, Clone, Deserialize)]
struct SurveyExport {
    survey: Option<ExportSurvey>,
    #[serde(default)]
    questions: Vec<QuestionRow>,
    /// Absent when the export was not restricted to responses.
    responses: Option<Vec<ExportResponse>>,
    #[serde(default)]
    response_answers: Vec<ExportAnswer>,
}

pub fn read_json_export(path: &str, src: &AnswerSource) -> TabResult<SourceData> {
    let js = read_json_file(path)?;
    let export: SurveyExport = serde_json::from_value(js).context(ParsingJsonSnafu { path })?;
    Ok(export_to_source_data(export, src.survey_id.as_deref()))
}

fn export_to_source_data(export: SurveyExport, survey_id: Option<&str>) -> SourceData {
    if let Some(s) = &export.survey {
        info!(
            "read_json_export: survey {:?} ({:?}, slug {:?}, active: {:?})",
            s.title, s.id, s.public_slug, s.is_active
        );
    }
    let survey_id: Option<String> = survey_id
        .map(|s| s.to_string())
        .or_else(|| export.survey.as_ref().and_then(|s| s.id.clone()));

    let questions = read_question_rows(&export.questions);

    let kept_responses: Option<HashSet<String>> = export.responses.as_ref().map(|rs| {
        rs.iter()
            .filter(|r| match (&survey_id, &r.survey_id) {
                (Some(sid), Some(rsid)) => sid == rsid,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .map(|r| r.id.clone())
            .collect()
    });
    debug!(
        "read_json_export: survey_id: {:?} kept responses: {:?}",
        survey_id,
        kept_responses.as_ref().map(|x| x.len())
    );

    let answers: Vec<Answer> = export
        .response_answers
        .iter()
        .filter(|a| match &kept_responses {
            Some(kept) => kept.contains(&a.response_id),
            None => true,
        })
        .map(|a| Answer {
            question_id: a.question_id.clone(),
            response_id: a.response_id.clone(),
            value: scalar_text(&a.answer_value),
        })
        .collect();

    info!(
        "read_json_export: {} questions, {} of {} answers kept",
        questions.len(),
        answers.len(),
        export.response_answers.len()
    );

    SourceData {
        questions: Some(questions),
        answers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use survey_tally::aggregate;

    fn export() -> SurveyExport {
        serde_json::from_value(json!({
            "survey": {"id": "s1", "title": "Team lunch", "public_slug": "team-lunch-1f0a2", "is_active": true},
            "questions": [
                {"id": "q2", "question_text": "How many?", "type": "single_choice", "options": ["1", "2"], "order": 2},
                {"id": "q1", "question_text": "Where?", "type": "single_choice", "options": ["Pizza", "Tacos"], "order": 1}
            ],
            "responses": [
                {"id": "r1", "survey_id": "s1", "user_id": "u1"},
                {"id": "r2", "survey_id": "s2", "user_id": "u2"}
            ],
            "response_answers": [
                {"response_id": "r1", "question_id": "q1", "answer_value": "Pizza"},
                {"response_id": "r1", "question_id": "q2", "answer_value": 2},
                {"response_id": "r2", "question_id": "q1", "answer_value": "Tacos"},
                {"response_id": "r3", "question_id": "q1", "answer_value": "Tacos"},
                {"response_id": "r1", "question_id": "q1", "answer_value": null},
                {"response_id": "r1", "question_id": "q1"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn filtered_by_survey_of_the_export() {
        let data = export_to_source_data(export(), None);
        let qs = data.questions.unwrap();
        assert_eq!(qs[0].id, "q1");
        assert_eq!(qs[1].id, "q2");
        assert_eq!(
            data.answers,
            vec![
                Answer::new("q1", "r1", Some("Pizza")),
                Answer::new("q2", "r1", Some("2")),
                Answer::new("q1", "r1", None),
                Answer::new("q1", "r1", None),
            ]
        );
    }

    #[test]
    fn filtered_by_survey_of_the_source() {
        let data = export_to_source_data(export(), Some("s2"));
        assert_eq!(data.answers, vec![Answer::new("q1", "r2", Some("Tacos"))]);
    }

    #[test]
    fn without_responses() {
        let mut e = export();
        e.responses = None;
        e.survey = None;
        let data = export_to_source_data(e, None);
        assert_eq!(data.answers.len(), 6);
    }

    #[test]
    fn tabulated() {
        let data = export_to_source_data(export(), None);
        let tables = aggregate(&data.questions.unwrap(), &data.answers);
        assert_eq!(
            tables[0].pairs(),
            vec![("Pizza".to_string(), 1), ("Tacos".to_string(), 0)]
        );
        assert_eq!(
            tables[1].pairs(),
            vec![("1".to_string(), 0), ("2".to_string(), 1)]
        );
    }
}
