/*!

This is the long-form manual for `survey_tally` and `surveytab`.

## Tabulation

A survey is a list of questions. Each question has a text and a list of options. A question
without any option is a free-text question: its answers are stored but never counted.

Every answer refers to one question and to one response (a respondent's submission). The
tabulation counts, for each question, how many answers selected each option:

- the tables come in the order of the questions, and the entries in the order of the options
- every option is present, even with a count of zero
- answers that have no value, or whose value is not exactly one of the options, are not counted
- the order in which the answers are provided does not matter

## Input formats

The following formats are supported by `surveytab`:
* `json` an export of the survey tables
* `csv` one answer per line
* `xlsx` a spreadsheet exported from an online form

### `json`

The export contains the rows of the `questions`, `responses` and `response_answers` tables, and
optionally the `survey` row:

```text
{
  "survey": {"id": "s1", "title": "Team lunch", "public_slug": "team-lunch-1f0a2", "is_active": true},
  "questions": [
    {"id": "q1", "question_text": "Where?", "type": "single_choice", "options": ["Pizza", "Tacos"], "order": 1}
  ],
  "responses": [{"id": "r1", "survey_id": "s1", "user_id": "u2"}],
  "response_answers": [{"response_id": "r1", "question_id": "q1", "answer_value": "Pizza"}]
}
```

Questions are sorted by their `order` field. An `options` field that is not a list is read as
no options. Only the answers of the responses of the survey are counted.

### `csv`

```text
response_id,question_id,answer_value
r1,q1,Pizza
r2,q1,
```

An empty value is a missing answer. The questions must be provided separately, either in the
configuration file or with the `--questions` flag (a JSON list of question rows, as in the
`json` export).

### `xlsx`

The first row contains the texts of the questions. Every other row is a response and every
cell is the selected option:

|           | Where? | When?  |
|-----------|--------|--------|
| response1 | Pizza  | Friday |
| response2 | Tacos  |        |

The questions must be provided separately, as for `csv`. The identifier of a response is read
from the column `responseIdColumnIndex` if it is configured.

## Configuration

```text
{
  "outputSettings": {
    "surveyTitle": "Team lunch",
    "surveySlug": "team-lunch-1f0a2",
    "surveyDate": "2024-05-01",
    "outputDirectory": "output"
  },
  "answerSources": [
    {"provider": "csv", "filePath": "answers.csv"}
  ],
  "questions": [
    {"id": "q1", "question_text": "Where?", "options": ["Pizza", "Tacos"], "order": 1}
  ]
}
```

Paths are relative to the configuration file. Several sources may be provided: their answers
are added together.

## Output

The summary is written in JSON. Each option comes with the color of its bar:

```text
{
  "config": {"survey": "Team lunch", "slug": "team-lunch-1f0a2"},
  "responses": 2,
  "results": [
    {"questionId": "q1", "question": "Where?", "total": 1,
     "data": [{"option": "Pizza", "count": 1, "color": "#22c55e"},
              {"option": "Tacos", "count": 0, "color": "#3b82f6"}]}
  ]
}
```

With `--chart`, the results are also printed as bars in the terminal.

 */
