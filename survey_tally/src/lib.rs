mod config;

pub mod builder;
pub mod manual;
pub mod session;

use log::{debug, info};

use std::{
    collections::{HashMap, HashSet},
    ops::{Add, AddAssign},
};

pub use crate::config::*;

// **** Private structures ****

// Position of an option in the declared order of its question.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct OptionId(usize);

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
struct AnswerCount(u64);

impl AnswerCount {
    const EMPTY: AnswerCount = AnswerCount(0);
    const ONE: AnswerCount = AnswerCount(1);
}

impl std::iter::Sum for AnswerCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        AnswerCount(iter.map(|ac| ac.0).sum())
    }
}

impl AddAssign for AnswerCount {
    fn add_assign(&mut self, rhs: AnswerCount) {
        self.0 += rhs.0;
    }
}

impl Add for AnswerCount {
    type Output = AnswerCount;
    fn add(self: AnswerCount, rhs: AnswerCount) -> AnswerCount {
        AnswerCount(self.0 + rhs.0)
    }
}

// The declared options of a question, with a lookup from the label to its position.
struct OptionIndex<'a> {
    labels: Vec<&'a str>,
    // A label declared twice resolves to its first position.
    by_label: HashMap<&'a str, OptionId>,
}

impl<'a> OptionIndex<'a> {
    fn new(question: &'a Question) -> OptionIndex<'a> {
        let labels: Vec<&'a str> = question.options.iter().map(|s| s.as_str()).collect();
        let mut by_label: HashMap<&'a str, OptionId> = HashMap::new();
        for (idx, label) in labels.iter().enumerate() {
            by_label.entry(*label).or_insert(OptionId(idx));
        }
        if by_label.len() < labels.len() {
            debug!(
                "OptionIndex: question {:?} declares repeated options: {:?}",
                question.id, labels
            );
        }
        OptionIndex { labels, by_label }
    }

    fn lookup(&self, value: &str) -> Option<OptionId> {
        self.by_label.get(value).cloned()
    }
}

/// Counts, for every question, how many answers selected each of its options.
///
/// Arguments:
/// * `questions` the questions of the survey, in display order
/// * `answers` all the recorded answers of the survey, in any order
///
/// One table is returned per question, in the same order as the questions. Every
/// table has one entry per declared option, in the declared order, including the
/// options that nobody selected. Answers without a value, or with a value that
/// is not one of the options of their question, are not counted. Free-text
/// questions (no options) always produce an empty table.
///
/// ```
/// use survey_tally::{aggregate, Answer, Question};
///
/// let questions = vec![Question::new("q1", "Favourite colour?", &["Red", "Blue"])];
/// let answers = vec![
///     Answer::new("q1", "r1", Some("Red")),
///     Answer::new("q1", "r2", Some("Green")),
///     Answer::new("q1", "r3", None),
/// ];
/// let tables = aggregate(&questions, &answers);
/// assert_eq!(tables[0].pairs(), vec![("Red".to_string(), 1), ("Blue".to_string(), 0)]);
/// ```
pub fn aggregate(questions: &[Question], answers: &[Answer]) -> Vec<FrequencyTable> {
    info!(
        "aggregate: processing {:?} answers for {:?} questions",
        answers.len(),
        questions.len()
    );

    let by_question = group_by_question(answers);

    {
        let known: HashSet<&str> = questions.iter().map(|q| q.id.as_str()).collect();
        let orphans: Vec<&&str> = by_question
            .keys()
            .filter(|qid| !known.contains(*qid))
            .collect();
        if !orphans.is_empty() {
            debug!(
                "aggregate: ignoring answers to unknown questions: {:?}",
                orphans
            );
        }
    }

    let mut res: Vec<FrequencyTable> = Vec::with_capacity(questions.len());
    for (idx, q) in questions.iter().enumerate() {
        let q_answers: &[&Answer] = by_question
            .get(q.id.as_str())
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        let table = tabulate_question(q, q_answers);
        info!(
            "Question {}: {} ({} of {} answers counted)",
            idx + 1,
            q.text,
            table.total(),
            q_answers.len()
        );
        for e in table.entries.iter() {
            info!("      {} {}", e.count, e.option);
        }
        res.push(table);
    }
    res
}

fn group_by_question(answers: &[Answer]) -> HashMap<&str, Vec<&Answer>> {
    let mut grouped: HashMap<&str, Vec<&Answer>> = HashMap::new();
    for a in answers.iter() {
        grouped.entry(a.question_id.as_str()).or_default().push(a);
    }
    grouped
}

fn tabulate_question(question: &Question, answers: &[&Answer]) -> FrequencyTable {
    let index = OptionIndex::new(question);
    let mut tally: Vec<AnswerCount> = vec![AnswerCount::EMPTY; index.labels.len()];
    let mut skipped: AnswerCount = AnswerCount::EMPTY;

    for a in answers.iter() {
        match a.value.as_deref().and_then(|v| index.lookup(v)) {
            Some(OptionId(idx)) => {
                tally[idx] += AnswerCount::ONE;
            }
            None => {
                skipped += AnswerCount::ONE;
            }
        }
    }

    let counted: AnswerCount = tally.iter().cloned().sum();
    debug!(
        "tabulate_question: {:?}: counted {:?} skipped {:?}",
        question.id, counted, skipped
    );
    assert_eq!(counted + skipped, AnswerCount(answers.len() as u64));

    FrequencyTable {
        question_id: question.id.clone(),
        question: question.text.clone(),
        entries: index
            .labels
            .iter()
            .zip(tally.iter())
            .map(|(label, count)| OptionCount {
                option: label.to_string(),
                count: count.0,
            })
            .collect(),
    }
}
