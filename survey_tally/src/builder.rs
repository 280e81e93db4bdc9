pub use crate::config::*;

use log::{debug, info};
use std::collections::{HashMap, HashSet};

const DEFAULT_SLUG_TITLE: &str = "survey";

/// Builds the public identifier of a survey from its title.
///
/// The title is lowercased and every run of characters outside `[a-z0-9]` becomes a
/// single dash. A short suffix derived from the seed is appended so that two
/// surveys with the same title get different links.
///
/// ```
/// use survey_tally::builder::slugify;
///
/// let slug = slugify("Lunch: what's next?", 7);
/// assert!(slug.starts_with("lunch-what-s-next-"));
/// assert_eq!(slug, slugify("Lunch: what's next?", 7));
/// ```
pub fn slugify(title: &str, seed: u64) -> String {
    let mut base = String::new();
    let mut pending_dash = false;
    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !base.is_empty() {
                base.push('-');
            }
            pending_dash = false;
            base.push(c);
        } else {
            pending_dash = true;
        }
    }
    if base.is_empty() {
        base.push_str(DEFAULT_SLUG_TITLE);
    }
    let digest = sha256::digest(format!("{:08}{}", seed, title));
    format!("{}-{}", base, &digest[..5])
}

/// One respondent's submission.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Response {
    pub id: String,
    pub survey_id: String,
    pub user_id: String,
    /// One answer per question, in question order.
    pub answers: Vec<Answer>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Survey {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub public_slug: String,
    pub is_active: bool,
    /// Creation sequence, assigned when the survey is stored in a [`Surveys`] collection.
    pub created_seq: u64,
    pub questions: Vec<Question>,
    pub responses: Vec<Response>,
}

/// A builder for authoring a survey.
///
/// ```
/// use survey_tally::builder::Builder;
/// use survey_tally::{AuthUser, Role, SurveyErrors};
///
/// let admin = AuthUser {
///     id: "u1".to_string(),
///     email: "ana@example.com".to_string(),
///     full_name: None,
///     role: Some(Role::Admin),
/// };
/// let mut builder = Builder::new(&admin, "Lunch", 1)?;
/// builder.add_question(&admin, "Where?", &["Pizza".to_string(), "Tacos".to_string()])?;
/// let survey = builder.finish()?;
/// assert_eq!(survey.questions.len(), 1);
///
/// # Ok::<(), SurveyErrors>(())
/// ```
pub struct Builder {
    pub(crate) _owner: AuthUser,
    pub(crate) _title: String,
    pub(crate) _description: Option<String>,
    pub(crate) _slug: String,
    pub(crate) _questions: Vec<Question>,
}

impl Builder {
    /// Starts a new survey. Only administrators can create surveys.
    pub fn new(owner: &AuthUser, title: &str, seed: u64) -> Result<Builder, SurveyErrors> {
        if !owner.is_admin() {
            return Err(SurveyErrors::NotAdmin);
        }
        let title = title.trim();
        let slug = slugify(
            if title.is_empty() {
                DEFAULT_SLUG_TITLE
            } else {
                title
            },
            seed,
        );
        info!("Builder: new survey {:?} with slug {:?}", title, slug);
        Ok(Builder {
            _owner: owner.clone(),
            _title: title.to_string(),
            _description: None,
            _slug: slug,
            _questions: Vec::new(),
        })
    }

    pub fn description(self, text: &str) -> Result<Builder, SurveyErrors> {
        let text = text.trim();
        Ok(Builder {
            _description: if text.is_empty() {
                None
            } else {
                Some(text.to_string())
            },
            ..self
        })
    }

    pub fn slug(&self) -> &str {
        &self._slug
    }

    pub fn questions(&self) -> &[Question] {
        &self._questions
    }

    /// Adds a multiple-choice question at the end of the survey.
    ///
    /// Only the owner of the survey may add questions. The text and the options are
    /// trimmed, empty options are dropped and at least two distinct options
    /// must remain.
    pub fn add_question(
        &mut self,
        user: &AuthUser,
        text: &str,
        options: &[String],
    ) -> Result<&Question, SurveyErrors> {
        if user.id != self._owner.id {
            return Err(SurveyErrors::NotOwner);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(SurveyErrors::EmptyQuestionText);
        }
        let opts: Vec<String> = options
            .iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if opts.len() < MIN_OPTIONS {
            return Err(SurveyErrors::TooFewOptions { found: opts.len() });
        }
        let mut seen: HashSet<&str> = HashSet::new();
        for o in opts.iter() {
            if !seen.insert(o.as_str()) {
                return Err(SurveyErrors::DuplicateOption(o.clone()));
            }
        }

        let order = (self._questions.len() + 1) as u32;
        let q = Question {
            id: format!("{}-q{}", self._slug, order),
            text: text.to_string(),
            options: opts,
            order,
        };
        debug!("add_question: {:?}", q);
        self._questions.push(q);
        Ok(&self._questions[self._questions.len() - 1])
    }

    /// Creates the survey. It must have at least one question.
    pub fn finish(self) -> Result<Survey, SurveyErrors> {
        if self._questions.is_empty() {
            return Err(SurveyErrors::NoQuestions);
        }
        let digest = sha256::digest(format!("survey:{}", self._slug));
        Ok(Survey {
            id: digest[..16].to_string(),
            owner_id: self._owner.id,
            title: self._title,
            description: self._description,
            public_slug: self._slug,
            is_active: true,
            created_seq: 0,
            questions: self._questions,
            responses: Vec::new(),
        })
    }
}

impl Survey {
    /// The link shared with respondents, usually through a QR code.
    pub fn public_url(&self, origin: &str) -> String {
        format!("{}/s/{}", origin.trim_end_matches('/'), self.public_slug)
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Records the answers of a respondent.
    ///
    /// `choices` maps a question id to the selected option (or the typed text for
    /// free-text questions). Every question must be answered.
    pub fn submit_response(
        &mut self,
        user: Option<&AuthUser>,
        choices: &HashMap<String, String>,
    ) -> Result<&Response, SurveyErrors> {
        let user = user.ok_or(SurveyErrors::NotAuthenticated)?;
        if !self.is_active {
            return Err(SurveyErrors::SurveyInactive);
        }
        let known: HashSet<&str> = self.questions.iter().map(|q| q.id.as_str()).collect();
        // Sorted for a stable error.
        let mut unknown: Vec<&String> = choices
            .keys()
            .filter(|k| !known.contains(k.as_str()))
            .collect();
        unknown.sort();
        if let Some(qid) = unknown.first() {
            return Err(SurveyErrors::UnknownQuestion(qid.to_string()));
        }

        let response_id = format!("{}-r{:06}", self.public_slug, self.responses.len() + 1);
        let mut answers: Vec<Answer> = Vec::with_capacity(self.questions.len());
        for q in self.questions.iter() {
            let value = match choices.get(&q.id) {
                Some(v) if q.is_free_text() && !v.trim().is_empty() => v.clone(),
                Some(v) if q.options.contains(v) => v.clone(),
                Some(v) if !q.is_free_text() && !v.is_empty() => {
                    return Err(SurveyErrors::InvalidChoice {
                        question_id: q.id.clone(),
                        value: v.clone(),
                    });
                }
                _ => {
                    return Err(SurveyErrors::UnansweredQuestion(q.id.clone()));
                }
            };
            answers.push(Answer {
                question_id: q.id.clone(),
                response_id: response_id.clone(),
                value: Some(value),
            });
        }

        info!(
            "submit_response: survey {:?}: response {:?} from user {:?}",
            self.public_slug, response_id, user.id
        );
        self.responses.push(Response {
            id: response_id,
            survey_id: self.id.clone(),
            user_id: user.id.clone(),
            answers,
        });
        Ok(&self.responses[self.responses.len() - 1])
    }

    /// All the answers collected so far.
    pub fn answers(&self) -> Vec<Answer> {
        self.responses
            .iter()
            .flat_map(|r| r.answers.iter().cloned())
            .collect()
    }

    /// The current results of the survey, one table per question.
    pub fn tabulate(&self) -> Vec<FrequencyTable> {
        crate::aggregate(&self.questions, &self.answers())
    }
}

/// The surveys created so far.
#[derive(Debug, Clone, Default)]
pub struct Surveys {
    pub(crate) _surveys: Vec<Survey>,
    pub(crate) _last_seq: u64,
}

impl Surveys {
    pub fn new() -> Surveys {
        Surveys::default()
    }

    /// Stores a finished survey and stamps it with the next creation sequence.
    pub fn add(&mut self, mut survey: Survey) -> &mut Survey {
        self._last_seq += 1;
        survey.created_seq = self._last_seq;
        debug!(
            "Surveys::add: {:?} with sequence {}",
            survey.public_slug, survey.created_seq
        );
        self._surveys.push(survey);
        let idx = self._surveys.len() - 1;
        &mut self._surveys[idx]
    }

    pub fn len(&self) -> usize {
        self._surveys.len()
    }

    pub fn is_empty(&self) -> bool {
        self._surveys.is_empty()
    }

    /// The surveys of an administrator, newest first.
    pub fn owned_by(&self, user: &AuthUser) -> Result<Vec<&Survey>, SurveyErrors> {
        if !user.is_admin() {
            return Err(SurveyErrors::NotAdmin);
        }
        let mut res: Vec<&Survey> = self
            ._surveys
            .iter()
            .filter(|s| s.owner_id == user.id)
            .collect();
        res.sort_by(|a, b| b.created_seq.cmp(&a.created_seq));
        Ok(res)
    }

    /// The survey behind a public link.
    pub fn by_slug_mut(&mut self, slug: &str) -> Option<&mut Survey> {
        self._surveys.iter_mut().find(|s| s.public_slug == slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, role: Option<Role>) -> AuthUser {
        AuthUser {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            full_name: None,
            role,
        }
    }

    fn opts(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn lunch_survey(admin: &AuthUser) -> Survey {
        let mut builder = Builder::new(admin, "Team lunch", 42).unwrap();
        builder
            .add_question(admin, "Where?", &opts(&["Pizza", "Tacos", "Sushi"]))
            .unwrap();
        builder
            .add_question(admin, "When?", &opts(&["Monday", "Friday"]))
            .unwrap();
        builder.finish().unwrap()
    }

    fn choices(v: &[(&str, &str)]) -> HashMap<String, String> {
        v.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn slug_is_url_safe() {
        let slug = slugify("  ¿Café con Leche?  ", 3);
        assert!(slug.starts_with("caf-con-leche-"), "{}", slug);
        assert_eq!(slug.len(), "caf-con-leche-".len() + 5);
        assert!(slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    }

    #[test]
    fn slug_of_symbols_only() {
        assert!(slugify("???", 0).starts_with("survey-"));
    }

    #[test]
    fn slug_is_deterministic() {
        assert_eq!(slugify("Lunch", 9), slugify("Lunch", 9));
    }

    #[test]
    fn only_admins_create_surveys() {
        let respondent = user("u2", Some(Role::Respondent));
        assert_eq!(
            Builder::new(&respondent, "Lunch", 1).err(),
            Some(SurveyErrors::NotAdmin)
        );
        let no_role = user("u3", None);
        assert_eq!(
            Builder::new(&no_role, "Lunch", 1).err(),
            Some(SurveyErrors::NotAdmin)
        );
    }

    #[test]
    fn empty_title_uses_default_slug() {
        let admin = user("u1", Some(Role::Admin));
        let builder = Builder::new(&admin, "   ", 1).unwrap();
        assert!(builder.slug().starts_with("survey-"));
    }

    #[test]
    fn only_the_owner_adds_questions() {
        let admin = user("u1", Some(Role::Admin));
        let other_admin = user("u9", Some(Role::Admin));
        let mut builder = Builder::new(&admin, "Lunch", 1).unwrap();
        assert_eq!(
            builder
                .add_question(&other_admin, "Where?", &opts(&["A", "B"]))
                .err(),
            Some(SurveyErrors::NotOwner)
        );
    }

    #[test]
    fn question_rules() {
        let admin = user("u1", Some(Role::Admin));
        let mut builder = Builder::new(&admin, "Lunch", 1).unwrap();
        assert_eq!(
            builder.add_question(&admin, "  ", &opts(&["A", "B"])).err(),
            Some(SurveyErrors::EmptyQuestionText)
        );
        assert_eq!(
            builder
                .add_question(&admin, "Where?", &opts(&["A", "  ", ""]))
                .err(),
            Some(SurveyErrors::TooFewOptions { found: 1 })
        );
        assert_eq!(
            builder
                .add_question(&admin, "Where?", &opts(&["A", " A "]))
                .err(),
            Some(SurveyErrors::DuplicateOption("A".to_string()))
        );
        assert!(builder.questions().is_empty());
    }

    #[test]
    fn questions_are_numbered_in_order() {
        let admin = user("u1", Some(Role::Admin));
        let mut builder = Builder::new(&admin, "Lunch", 1).unwrap();
        let slug = builder.slug().to_string();
        let q = builder
            .add_question(&admin, " Where? ", &opts(&[" Pizza ", "Tacos"]))
            .unwrap()
            .clone();
        assert_eq!(q.text, "Where?");
        assert_eq!(q.options, opts(&["Pizza", "Tacos"]));
        assert_eq!(q.order, 1);
        assert_eq!(q.id, format!("{}-q1", slug));
        let q2 = builder
            .add_question(&admin, "When?", &opts(&["Now", "Later"]))
            .unwrap();
        assert_eq!(q2.order, 2);
    }

    #[test]
    fn finish_needs_questions() {
        let admin = user("u1", Some(Role::Admin));
        let builder = Builder::new(&admin, "Lunch", 1).unwrap();
        assert_eq!(builder.finish().err(), Some(SurveyErrors::NoQuestions));
    }

    #[test]
    fn finished_survey() {
        let admin = user("u1", Some(Role::Admin));
        let mut builder = Builder::new(&admin, "Lunch", 1)
            .unwrap()
            .description("  Where do we go?  ")
            .unwrap();
        builder
            .add_question(&admin, "Where?", &opts(&["A", "B"]))
            .unwrap();
        let survey = builder.finish().unwrap();
        assert!(survey.is_active);
        assert_eq!(survey.owner_id, "u1");
        assert_eq!(survey.description, Some("Where do we go?".to_string()));
        assert_eq!(
            survey.public_url("https://polls.example.com/"),
            format!("https://polls.example.com/s/{}", survey.public_slug)
        );
    }

    #[test]
    fn respondents_must_sign_in() {
        let admin = user("u1", Some(Role::Admin));
        let mut survey = lunch_survey(&admin);
        let c = choices(&[]);
        assert_eq!(
            survey.submit_response(None, &c).err(),
            Some(SurveyErrors::NotAuthenticated)
        );
    }

    #[test]
    fn inactive_surveys_refuse_responses() {
        let admin = user("u1", Some(Role::Admin));
        let respondent = user("u2", Some(Role::Respondent));
        let mut survey = lunch_survey(&admin);
        survey.deactivate();
        let c = choices(&[]);
        assert_eq!(
            survey.submit_response(Some(&respondent), &c).err(),
            Some(SurveyErrors::SurveyInactive)
        );
    }

    #[test]
    fn every_question_must_be_answered() {
        let admin = user("u1", Some(Role::Admin));
        let respondent = user("u2", Some(Role::Respondent));
        let mut survey = lunch_survey(&admin);
        let q1_id = survey.questions[0].id.clone();
        let q2_id = survey.questions[1].id.clone();
        let (q1, q2) = (q1_id.as_str(), q2_id.as_str());

        let partial = choices(&[(q1, "Pizza")]);
        assert_eq!(
            survey.submit_response(Some(&respondent), &partial).err(),
            Some(SurveyErrors::UnansweredQuestion(q2_id.clone()))
        );

        let wrong = choices(&[(q1, "Burgers"), (q2, "Monday")]);
        assert_eq!(
            survey.submit_response(Some(&respondent), &wrong).err(),
            Some(SurveyErrors::InvalidChoice {
                question_id: q1_id.clone(),
                value: "Burgers".to_string()
            })
        );

        let unknown = choices(&[(q1, "Pizza"), (q2, "Monday"), ("zzz", "x")]);
        assert_eq!(
            survey.submit_response(Some(&respondent), &unknown).err(),
            Some(SurveyErrors::UnknownQuestion("zzz".to_string()))
        );
        assert!(survey.responses.is_empty());
    }

    #[test]
    fn responses_are_tabulated() {
        let admin = user("u1", Some(Role::Admin));
        let mut survey = lunch_survey(&admin);
        let q1_id = survey.questions[0].id.clone();
        let q2_id = survey.questions[1].id.clone();
        let (q1, q2) = (q1_id.as_str(), q2_id.as_str());

        let picks: [(&str, &str); 3] = [("Pizza", "Friday"), ("Tacos", "Friday"), ("Pizza", "Monday")];
        for (idx, (where_, when)) in picks.iter().cloned().enumerate() {
            let respondent = user(&format!("r{}", idx), Some(Role::Respondent));
            let r = survey
                .submit_response(Some(&respondent), &choices(&[(q1, where_), (q2, when)]))
                .unwrap();
            assert_eq!(r.answers.len(), 2);
            assert_eq!(r.user_id, respondent.id);
        }
        assert_eq!(
            survey.responses[2].id,
            format!("{}-r000003", survey.public_slug)
        );

        let tables = survey.tabulate();
        assert_eq!(tables.len(), 2);
        assert_eq!(
            tables[0].pairs(),
            vec![
                ("Pizza".to_string(), 2),
                ("Tacos".to_string(), 1),
                ("Sushi".to_string(), 0)
            ]
        );
        assert_eq!(
            tables[1].pairs(),
            vec![("Monday".to_string(), 1), ("Friday".to_string(), 2)]
        );
    }

    #[test]
    fn new_survey_tabulates_to_zero() {
        let admin = user("u1", Some(Role::Admin));
        let survey = lunch_survey(&admin);
        let tables = survey.tabulate();
        assert!(tables.iter().all(|t| t.total() == 0 && !t.is_empty()));
    }

    #[test]
    fn surveys_of_an_owner_newest_first() {
        let admin = user("u1", Some(Role::Admin));
        let other_admin = user("u9", Some(Role::Admin));
        let mut surveys = Surveys::new();
        for (seed, (owner, title)) in [(&admin, "Lunch"), (&other_admin, "Offsite"), (&admin, "Dinner")]
            .iter()
            .enumerate()
        {
            let mut builder = Builder::new(owner, title, seed as u64).unwrap();
            builder
                .add_question(owner, "Where?", &opts(&["A", "B"]))
                .unwrap();
            surveys.add(builder.finish().unwrap());
        }
        assert_eq!(surveys.len(), 3);

        let mine: Vec<&str> = surveys
            .owned_by(&admin)
            .unwrap()
            .iter()
            .map(|s| s.title.as_str())
            .collect();
        assert_eq!(mine, vec!["Dinner", "Lunch"]);
        assert_eq!(surveys.owned_by(&other_admin).unwrap()[0].created_seq, 2);

        let respondent = user("u2", Some(Role::Respondent));
        assert_eq!(
            surveys.owned_by(&respondent).err(),
            Some(SurveyErrors::NotAdmin)
        );
        assert!(surveys
            .owned_by(&user("u3", Some(Role::Admin)))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn stored_surveys_take_responses() {
        let admin = user("u1", Some(Role::Admin));
        let respondent = user("u2", Some(Role::Respondent));
        let mut surveys = Surveys::new();
        let slug = surveys.add(lunch_survey(&admin)).public_slug.clone();
        let survey = surveys.by_slug_mut(&slug).unwrap();
        let q1 = survey.questions[0].id.clone();
        let q2 = survey.questions[1].id.clone();
        survey
            .submit_response(
                Some(&respondent),
                &choices(&[(q1.as_str(), "Sushi"), (q2.as_str(), "Monday")]),
            )
            .unwrap();
        assert_eq!(
            surveys.owned_by(&admin).unwrap()[0].tabulate()[0].count_for("Sushi"),
            Some(1)
        );
        assert!(surveys.by_slug_mut("nope").is_none());
    }
}
