// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// A question of a survey.
///
/// A question with no options is a free-text question. It is accepted everywhere
/// but it never produces any count.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Question {
    /// Unique within a survey.
    pub id: String,
    pub text: String,
    /// The selectable labels, in the order in which they should be displayed.
    pub options: Vec<String>,
    /// Position of the question in the survey. Only used for display ordering.
    pub order: u32,
}

impl Question {
    pub fn new(id: &str, text: &str, options: &[&str]) -> Question {
        Question {
            id: id.to_string(),
            text: text.to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
            order: 0,
        }
    }

    pub fn is_free_text(&self) -> bool {
        self.options.is_empty()
    }
}

/// The value selected by one respondent for one question.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Answer {
    pub question_id: String,
    pub response_id: String,
    /// The selected label. It is expected to match one of the options of the
    /// question verbatim, but this is not enforced.
    pub value: Option<String>,
}

impl Answer {
    pub fn new(question_id: &str, response_id: &str, value: Option<&str>) -> Answer {
        Answer {
            question_id: question_id.to_string(),
            response_id: response_id.to_string(),
            value: value.map(|s| s.to_string()),
        }
    }
}

// ******** Output data structures *********

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct OptionCount {
    pub option: String,
    pub count: u64,
}

/// The tabulation of one question.
///
/// There is exactly one entry per declared option, in the declared order.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FrequencyTable {
    pub question_id: String,
    pub question: String,
    pub entries: Vec<OptionCount>,
}

impl FrequencyTable {
    /// The number of answers that matched one of the options.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|e| e.count).sum()
    }

    /// True for questions that do not declare any option.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_for(&self, option: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|e| e.option == option)
            .map(|e| e.count)
    }

    pub fn pairs(&self) -> Vec<(String, u64)> {
        self.entries
            .iter()
            .map(|e| (e.option.clone(), e.count))
            .collect()
    }
}

// ********* Users **********

#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum Role {
    Admin,
    Respondent,
    /// Roles are free-form in the profile store.
    Other(String),
}

impl Role {
    pub fn parse(s: &str) -> Role {
        match s {
            "admin" => Role::Admin,
            "respondent" => Role::Respondent,
            x => Role::Other(x.to_string()),
        }
    }
}

/// The authenticated user, with the profile information attached to it.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Option<Role>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }
}

// ********* Errors **********

/// Errors raised when authoring a survey or submitting a response.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SurveyErrors {
    NotAuthenticated,
    NotAdmin,
    NotOwner,
    SurveyInactive,
    EmptyQuestionText,
    TooFewOptions { found: usize },
    DuplicateOption(String),
    NoQuestions,
    UnknownQuestion(String),
    UnansweredQuestion(String),
    InvalidChoice { question_id: String, value: String },
}

impl Error for SurveyErrors {}

impl Display for SurveyErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurveyErrors::NotAuthenticated => write!(f, "a signed-in user is required"),
            SurveyErrors::NotAdmin => write!(f, "only administrators can create or list surveys"),
            SurveyErrors::NotOwner => write!(f, "only the owner can edit this survey"),
            SurveyErrors::SurveyInactive => write!(f, "the survey is not active"),
            SurveyErrors::EmptyQuestionText => write!(f, "the question text is empty"),
            SurveyErrors::TooFewOptions { found } => write!(
                f,
                "a question needs at least {} options, found {}",
                MIN_OPTIONS, found
            ),
            SurveyErrors::DuplicateOption(o) => write!(f, "option {:?} is repeated", o),
            SurveyErrors::NoQuestions => write!(f, "the survey has no questions"),
            SurveyErrors::UnknownQuestion(q) => write!(f, "unknown question {:?}", q),
            SurveyErrors::UnansweredQuestion(q) => write!(f, "question {:?} has no answer", q),
            SurveyErrors::InvalidChoice { question_id, value } => write!(
                f,
                "{:?} is not an option of question {:?}",
                value, question_id
            ),
        }
    }
}

/// Errors raised by the authentication session.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SessionErrors {
    InvalidCredentials,
    EmailNotConfirmed,
    /// The provider accepted the credentials but no user could be loaded afterwards.
    MissingUser,
    /// The session was torn down.
    Disposed,
    Provider(String),
}

impl Error for SessionErrors {}

impl Display for SessionErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionErrors::InvalidCredentials => write!(f, "invalid email or password"),
            SessionErrors::EmailNotConfirmed => {
                write!(f, "email not confirmed, check your inbox")
            }
            SessionErrors::MissingUser => write!(f, "no user after signing in"),
            SessionErrors::Disposed => write!(f, "the session has been torn down"),
            SessionErrors::Provider(msg) => write!(f, "authentication error: {}", msg),
        }
    }
}

// ********* Authoring rules **********

/// The minimum number of options of a multiple-choice question.
pub const MIN_OPTIONS: usize = 2;
