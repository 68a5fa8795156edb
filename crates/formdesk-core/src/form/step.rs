//! Questionnaire steps and the transition function between them.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use super::model::FormAnswers;

/// Citizenship substring that makes the back side of the passport required.
pub const DEFAULT_BACK_SIDE_MARKER: &str = "киргиз";

/// The kind of inbound message a step accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum InputShape {
    Text,
    Photo,
}

/// One named stage of the questionnaire, in presentation order.
///
/// The string form of each variant is also the column name of the answer in
/// the form table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumIter,
    AsRefStr,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FormStep {
    Citizenship,
    Age,
    Fullname,
    City,
    Address,
    BadHabits,
    Username,
    Travel,
    License,
    Phone,
    Passport,
    Experience,
    PassportFront,
    PassportBack,
    Selfie,
}

impl FormStep {
    /// Column name of the answer recorded by this step.
    pub fn field(self) -> &'static str {
        match self {
            FormStep::Citizenship => "citizenship",
            FormStep::Age => "age",
            FormStep::Fullname => "fullname",
            FormStep::City => "city",
            FormStep::Address => "address",
            FormStep::BadHabits => "bad_habits",
            FormStep::Username => "username",
            FormStep::Travel => "travel",
            FormStep::License => "license",
            FormStep::Phone => "phone",
            FormStep::Passport => "passport",
            FormStep::Experience => "experience",
            FormStep::PassportFront => "passport_front",
            FormStep::PassportBack => "passport_back",
            FormStep::Selfie => "selfie",
        }
    }

    pub fn expected_shape(self) -> InputShape {
        match self {
            FormStep::PassportFront | FormStep::PassportBack | FormStep::Selfie => {
                InputShape::Photo
            }
            _ => InputShape::Text,
        }
    }

    /// Question shown to the conversant when this step becomes current.
    pub fn prompt(self) -> &'static str {
        match self {
            FormStep::Citizenship => "<b>0. What is your citizenship?</b>",
            FormStep::Age => "1. How old are you?",
            FormStep::Fullname => "2. Your full name:",
            FormStep::City => "3. City / registered address:",
            FormStep::Address => "4. Where do you live now:",
            FormStep::BadHabits => "5. Any bad habits?",
            FormStep::Username => "6. Your username on the platform:",
            FormStep::Travel => "7. Are you ready to work on business trips?",
            FormStep::License => "8. Do you have a driving license?",
            FormStep::Phone => "9. Your phone number:",
            FormStep::Passport => "10. Do you have an international passport?",
            FormStep::Experience => "11. Work experience:",
            FormStep::PassportFront => "12. Photo of the passport front side:",
            FormStep::PassportBack => "13. Photo of the passport back side:",
            FormStep::Selfie => "14. Selfie with the passport:",
        }
    }

    /// Caption attached to a forwarded photo for photo steps.
    pub fn photo_caption(self) -> Option<&'static str> {
        match self {
            FormStep::PassportFront => Some("📄 Passport front side"),
            FormStep::PassportBack => Some("📄 Passport back side"),
            FormStep::Selfie => Some("🤳 Selfie with passport"),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == FormStep::Selfie
    }

    /// Steps whose answers are photo references, in display order.
    pub fn photo_steps() -> impl Iterator<Item = FormStep> {
        FormStep::iter().filter(|s| s.expected_shape() == InputShape::Photo)
    }

    /// Steps whose answers are free text, in display order.
    pub fn text_steps() -> impl Iterator<Item = FormStep> {
        FormStep::iter().filter(|s| s.expected_shape() == InputShape::Text)
    }

    /// Fixed successor in declaration order, ignoring the branch.
    fn successor(self) -> Option<FormStep> {
        FormStep::iter().skip_while(|s| *s != self).nth(1)
    }
}

/// The questionnaire's transition rules.
///
/// Every step has a fixed successor except `PassportFront`, which goes to
/// `PassportBack` only when the recorded citizenship contains the marker
/// (case-insensitive substring), and to `Selfie` otherwise. A blank marker
/// matches nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFlow {
    back_side_marker: String,
}

impl FormFlow {
    pub fn new(back_side_marker: impl Into<String>) -> Self {
        Self {
            back_side_marker: back_side_marker.into().trim().to_lowercase(),
        }
    }

    pub fn first_step(&self) -> FormStep {
        FormStep::Citizenship
    }

    pub fn back_side_marker(&self) -> &str {
        &self.back_side_marker
    }

    pub fn requires_back_side(&self, answers: &FormAnswers) -> bool {
        if self.back_side_marker.is_empty() {
            return false;
        }
        answers
            .get(FormStep::Citizenship)
            .map(|c| c.to_lowercase().contains(&self.back_side_marker))
            .unwrap_or(false)
    }

    /// Returns the step after `current`, or `None` when `current` is terminal.
    pub fn next_step(&self, current: FormStep, answers: &FormAnswers) -> Option<FormStep> {
        match current {
            FormStep::PassportFront if self.requires_back_side(answers) => {
                Some(FormStep::PassportBack)
            }
            FormStep::PassportFront => Some(FormStep::Selfie),
            FormStep::Selfie => None,
            other => other.successor(),
        }
    }
}

impl Default for FormFlow {
    fn default() -> Self {
        Self::new(DEFAULT_BACK_SIDE_MARKER)
    }
}
