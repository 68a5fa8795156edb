//! Form answers and the persisted form record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::step::FormStep;
use crate::error::FormdeskError;
use crate::identity::UserId;

/// Stored value of `passport_back` when the step was skipped.
pub const PASSPORT_BACK_SKIPPED: &str = "N/A";

/// Triage status of a stored form.
///
/// The string forms are persisted and compared verbatim; existing databases
/// contain exactly these literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FormStatus {
    #[default]
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "передан")]
    Transferred,
    #[serde(rename = "швырь")]
    Rejected,
}

impl FormStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FormStatus::Pending => "pending",
            FormStatus::Transferred => "передан",
            FormStatus::Rejected => "швырь",
        }
    }

    /// Upper-case label used in admin confirmations.
    pub fn label(self) -> &'static str {
        match self {
            FormStatus::Pending => "PENDING",
            FormStatus::Transferred => "TRANSFERRED",
            FormStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for FormStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormStatus {
    type Err = FormdeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(FormStatus::Pending),
            "передан" => Ok(FormStatus::Transferred),
            "швырь" => Ok(FormStatus::Rejected),
            other => Err(FormdeskError::invalid_input(format!(
                "unknown form status '{}'",
                other
            ))),
        }
    }
}

/// Answers accumulated during a conversation, keyed by step.
///
/// Answers are only ever added; a step answered twice keeps the latest value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormAnswers {
    values: BTreeMap<FormStep, String>,
}

impl FormAnswers {
    pub fn record(&mut self, step: FormStep, value: impl Into<String>) {
        self.values.insert(step, value.into());
    }

    pub fn get(&self, step: FormStep) -> Option<&str> {
        self.values.get(&step).map(String::as_str)
    }

    pub fn contains(&self, step: FormStep) -> bool {
        self.values.contains_key(&step)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn text(&self, step: FormStep) -> String {
        self.get(step).unwrap_or_default().to_string()
    }
}

/// Field searched by the admin lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchField {
    FullName,
    Phone,
}

impl SearchField {
    pub fn column(self) -> &'static str {
        match self {
            SearchField::FullName => "fullname",
            SearchField::Phone => "phone",
        }
    }

    /// Human-readable name used in prompts and "not found" notices.
    pub fn describe(self) -> &'static str {
        match self {
            SearchField::FullName => "full name",
            SearchField::Phone => "phone number",
        }
    }
}

/// One row of the form table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormRecord {
    pub user_id: UserId,
    pub citizenship: String,
    pub age: String,
    pub fullname: String,
    pub city: String,
    pub address: String,
    pub bad_habits: String,
    pub username: String,
    pub travel: String,
    pub license: String,
    pub phone: String,
    pub passport: String,
    pub experience: String,
    pub passport_front: String,
    pub passport_back: String,
    pub selfie: String,
    pub status: FormStatus,
    pub created_at: DateTime<Utc>,
}

impl FormRecord {
    /// Builds the record for a completed conversation.
    ///
    /// Missing answers become empty strings; a skipped back side is stored
    /// as [`PASSPORT_BACK_SKIPPED`].
    pub fn from_answers(user_id: UserId, answers: &FormAnswers) -> Self {
        Self {
            user_id,
            citizenship: answers.text(FormStep::Citizenship),
            age: answers.text(FormStep::Age),
            fullname: answers.text(FormStep::Fullname),
            city: answers.text(FormStep::City),
            address: answers.text(FormStep::Address),
            bad_habits: answers.text(FormStep::BadHabits),
            username: answers.text(FormStep::Username),
            travel: answers.text(FormStep::Travel),
            license: answers.text(FormStep::License),
            phone: answers.text(FormStep::Phone),
            passport: answers.text(FormStep::Passport),
            experience: answers.text(FormStep::Experience),
            passport_front: answers.text(FormStep::PassportFront),
            passport_back: answers
                .get(FormStep::PassportBack)
                .unwrap_or(PASSPORT_BACK_SKIPPED)
                .to_string(),
            selfie: answers.text(FormStep::Selfie),
            status: FormStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// Value of the column backing `step`.
    pub fn field(&self, step: FormStep) -> &str {
        match step {
            FormStep::Citizenship => &self.citizenship,
            FormStep::Age => &self.age,
            FormStep::Fullname => &self.fullname,
            FormStep::City => &self.city,
            FormStep::Address => &self.address,
            FormStep::BadHabits => &self.bad_habits,
            FormStep::Username => &self.username,
            FormStep::Travel => &self.travel,
            FormStep::License => &self.license,
            FormStep::Phone => &self.phone,
            FormStep::Passport => &self.passport,
            FormStep::Experience => &self.experience,
            FormStep::PassportFront => &self.passport_front,
            FormStep::PassportBack => &self.passport_back,
            FormStep::Selfie => &self.selfie,
        }
    }

    /// Photo references present on this record, with the step they belong to.
    pub fn photos(&self) -> Vec<(FormStep, &str)> {
        FormStep::photo_steps()
            .map(|step| (step, self.field(step)))
            .filter(|(_, value)| !value.is_empty() && *value != PASSPORT_BACK_SKIPPED)
            .collect()
    }
}

/// Name and creation time of a form, used by period summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSummary {
    pub fullname: String,
    pub created_at: DateTime<Utc>,
}

/// Aggregate counters shown on the admin statistics screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FormStatistics {
    pub total_users: u64,
    pub total_forms: u64,
    pub rejected: u64,
    pub transferred: u64,
}
