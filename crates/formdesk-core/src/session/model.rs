use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::form::{FormAnswers, FormFlow, FormRecord, FormStep, InputShape};
use crate::identity::UserId;
use crate::transport::PhotoRef;

/// Input offered to the current step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepInput {
    Text(String),
    Photo(PhotoRef),
}

impl StepInput {
    pub fn shape(&self) -> InputShape {
        match self {
            StepInput::Text(_) => InputShape::Text,
            StepInput::Photo(_) => InputShape::Photo,
        }
    }

    fn into_value(self) -> String {
        match self {
            StepInput::Text(text) => text,
            StepInput::Photo(photo) => photo.0,
        }
    }
}

/// Outcome of offering input to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// The answer was recorded and `FormStep` is now current.
    Next(FormStep),
    /// The terminal step was answered; the record is ready for handoff.
    Completed(Box<FormRecord>),
    /// The input had the wrong shape; nothing was recorded.
    Rejected { expected: InputShape },
}

/// Questionnaire state of one conversant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub step: FormStep,
    pub answers: FormAnswers,
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: UserId, flow: &FormFlow) -> Self {
        Self {
            user_id,
            step: flow.first_step(),
            answers: FormAnswers::default(),
            started_at: Utc::now(),
        }
    }

    /// Records `input` for the current step and moves to the next one.
    ///
    /// Input whose shape does not match the current step is rejected and
    /// leaves the session untouched.
    pub fn advance(&mut self, flow: &FormFlow, input: StepInput) -> Advance {
        let expected = self.step.expected_shape();
        if input.shape() != expected {
            return Advance::Rejected { expected };
        }

        self.answers.record(self.step, input.into_value());

        match flow.next_step(self.step, &self.answers) {
            Some(next) => {
                self.step = next;
                Advance::Next(next)
            }
            None => Advance::Completed(Box::new(FormRecord::from_answers(
                self.user_id,
                &self.answers,
            ))),
        }
    }
}
