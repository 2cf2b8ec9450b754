//! Step controller
//!
//! Bounded index over the four wizard steps. Transitions past either end
//! are no-ops and every step stays revisitable.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Profile,
    Income,
    Deductions,
    Review,
}

pub const STEPS: [Step; 4] = [Step::Profile, Step::Income, Step::Deductions, Step::Review];

const LAST_INDEX: usize = STEPS.len() - 1;

#[derive(Debug, Clone, Default)]
pub struct StepController {
    index: usize,
}

impl StepController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Step {
        STEPS[self.index]
    }

    pub fn next(&mut self) -> Step {
        self.index = (self.index + 1).min(LAST_INDEX);
        self.current()
    }

    pub fn back(&mut self) -> Step {
        self.index = self.index.saturating_sub(1);
        self.current()
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index == LAST_INDEX
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::Profile => "Profile",
            Step::Income => "Income",
            Step::Deductions => "Deductions",
            Step::Review => "Review",
        };
        write!(f, "{}", s)
    }
}
