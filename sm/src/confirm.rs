//! Yes/no and free-form decision points

use tracing::{debug, warn};

use crate::error::{MigrateError, Result};
use crate::ui::{InputRequest, UiInput};

/// Attempts allowed before an unrecognised yes/no answer becomes an error
const CONFIRM_ATTEMPTS: usize = 2;

/// Routes questions to a [`UiInput`], refusing outright when input is disabled
pub struct ConfirmationGate<'a> {
    ui: &'a dyn UiInput,
    input_enabled: bool,
}

impl<'a> ConfirmationGate<'a> {
    pub fn new(ui: &'a dyn UiInput, input_enabled: bool) -> Self {
        Self { ui, input_enabled }
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    /// Ask for a free-form answer (trimmed)
    pub fn ask(&self, request: &InputRequest) -> Result<String> {
        debug!(id = %request.id, "ConfirmationGate::ask: called");
        if !self.input_enabled {
            return Err(MigrateError::Confirmation("input disabled".to_string()));
        }
        self.ui
            .input(request)
            .map(|answer| answer.trim().to_string())
            .map_err(|e| MigrateError::Confirmation(e.to_string()))
    }

    /// Ask a yes/no question
    pub fn confirm(&self, request: &InputRequest) -> Result<bool> {
        debug!(id = %request.id, "ConfirmationGate::confirm: called");
        for _ in 0..CONFIRM_ATTEMPTS {
            let answer = self.ask(request)?;
            match answer.to_lowercase().as_str() {
                "yes" => return Ok(true),
                "no" => return Ok(false),
                other => {
                    warn!(id = %request.id, answer = %other, "Unrecognised confirmation answer");
                    self.ui.output("Invalid answer. Enter \"yes\" or \"no\".");
                }
            }
        }
        Err(MigrateError::Confirmation(format!(
            "no valid answer to {:?}; expected \"yes\" or \"no\"",
            request.id
        )))
    }

    pub fn output(&self, text: &str) {
        self.ui.output(text);
    }
}
