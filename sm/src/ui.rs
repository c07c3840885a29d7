//! Prompt surface used for confirmations and free-form answers

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use thiserror::Error;
use tracing::debug;

/// One question put to the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRequest {
    /// Stable identifier, usable for scripting answers
    pub id: String,

    /// Short question shown next to the prompt
    pub query: String,

    /// Longer explanation shown before the question
    pub description: String,
}

impl InputRequest {
    pub fn new(id: impl Into<String>, query: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            query: query.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum UiError {
    #[error("interrupted")]
    Interrupted,

    #[error("end of input")]
    Eof,

    #[error("terminal error: {0}")]
    Terminal(String),

    /// Scripted UIs ran out of answers
    #[error("no answer available for {0:?}")]
    NoAnswer(String),
}

/// Where questions are asked and messages are shown
pub trait UiInput: Send + Sync {
    /// Ask a question and return the raw answer
    fn input(&self, request: &InputRequest) -> Result<String, UiError>;

    /// Show an informational message
    fn output(&self, text: &str);
}

/// Interactive terminal prompts backed by rustyline
#[derive(Debug, Default)]
pub struct TerminalUi;

impl TerminalUi {
    pub fn new() -> Self {
        Self
    }
}

impl UiInput for TerminalUi {
    fn input(&self, request: &InputRequest) -> Result<String, UiError> {
        debug!(id = %request.id, "TerminalUi::input: called");
        println!("{}", request.query.bold().yellow());
        if !request.description.is_empty() {
            println!("  {}\n", request.description.replace('\n', "\n  "));
        }

        let mut rl = DefaultEditor::new().map_err(|e| UiError::Terminal(e.to_string()))?;
        match rl.readline(&format!("  {} ", "Enter a value:".bold())) {
            Ok(line) => {
                println!();
                Ok(line.trim().to_string())
            }
            Err(ReadlineError::Interrupted) => Err(UiError::Interrupted),
            Err(ReadlineError::Eof) => Err(UiError::Eof),
            Err(e) => Err(UiError::Terminal(e.to_string())),
        }
    }

    fn output(&self, text: &str) {
        println!("{}", text);
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Answers questions from a fixed script and records everything asked and shown
    #[derive(Debug, Default)]
    pub struct ScriptedUi {
        answers: Mutex<VecDeque<String>>,
        asked: Mutex<Vec<InputRequest>>,
        shown: Mutex<Vec<String>>,
    }

    impl ScriptedUi {
        pub fn new<I, S>(answers: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            debug!("ScriptedUi::new: called");
            Self {
                answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
                ..Default::default()
            }
        }

        /// Ids of every question asked, in order
        pub fn asked_ids(&self) -> Vec<String> {
            self.asked.lock().unwrap().iter().map(|r| r.id.clone()).collect()
        }

        pub fn asked(&self) -> Vec<InputRequest> {
            self.asked.lock().unwrap().clone()
        }

        pub fn shown(&self) -> Vec<String> {
            self.shown.lock().unwrap().clone()
        }

        pub fn remaining(&self) -> usize {
            self.answers.lock().unwrap().len()
        }
    }

    impl UiInput for ScriptedUi {
        fn input(&self, request: &InputRequest) -> Result<String, UiError> {
            debug!(id = %request.id, "ScriptedUi::input: called");
            self.asked.lock().unwrap().push(request.clone());
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| UiError::NoAnswer(request.id.clone()))
        }

        fn output(&self, text: &str) {
            self.shown.lock().unwrap().push(text.to_string());
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_scripted_answers_in_order() {
            let ui = ScriptedUi::new(["yes", "no"]);
            let request = InputRequest::new("q", "Proceed?", "");
            assert_eq!(ui.input(&request).unwrap(), "yes");
            assert_eq!(ui.input(&request).unwrap(), "no");
            assert!(matches!(ui.input(&request), Err(UiError::NoAnswer(_))));
            assert_eq!(ui.asked_ids(), vec!["q", "q", "q"]);
        }
    }
}
