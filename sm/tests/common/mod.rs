//! Shared fixtures for the statemigrate integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::json;
use statemigrate::{InputRequest, UiError, UiInput};
use statestore::{Backend, SnapshotMeta, StateSnapshot};

/// Answers questions from a fixed script and records what was asked
#[derive(Debug, Default)]
pub struct Answers {
    script: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<InputRequest>>,
    shown: Mutex<Vec<String>>,
}

impl Answers {
    pub fn new(script: &[&str]) -> Self {
        Self {
            script: Mutex::new(script.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        }
    }

    pub fn asked(&self) -> Vec<InputRequest> {
        self.asked.lock().unwrap().clone()
    }

    pub fn shown(&self) -> Vec<String> {
        self.shown.lock().unwrap().clone()
    }
}

impl UiInput for Answers {
    fn input(&self, request: &InputRequest) -> Result<String, UiError> {
        self.asked.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| UiError::NoAnswer(request.id.clone()))
    }

    fn output(&self, text: &str) {
        self.shown.lock().unwrap().push(text.to_string());
    }
}

pub fn populated(id: &str) -> StateSnapshot {
    StateSnapshot::new()
        .with_resource("null_resource.a", json!({ "id": id }))
        .with_output("id", json!(id))
}

/// Write `state` into `workspace` through the backend's own manager
pub async fn seed(backend: &dyn Backend, workspace: &str, state: StateSnapshot) {
    let mut manager = backend.state_manager(workspace).await.expect("open workspace");
    manager.refresh_state().await.expect("refresh");
    manager.write_state(state).expect("write");
    manager.persist_state().await.expect("persist");
}

/// Stored snapshot and metadata of `workspace`
pub async fn read(backend: &dyn Backend, workspace: &str) -> (Option<StateSnapshot>, Option<SnapshotMeta>) {
    let mut manager = backend.state_manager(workspace).await.expect("open workspace");
    manager.refresh_state().await.expect("refresh");
    (manager.state().cloned(), manager.snapshot_meta())
}
