//! Scripted driver for exercising the executor and session flow without a browser

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::PortalResult;
use crate::models::Action;
use crate::portal::actions::UiDriver;

type AttemptHandler = dyn Fn(usize, &Action) -> PortalResult<()> + Send + Sync;

/// Driver whose outcomes come from a closure receiving the 0-based global
/// attempt count and the action under attempt.
pub struct MockDriver {
    attempts: AtomicUsize,
    log: Mutex<Vec<String>>,
    handler: Box<AttemptHandler>,
}

impl MockDriver {
    pub fn new(handler: impl Fn(usize, &Action) -> PortalResult<()> + Send + Sync + 'static) -> Self {
        Self {
            attempts: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        }
    }

    /// Total attempts made, across all actions.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Locators in the order they were attempted, one entry per attempt.
    pub fn attempted_locators(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl UiDriver for MockDriver {
    async fn attempt(&self, action: &Action) -> PortalResult<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(action.locator.clone());
        (self.handler)(attempt, action)
    }
}
