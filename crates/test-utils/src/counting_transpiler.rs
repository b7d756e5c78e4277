use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use pipewright::errors::TransformError;
use pipewright::platform::transpile::{TranspileFuture, Transpiler};

/// A fake transpiler that:
/// - records which files were transpiled, in call order
/// - returns the source unchanged, or a configured error for chosen files.
#[derive(Debug, Clone, Default)]
pub struct CountingTranspiler {
    calls: Arc<Mutex<Vec<String>>>,
    failures: Arc<Mutex<HashMap<String, TransformError>>>,
}

impl CountingTranspiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every transpile of `file` fail with `err`.
    pub fn fail_on(self, file: &str, err: TransformError) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(file.to_string(), err);
        self
    }

    /// Number of transpile calls so far.
    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Files passed to the transpiler, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reset(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl Transpiler for CountingTranspiler {
    fn transpile<'a>(&'a self, source: &'a str, file: &'a str) -> TranspileFuture<'a> {
        let calls = Arc::clone(&self.calls);
        let failure = self.failures.lock().unwrap().get(file).cloned();

        Box::pin(async move {
            {
                let mut guard = calls.lock().unwrap();
                guard.push(file.to_string());
            }
            match failure {
                Some(err) => Err(err.into()),
                None => Ok(source.to_string()),
            }
        })
    }
}
