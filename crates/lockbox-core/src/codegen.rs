//! Access code generation.
//!
//! Generators only produce candidate values. Uniqueness within a lock is the
//! caller's job: the issuing service loops generate → check → insert with a
//! bounded number of attempts.

use crate::constants::{MAX_CODE_LENGTH, MIN_CODE_LENGTH};
use crate::{Error, Result};
use rand::Rng;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Source of candidate access code values.
///
/// Implementations must be safe to share between concurrently running
/// issuance requests.
pub trait CodeGenerator: Send + Sync {
    /// Produce a numeric string of exactly `length` digits.
    fn generate(&self, length: usize) -> String;
}

/// Check that `length` is a code length every provider accepts.
///
/// # Errors
/// Returns `Error::InvalidCodeLength` outside `MIN_CODE_LENGTH..=MAX_CODE_LENGTH`.
pub fn validate_code_length(length: usize) -> Result<usize> {
    if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&length) {
        return Err(Error::InvalidCodeLength(length));
    }
    Ok(length)
}

/// Uniform random digits from the thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCodeGenerator;

impl RandomCodeGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self, length: usize) -> String {
        let mut rng = rand::rng();
        (0..length)
            .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
            .collect()
    }
}

/// Replays a fixed list of values, then falls back to random digits.
///
/// Used to force collisions in tests and to seed reproducible demo data.
#[derive(Debug, Default)]
pub struct ScriptedCodeGenerator {
    script: Mutex<VecDeque<String>>,
}

impl ScriptedCodeGenerator {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Values not yet handed out.
    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl CodeGenerator for ScriptedCodeGenerator {
    fn generate(&self, length: usize) -> String {
        let next = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front());
        match next {
            Some(value) => value,
            None => RandomCodeGenerator.generate(length),
        }
    }
}
