//! Host input sources.
//!
//! The display server has no windowing toolkit of its own. Whatever presents
//! the framebuffer feeds pointer and keyboard input back through an
//! [`InputSource`]; headless hosts use [`ScriptedInput`], which replays a
//! text script one batch per pump.
//!
//! Script format, one action per line:
//!
//! ```text
//! # comment
//! click 20 30
//! move 40 50
//! release
//! key a
//! key space
//! ---
//! click 5 5
//! ```
//!
//! A blank line or `---` ends the current batch.

use std::collections::VecDeque;

use crate::error::{KernelError, Result};

/// One host input action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Click { x: i32, y: i32 },
    Move { x: i32, y: i32 },
    Release,
    Key(char),
}

/// Supplies batches of input to the display server.
pub trait InputSource: Send {
    /// Next batch of actions; empty when nothing is pending.
    fn poll(&mut self) -> Vec<InputAction>;
}

/// Pre-recorded input replayed one batch per poll.
#[derive(Debug, Default, Clone)]
pub struct ScriptedInput {
    batches: VecDeque<Vec<InputAction>>,
}

impl ScriptedInput {
    pub fn new(batches: impl IntoIterator<Item = Vec<InputAction>>) -> Self {
        Self {
            batches: batches.into_iter().collect(),
        }
    }

    /// Parse the script format described in the module docs.
    pub fn parse(script: &str) -> Result<Self> {
        let mut batches = VecDeque::new();
        let mut current = Vec::new();

        for (lineno, raw) in script.lines().enumerate() {
            let line = raw.trim();
            if line.starts_with('#') {
                continue;
            }
            if line.is_empty() || line == "---" {
                if !current.is_empty() {
                    batches.push_back(std::mem::take(&mut current));
                }
                continue;
            }
            current.push(parse_action(line).map_err(|reason| KernelError::Config {
                reason: format!("input script line {}: {reason}", lineno + 1),
            })?);
        }
        if !current.is_empty() {
            batches.push_back(current);
        }

        Ok(Self { batches })
    }

    /// Batches not yet replayed.
    pub fn remaining(&self) -> usize {
        self.batches.len()
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> Vec<InputAction> {
        self.batches.pop_front().unwrap_or_default()
    }
}

fn parse_action(line: &str) -> std::result::Result<InputAction, String> {
    let mut parts = line.split_whitespace();
    let verb = parts.next().unwrap_or_default();
    let mut coord = |name: &str| -> std::result::Result<i32, String> {
        parts
            .next()
            .ok_or_else(|| format!("`{verb}` is missing {name}"))?
            .parse::<i32>()
            .map_err(|e| format!("bad {name}: {e}"))
    };

    match verb {
        "click" => Ok(InputAction::Click {
            x: coord("x")?,
            y: coord("y")?,
        }),
        "move" => Ok(InputAction::Move {
            x: coord("x")?,
            y: coord("y")?,
        }),
        "release" => Ok(InputAction::Release),
        "key" => {
            let rest = line["key".len()..].trim();
            if rest == "space" {
                return Ok(InputAction::Key(' '));
            }
            let mut chars = rest.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => Ok(InputAction::Key(ch)),
                _ => Err(format!("`key` expects one character, got `{rest}`")),
            }
        }
        other => Err(format!("unknown action `{other}`")),
    }
}
