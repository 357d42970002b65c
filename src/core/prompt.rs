// src/core/prompt.rs

//! Interactive operator prompts, abstracted so the flows are scriptable in
//! tests and bypassed by non-interactive flags.

use std::io::{BufRead, Write};

/// The operator-interaction capability. Production uses stdin; tests script
/// the answers.
pub trait Prompter {
    /// Asks a yes/no question; only the literal answer "yes" confirms.
    fn confirm(&mut self, msg: &str) -> bool;

    /// Asks for an integer within an inclusive range, re-asking on invalid
    /// input until one is given or input runs out.
    fn ask_int(&mut self, msg: &str, lo: i64, hi: i64) -> Option<i64>;

    /// Asks for a single line; `None` when input is exhausted.
    fn ask_line(&mut self, msg: &str) -> Option<String>;

    /// Collects node ids until the operator types `done` or `all`. The
    /// literal answer `all` collapses the list to that single token.
    fn ask_ids(&mut self, msg: &str) -> Vec<String>;
}

/// Reads answers from standard input.
#[derive(Debug, Default)]
pub struct StdinPrompter;

impl StdinPrompter {
    fn read_line(&self, msg: &str) -> Option<String> {
        print!("{msg}");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }
}

impl Prompter for StdinPrompter {
    fn confirm(&mut self, msg: &str) -> bool {
        match self.read_line(&format!("{msg} (type 'yes' to accept): ")) {
            Some(answer) => answer.eq_ignore_ascii_case("yes"),
            None => false,
        }
    }

    fn ask_int(&mut self, msg: &str, lo: i64, hi: i64) -> Option<i64> {
        loop {
            let line = self.read_line(&format!("{msg} "))?;
            if let Ok(value) = line.parse::<i64>()
                && (lo..=hi).contains(&value)
            {
                return Some(value);
            }
        }
    }

    fn ask_line(&mut self, msg: &str) -> Option<String> {
        self.read_line(&format!("{msg} "))
    }

    fn ask_ids(&mut self, msg: &str) -> Vec<String> {
        println!("{msg}");
        let mut ids = Vec::new();
        loop {
            let line = match self.read_line(&format!("Source node #{}:", ids.len() + 1)) {
                Some(line) => line,
                None => break,
            };
            match line.as_str() {
                "done" => break,
                "all" => return vec!["all".to_string()],
                "" => continue,
                id => ids.push(id.to_string()),
            }
        }
        ids
    }
}

/// Feeds pre-scripted answers; used by tests.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: std::collections::VecDeque<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
        }
    }

    fn next(&mut self) -> Option<String> {
        self.answers.pop_front()
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, _msg: &str) -> bool {
        matches!(self.next().as_deref(), Some("yes"))
    }

    fn ask_int(&mut self, _msg: &str, lo: i64, hi: i64) -> Option<i64> {
        loop {
            let value = self.next()?.parse::<i64>().ok()?;
            if (lo..=hi).contains(&value) {
                return Some(value);
            }
        }
    }

    fn ask_line(&mut self, _msg: &str) -> Option<String> {
        self.next()
    }

    fn ask_ids(&mut self, _msg: &str) -> Vec<String> {
        let mut ids = Vec::new();
        while let Some(line) = self.next() {
            match line.as_str() {
                "done" => break,
                "all" => return vec!["all".to_string()],
                "" => continue,
                id => ids.push(id.to_string()),
            }
        }
        ids
    }
}
