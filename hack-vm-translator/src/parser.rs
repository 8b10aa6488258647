use std::fs::File;
use std::io::{BufRead, BufReader};

use crate::error::{Result, TranslateError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Arithmetic,
    Push,
    Pop,
    Label,
    Goto,
    If,
    Function,
    Return,
    Call,
}

/// The nine arithmetic/logical operator names recognized by `push`/`pop`-less
/// commands. Anything else is an `UnknownCommand`.
const ARITHMETIC_OPS: &[&str] = &[
    "add", "sub", "neg", "eq", "gt", "lt", "and", "or", "not",
];

pub struct Parser {
    /// (1-based physical source line, trimmed comment-free command text)
    lines: Vec<(usize, String)>,
    current_line: usize,
    current_command: String,
    current_line_number: usize,
    /// Cached parts of the current command to avoid repeated parsing
    cached_parts: Vec<String>,
}

impl Parser {
    pub fn new(filename: &str) -> Result<Self> {
        let file = File::open(filename)?;
        let reader = BufReader::new(file);

        let mut lines = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            // Remove comments and whitespace
            let line = if let Some(pos) = line.find("//") {
                &line[..pos]
            } else {
                &line
            };

            let trimmed = line.trim();

            // Skip empty lines
            if !trimmed.is_empty() {
                lines.push((index + 1, trimmed.to_string()));
            }
        }

        Ok(Parser {
            lines,
            current_line: 0,
            current_command: String::new(),
            current_line_number: 0,
            cached_parts: Vec::new(),
        })
    }

    #[inline]
    pub fn has_more_commands(&self) -> bool {
        self.current_line < self.lines.len()
    }

    #[inline]
    pub fn advance(&mut self) {
        if self.has_more_commands() {
            let (line_number, text) = &mut self.lines[self.current_line];
            self.current_line_number = *line_number;
            // Use swap to avoid allocation
            std::mem::swap(&mut self.current_command, text);

            // Parse and cache command parts once
            self.cached_parts.clear();
            self.cached_parts.extend(
                self.current_command
                    .split_whitespace()
                    .map(str::to_string),
            );

            // Arithmetic operator names are classified and emitted case-insensitively;
            // lower-case the first token here so both `command_type` and `arg1` see
            // the canonical spelling `write_arithmetic` matches on.
            if let Some(first) = self.cached_parts.first_mut() {
                if ARITHMETIC_OPS.iter().any(|op| first.eq_ignore_ascii_case(op)) {
                    first.make_ascii_lowercase();
                }
            }

            self.current_line += 1;
        }
    }

    /// 1-based physical source line of the command last returned by `advance`.
    #[inline]
    #[must_use]
    pub fn line_number(&self) -> usize {
        self.current_line_number
    }

    #[inline]
    pub fn command_type(&self) -> Result<CommandType> {
        debug_assert!(!self.cached_parts.is_empty(), "Empty command");

        let command_type = match self.cached_parts[0].as_str() {
            "push" => CommandType::Push,
            "pop" => CommandType::Pop,
            "label" => CommandType::Label,
            "goto" => CommandType::Goto,
            "if-goto" => CommandType::If,
            "function" => CommandType::Function,
            "return" => CommandType::Return,
            "call" => CommandType::Call,
            op if ARITHMETIC_OPS.contains(&op) => CommandType::Arithmetic,
            other => {
                return Err(TranslateError::UnknownCommand {
                    command: other.to_string(),
                    line: self.current_line_number,
                });
            }
        };
        Ok(command_type)
    }

    #[inline]
    pub fn arg1(&self) -> Result<&str> {
        let cmd_type = self.command_type()?;
        match cmd_type {
            CommandType::Arithmetic => Ok(&self.cached_parts[0]),
            CommandType::Return => unreachable!("arg1 is never called for Return"),
            _ => self.cached_parts.get(1).map(String::as_str).ok_or_else(|| {
                TranslateError::MissingArgument {
                    command: self.current_command.clone(),
                    line: self.current_line_number,
                }
            }),
        }
    }

    #[inline]
    pub fn arg2(&self) -> Result<i32> {
        let raw = self.cached_parts.get(2).ok_or_else(|| TranslateError::MissingArgument {
            command: self.current_command.clone(),
            line: self.current_line_number,
        })?;
        raw.parse().map_err(|_| TranslateError::MissingArgument {
            command: self.current_command.clone(),
            line: self.current_line_number,
        })
    }
}
