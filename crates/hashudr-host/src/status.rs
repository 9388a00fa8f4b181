//! # Status Vector
//!
//! Structured error payload handed to the host's error channel. Codes are
//! symbolic; translating them into the host's numeric status codes is the
//! adapter's job.

use std::fmt;

/// Symbolic status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// A user-defined exception, followed by its number.
    Except,
    /// The exception name, followed by the name text.
    ExceptionName,
    /// Free message text, followed by the text.
    Random,
}

/// One element of a status vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusArg {
    Code(StatusCode),
    Number(i32),
    Text(String),
}

/// Ordered list of status arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusVector {
    args: Vec<StatusArg>,
}

impl StatusVector {
    /// An empty vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an argument.
    pub fn push(&mut self, arg: StatusArg) -> &mut Self {
        self.args.push(arg);
        self
    }

    /// Append a code followed by a number.
    pub fn push_number(&mut self, code: StatusCode, number: i32) -> &mut Self {
        self.push(StatusArg::Code(code)).push(StatusArg::Number(number))
    }

    /// Append a code followed by text.
    pub fn push_text(&mut self, code: StatusCode, text: impl Into<String>) -> &mut Self {
        self.push(StatusArg::Code(code))
            .push(StatusArg::Text(text.into()))
    }

    /// All arguments in order.
    pub fn args(&self) -> &[StatusArg] {
        &self.args
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// The user exception number, if the vector carries one.
    pub fn exception_number(&self) -> Option<i32> {
        self.args.windows(2).find_map(|pair| match pair {
            [StatusArg::Code(StatusCode::Except), StatusArg::Number(n)] => Some(*n),
            _ => None,
        })
    }

    /// The exception name, if present.
    pub fn exception_name(&self) -> Option<&str> {
        self.text_after(StatusCode::ExceptionName)
    }

    /// The free message text, if present.
    pub fn message(&self) -> Option<&str> {
        self.text_after(StatusCode::Random)
    }

    fn text_after(&self, code: StatusCode) -> Option<&str> {
        self.args.windows(2).find_map(|pair| match pair {
            [StatusArg::Code(c), StatusArg::Text(text)] if *c == code => Some(text.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for StatusVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.exception_number(), self.exception_name(), self.message()) {
            (Some(number), Some(name), Some(msg)) => write!(f, "{name} ({number}): {msg}"),
            (_, Some(name), Some(msg)) => write!(f, "{name}: {msg}"),
            (_, _, Some(msg)) => f.write_str(msg),
            _ => f.write_str("<empty status>"),
        }
    }
}
