use std::fmt;

/// A message shown to the operator after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

impl Notice {
    /// Shown as soon as the backend accepts a retry.
    ///
    /// The wording claims success even though delivery has not been observed
    /// yet; see `console::recheck` for what was actually delivered.
    pub fn retry_accepted() -> Self {
        Notice::Success("retry succeeded!".to_string())
    }

    pub fn system_error(status: u16) -> Self {
        Notice::Error(format!("system error: {status}"))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error(_))
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Success(text) => write!(f, "[ok] {text}"),
            Notice::Error(text) => write!(f, "[error] {text}"),
        }
    }
}
