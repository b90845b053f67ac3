use std::fmt;

/// A language with its own catalog of books.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Language {
    id: u32,
    code: String,
    name: String,
}

impl Language {
    pub fn new(id: u32, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            code: code.into(),
            name: name.into(),
        }
    }

    /// Numeric id; book databases for this language live under a directory
    /// named after it.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}
