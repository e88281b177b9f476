use std::fmt;

/// Warnings and errors collected while exporting one song
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorReport {
    entries: Vec<String>,
}

impl ErrorReport {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.entries.is_empty()
    }

    #[allow(clippy::missing_const_for_fn)]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// One entry per line
    pub fn full_report(&self) -> String {
        self.entries.join("\n")
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_report())
    }
}
