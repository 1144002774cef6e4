use std::str::FromStr;

pub const MATCH_ALL: &str = "*";

/// Ordered glob patterns selecting which keys are measured. Read-only after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPatternSet {
    patterns: Vec<String>,
}

impl KeyPatternSet {
    pub fn new<I, S>(patterns: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        if patterns.is_empty() {
            return Ok(Self::default());
        }
        if let Some(pos) = patterns.iter().position(|p| p.is_empty()) {
            return Err(format!("pattern #{} is empty", pos + 1));
        }
        Ok(Self { patterns })
    }

    /// Comma separated list; surrounding whitespace is trimmed. Blank input means match-all.
    pub fn parse(raw: &str) -> Result<Self, String> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Self::new(raw.split(',').map(str::trim))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for KeyPatternSet {
    fn default() -> Self {
        Self {
            patterns: vec![MATCH_ALL.to_string()],
        }
    }
}

impl FromStr for KeyPatternSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for KeyPatternSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.patterns.join(","))
    }
}
