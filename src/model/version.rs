use std::{cmp::Ordering, fmt::Display};

use serde::{Deserialize, Serialize};

/// A module version string with a release-aware ordering.
///
/// Versions are split into parts on `.`, `-`, `_`, `+` and on every switch
/// between digits and letters. Numeric parts compare numerically and sort above
/// textual parts, so `1.0-rc1 < 1.0 < 1.0.1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

#[derive(Debug, PartialEq, Eq)]
enum Part<'a> {
    Numeric(&'a str),
    Text(&'a str),
}

impl Part<'_> {
    fn is_numeric(&self) -> bool {
        matches!(self, Part::Numeric(_))
    }
}

impl Ord for Part<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Part::Numeric(a), Part::Numeric(b)) => {
                let a = a.trim_start_matches('0');
                let b = b.trim_start_matches('0');
                a.len().cmp(&b.len()).then_with(|| a.cmp(b))
            }
            (Part::Text(a), Part::Text(b)) => a.cmp(b),
            (Part::Numeric(_), Part::Text(_)) => Ordering::Greater,
            (Part::Text(_), Part::Numeric(_)) => Ordering::Less,
        }
    }
}

impl PartialOrd for Part<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Version {
    pub fn new(version: impl Into<String>) -> Version {
        Version(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn parts(&self) -> Vec<Part<'_>> {
        let mut parts = Vec::new();
        let mut start = None;
        let mut numeric = false;
        for (index, c) in self.0.char_indices() {
            if matches!(c, '.' | '-' | '_' | '+') {
                if let Some(from) = start.take() {
                    parts.push(part(&self.0[from..index], numeric));
                }
                continue;
            }
            match start {
                Some(from) if c.is_ascii_digit() != numeric => {
                    parts.push(part(&self.0[from..index], numeric));
                    start = Some(index);
                    numeric = c.is_ascii_digit();
                }
                Some(_) => {}
                None => {
                    start = Some(index);
                    numeric = c.is_ascii_digit();
                }
            }
        }
        if let Some(from) = start {
            parts.push(part(&self.0[from..], numeric));
        }
        parts
    }
}

fn part(value: &str, numeric: bool) -> Part<'_> {
    if numeric {
        Part::Numeric(value)
    } else {
        Part::Text(value)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let ours = self.parts();
        let theirs = other.parts();
        for index in 0..ours.len().max(theirs.len()) {
            let ordering = match (ours.get(index), theirs.get(index)) {
                (Some(a), Some(b)) => a.cmp(b),
                // An extra numeric part is a newer version, an extra qualifier an older one.
                (Some(a), None) if a.is_numeric() => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (None, Some(b)) if b.is_numeric() => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Version {
    fn from(value: &str) -> Self {
        Version::new(value)
    }
}
