//! Shard file-name templates.
//!
//! A template carries exactly one integer placeholder that is replaced by the
//! 1-based shard number. Both printf-style and Rust-style spellings are
//! accepted so that names carried over from existing load scripts keep working:
//!
//! | Placeholder | `render(7)` |
//! |-------------|-------------|
//! | `%d`, `%s`, `{}` | `7` |
//! | `%04d`, `{:04}`  | `0007` |
//!
//! As in printf, `%%` is a literal percent sign; any other stray `%` is an
//! error.

use crate::error::{Result, SplitError};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%%|%(?:0(?P<pw>[1-9][0-9]?))?[ds]|\{(?::0(?P<bw>[1-9][0-9]?))?\}")
        .expect("placeholder regex is valid")
});

/// A validated shard name pattern.
#[derive(Clone, PartialEq, Eq)]
pub struct NameTemplate {
    raw: String,
    /// Literal text before the placeholder, `%%` already unescaped.
    prefix: String,
    placeholder: String,
    suffix: String,
    width: usize,
}

impl NameTemplate {
    /// Parse a template, requiring exactly one placeholder and no path separator.
    ///
    /// # Errors
    /// Returns [`SplitError::InvalidArgument`] if the pattern is unusable.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.contains('/') || raw.contains('\\') {
            return Err(SplitError::invalid(format!(
                "template {raw:?} must be a file name, not a path"
            )));
        }
        let mut literal = String::new();
        let mut found: Option<(String, String, usize)> = None;
        let mut last = 0;
        for caps in TOKEN.captures_iter(raw) {
            let Some(m) = caps.get(0) else { continue };
            push_literal(&mut literal, &raw[last..m.start()], raw)?;
            last = m.end();
            if m.as_str() == "%%" {
                literal.push('%');
                continue;
            }
            if found.is_some() {
                return Err(SplitError::invalid(format!(
                    "template {raw:?} has more than one placeholder"
                )));
            }
            let width = caps
                .name("pw")
                .or_else(|| caps.name("bw"))
                .map_or(Ok(0), |w| w.as_str().parse::<usize>())
                .map_err(|e| SplitError::invalid(format!("template {raw:?}: {e}")))?;
            found = Some((std::mem::take(&mut literal), m.as_str().to_string(), width));
        }
        push_literal(&mut literal, &raw[last..], raw)?;

        let Some((prefix, placeholder, width)) = found else {
            return Err(SplitError::invalid(format!(
                "template {raw:?} has no shard number placeholder (%d, %s or {{}})"
            )));
        };
        let suffix = literal;
        if prefix.is_empty() && suffix.is_empty() {
            return Err(SplitError::invalid(
                "template must contain more than the placeholder",
            ));
        }
        Ok(Self {
            raw: raw.to_string(),
            prefix,
            placeholder,
            suffix,
            width,
        })
    }

    /// File name of shard `index`.
    #[must_use]
    pub fn render(&self, index: u64) -> String {
        format!(
            "{}{:0width$}{}",
            self.prefix,
            index,
            self.suffix,
            width = self.width
        )
    }

    /// Same placeholder and suffix behind a new prefix.
    ///
    /// # Errors
    /// [`SplitError::InvalidArgument`] if the result is not a valid template.
    pub fn with_prefix(&self, prefix: &str) -> Result<Self> {
        Self::parse(&format!(
            "{}{}{}",
            escape_percent(prefix),
            self.placeholder,
            escape_percent(&self.suffix)
        ))
    }

    /// Shard number whose rendered name is exactly `name`, if any.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<u64> {
        let digits = name
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let index = digits.parse::<u64>().ok().filter(|&n| n > 0)?;
        (self.render(index) == name).then_some(index)
    }

    /// Whether some file name is rendered by both templates, for any pair of
    /// shard numbers.
    ///
    /// Names are compared position by position for every length up to the
    /// point where longer names only add digit-against-digit positions, so
    /// the answer is exact apart from all-zero digit runs, which count as
    /// overlapping.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        let longest = self.fixed_len() + other.fixed_len() + self.width + other.width + 2;
        (1..=longest).any(|len| match (self.slots(len), other.slots(len)) {
            (Some(a), Some(b)) => a.iter().zip(&b).all(|(x, y)| x.accepts(*y)),
            _ => false,
        })
    }

    fn fixed_len(&self) -> usize {
        self.prefix.chars().count() + self.suffix.chars().count()
    }

    /// Per-character shape of a rendered name of `len` characters.
    fn slots(&self, len: usize) -> Option<Vec<Slot>> {
        let digits = len.checked_sub(self.fixed_len())?;
        if digits < self.width.max(1) {
            return None;
        }
        // Beyond the padding width the first digit cannot be a zero.
        let unpadded = digits > self.width;
        Some(
            self.prefix
                .chars()
                .map(Slot::Char)
                .chain((0..digits).map(|i| Slot::Digit {
                    nonzero: unpadded && i == 0,
                }))
                .chain(self.suffix.chars().map(Slot::Char))
                .collect(),
        )
    }

    /// The template as originally written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Text before the placeholder with trailing separators trimmed; used to
    /// name companion files such as the manifest.
    #[must_use]
    pub fn stem(&self) -> &str {
        let s = self.prefix.trim_end_matches(['_', '-', '.']);
        if s.is_empty() { "shards" } else { s }
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Char(char),
    Digit { nonzero: bool },
}

impl Slot {
    fn accepts(self, other: Self) -> bool {
        match (self, other) {
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::Char(c), Self::Digit { nonzero }) | (Self::Digit { nonzero }, Self::Char(c)) => {
                c.is_ascii_digit() && !(nonzero && c == '0')
            }
            (Self::Digit { .. }, Self::Digit { .. }) => true,
        }
    }
}

fn push_literal(out: &mut String, text: &str, raw: &str) -> Result<()> {
    if text.contains('%') {
        return Err(SplitError::invalid(format!(
            "template {raw:?} has a stray '%'; write '%%' for a literal percent sign"
        )));
    }
    out.push_str(text);
    Ok(())
}

fn escape_percent(text: &str) -> String {
    text.replace('%', "%%")
}

impl Default for NameTemplate {
    fn default() -> Self {
        Self {
            raw: "output_%s.csv".to_string(),
            prefix: "output_".to_string(),
            placeholder: "%s".to_string(),
            suffix: ".csv".to_string(),
            width: 0,
        }
    }
}

impl fmt::Debug for NameTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NameTemplate").field(&self.raw).finish()
    }
}

impl fmt::Display for NameTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for NameTemplate {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for NameTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for NameTemplate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
