//! Tool distribution versions.
//!
//! Released artifacts carry a dotted numeric version with an optional
//! qualifier (`0.7.2`, `1.0-rc1`). The `core` artifact has no version in its
//! file name and maps to [`ToolVersion::Core`], which orders below every
//! released version.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Pseudo-version reported for the `core` artifact.
pub const CORE_PSEUDO_VERSION: &str = "0.6.0-SNAPSHOT";

/// A malformed version token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed version '{token}': {reason}")]
pub struct VersionParseError {
    pub token: String,
    pub reason: &'static str,
}

/// `major[.minor[.micro[.patch]]][-qualifier]`.
///
/// Missing components compare as zero, so `1.2` equals `1.2.0`; display keeps
/// the number of components that was parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionNumber {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
    pub patch: u32,
    pub qualifier: Option<String>,
    components: u8,
}

impl VersionNumber {
    pub fn new(major: u32, minor: u32, micro: u32, qualifier: Option<&str>) -> Self {
        Self {
            major,
            minor,
            micro,
            patch: 0,
            qualifier: qualifier.map(str::to_string),
            components: 3,
        }
    }

    pub fn parse(token: &str) -> Result<Self, VersionParseError> {
        let malformed = |reason| VersionParseError {
            token: token.to_string(),
            reason,
        };

        let (numbers, qualifier) = match token.split_once('-') {
            Some((numbers, qualifier)) => {
                let valid = qualifier.chars().all(is_qualifier_char);
                if qualifier.is_empty() || !valid {
                    return Err(malformed("invalid qualifier"));
                }
                (numbers, Some(qualifier.to_string()))
            }
            None => (token, None),
        };

        let mut parts = [0u32; 4];
        let mut components = 0u8;
        for (index, part) in numbers.split('.').enumerate() {
            if index >= parts.len() {
                return Err(malformed("too many numeric components"));
            }
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed("non-numeric component"));
            }
            parts[index] = part
                .parse()
                .map_err(|_| malformed("numeric component out of range"))?;
            components += 1;
        }

        Ok(Self {
            major: parts[0],
            minor: parts[1],
            micro: parts[2],
            patch: parts[3],
            qualifier,
            components,
        })
    }
}

fn is_qualifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+')
}

impl TryFrom<String> for VersionNumber {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VersionNumber> for String {
    fn from(value: VersionNumber) -> Self {
        value.to_string()
    }
}

impl PartialEq for VersionNumber {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionNumber {}

impl Hash for VersionNumber {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.major, self.minor, self.micro, self.patch).hash(state);
        self.qualifier.hash(state);
    }
}

impl FromStr for VersionNumber {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Ord for VersionNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.micro, self.patch)
            .cmp(&(other.major, other.minor, other.micro, other.patch))
            .then_with(|| match (&self.qualifier, &other.qualifier) {
                (None, None) => Ordering::Equal,
                // a release outranks any qualified build of the same numbers
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for VersionNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let numbers = [self.major, self.minor, self.micro, self.patch];
        let shown = usize::from(self.components.clamp(1, 4));
        let rendered: Vec<String> = numbers[..shown].iter().map(u32::to_string).collect();
        write!(f, "{}", rendered.join("."))?;
        if let Some(qualifier) = &self.qualifier {
            write!(f, "-{qualifier}")?;
        }
        Ok(())
    }
}

/// Version of a tool artifact.
///
/// Variant order matters: `Core` sorts before every `Release`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolVersion {
    Core,
    Release(VersionNumber),
}

impl ToolVersion {
    /// Parses the version token captured from an artifact file name.
    pub fn from_token(token: &str) -> Result<Self, VersionParseError> {
        if token == "core" {
            return Ok(ToolVersion::Core);
        }
        VersionNumber::parse(token).map(ToolVersion::Release)
    }

    pub fn is_core(&self) -> bool {
        matches!(self, ToolVersion::Core)
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolVersion::Core => f.write_str(CORE_PSEUDO_VERSION),
            ToolVersion::Release(version) => version.fmt(f),
        }
    }
}
