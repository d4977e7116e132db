//! Version parsing and comparison
//!
//! Provides the [`Version`] value type used for device firmware, firmware
//! containers, release tags and signing-key ranges.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::VersionError;

/// A firmware version following Semantic Versioning 2.0.0.
///
/// Versions parsed from strings are *complete*. Versions built from numeric
/// literals, from the packed integer representation or from BCD components
/// are *incomplete*: their pre-release component is unknown, so it is ignored
/// whenever they are compared. The build component never takes part in
/// comparisons.
///
/// Because of the completeness rule, equality is not transitive and the
/// ordering is partial; `Version` deliberately implements neither `Eq` nor
/// `Ord`.
#[derive(Debug, Clone)]
pub struct Version {
    major: u32,
    minor: u32,
    patch: u32,
    pre: Option<String>,
    build: Option<String>,
    complete: bool,
}

impl Version {
    /// Create an incomplete version from its core components.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
            build: None,
            complete: false,
        }
    }

    /// Set the pre-release component.
    pub fn with_pre(mut self, pre: impl Into<String>) -> Self {
        self.pre = Some(pre.into());
        self
    }

    /// Set the build metadata component.
    pub fn with_build(mut self, build: impl Into<String>) -> Self {
        self.build = Some(build.into());
        self
    }

    /// Mark the version as complete, i.e. its pre-release component is known.
    pub fn into_complete(mut self) -> Self {
        self.complete = true;
        self
    }

    /// Parse a version string without a `v` prefix, e.g. `1.8.2-rc.1+git`.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::InvalidVersion`] if the core does not have
    /// exactly three components and [`VersionError::InvalidComponent`] if a
    /// component is not an unsigned integer.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let (rest, build) = match s.split_once('+') {
            Some((rest, build)) => (rest, Some(build.to_string())),
            None => (s, None),
        };
        let (core, pre) = match rest.split_once('-') {
            Some((core, pre)) => (core, Some(pre.to_string())),
            None => (rest, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        let [major, minor, patch] = parts.as_slice() else {
            return Err(VersionError::InvalidVersion(rest.to_string()));
        };
        let component = |part: &str| {
            part.parse::<u32>()
                .ok()
                .ok_or_else(|| VersionError::InvalidComponent(rest.to_string()))
        };

        Ok(Self {
            major: component(*major)?,
            minor: component(*minor)?,
            patch: component(*patch)?,
            pre,
            build,
            complete: true,
        })
    }

    /// Parse a version string with a mandatory `v` prefix, e.g. `v1.8.2`.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::MissingPrefix`] if the string does not start
    /// with `v`, otherwise the errors of [`Version::parse`].
    pub fn from_v_str(s: &str) -> Result<Self, VersionError> {
        match s.strip_prefix('v') {
            Some(rest) => Self::parse(rest),
            None => Err(VersionError::MissingPrefix(s.to_string())),
        }
    }

    /// Decode the packed integer representation used by the firmware.
    ///
    /// The layout is `major << 22 | minor << 6 | patch`, with the minor
    /// component masked to 16 bits and the patch component to 6 bits. The
    /// overlap between major and minor is part of the firmware encoding.
    pub const fn from_packed(version: u32) -> Self {
        Self::new(version >> 22, (version >> 6) & 0xFFFF, version & 0x3F)
    }

    /// Decode three BCD-encoded components, as stored in SB2.1 image headers.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::InvalidBcd`] if a nibble is greater than nine.
    pub fn from_bcd(major: u16, minor: u16, patch: u16) -> Result<Self, VersionError> {
        Ok(Self::new(bcd(major)?, bcd(minor)?, bcd(patch)?))
    }

    /// The major component.
    pub fn major(&self) -> u32 {
        self.major
    }

    /// The minor component.
    pub fn minor(&self) -> u32 {
        self.minor
    }

    /// The patch component.
    pub fn patch(&self) -> u32 {
        self.patch
    }

    /// The pre-release component, if any.
    pub fn pre(&self) -> Option<&str> {
        self.pre.as_deref()
    }

    /// The build metadata component, if any.
    pub fn build(&self) -> Option<&str> {
        self.build.as_deref()
    }

    /// Whether the pre-release component of this version is known.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// This version without pre-release and build components.
    pub fn core(&self) -> Self {
        Self {
            pre: None,
            build: None,
            ..self.clone()
        }
    }

    fn core_tuple(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.patch)
    }
}

fn bcd(value: u16) -> Result<u32, VersionError> {
    let mut result = 0u32;
    for shift in [12u16, 8, 4, 0] {
        let digit = (value >> shift) & 0xF;
        if digit > 9 {
            return Err(VersionError::InvalidBcd(value));
        }
        result = result * 10 + u32::from(digit);
    }
    Ok(result)
}

/// A dot-separated pre-release identifier.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum PreIdentifier<'a> {
    // Declaration order matters: numeric identifiers sort first.
    Numeric(u64),
    Alphanumeric(&'a str),
}

impl<'a> PreIdentifier<'a> {
    fn parse(s: &'a str) -> Self {
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = s.parse() {
                return PreIdentifier::Numeric(n);
            }
        }
        PreIdentifier::Alphanumeric(s)
    }
}

fn compare_pre(lhs: &str, rhs: &str) -> Ordering {
    lhs.split('.')
        .map(PreIdentifier::parse)
        .cmp(rhs.split('.').map(PreIdentifier::parse))
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        if self.core_tuple() != other.core_tuple() {
            return false;
        }
        if self.complete && other.complete {
            return self.pre == other.pre;
        }
        true
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let core = self.core_tuple().cmp(&other.core_tuple());
        if core != Ordering::Equal || !(self.complete && other.complete) {
            return Some(core);
        }
        // Same core, both complete: a pre-release sorts before the release.
        Some(match (&self.pre, &other.pre) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(lhs), Some(rhs)) => compare_pre(lhs, rhs),
        })
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = self.pre.as_deref().filter(|pre| !pre.is_empty()) {
            write!(f, "-{pre}")?;
        }
        if let Some(build) = self.build.as_deref().filter(|build| !build.is_empty()) {
            write!(f, "+{build}")?;
        }
        Ok(())
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let parsed = if s.starts_with('v') {
            Version::from_v_str(&s)
        } else {
            Version::parse(&s)
        };
        parsed.map_err(serde::de::Error::custom)
    }
}
