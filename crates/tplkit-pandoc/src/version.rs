/*
 * version.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Converter version numbers.

use crate::error::{ConvertError, ConvertResult};
use std::fmt;
use std::str::FromStr;

/// A `major.minor` version. Ordering is lexicographic on (major, minor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PandocVersion {
    pub major: u32,
    pub minor: u32,
}

/// First version with built-in `--citeproc`.
pub const MIN_CITATIONS_VERSION: PandocVersion = PandocVersion::new(2, 11);

impl PandocVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    pub fn greater_than_or_equal(self, other: PandocVersion) -> bool {
        self >= other
    }

    /// Parse the output of `pandoc --version`.
    ///
    /// The first line reads `pandoc 3.1.9` (or `pandoc.exe 3.1.9`); only the
    /// major and minor components of the second word are kept.
    pub fn parse_version_output(output: &str) -> ConvertResult<Self> {
        output
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .ok_or_else(|| ConvertError::VersionParse {
                output: output.to_string(),
            })
            .and_then(|word| {
                word.parse().map_err(|_| ConvertError::VersionParse {
                    output: output.to_string(),
                })
            })
    }
}

impl FromStr for PandocVersion {
    type Err = ConvertError;

    /// Parse `major.minor[.patch...]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ConvertError::VersionParse {
            output: s.to_string(),
        };
        let mut parts = s.trim().split('.');
        let major = parts.next().and_then(|p| p.parse().ok()).ok_or_else(err)?;
        let minor = parts.next().and_then(|p| p.parse().ok()).ok_or_else(err)?;
        Ok(Self { major, minor })
    }
}

impl fmt::Display for PandocVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_greater_than_or_equal() {
        let v1 = PandocVersion::new(1, 0);
        let v2 = PandocVersion::new(2, 0);
        let v2_2 = PandocVersion::new(2, 2);
        let v1_2 = PandocVersion::new(1, 2);
        let v2_11 = PandocVersion::new(2, 11);
        let v3_9 = PandocVersion::new(3, 9);
        let v1_15 = PandocVersion::new(1, 15);

        assert!(v1.greater_than_or_equal(v1));

        assert!(!v1.greater_than_or_equal(v2));
        assert!(v2.greater_than_or_equal(v1));

        assert!(!v2.greater_than_or_equal(v2_2));
        assert!(v2_2.greater_than_or_equal(v2));

        assert!(v2_2.greater_than_or_equal(v1_2));
        assert!(!v1_2.greater_than_or_equal(v2_2));

        // Minor components compare numerically, not as text.
        assert!(v2_11.greater_than_or_equal(v2_2));
        assert!(!v2_2.greater_than_or_equal(v2_11));

        assert!(v3_9.greater_than_or_equal(v2_11));
        assert!(!v2_11.greater_than_or_equal(v3_9));

        assert!(v2_11.greater_than_or_equal(v1_15));
        assert!(!v1_15.greater_than_or_equal(v2_11));
    }

    #[test]
    fn test_parse_version_output() {
        let output = "pandoc 3.1.9\nFeatures: +server +lua\nScripting engine: Lua 5.4\n";
        assert_eq!(
            PandocVersion::parse_version_output(output).unwrap(),
            PandocVersion::new(3, 1)
        );
        assert_eq!(
            PandocVersion::parse_version_output("pandoc.exe 2.11.4").unwrap(),
            PandocVersion::new(2, 11)
        );
    }

    #[test]
    fn test_parse_version_output_errors() {
        assert!(matches!(
            PandocVersion::parse_version_output(""),
            Err(ConvertError::VersionParse { .. })
        ));
        assert!(PandocVersion::parse_version_output("pandoc").is_err());
        assert!(PandocVersion::parse_version_output("pandoc dev").is_err());
        assert!(PandocVersion::parse_version_output("pandoc 3").is_err());
    }

    #[test]
    fn test_display_and_from_str() {
        let v: PandocVersion = "2.19.2".parse().unwrap();
        assert_eq!(v, PandocVersion::new(2, 19));
        assert_eq!(v.to_string(), "2.19");
    }
}
