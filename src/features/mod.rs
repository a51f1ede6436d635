//! Feature-support matrix
//!
//! The matrix maps `(section, item[, argument value])` to a [`Status`] per
//! target version. The analyzer only talks to the [`FeatureMatrix`] trait;
//! [`ConfigMatrix`] implements it over the `.cfg` format and ships an
//! embedded default.

mod matrix;
mod overrides;
pub mod sections;

pub use matrix::{argument_section, ConfigMatrix, Version};
pub use overrides::Overrides;

use crate::error::CompassError;
use crate::report::Status;

/// Versioned lookup of construct support.
///
/// Lookups are side-effect free. A section or item the matrix does not
/// define is configuration drift and fails with [`CompassError::ConfigDrift`].
pub trait FeatureMatrix: Send + Sync {
    /// Known target versions in declaration order; the last is the default.
    fn versions(&self) -> &[Version];

    fn exists(&self, section: &str, item: Option<&str>) -> bool;

    fn status(
        &self,
        version: &Version,
        section: &str,
        item: Option<&str>,
    ) -> Result<Status, CompassError>;

    /// Whether the status of `item` also depends on its `argument`-th argument
    /// (1-based).
    fn has_argument_rule(&self, section: &str, item: &str, argument: usize) -> bool;

    /// Status of an argument value. `None` means the argument is not a
    /// literal, which always needs manual review.
    fn argument_status(
        &self,
        version: &Version,
        section: &str,
        item: &str,
        argument: usize,
        value: Option<&str>,
    ) -> Result<Status, CompassError>;

    fn int_limit(&self, section: &str) -> Result<i64, CompassError>;

    fn value_list(&self, section: &str) -> Result<Vec<String>, CompassError>;

    fn report_group(&self, section: &str, item: Option<&str>) -> Result<String, CompassError>;

    fn default_version(&self) -> Option<&Version> {
        self.versions().last()
    }

    /// Resolves a requested target version, defaulting to the newest one.
    fn resolve_version(&self, requested: Option<&str>) -> Result<Version, CompassError> {
        let known = || {
            self.versions()
                .iter()
                .map(Version::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };
        match requested {
            None => self
                .default_version()
                .cloned()
                .ok_or_else(|| CompassError::UnknownTargetVersion {
                    version: String::new(),
                    known: known(),
                }),
            Some(text) => {
                let wanted = text.parse::<Version>().ok();
                self.versions()
                    .iter()
                    .find(|v| Some(*v) == wanted.as_ref())
                    .cloned()
                    .ok_or_else(|| CompassError::UnknownTargetVersion {
                        version: text.to_string(),
                        known: known(),
                    })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_version() {
        let m = ConfigMatrix::parse("t", "[Versions]\nlist = 1.0.0, 2.0.0\n").unwrap();
        assert_eq!(m.resolve_version(None).unwrap().as_str(), "2.0.0");
        assert_eq!(m.resolve_version(Some("1.0")).unwrap().as_str(), "1.0.0");
        let err = m.resolve_version(Some("9.9")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown target version '9.9' (known: 1.0.0, 2.0.0)"
        );
    }
}
