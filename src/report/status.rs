//! Support status of a classified construct

use std::fmt;
use std::str::FromStr;

/// Closed set of classification outcomes.
///
/// The derived ordering is the display order used by summaries; it carries
/// no meaning beyond that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Status {
    Supported,
    NotSupported,
    ReviewSemantics,
    ReviewPerformance,
    ReviewManually,
    Ignored,
    ObjectCountOnly,
    Rewritten,
}

impl Status {
    pub const ALL: [Status; 8] = [
        Status::Supported,
        Status::NotSupported,
        Status::ReviewSemantics,
        Status::ReviewPerformance,
        Status::ReviewManually,
        Status::Ignored,
        Status::ObjectCountOnly,
        Status::Rewritten,
    ];

    /// Label written to finding records and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Status::Supported => "Supported",
            Status::NotSupported => "Not supported",
            Status::ReviewSemantics => "Review semantics",
            Status::ReviewPerformance => "Review performance",
            Status::ReviewManually => "Review manually",
            Status::Ignored => "Ignored",
            Status::ObjectCountOnly => "Object count only",
            Status::Rewritten => "Rewritten",
        }
    }

    /// Key prefix used by the feature matrix configuration format.
    pub fn config_key(&self) -> &'static str {
        match self {
            Status::Supported => "supported",
            Status::NotSupported => "not_supported",
            Status::ReviewSemantics => "review_semantics",
            Status::ReviewPerformance => "review_performance",
            Status::ReviewManually => "review_manually",
            Status::Ignored => "ignored",
            Status::ObjectCountOnly => "object_count_only",
            Status::Rewritten => "rewritten",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Status {
    type Err = String;

    /// Accepts either the configuration key or the display label, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Status::ALL
            .iter()
            .copied()
            .find(|status| {
                status.config_key().eq_ignore_ascii_case(wanted)
                    || status.label().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| format!("Unknown status: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_config_key_and_label() {
        assert_eq!("not_supported".parse::<Status>().unwrap(), Status::NotSupported);
        assert_eq!("Review manually".parse::<Status>().unwrap(), Status::ReviewManually);
        assert_eq!(" IGNORED ".parse::<Status>().unwrap(), Status::Ignored);
        assert!("maybe".parse::<Status>().is_err());
    }

    #[test]
    fn test_status_display_order() {
        let mut statuses = vec![Status::Rewritten, Status::Supported, Status::ReviewManually];
        statuses.sort();
        assert_eq!(
            statuses,
            vec![Status::Supported, Status::ReviewManually, Status::Rewritten]
        );
    }
}
