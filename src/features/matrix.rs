//! Feature matrix loaded from an INI-style `.cfg` file
//!
//! ```text
//! [Versions]
//! list = 1.0.0, 1.1.0
//!
//! [Joins]
//! report_group = Queries
//! list = INNER JOIN, FULL OUTER JOIN
//! supported-1.0.0 = INNER JOIN
//! supported-1.1.0 = FULL OUTER JOIN
//! default_classification = not_supported
//! ```
//!
//! Section names and items compare case-insensitively. Indented lines continue
//! the value of the previous key.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::FeatureMatrix;
use crate::error::CompassError;
use crate::report::Status;

const VERSIONS_SECTION: &str = "VERSIONS";
const WILDCARD: &str = "*";

/// The matrix shipped with the crate.
const DEFAULT_MATRIX: &str = include_str!("default_features.cfg");

/// A target engine version, ordered numerically component by component.
#[derive(Debug, Clone, Eq)]
pub struct Version {
    text: String,
    parts: Vec<u32>,
}

impl Version {
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let parts = text
            .split('.')
            .map(|p| p.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| format!("Invalid version: {}", s))?;
        if parts.is_empty() {
            return Err(format!("Invalid version: {}", s));
        }
        Ok(Version {
            text: text.to_string(),
            parts,
        })
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let a = self.parts.get(i).copied().unwrap_or(0);
            let b = other.parts.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Clone)]
struct StatusRule {
    status: Status,
    since: Version,
    /// Upper-cased items; empty applies to the section itself.
    items: Vec<String>,
    wildcard: bool,
}

impl StatusRule {
    fn applies_to(&self, item: Option<&str>) -> bool {
        if self.wildcard {
            return true;
        }
        match item {
            Some(item) => self.items.iter().any(|i| i == item),
            None => self.items.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Section {
    name: String,
    /// `None` when the section accepts any item.
    list: Option<Vec<String>>,
    rules: Vec<StatusRule>,
    default_classification: Option<Status>,
    report_group: Option<String>,
    item_groups: HashMap<String, String>,
    limit: Option<i64>,
}

impl Section {
    fn contains(&self, item: &str) -> bool {
        match &self.list {
            None => true,
            Some(list) => list.iter().any(|i| i == item),
        }
    }
}

/// [`FeatureMatrix`] backed by the `.cfg` format.
#[derive(Debug, Clone)]
pub struct ConfigMatrix {
    origin: String,
    versions: Vec<Version>,
    sections: BTreeMap<String, Section>,
}

impl ConfigMatrix {
    /// The matrix embedded in the binary.
    pub fn embedded() -> Result<Self, CompassError> {
        Self::parse("<embedded>", DEFAULT_MATRIX)
    }

    pub fn load(path: &Path) -> Result<Self, CompassError> {
        let text = std::fs::read_to_string(path).map_err(|e| CompassError::MatrixReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&path.display().to_string(), &text)
    }

    pub fn parse(origin: &str, text: &str) -> Result<Self, CompassError> {
        let entries = parse_ini(origin, text)?;

        let mut sections: BTreeMap<String, Section> = BTreeMap::new();
        let mut versions: Vec<Version> = Vec::new();

        for (section_name, section_line, keys) in entries {
            let section_key = section_name.to_ascii_uppercase();
            if sections.contains_key(&section_key) {
                return Err(parse_error(
                    origin,
                    section_line,
                    format!("duplicate section [{}]", section_name),
                ));
            }

            if section_key == VERSIONS_SECTION {
                for (key, value, line) in &keys {
                    if !key.eq_ignore_ascii_case("list") {
                        return Err(parse_error(origin, *line, format!("unknown key '{}'", key)));
                    }
                    for v in split_list(value) {
                        let version = v
                            .parse::<Version>()
                            .map_err(|message| parse_error(origin, *line, message))?;
                        versions.push(version);
                    }
                }
                continue;
            }

            let mut section = Section {
                name: section_name.clone(),
                ..Section::default()
            };
            for (key, value, line) in keys {
                apply_key(origin, &mut section, &key, &value, line)?;
            }
            sections.insert(section_key, section);
        }

        if versions.is_empty() {
            return Err(parse_error(origin, 0, "missing [Versions] list".to_string()));
        }
        for section in sections.values() {
            for rule in &section.rules {
                if !versions.contains(&rule.since) {
                    return Err(parse_error(
                        origin,
                        0,
                        format!(
                            "section [{}] refers to undeclared version {}",
                            section.name, rule.since
                        ),
                    ));
                }
            }
        }

        Ok(Self {
            origin: origin.to_string(),
            versions,
            sections,
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    fn section(&self, section: &str, item: Option<&str>) -> Result<&Section, CompassError> {
        self.sections
            .get(&section.to_ascii_uppercase())
            .ok_or_else(|| drift(section, item))
    }
}

impl FeatureMatrix for ConfigMatrix {
    fn versions(&self) -> &[Version] {
        &self.versions
    }

    fn exists(&self, section: &str, item: Option<&str>) -> bool {
        match self.sections.get(&section.to_ascii_uppercase()) {
            Some(found) => item.map_or(true, |i| found.contains(&i.to_ascii_uppercase())),
            None => false,
        }
    }

    fn status(
        &self,
        version: &Version,
        section: &str,
        item: Option<&str>,
    ) -> Result<Status, CompassError> {
        let found = self.section(section, item)?;
        let key = item.map(str::to_ascii_uppercase);
        if let Some(key) = &key {
            if !found.contains(key) {
                return Err(drift(section, item));
            }
        }

        let mut best: Option<&StatusRule> = None;
        for rule in &found.rules {
            if rule.since > *version || !rule.applies_to(key.as_deref()) {
                continue;
            }
            // First declared wins on equal versions.
            if best.map_or(true, |b| rule.since > b.since) {
                best = Some(rule);
            }
        }
        Ok(best
            .map(|rule| rule.status)
            .or(found.default_classification)
            .unwrap_or(Status::NotSupported))
    }

    fn has_argument_rule(&self, section: &str, item: &str, argument: usize) -> bool {
        self.sections
            .contains_key(&argument_section(section, item, argument).to_ascii_uppercase())
    }

    fn argument_status(
        &self,
        version: &Version,
        section: &str,
        item: &str,
        argument: usize,
        value: Option<&str>,
    ) -> Result<Status, CompassError> {
        let sub_section = argument_section(section, item, argument);
        match value {
            Some(value) => self.status(version, &sub_section, Some(value)),
            None => {
                self.section(&sub_section, None)?;
                Ok(Status::ReviewManually)
            }
        }
    }

    fn int_limit(&self, section: &str) -> Result<i64, CompassError> {
        self.section(section, None)?
            .limit
            .ok_or_else(|| drift(section, Some("limit")))
    }

    fn value_list(&self, section: &str) -> Result<Vec<String>, CompassError> {
        self.section(section, None)?
            .list
            .clone()
            .ok_or_else(|| drift(section, Some("list")))
    }

    fn report_group(&self, section: &str, item: Option<&str>) -> Result<String, CompassError> {
        let found = self.section(section, item)?;
        if let Some(item) = item {
            if let Some(group) = found.item_groups.get(&item.to_ascii_uppercase()) {
                return Ok(group.clone());
            }
        }
        Ok(found
            .report_group
            .clone()
            .unwrap_or_else(|| found.name.clone()))
    }
}

/// Name of the sub-section holding the argument rule of `item`.
pub fn argument_section(section: &str, item: &str, argument: usize) -> String {
    format!("{}:{}:arg{}", section, item, argument)
}

fn drift(section: &str, item: Option<&str>) -> CompassError {
    CompassError::ConfigDrift {
        section: section.to_string(),
        item: item.map(str::to_string),
    }
}

fn parse_error(origin: &str, line: usize, message: String) -> CompassError {
    CompassError::MatrixParse {
        origin: origin.to_string(),
        line,
        message,
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|v| !v.is_empty())
}

fn upper_list(value: &str) -> Vec<String> {
    split_list(value).map(str::to_ascii_uppercase).collect()
}

fn apply_key(
    origin: &str,
    section: &mut Section,
    key: &str,
    value: &str,
    line: usize,
) -> Result<(), CompassError> {
    let lower = key.to_ascii_lowercase();
    match lower.as_str() {
        "list" => {
            let items = upper_list(value);
            section.list = if items.iter().any(|i| i == WILDCARD) {
                None
            } else {
                Some(items)
            };
        }
        "report_group" => section.report_group = Some(value.trim().to_string()),
        "default_classification" => {
            let status = value
                .parse::<Status>()
                .map_err(|message| parse_error(origin, line, message))?;
            section.default_classification = Some(status);
        }
        "limit" => {
            let limit = value
                .trim()
                .parse::<i64>()
                .map_err(|_| parse_error(origin, line, format!("invalid limit '{}'", value)))?;
            section.limit = Some(limit);
        }
        _ if lower.starts_with("report_group.") => {
            let item = key["report_group.".len()..].trim().to_ascii_uppercase();
            section.item_groups.insert(item, value.trim().to_string());
        }
        _ => {
            let (status_key, version) = lower
                .rsplit_once('-')
                .ok_or_else(|| parse_error(origin, line, format!("unknown key '{}'", key)))?;
            let status = Status::ALL
                .iter()
                .copied()
                .find(|s| s.config_key() == status_key)
                .ok_or_else(|| parse_error(origin, line, format!("unknown status key '{}'", key)))?;
            let since = version
                .parse::<Version>()
                .map_err(|message| parse_error(origin, line, message))?;
            let items = upper_list(value);
            let wildcard = items.iter().any(|i| i == WILDCARD);
            section.rules.push(StatusRule {
                status,
                since,
                items,
                wildcard,
            });
        }
    }
    Ok(())
}

type RawSection = (String, usize, Vec<(String, String, usize)>);

/// Splits the text into sections of `(key, value, line)` entries.
fn parse_ini(origin: &str, text: &str) -> Result<Vec<RawSection>, CompassError> {
    let mut sections: Vec<RawSection> = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if raw.starts_with([' ', '\t']) {
            let continued = sections
                .last_mut()
                .and_then(|(_, _, keys)| keys.last_mut())
                .ok_or_else(|| {
                    parse_error(origin, line_no, "continuation line without a key".to_string())
                })?;
            continued.1.push(' ');
            continued.1.push_str(trimmed);
            continue;
        }

        if let Some(header) = trimmed.strip_prefix('[') {
            let name = header.strip_suffix(']').ok_or_else(|| {
                parse_error(origin, line_no, format!("unterminated section header '{}'", trimmed))
            })?;
            sections.push((name.trim().to_string(), line_no, Vec::new()));
            continue;
        }

        let (key, value) = trimmed
            .split_once('=')
            .ok_or_else(|| parse_error(origin, line_no, format!("expected key = value: '{}'", trimmed)))?;
        let (_, _, keys) = sections.last_mut().ok_or_else(|| {
            parse_error(origin, line_no, "key outside of a section".to_string())
        })?;
        keys.push((key.trim().to_string(), value.trim().to_string(), line_no));
    }

    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
[Versions]
list = 1.0.0, 1.1.0, 2.0.0

[Joins]
report_group = Queries
report_group.FULL OUTER JOIN = Outer joins
list = INNER JOIN, FULL OUTER JOIN, CROSS APPLY
supported-1.0.0 = INNER JOIN
supported-1.1.0 = FULL OUTER JOIN
review_semantics-2.0.0 = FULL OUTER JOIN
default_classification = not_supported

[Datatypes]
list = *
supported-1.0.0 = INT,
    BIGINT
not_supported-1.0.0 = SQL_VARIANT
default_classification = review_manually

[Maximum identifier length]
limit = 63

[Built-in functions]
list = *
supported-1.0.0 = *

[Built-in functions:DATEADD:arg1]
list = *
supported-1.0.0 = YEAR, MONTH
not_supported-1.0.0 = NANOSECOND
";

    fn sample() -> ConfigMatrix {
        ConfigMatrix::parse("sample", SAMPLE).unwrap()
    }

    fn v(text: &str) -> Version {
        text.parse().unwrap()
    }

    #[test]
    fn test_version_ordering_is_numeric() {
        assert!(v("1.10.0") > v("1.9.0"));
        assert_eq!(v("2.0"), v("2.0.0"));
    }

    #[test]
    fn test_status_picks_highest_applicable_version() {
        let m = sample();
        assert_eq!(
            m.status(&v("1.0.0"), "Joins", Some("FULL OUTER JOIN")).unwrap(),
            Status::NotSupported
        );
        assert_eq!(
            m.status(&v("1.1.0"), "joins", Some("full outer join")).unwrap(),
            Status::Supported
        );
        assert_eq!(
            m.status(&v("2.0.0"), "Joins", Some("FULL OUTER JOIN")).unwrap(),
            Status::ReviewSemantics
        );
    }

    #[test]
    fn test_closed_list_drift() {
        let m = sample();
        let err = m.status(&v("1.0.0"), "Joins", Some("LEFT SEMI JOIN")).unwrap_err();
        assert!(matches!(err, CompassError::ConfigDrift { .. }));
        let err = m.status(&v("1.0.0"), "Nope", None).unwrap_err();
        assert!(matches!(err, CompassError::ConfigDrift { .. }));
    }

    #[test]
    fn test_open_list_falls_back_to_default_classification() {
        let m = sample();
        assert_eq!(
            m.status(&v("1.0.0"), "Datatypes", Some("BIGINT")).unwrap(),
            Status::Supported
        );
        assert_eq!(
            m.status(&v("1.0.0"), "Datatypes", Some("GEOGRAPHY")).unwrap(),
            Status::ReviewManually
        );
        assert!(m.exists("Datatypes", Some("anything")));
        assert!(!m.exists("Joins", Some("anything")));
    }

    #[test]
    fn test_report_group_lookup() {
        let m = sample();
        assert_eq!(m.report_group("Joins", Some("INNER JOIN")).unwrap(), "Queries");
        assert_eq!(
            m.report_group("Joins", Some("FULL OUTER JOIN")).unwrap(),
            "Outer joins"
        );
        assert_eq!(m.report_group("Datatypes", None).unwrap(), "Datatypes");
    }

    #[test]
    fn test_argument_rules() {
        let m = sample();
        assert!(m.has_argument_rule("Built-in functions", "DATEADD", 1));
        assert!(!m.has_argument_rule("Built-in functions", "DATEADD", 2));
        assert_eq!(
            m.argument_status(&v("1.0.0"), "Built-in functions", "DATEADD", 1, Some("nanosecond"))
                .unwrap(),
            Status::NotSupported
        );
        assert_eq!(
            m.argument_status(&v("1.0.0"), "Built-in functions", "DATEADD", 1, None)
                .unwrap(),
            Status::ReviewManually
        );
    }

    #[test]
    fn test_int_limit_and_value_list() {
        let m = sample();
        assert_eq!(m.int_limit("Maximum identifier length").unwrap(), 63);
        assert!(m.int_limit("Joins").is_err());
        assert_eq!(m.value_list("Joins").unwrap().len(), 3);
    }

    #[test]
    fn test_undeclared_version_is_parse_error() {
        let text = "[Versions]\nlist = 1.0.0\n[A]\nsupported-3.0.0 = X\n";
        let err = ConfigMatrix::parse("bad", text).unwrap_err();
        assert!(matches!(err, CompassError::MatrixParse { .. }));
    }

    #[test]
    fn test_key_outside_section_is_parse_error() {
        let err = ConfigMatrix::parse("bad", "list = a\n").unwrap_err();
        assert!(matches!(err, CompassError::MatrixParse { line: 1, .. }));
    }

    #[test]
    fn test_embedded_matrix_loads() {
        let m = ConfigMatrix::embedded().unwrap();
        assert!(m.section_count() > 50);
        assert!(!m.versions().is_empty());
    }
}
