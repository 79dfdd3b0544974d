//! Pattern Registry (spec.md §4.1, component A).
//!
//! Binds a compiled regular expression, an expected capture-group count,
//! and a [`Kind`] tag to each response/request/notification shape. The
//! per-property `Set*`/`Get*`/`Toggle*`/`Increase*`/`Decrease*` families
//! are out of scope (spec.md §1) and mechanically derivable from this
//! table; the entries below are the representative subset the dispatch
//! core itself needs to drive disambiguation and the test scenarios in
//! spec.md §8.
//!
//! Grounded on `examples/original_source`'s
//! `CommandInfraredRegularExpressionBases.cpp`, whose
//! `DisabledRegularExpressionBasis::kRegexp = "IRL([01])"` establishes
//! that entity identifiers are raw digit captures immediately after the
//! object letter (not the literal placeholder letters spec.md's prose
//! examples use for readability).

use regex::Regex;

use crate::error::{Error, Result};

/// The logical shape of one request, response, or notification frame's
/// body (the bytes between the delimiters, not including `[]`/`()`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    SourceName,
    ZoneName,
    ZoneVolumeLevel,
    ZoneVolumeMuteToggle,
    ZoneVolumeMuteToggleResult,
    GroupName,
    GroupVolumeMuteToggle,
    GroupVolumeMuteToggleResult,
    GroupZoneAdd,
    GroupZoneRemove,
    EqualizerPresetName,
    FavoriteName,
    QueryCurrentConfiguration,
    QueryCurrentConfigurationTerminator,
    QueryZone,
    QueryZoneTerminator,
    Error,
    ConfigurationSaving,
    ConfigurationSaved,
}

struct Spec {
    kind: Kind,
    pattern: &'static str,
    capture_count: usize,
}

/// Declaration order is the registry's specificity order: fixed, no-
/// capture literals first, then the rest from most- to least-specific.
/// `PatternRegistry::match_line` returns the first entry that matches.
fn response_specs() -> Vec<Spec> {
    vec![
        Spec {
            kind: Kind::Error,
            pattern: r"^ERROR$",
            capture_count: 0,
        },
        Spec {
            kind: Kind::ConfigurationSaving,
            pattern: r"^SAVING$",
            capture_count: 0,
        },
        Spec {
            kind: Kind::ConfigurationSaved,
            pattern: r"^SAVED$",
            capture_count: 0,
        },
        Spec {
            kind: Kind::QueryCurrentConfigurationTerminator,
            pattern: r"^QX$",
            capture_count: 0,
        },
        Spec {
            kind: Kind::QueryZoneTerminator,
            pattern: r"^QZ(\d+)$",
            capture_count: 1,
        },
        Spec {
            kind: Kind::SourceName,
            pattern: r#"^OName(\d+)"([^"]*)"$"#,
            capture_count: 2,
        },
        Spec {
            kind: Kind::ZoneName,
            pattern: r#"^ZName(\d+)"([^"]*)"$"#,
            capture_count: 2,
        },
        Spec {
            kind: Kind::GroupName,
            pattern: r#"^GName(\d+)"([^"]*)"$"#,
            capture_count: 2,
        },
        Spec {
            kind: Kind::EqualizerPresetName,
            pattern: r#"^EName(\d+)"([^"]*)"$"#,
            capture_count: 2,
        },
        Spec {
            kind: Kind::FavoriteName,
            pattern: r#"^FName(\d+)"([^"]*)"$"#,
            capture_count: 2,
        },
        Spec {
            kind: Kind::ZoneVolumeMuteToggleResult,
            pattern: r"^Z(\d+)VM([01])$",
            capture_count: 2,
        },
        Spec {
            kind: Kind::GroupVolumeMuteToggleResult,
            pattern: r"^G(\d+)VM([01])$",
            capture_count: 2,
        },
        Spec {
            kind: Kind::ZoneVolumeLevel,
            pattern: r"^Z(\d+)VUL(-?\d+)$",
            capture_count: 2,
        },
        Spec {
            kind: Kind::GroupZoneAdd,
            pattern: r"^G(\d+)AO(\d+)$",
            capture_count: 2,
        },
        Spec {
            kind: Kind::GroupZoneRemove,
            pattern: r"^G(\d+)RO(\d+)$",
            capture_count: 2,
        },
    ]
}

/// Server-side request pattern table (spec.md §4.5): bracket syntax,
/// matched against inbound frames to dispatch to a per-controller
/// handler.
fn request_specs() -> Vec<Spec> {
    vec![
        Spec {
            kind: Kind::QueryCurrentConfiguration,
            pattern: r"^QX$",
            capture_count: 0,
        },
        Spec {
            kind: Kind::QueryZone,
            pattern: r"^QZ(\d+)$",
            capture_count: 1,
        },
        Spec {
            kind: Kind::ZoneVolumeLevel,
            pattern: r"^Z(\d+)VUL(-?\d+)$",
            capture_count: 2,
        },
        Spec {
            kind: Kind::ZoneVolumeMuteToggle,
            pattern: r"^Z(\d+)VMT$",
            capture_count: 1,
        },
        Spec {
            kind: Kind::GroupVolumeMuteToggle,
            pattern: r"^G(\d+)VMT$",
            capture_count: 1,
        },
        Spec {
            kind: Kind::GroupZoneAdd,
            pattern: r"^G(\d+)AO(\d+)$",
            capture_count: 2,
        },
        Spec {
            kind: Kind::GroupZoneRemove,
            pattern: r"^G(\d+)RO(\d+)$",
            capture_count: 2,
        },
    ]
}

/// A compiled, ordered pattern table. `Match(bytes, ...)` in spec.md's
/// prose is `match_line` here: frame extraction (finding the CR-LF) is a
/// separate concern (see `wire::next_frame`), so this operates on one
/// already-delimited line.
pub struct PatternRegistry {
    entries: Vec<(Kind, Regex)>,
}

impl PatternRegistry {
    fn compile(specs: Vec<Spec>) -> Result<Self> {
        let mut entries = Vec::with_capacity(specs.len());
        for spec in specs {
            let regex = Regex::new(spec.pattern).map_err(Error::internal)?;
            // CompileAll: a pattern that fails to compile, or whose
            // capture-group count doesn't match its declaration, is a
            // fatal initialization error (spec.md §4.1).
            if regex.captures_len() - 1 != spec.capture_count {
                return Err(Error::internal(format!(
                    "pattern {:?} declared {} captures but has {}",
                    spec.kind,
                    spec.capture_count,
                    regex.captures_len() - 1
                )));
            }
            entries.push((spec.kind, regex));
        }
        Ok(PatternRegistry { entries })
    }

    /// The shared response/notification table (spec.md §4.1: "Patterns
    /// are sorted most-specific first").
    pub fn responses() -> Result<Self> {
        Self::compile(response_specs())
    }

    /// The server-side request table (spec.md §4.5).
    pub fn requests() -> Result<Self> {
        Self::compile(request_specs())
    }

    /// Strips delimiters (`[]` or `()`) from a raw frame and matches the
    /// body against the table, returning the first (most specific)
    /// match.
    pub fn match_frame<'t>(&self, frame: &'t str) -> Option<(Kind, regex::Captures<'t>)> {
        let body = strip_delimiters(frame)?;
        self.match_line(body)
    }

    /// Matches an already-delimiter-stripped line.
    pub fn match_line<'t>(&self, line: &'t str) -> Option<(Kind, regex::Captures<'t>)> {
        for (kind, regex) in &self.entries {
            if let Some(caps) = regex.captures(line) {
                return Some((*kind, caps));
            }
        }
        None
    }

    /// Tests `line` against exactly one kind's pattern, bypassing
    /// specificity ordering. Used by the client-side Command Manager to
    /// test an already-delimiter-stripped frame against the *active*
    /// exchange's completion pattern specifically (spec.md §4.4.2),
    /// rather than whatever the table's most-specific match happens to
    /// be.
    pub fn match_kind_line<'t>(&self, kind: Kind, line: &'t str) -> Option<regex::Captures<'t>> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .and_then(|(_, regex)| regex.captures(line))
    }
}

/// Converts borrowed `Captures` into an owned vector (index 0, the
/// whole match, dropped) so they can outlive the buffer they were
/// matched against and cross an `async` suspension point into a
/// handler closure.
pub fn owned_captures(captures: &regex::Captures<'_>) -> Vec<Option<String>> {
    captures
        .iter()
        .skip(1)
        .map(|m| m.map(|m| m.as_str().to_string()))
        .collect()
}

pub(crate) fn strip_delimiters(frame: &str) -> Option<&str> {
    let bytes = frame.as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    match (bytes[0], bytes[bytes.len() - 1]) {
        (b'[', b']') | (b'(', b')') => Some(&frame[1..frame.len() - 1]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn most_specific_wins_for_query_terminator_vs_config() {
        let registry = PatternRegistry::responses().unwrap();
        let (kind, _) = registry.match_frame("(QX)").unwrap();
        assert_eq!(kind, Kind::QueryCurrentConfigurationTerminator);
    }

    #[test]
    fn zone_name_captures_id_and_value() {
        let registry = PatternRegistry::responses().unwrap();
        let (kind, caps) = registry.match_frame("(ZName1\"Kitchen\")").unwrap();
        assert_eq!(kind, Kind::ZoneName);
        assert_eq!(&caps[1], "1");
        assert_eq!(&caps[2], "Kitchen");
    }

    #[test]
    fn unmatched_frame_returns_none() {
        let registry = PatternRegistry::responses().unwrap();
        assert!(registry.match_frame("(BOGUS)").is_none());
    }

    #[test]
    fn match_kind_line_tests_only_the_requested_kind() {
        let registry = PatternRegistry::responses().unwrap();
        assert!(registry
            .match_kind_line(Kind::QueryCurrentConfigurationTerminator, "QX")
            .is_some());
        assert!(registry
            .match_kind_line(Kind::QueryCurrentConfigurationTerminator, "ZName1\"Kitchen\"")
            .is_none());
    }

    #[test]
    fn request_table_matches_bracket_frames() {
        let registry = PatternRegistry::requests().unwrap();
        let (kind, caps) = registry.match_frame("[Z1VUL-20]").unwrap();
        assert_eq!(kind, Kind::ZoneVolumeLevel);
        assert_eq!(&caps[1], "1");
        assert_eq!(&caps[2], "-20");
    }
}
