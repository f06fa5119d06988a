//! Core data model shared by the builder and the lookup layer.

use core::fmt::Write;

use alloc::borrow::ToOwned;
use alloc::string::String;

use crate::calendar;

/// Which clock a civil datetime is expressed in.
///
/// `Wall` is the locally observed clock, `Standard` ignores any daylight
/// saving shift, and `Universal` is UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeKind {
    Wall,
    Standard,
    Universal,
}

/// A proleptic Gregorian datetime at second precision, with no attached
/// offset. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CivilDateTime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl CivilDateTime {
    pub const fn new(year: i32, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }
}

/// An endpoint of a zone line or rule span: the infinite past, the open
/// future, or a concrete datetime tagged with the clock it is read on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Min,
    At(CivilDateTime, TimeKind),
    Max,
}

/// One instant carried in every representation the engine compares on:
/// the three civil clocks plus the two integer axes used for lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryInstant {
    pub wall: CivilDateTime,
    pub standard: CivilDateTime,
    pub utc: CivilDateTime,
    pub unix_time: i64,
    pub wall_seconds: i64,
}

impl BoundaryInstant {
    /// Resolves a tagged civil datetime into all representations under
    /// the given offsets, where
    /// `wall = standard + save = utc + std_offset + save`.
    pub(crate) fn resolve(
        dt: CivilDateTime,
        kind: TimeKind,
        std_offset: i64,
        save: i64,
    ) -> Self {
        let base = calendar::unix_seconds(&dt);
        let unix_time = match kind {
            TimeKind::Wall => base - std_offset - save,
            TimeKind::Standard => base - std_offset,
            TimeKind::Universal => base,
        };
        let wall_unix = unix_time + std_offset + save;
        Self {
            wall: calendar::civil_from_unix(wall_unix),
            standard: calendar::civil_from_unix(unix_time + std_offset),
            utc: calendar::civil_from_unix(unix_time),
            unix_time,
            wall_seconds: wall_unix + calendar::GREGORIAN_EPOCH_SECONDS,
        }
    }

    /// The civil representation read on the given clock.
    pub(crate) fn civil(&self, kind: TimeKind) -> CivilDateTime {
        match kind {
            TimeKind::Wall => self.wall,
            TimeKind::Standard => self.standard,
            TimeKind::Universal => self.utc,
        }
    }
}

/// The RULES column of a zone line: nothing, a literal saving applied on
/// top of standard time, or a reference to a named rule set.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleIdentifier {
    None,
    Fixed(i64),
    Named(String),
}

/// One continuous epoch of a named zone: its standard offset from UTC,
/// the rules in effect, the abbreviation template, and the datetimes at
/// which the epoch begins and ends.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneLine {
    /// Offset of standard time from UTC, in seconds.
    pub std_offset: i64,
    pub rule: RuleIdentifier,
    pub format: AbbreviationFormat,
    pub from: Bound,
    pub to: Bound,
}

/// The FORMAT column of a zone line.
#[derive(Debug, Clone, PartialEq)]
pub enum AbbreviationFormat {
    String(String),
    Pair(String, String),
    Formattable(String),
    Numeric,
}

impl AbbreviationFormat {
    pub fn new(template: &str) -> Self {
        if template.contains("%s") {
            Self::Formattable(template.to_owned())
        } else if template.contains("%z") {
            Self::Numeric
        } else if let Some((std, dst)) = template.split_once('/') {
            Self::Pair(std.to_owned(), dst.to_owned())
        } else {
            Self::String(template.to_owned())
        }
    }

    pub fn format(&self, offset: i64, letter: Option<&str>, is_dst: bool) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Formattable(tpl) => tpl.replace("%s", letter.unwrap_or("")),
            Self::Pair(std, dst) => {
                if is_dst {
                    dst.clone()
                } else {
                    std.clone()
                }
            }
            Self::Numeric => offset_to_abbr(offset),
        }
    }
}

fn offset_to_abbr(offset: i64) -> String {
    let mut output = String::new();
    let sign = if offset < 0 { '-' } else { '+' };
    let hour = offset.abs().div_euclid(3600);
    let minute = offset.abs().rem_euclid(3600).div_euclid(60);
    let _ = write!(&mut output, "{sign}{hour:02}");
    if minute > 0 {
        let _ = write!(&mut output, "{minute:02}");
    }
    output
}
