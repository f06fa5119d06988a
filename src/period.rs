//! Compiled period shapes and the shrink pass that produces them.
//!
//! Built periods carry every boundary representation; the compiled
//! shapes keep only what lookup and callers need. Regular and overlap
//! boundaries reduce to the two integer axes, gap boundaries also keep
//! the wall datetime so a gap can be reported in wall-clock terms, and
//! the offset fields take their external names: `utc_offset` is the
//! total standard offset from UTC, `std_offset` the saving on top of
//! standard time. The list is reversed so lookups walk newest to
//! oldest.

use alloc::string::String;
use alloc::vec::Vec;

use crate::builder::{DynamicSeed, RawBound, RawOffsets, RawPeriod};
use crate::calendar;
use crate::types::CivilDateTime;

/// A finite compiled boundary: the instant on both lookup axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodInstant {
    /// Seconds since the Unix epoch.
    pub unix_time: i64,
    /// Seconds from 0000-01-01 00:00:00 to the boundary's wall datetime.
    pub wall_seconds: i64,
}

/// A compiled period boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PeriodBound {
    Min,
    Finite(PeriodInstant),
    Max,
}

impl PeriodBound {
    pub fn unix_time(&self) -> Option<i64> {
        match self {
            Self::Finite(instant) => Some(instant.unix_time),
            _ => None,
        }
    }

    /// The boundary's wall datetime, reconstructed on demand.
    pub fn wall(&self) -> Option<CivilDateTime> {
        match self {
            Self::Finite(instant) => {
                Some(calendar::civil_from_gregorian_seconds(instant.wall_seconds))
            }
            _ => None,
        }
    }

    fn begun_by_unix(&self, t: i64) -> bool {
        match self {
            Self::Min => true,
            Self::Finite(instant) => instant.unix_time <= t,
            Self::Max => false,
        }
    }

    fn ends_after_unix(&self, t: i64) -> bool {
        match self {
            Self::Max => true,
            Self::Finite(instant) => t < instant.unix_time,
            Self::Min => false,
        }
    }

    fn begun_by_wall(&self, seconds: i64) -> bool {
        match self {
            Self::Min => true,
            Self::Finite(instant) => instant.wall_seconds <= seconds,
            Self::Max => false,
        }
    }

    fn ends_after_wall(&self, seconds: i64) -> bool {
        match self {
            Self::Max => true,
            Self::Finite(instant) => seconds < instant.wall_seconds,
            Self::Min => false,
        }
    }
}

/// A gap boundary keeps its wall datetime for reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapBoundary {
    pub unix_time: i64,
    pub wall_seconds: i64,
    pub wall: CivilDateTime,
}

/// The offsets of a period neighboring a gap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetInfo {
    /// Offset of standard time from UTC, in seconds.
    pub utc_offset: i64,
    /// Saving on top of standard time, in seconds.
    pub std_offset: i64,
}

/// A span of uniform local-clock behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonePeriod {
    pub from: PeriodBound,
    pub to: PeriodBound,
    /// Offset of standard time from UTC, in seconds.
    pub utc_offset: i64,
    /// Saving on top of standard time, in seconds. Zero is standard
    /// time.
    pub std_offset: i64,
    pub abbr: String,
    pub(crate) seed: Option<DynamicSeed>,
}

impl ZonePeriod {
    /// The total offset of the local clock from UTC.
    pub fn total_offset(&self) -> i64 {
        self.utc_offset + self.std_offset
    }
}

/// A wall-clock interval that does not exist. Its endpoints coincide in
/// UTC.
#[derive(Debug, Clone, PartialEq)]
pub struct GapPeriod {
    pub from: GapBoundary,
    pub to: GapBoundary,
    pub before: OffsetInfo,
    pub after: OffsetInfo,
}

/// A wall-clock interval that occurs twice. Its `from` lies after its
/// `to` in UTC.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlapPeriod {
    pub from: PeriodInstant,
    pub to: PeriodInstant,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompiledPeriod {
    Regular(ZonePeriod),
    Gap(GapPeriod),
    Overlap(OverlapPeriod),
}

impl CompiledPeriod {
    pub fn as_regular(&self) -> Option<&ZonePeriod> {
        match self {
            Self::Regular(period) => Some(period),
            _ => None,
        }
    }

    pub(crate) fn contains_unix(&self, t: i64) -> bool {
        match self {
            Self::Regular(period) => {
                period.from.begun_by_unix(t) && period.to.ends_after_unix(t)
            }
            Self::Gap(gap) => gap.from.unix_time <= t && t < gap.to.unix_time,
            Self::Overlap(overlap) => overlap.from.unix_time <= t && t < overlap.to.unix_time,
        }
    }

    pub(crate) fn contains_wall(&self, seconds: i64) -> bool {
        match self {
            Self::Regular(period) => {
                period.from.begun_by_wall(seconds) && period.to.ends_after_wall(seconds)
            }
            Self::Gap(gap) => gap.from.wall_seconds <= seconds && seconds < gap.to.wall_seconds,
            Self::Overlap(overlap) => {
                overlap.from.wall_seconds <= seconds && seconds < overlap.to.wall_seconds
            }
        }
    }

    pub(crate) fn start_unix(&self) -> Option<i64> {
        match self {
            Self::Regular(period) => period.from.unix_time(),
            Self::Gap(gap) => Some(gap.from.unix_time),
            Self::Overlap(overlap) => Some(overlap.from.unix_time),
        }
    }

    pub(crate) fn start_wall_seconds(&self) -> Option<i64> {
        match self {
            Self::Regular(period) => match &period.from {
                PeriodBound::Finite(instant) => Some(instant.wall_seconds),
                _ => None,
            },
            Self::Gap(gap) => Some(gap.from.wall_seconds),
            Self::Overlap(overlap) => Some(overlap.from.wall_seconds),
        }
    }
}

fn compiled_bound(bound: &RawBound) -> PeriodBound {
    match bound {
        RawBound::Min => PeriodBound::Min,
        RawBound::Max => PeriodBound::Max,
        RawBound::Finite(instant) => PeriodBound::Finite(PeriodInstant {
            unix_time: instant.unix_time,
            wall_seconds: instant.wall_seconds,
        }),
    }
}

fn offset_info(offsets: &RawOffsets) -> OffsetInfo {
    OffsetInfo {
        utc_offset: offsets.std_offset,
        std_offset: offsets.save,
    }
}

/// Converts the built list to the compiled shape and reverses it into
/// descending time order.
pub(crate) fn shrink(raw: Vec<RawPeriod>) -> Vec<CompiledPeriod> {
    let mut compiled: Vec<CompiledPeriod> = raw
        .into_iter()
        .map(|period| match period {
            RawPeriod::Regular(regular) => CompiledPeriod::Regular(ZonePeriod {
                from: compiled_bound(&regular.from),
                to: compiled_bound(&regular.to),
                utc_offset: regular.std_offset,
                std_offset: regular.save,
                abbr: regular.abbr,
                seed: regular.seed,
            }),
            RawPeriod::Gap(gap) => CompiledPeriod::Gap(GapPeriod {
                from: GapBoundary {
                    unix_time: gap.from.unix_time,
                    wall_seconds: gap.from.wall_seconds,
                    wall: gap.from.wall,
                },
                to: GapBoundary {
                    unix_time: gap.to.unix_time,
                    wall_seconds: gap.to.wall_seconds,
                    wall: gap.to.wall,
                },
                before: offset_info(&gap.before),
                after: offset_info(&gap.after),
            }),
            RawPeriod::Overlap(overlap) => CompiledPeriod::Overlap(OverlapPeriod {
                from: PeriodInstant {
                    unix_time: overlap.from.unix_time,
                    wall_seconds: overlap.from.wall_seconds,
                },
                to: PeriodInstant {
                    unix_time: overlap.to.unix_time,
                    wall_seconds: overlap.to.wall_seconds,
                },
            }),
        })
        .collect();
    compiled.reverse();
    compiled
}
