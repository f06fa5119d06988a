//! A time-zone database engine over parsed IANA tz records.
//!
//! Given the zone lines and rule records of the tz database, this crate
//! materializes, per named zone, an ordered sequence of contiguous
//! **periods** describing the local clock across all of history and
//! into the open future, and answers two queries against them: which
//! period contains a UTC instant, and which period(s) contain a naive
//! wall-clock datetime. Clock gaps (spring-forward) and overlaps
//! (fall-back) are first-class: the builder synthesizes a period for
//! every wall-clock discontinuity, and wall lookups report them as
//! [`WallResolution::Gap`] and [`WallResolution::Ambiguous`].
//!
//! Parsing tz source text is out of scope; input arrives as structured
//! [`ZoneLine`], [`RawRule`], and [`Rules`] values, normally produced
//! by a parser over the tz data files. [`PeriodIndex::compile`] builds
//! every zone once; the resulting index is immutable and can be shared
//! freely across threads.
//!
//! Zones whose tail recurs indefinitely (two open periods carrying
//! their originating rules) are not expanded to the end of time.
//! Lookups that land on the open tail rematerialize the concrete
//! periods for the years around the query instant on the fly, so
//! far-future instants resolve exactly.

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

use alloc::borrow::ToOwned;
use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;

#[macro_use]
mod logging;

mod builder;
mod extend;

pub mod calendar;
pub mod index;
pub mod period;
pub mod rule;
pub mod types;

#[doc(inline)]
pub use index::{CompileOptions, PeriodIndex, WallResolution};
#[doc(inline)]
pub use period::{
    CompiledPeriod, GapBoundary, GapPeriod, OffsetInfo, OverlapPeriod, PeriodBound, PeriodInstant,
    ZonePeriod,
};
#[doc(inline)]
pub use rule::{DayOfMonth, Month, RawRule, RuleSpan, RuleYear, Rules, WeekDay};
#[doc(inline)]
pub use types::{AbbreviationFormat, Bound, CivilDateTime, RuleIdentifier, TimeKind, ZoneLine};

/// The error type for building and lookup operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodError {
    /// The requested zone name is unknown.
    ZoneNotFound(String),
    /// An invariant violation in the input database or the compiled
    /// periods. Carries the affected zone and the violated condition.
    Structural {
        zone: String,
        context: &'static str,
    },
}

impl PeriodError {
    pub(crate) fn structural(zone: &str, context: &'static str) -> Self {
        Self::Structural {
            zone: zone.to_owned(),
            context,
        }
    }
}

impl core::fmt::Display for PeriodError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ZoneNotFound(zone) => write!(f, "time zone not found: {zone}"),
            Self::Structural { zone, context } => {
                write!(f, "structural error in zone {zone}: {context}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PeriodError {}

/// Raw zone and rule records for a set of zones, keyed the way the tz
/// database keys them: zones by IANA identifier, rule sets by NAME.
///
/// See [`PeriodIndex::compile`] to turn this into something queryable.
#[derive(Debug, Clone, Default)]
pub struct TzData {
    pub zones: HashMap<String, Vec<ZoneLine>>,
    pub rules: HashMap<String, Rules>,
}

impl TzData {
    pub fn add_zone(&mut self, name: &str, lines: Vec<ZoneLine>) {
        self.zones.insert(name.to_owned(), lines);
    }

    pub fn add_rules(&mut self, name: &str, rules: Rules) {
        self.rules.insert(name.to_owned(), rules);
    }

    /// Merges another data set into this one, newer entries winning.
    pub fn extend(&mut self, other: Self) {
        self.zones.extend(other.zones);
        self.rules.extend(other.rules);
    }
}
