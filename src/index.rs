//! The compiled per-zone period table and the two lookup operations.

use alloc::borrow::ToOwned;
use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::{DefaultHashBuilder, HashMap};
use indexmap::IndexMap;

use crate::builder::{self, RuleResolver};
use crate::calendar;
use crate::extend;
use crate::period::{self, CompiledPeriod, OffsetInfo, PeriodBound, ZonePeriod};
use crate::rule::{RuleSpan, Rules};
use crate::types::{Bound, CivilDateTime, RuleIdentifier, ZoneLine};
use crate::{PeriodError, TzData};

type ZoneMap = IndexMap<String, Vec<CompiledPeriod>, DefaultHashBuilder>;

/// Knobs for [`PeriodIndex::compile_with`].
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Expand recurring rules concretely through at least this year.
    /// Years at or before the computed expansion horizon have no effect;
    /// later years trade compile size for lookups that stay off the
    /// dynamic path.
    pub horizon: Option<i32>,
}

/// The answer to a wall-clock lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum WallResolution {
    /// The datetime exists exactly once.
    Unambiguous(ZonePeriod),
    /// The datetime was skipped by a forward clock jump. Carries the
    /// offsets on both sides and the skipped wall interval.
    Gap {
        before: OffsetInfo,
        after: OffsetInfo,
        from_wall: CivilDateTime,
        to_wall: CivilDateTime,
    },
    /// The datetime occurred twice around a backward clock jump.
    Ambiguous {
        earlier: ZonePeriod,
        later: ZonePeriod,
    },
}

/// Immutable compiled period lists for a set of zones, answering "which
/// period contains this UTC instant" and "which periods contain this
/// wall datetime".
#[derive(Debug)]
pub struct PeriodIndex {
    zones: ZoneMap,
}

impl PeriodIndex {
    pub fn compile(data: &TzData) -> Result<Self, PeriodError> {
        Self::compile_with(data, CompileOptions::default())
    }

    pub fn compile_with(data: &TzData, options: CompileOptions) -> Result<Self, PeriodError> {
        let mut spans: HashMap<String, Vec<RuleSpan>> = HashMap::new();
        for (name, rules) in &data.rules {
            let mut horizon = expansion_horizon(name, rules, &data.zones);
            if let Some(at_least) = options.horizon {
                horizon = horizon.max(at_least);
            }
            spans.insert(name.clone(), rules.expand(name, horizon));
        }
        let resolver = RuleResolver { spans: &spans };

        let mut zones: ZoneMap = IndexMap::with_hasher(DefaultHashBuilder::default());
        for (name, lines) in &data.zones {
            let raw = builder::build_zone(name, lines, &resolver)?;
            debug!("compiled {} periods for zone {}", raw.len(), name);
            zones.insert(name.clone(), period::shrink(raw));
        }
        zones.sort_unstable_keys();
        Ok(Self { zones })
    }

    pub fn zone_names(&self) -> impl Iterator<Item = &str> {
        self.zones.keys().map(String::as_str)
    }

    /// The compiled periods of a zone, newest first.
    pub fn periods(&self, zone: &str) -> Option<&[CompiledPeriod]> {
        self.zones.get(zone).map(Vec::as_slice)
    }

    /// Returns the regular period containing the UTC instant.
    pub fn period_for_utc_instant(
        &self,
        zone: &str,
        unix_time: i64,
    ) -> Result<ZonePeriod, PeriodError> {
        let periods = self
            .zones
            .get(zone)
            .ok_or_else(|| PeriodError::ZoneNotFound(zone.to_owned()))?;
        let found = regular_by_unix(zone, periods, unix_time)?;
        if found.to == PeriodBound::Max {
            if let Some(tail) = recurring_tail(periods) {
                let year = calendar::civil_from_unix(unix_time).year;
                let dynamic = extend::periods_for_year(zone, tail, year)?;
                return regular_by_unix(zone, &dynamic, unix_time).cloned();
            }
        }
        Ok(found.clone())
    }

    /// Resolves a naive wall datetime to the period(s) containing it.
    pub fn periods_for_wall_datetime(
        &self,
        zone: &str,
        naive: CivilDateTime,
    ) -> Result<WallResolution, PeriodError> {
        let periods = self
            .zones
            .get(zone)
            .ok_or_else(|| PeriodError::ZoneNotFound(zone.to_owned()))?;
        let wall_seconds = calendar::gregorian_seconds(&naive);
        let matches = collect_by_wall(periods, wall_seconds);
        let touches_tail = matches.iter().any(|period| {
            matches!(period, CompiledPeriod::Regular(regular)
                if regular.to == PeriodBound::Max && regular.seed.is_some())
        });
        if touches_tail {
            if let Some(tail) = recurring_tail(periods) {
                let dynamic = extend::periods_for_year(zone, tail, naive.year)?;
                let matches = collect_by_wall(&dynamic, wall_seconds);
                return resolve_wall_matches(zone, &matches);
            }
        }
        resolve_wall_matches(zone, &matches)
    }
}

/// The largest year a named set must be expanded through: the last year
/// its own records name, or one past the last bounded zone line that
/// references it, whichever is later. Past this point the open tail and
/// dynamic materialization take over.
fn expansion_horizon(
    name: &str,
    rules: &Rules,
    zones: &HashMap<String, Vec<ZoneLine>>,
) -> i32 {
    let mut horizon = rules.last_named_year();
    for lines in zones.values() {
        for line in lines {
            let references = matches!(&line.rule, RuleIdentifier::Named(n) if n == name);
            if references {
                if let Bound::At(dt, _) = &line.to {
                    horizon = horizon.max(dt.year + 1);
                }
            }
        }
    }
    horizon
}

/// Walks the descending list for the first period containing the UTC
/// instant. Once a period starting a full day before the instant has
/// been examined, no older period can contain it and the walk stops.
fn find_by_unix<'a>(periods: &'a [CompiledPeriod], t: i64) -> Option<&'a CompiledPeriod> {
    for period in periods {
        if period.contains_unix(t) {
            return Some(period);
        }
        if let Some(start) = period.start_unix() {
            if start <= t - calendar::SECONDS_PER_DAY {
                break;
            }
        }
    }
    None
}

fn regular_by_unix<'a>(
    zone: &str,
    periods: &'a [CompiledPeriod],
    t: i64,
) -> Result<&'a ZonePeriod, PeriodError> {
    let found = find_by_unix(periods, t)
        .ok_or_else(|| PeriodError::structural(zone, "no period contains the utc instant"))?;
    found
        .as_regular()
        .ok_or_else(|| PeriodError::structural(zone, "utc instant resolved to a synthetic period"))
}

/// Collects every period containing the wall datetime, with the same
/// one-day stop as the UTC walk.
fn collect_by_wall<'a>(
    periods: &'a [CompiledPeriod],
    wall_seconds: i64,
) -> Vec<&'a CompiledPeriod> {
    let mut matches = Vec::new();
    for period in periods {
        if period.contains_wall(wall_seconds) {
            matches.push(period);
        }
        if let Some(start) = period.start_wall_seconds() {
            if start <= wall_seconds - calendar::SECONDS_PER_DAY {
                break;
            }
        }
    }
    matches
}

fn resolve_wall_matches(
    zone: &str,
    matches: &[&CompiledPeriod],
) -> Result<WallResolution, PeriodError> {
    match matches {
        [single] => match single {
            CompiledPeriod::Regular(regular) => Ok(WallResolution::Unambiguous(regular.clone())),
            CompiledPeriod::Gap(gap) => Ok(WallResolution::Gap {
                before: gap.before,
                after: gap.after,
                from_wall: gap.from.wall,
                to_wall: gap.to.wall,
            }),
            CompiledPeriod::Overlap(_) => Err(PeriodError::structural(
                zone,
                "wall datetime matched a bare overlap",
            )),
        },
        // Descending order: the later period, the overlap, the earlier
        // period.
        [first, middle, last] => {
            let (
                CompiledPeriod::Regular(later),
                CompiledPeriod::Overlap(_),
                CompiledPeriod::Regular(earlier),
            ) = (first, middle, last)
            else {
                return Err(PeriodError::structural(
                    zone,
                    "wall datetime matched an unexpected period shape",
                ));
            };
            Ok(WallResolution::Ambiguous {
                earlier: earlier.clone(),
                later: later.clone(),
            })
        }
        _ => Err(PeriodError::structural(
            zone,
            "wall datetime match count is not one or three",
        )),
    }
}

/// The recurring tail of a zone: its two chronologically last periods
/// when both are open and carry rematerialization seeds.
fn recurring_tail(periods: &[CompiledPeriod]) -> Option<[&ZonePeriod; 2]> {
    let (Some(CompiledPeriod::Regular(last)), Some(CompiledPeriod::Regular(second_last))) =
        (periods.first(), periods.get(1))
    else {
        return None;
    };
    let recurring = last.to == PeriodBound::Max
        && second_last.to == PeriodBound::Max
        && last.seed.is_some()
        && second_last.seed.is_some();
    recurring.then_some([last, second_last])
}
