//! Materializes the open recurring tail of a zone for one query year.
//!
//! A zone whose last two periods are both open describes a recurrence
//! ("DST switches twice a year, indefinitely") rather than concrete
//! transitions. When a lookup lands there, the retained raw rules are
//! re-expanded for the years around the query, the single retained zone
//! line is rebuilt through the ordinary builder, and the query is
//! re-run against the resulting short list. The rebuilt expansion is
//! fully concrete except for its final span, so the rebuilt list can
//! never trigger a further materialization.

use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::builder::{self, RuleResolver};
use crate::period::{self, CompiledPeriod, ZonePeriod};
use crate::rule::{RuleSpan, Rules};
use crate::types::ZoneLine;
use crate::PeriodError;

pub(crate) fn periods_for_year(
    zone: &str,
    tail: [&ZonePeriod; 2],
    year: i32,
) -> Result<Vec<CompiledPeriod>, PeriodError> {
    let mut rules: HashMap<String, Rules> = HashMap::new();
    let mut line: Option<ZoneLine> = None;
    for period in tail {
        let Some(seed) = period.seed.as_ref() else {
            return Err(PeriodError::structural(
                zone,
                "open tail period carries no rule seed",
            ));
        };
        rules
            .entry(seed.name.clone())
            .or_default()
            .push(seed.raw.clone());
        line.get_or_insert_with(|| seed.line.clone());
    }
    let Some(line) = line else {
        return Err(PeriodError::structural(
            zone,
            "open tail period carries no zone line",
        ));
    };

    let mut spans: HashMap<String, Vec<RuleSpan>> = HashMap::new();
    for (name, set) in &rules {
        spans.insert(name.clone(), set.expand_window(name, year - 1, year + 1));
    }
    trace!("materializing periods for zone {} around year {}", zone, year);
    let resolver = RuleResolver { spans: &spans };
    let raw = builder::build_zone(zone, core::slice::from_ref(&line), &resolver)?;
    Ok(period::shrink(raw))
}
