//! Builds the ordered period timeline for a single zone.
//!
//! The zone lines are folded in order, threading the previously emitted
//! regular period. A line with no rules (or a literal saving) is one
//! period; a line naming a rule set is cut against the expanded spans of
//! that set, padded and trimmed to the line's window, and emitted one
//! period per span. Wherever the total offset changes between two
//! periods a synthetic gap or overlap period is inserted to describe
//! the wall-clock discontinuity.

use alloc::borrow::ToOwned;
use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::calendar;
use crate::rule::{RawRule, RuleSpan};
use crate::types::{Bound, BoundaryInstant, RuleIdentifier, TimeKind, ZoneLine};
use crate::PeriodError;

/// A boundary of a built period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum RawBound {
    Min,
    Finite(BoundaryInstant),
    Max,
}

/// What an open-tailed period needs to be rematerialized for a concrete
/// year later: the untransformed rule and the line it was built under.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DynamicSeed {
    pub(crate) name: String,
    pub(crate) raw: RawRule,
    pub(crate) line: ZoneLine,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawRegular {
    pub(crate) from: RawBound,
    pub(crate) to: RawBound,
    /// Offset of standard time from UTC, in seconds.
    pub(crate) std_offset: i64,
    /// Saving on top of standard time, in seconds. Zero is standard time.
    pub(crate) save: i64,
    pub(crate) abbr: String,
    pub(crate) seed: Option<DynamicSeed>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RawOffsets {
    pub(crate) std_offset: i64,
    pub(crate) save: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawGap {
    pub(crate) from: BoundaryInstant,
    pub(crate) to: BoundaryInstant,
    pub(crate) before: RawOffsets,
    pub(crate) after: RawOffsets,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawOverlap {
    pub(crate) from: BoundaryInstant,
    pub(crate) to: BoundaryInstant,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawPeriod {
    Regular(RawRegular),
    Gap(RawGap),
    Overlap(RawOverlap),
}

/// Maps rule-set names to their expanded spans.
pub(crate) struct RuleResolver<'a> {
    pub(crate) spans: &'a HashMap<String, Vec<RuleSpan>>,
}

impl<'a> RuleResolver<'a> {
    fn spans(&self, name: &str) -> Option<&'a [RuleSpan]> {
        self.spans.get(name).map(Vec::as_slice)
    }
}

pub(crate) fn build_zone(
    zone: &str,
    lines: &[ZoneLine],
    resolver: &RuleResolver<'_>,
) -> Result<Vec<RawPeriod>, PeriodError> {
    let mut periods = Vec::new();
    let mut prev: Option<RawRegular> = None;
    for line in lines {
        // A continuation line must begin exactly where the previous
        // period ended, read on the line's own clock.
        if let (Some(p), Bound::At(start, kind)) = (prev.as_ref(), &line.from) {
            if let RawBound::Finite(end) = &p.to {
                if end.civil(*kind) != *start {
                    return Err(PeriodError::structural(
                        zone,
                        "zone line does not stitch to the previous period",
                    ));
                }
            }
        }
        match &line.rule {
            RuleIdentifier::None => emit_fixed(zone, line, 0, &mut periods, &mut prev)?,
            RuleIdentifier::Fixed(save) => emit_fixed(zone, line, *save, &mut periods, &mut prev)?,
            RuleIdentifier::Named(name) => {
                emit_rule_spans(zone, line, name, resolver, &mut periods, &mut prev)?
            }
        }
    }
    if periods.is_empty() {
        return Err(PeriodError::structural(zone, "zone has no lines"));
    }
    Ok(periods)
}

/// Emits the single period of a line with no named rules.
fn emit_fixed(
    zone: &str,
    line: &ZoneLine,
    save: i64,
    periods: &mut Vec<RawPeriod>,
    prev: &mut Option<RawRegular>,
) -> Result<(), PeriodError> {
    let from = match prev.as_ref() {
        None => match &line.from {
            Bound::Min => RawBound::Min,
            Bound::At(dt, kind) => {
                RawBound::Finite(BoundaryInstant::resolve(*dt, *kind, line.std_offset, save))
            }
            Bound::Max => return Err(PeriodError::structural(zone, "zone line begins at :max")),
        },
        Some(p) => start_after(zone, line, p, &line.from, save)?,
    };
    let to = end_bound(zone, line, &line.to, save)?;
    let abbr = line
        .format
        .format(line.std_offset + save, None, save != 0);
    push_regular(
        zone,
        periods,
        prev,
        RawRegular {
            from,
            to,
            std_offset: line.std_offset,
            save,
            abbr,
            seed: None,
        },
    )
}

/// Emits one period per applicable rule span of a named-rule line.
fn emit_rule_spans(
    zone: &str,
    line: &ZoneLine,
    name: &str,
    resolver: &RuleResolver<'_>,
    periods: &mut Vec<RawPeriod>,
    prev: &mut Option<RawRegular>,
) -> Result<(), PeriodError> {
    let spans = resolver.spans(name).ok_or_else(|| {
        PeriodError::structural(zone, "zone line references an unknown rule set")
    })?;

    let entry_std = prev.as_ref().map_or(line.std_offset, |p| p.std_offset);
    let entry_save = prev.as_ref().map_or(0, |p| p.save);

    // Cut the span list down to the ones overlapping this line's window.
    let mut included: Vec<RuleSpan> = Vec::new();
    let mut running_save = entry_save;
    for span in spans {
        if span_applies(line, prev.as_ref(), span, entry_std, running_save) {
            running_save = span.save;
            included.push(span.clone());
        }
    }

    if included.is_empty() {
        // The whole line predates (or postdates) every span: standard
        // time for the full window.
        included.push(RuleSpan {
            name: name.to_owned(),
            from: line.from,
            to: line.to,
            save: 0,
            letter: standard_letter(spans),
            raw: None,
        });
    } else {
        pad_or_clip_start(zone, line, name, spans, entry_save, &mut included)?;
        clip_end(zone, line, &mut included)?;
    }

    for span in included {
        let from = match prev.as_ref() {
            None => match &line.from {
                Bound::Min => RawBound::Min,
                Bound::At(dt, kind) => {
                    RawBound::Finite(BoundaryInstant::resolve(*dt, *kind, line.std_offset, 0))
                }
                Bound::Max => {
                    return Err(PeriodError::structural(zone, "zone line begins at :max"))
                }
            },
            Some(p) => start_after(zone, line, p, &span.from, span.save)?,
        };
        let to = end_bound(zone, line, &span.to, span.save)?;
        let abbr = line.format.format(
            line.std_offset + span.save,
            span.letter.as_deref(),
            span.save != 0,
        );
        let seed = match (&to, &span.raw) {
            (RawBound::Max, Some(raw)) => Some(DynamicSeed {
                name: span.name.clone(),
                raw: raw.clone(),
                line: line.clone(),
            }),
            _ => None,
        };
        push_regular(
            zone,
            periods,
            prev,
            RawRegular {
                from,
                to,
                std_offset: line.std_offset,
                save: span.save,
                abbr,
                seed,
            },
        )?;
    }
    Ok(())
}

/// Whether a span's active window overlaps the zone line's window. The
/// span end is compared against the previous period on the span's own
/// clock; the span start is compared against the line end on the line's
/// clock, resolved with the previous period's standard offset and the
/// saving running at this point of the cut.
fn span_applies(
    line: &ZoneLine,
    prev: Option<&RawRegular>,
    span: &RuleSpan,
    entry_std: i64,
    running_save: i64,
) -> bool {
    let starts_before_line_end = match (&line.to, &span.from) {
        (Bound::Max, _) | (_, Bound::Min) => true,
        (Bound::At(end, kind), Bound::At(dt, at_kind)) => {
            let instant = BoundaryInstant::resolve(*dt, *at_kind, entry_std, running_save);
            instant.civil(*kind) < *end
        }
        (Bound::Min, _) | (_, Bound::Max) => false,
    };
    if !starts_before_line_end {
        return false;
    }
    match &span.to {
        Bound::Max => true,
        Bound::At(dt, kind) => match prev {
            None => true,
            Some(p) => match &p.to {
                RawBound::Finite(end) => end.civil(*kind) < *dt,
                RawBound::Min => true,
                RawBound::Max => false,
            },
        },
        Bound::Min => false,
    }
}

/// Aligns the first included span with the start of the line: a span
/// reaching back before the line is clipped, and a line starting before
/// its first span gets a synthetic standard-time span in front. The
/// synthetic span borrows its letter from the earliest standard-time
/// record of the set, which is what pre-rule time displayed.
fn pad_or_clip_start(
    zone: &str,
    line: &ZoneLine,
    name: &str,
    spans: &[RuleSpan],
    entry_save: i64,
    included: &mut Vec<RuleSpan>,
) -> Result<(), PeriodError> {
    let first_from = included[0].from;
    match (&line.from, &first_from) {
        (Bound::Min, Bound::At(..)) => {
            included.insert(
                0,
                RuleSpan {
                    name: name.to_owned(),
                    from: Bound::Min,
                    to: first_from,
                    save: 0,
                    letter: standard_letter(spans),
                    raw: None,
                },
            );
        }
        (Bound::At(start, kind), Bound::At(dt, at_kind)) => {
            let instant = BoundaryInstant::resolve(*dt, *at_kind, line.std_offset, entry_save);
            let first_start = instant.civil(*kind);
            if first_start > *start {
                included.insert(
                    0,
                    RuleSpan {
                        name: name.to_owned(),
                        from: line.from,
                        to: first_from,
                        save: 0,
                        letter: standard_letter(spans),
                        raw: None,
                    },
                );
            } else if first_start < *start {
                included[0].from = line.from;
            }
        }
        (Bound::At(..), Bound::Min) => included[0].from = line.from,
        (Bound::Min, Bound::Min) => {}
        (Bound::Max, _) => {
            return Err(PeriodError::structural(zone, "zone line begins at :max"))
        }
        (_, Bound::Max) => {
            return Err(PeriodError::structural(zone, "rule span begins at :max"))
        }
    }
    Ok(())
}

/// Clips the last included span to the end of a bounded line.
fn clip_end(
    zone: &str,
    line: &ZoneLine,
    included: &mut [RuleSpan],
) -> Result<(), PeriodError> {
    let Bound::At(end, kind) = &line.to else {
        return Ok(());
    };
    if let Some(last) = included.last_mut() {
        match &last.to {
            Bound::Max => last.to = line.to,
            Bound::At(dt, at_kind) => {
                let instant =
                    BoundaryInstant::resolve(*dt, *at_kind, line.std_offset, last.save);
                if instant.civil(*kind) > *end {
                    last.to = line.to;
                }
            }
            Bound::Min => {}
        }
    }
    // A bounded line may end mid-span, but only on its last span.
    let interior_open = included
        .iter()
        .rev()
        .skip(1)
        .any(|span| span.to == Bound::Max);
    if interior_open {
        return Err(PeriodError::structural(
            zone,
            "open rule span inside a bounded zone line",
        ));
    }
    Ok(())
}

/// The start boundary of a period that follows an existing one. The
/// normal case carries the previous end across the transition on the
/// wall clock, which lands both boundaries on the same UTC instant by
/// construction.
fn start_after(
    zone: &str,
    line: &ZoneLine,
    prev: &RawRegular,
    entry_from: &Bound,
    save: i64,
) -> Result<RawBound, PeriodError> {
    match &prev.to {
        RawBound::Finite(end) => {
            let diff = (line.std_offset + save) - (prev.std_offset + prev.save);
            let wall = calendar::add_seconds(end.wall, diff);
            Ok(RawBound::Finite(BoundaryInstant::resolve(
                wall,
                TimeKind::Wall,
                line.std_offset,
                save,
            )))
        }
        RawBound::Max => match entry_from {
            Bound::At(dt, kind) => Ok(RawBound::Finite(BoundaryInstant::resolve(
                *dt,
                *kind,
                line.std_offset,
                prev.save,
            ))),
            Bound::Min => Ok(RawBound::Min),
            Bound::Max => Err(PeriodError::structural(zone, "period begins at :max")),
        },
        RawBound::Min => Err(PeriodError::structural(
            zone,
            "previous period ends at :min",
        )),
    }
}

fn end_bound(
    zone: &str,
    line: &ZoneLine,
    to: &Bound,
    save: i64,
) -> Result<RawBound, PeriodError> {
    match to {
        Bound::Max => Ok(RawBound::Max),
        Bound::At(dt, kind) => Ok(RawBound::Finite(BoundaryInstant::resolve(
            *dt,
            *kind,
            line.std_offset,
            save,
        ))),
        Bound::Min => Err(PeriodError::structural(zone, "period ends at :min")),
    }
}

fn standard_letter(spans: &[RuleSpan]) -> Option<String> {
    spans
        .iter()
        .find(|span| span.save == 0)
        .and_then(|span| span.letter.clone())
}

/// Appends a regular period, inserting the gap or overlap its offset
/// change opens up against the previous period. Both sides of a change
/// must land on one UTC instant, and a finite period must be non-empty.
fn push_regular(
    zone: &str,
    periods: &mut Vec<RawPeriod>,
    prev: &mut Option<RawRegular>,
    next: RawRegular,
) -> Result<(), PeriodError> {
    if let Some(p) = prev.as_ref() {
        if let (RawBound::Finite(end), RawBound::Finite(start)) = (&p.to, &next.from) {
            if end.unix_time != start.unix_time {
                return Err(PeriodError::structural(
                    zone,
                    "utc boundaries do not coincide between adjacent periods",
                ));
            }
            let diff = (next.std_offset + next.save) - (p.std_offset + p.save);
            if diff > 0 {
                periods.push(RawPeriod::Gap(RawGap {
                    from: *end,
                    to: *start,
                    before: RawOffsets {
                        std_offset: p.std_offset,
                        save: p.save,
                    },
                    after: RawOffsets {
                        std_offset: next.std_offset,
                        save: next.save,
                    },
                }));
            } else if diff < 0 {
                periods.push(RawPeriod::Overlap(RawOverlap {
                    from: *start,
                    to: *end,
                }));
            }
        }
    }
    if let (RawBound::Finite(start), RawBound::Finite(end)) = (&next.from, &next.to) {
        if start.unix_time == end.unix_time {
            return Err(PeriodError::structural(
                zone,
                "degenerate period with equal endpoints",
            ));
        }
        if end.unix_time < start.unix_time {
            return Err(PeriodError::structural(
                zone,
                "period endpoints out of order",
            ));
        }
    }
    periods.push(RawPeriod::Regular(next.clone()));
    *prev = Some(next);
    Ok(())
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::types::{AbbreviationFormat, CivilDateTime};

    fn empty_resolver() -> HashMap<String, Vec<RuleSpan>> {
        HashMap::new()
    }

    fn fixed_line(
        std_offset: i64,
        abbr: &str,
        from: Bound,
        to: Bound,
    ) -> ZoneLine {
        ZoneLine {
            std_offset,
            rule: RuleIdentifier::None,
            format: AbbreviationFormat::new(abbr),
            from,
            to,
        }
    }

    #[test]
    fn single_fixed_line_is_one_unbounded_period() {
        let spans = empty_resolver();
        let resolver = RuleResolver { spans: &spans };
        let lines = vec![fixed_line(0, "UTC", Bound::Min, Bound::Max)];
        let periods = build_zone("Etc/UTC", &lines, &resolver).unwrap();
        assert_eq!(periods.len(), 1);
        let RawPeriod::Regular(period) = &periods[0] else {
            panic!("expected a regular period");
        };
        assert_eq!(period.from, RawBound::Min);
        assert_eq!(period.to, RawBound::Max);
        assert_eq!(period.abbr, "UTC");
        assert_eq!(period.save, 0);
    }

    #[test]
    fn forward_offset_change_inserts_gap() {
        let spans = empty_resolver();
        let resolver = RuleResolver { spans: &spans };
        let cut = Bound::At(CivilDateTime::new(1941, 10, 1, 0, 0, 0), TimeKind::Wall);
        let lines = vec![
            fixed_line(19_800, "IST", Bound::Min, cut),
            fixed_line(23_400, "%z", cut, Bound::Max),
        ];
        let periods = build_zone("Asia/Kolkata", &lines, &resolver).unwrap();
        assert_eq!(periods.len(), 3);
        let RawPeriod::Gap(gap) = &periods[1] else {
            panic!("expected a gap between the regular periods");
        };
        assert_eq!(gap.from.unix_time, gap.to.unix_time);
        assert_eq!(gap.from.wall, CivilDateTime::new(1941, 10, 1, 0, 0, 0));
        assert_eq!(gap.to.wall, CivilDateTime::new(1941, 10, 1, 1, 0, 0));
        assert_eq!(gap.before.std_offset, 19_800);
        assert_eq!(gap.after.std_offset, 23_400);
        let RawPeriod::Regular(after) = &periods[2] else {
            panic!("expected a regular period after the gap");
        };
        assert_eq!(after.abbr, "+0630");
    }

    #[test]
    fn backward_offset_change_inserts_overlap() {
        let spans = empty_resolver();
        let resolver = RuleResolver { spans: &spans };
        let cut = Bound::At(CivilDateTime::new(1911, 3, 11, 0, 0, 0), TimeKind::Wall);
        let lines = vec![
            fixed_line(561, "LMT", Bound::Min, cut),
            fixed_line(0, "WET", cut, Bound::Max),
        ];
        let periods = build_zone("Europe/Paris", &lines, &resolver).unwrap();
        assert_eq!(periods.len(), 3);
        let RawPeriod::Overlap(overlap) = &periods[1] else {
            panic!("expected an overlap between the regular periods");
        };
        // The repeated wall interval is 9m21s long and ends where the
        // earlier period ended.
        assert_eq!(overlap.to.wall, CivilDateTime::new(1911, 3, 11, 0, 0, 0));
        assert_eq!(overlap.from.wall, CivilDateTime::new(1911, 3, 10, 23, 50, 39));
        assert_eq!(overlap.from.unix_time, overlap.to.unix_time);
    }

    #[test]
    fn mismatched_stitching_is_rejected() {
        let spans = empty_resolver();
        let resolver = RuleResolver { spans: &spans };
        let lines = vec![
            fixed_line(
                0,
                "A",
                Bound::Min,
                Bound::At(CivilDateTime::new(1950, 1, 1, 0, 0, 0), TimeKind::Wall),
            ),
            fixed_line(
                3600,
                "B",
                Bound::At(CivilDateTime::new(1950, 6, 1, 0, 0, 0), TimeKind::Wall),
                Bound::Max,
            ),
        ];
        let err = build_zone("Test/Zone", &lines, &resolver).unwrap_err();
        assert!(matches!(err, PeriodError::Structural { .. }));
    }

    #[test]
    fn degenerate_line_is_rejected() {
        let spans = empty_resolver();
        let resolver = RuleResolver { spans: &spans };
        let cut = CivilDateTime::new(1950, 1, 1, 0, 0, 0);
        let lines = vec![
            fixed_line(0, "A", Bound::Min, Bound::At(cut, TimeKind::Wall)),
            fixed_line(
                0,
                "B",
                Bound::At(cut, TimeKind::Wall),
                Bound::At(cut, TimeKind::Wall),
            ),
        ];
        let err = build_zone("Test/Zone", &lines, &resolver).unwrap_err();
        assert!(matches!(
            err,
            PeriodError::Structural {
                context: "degenerate period with equal endpoints",
                ..
            }
        ));
    }
}
