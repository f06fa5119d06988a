//! Recurring rule sets and their expansion into concrete dated spans.
//!
//! Rule records describe transitions by year range and a day-of-month
//! pattern ("last Sunday", "first Sunday on or after the 8th"). The
//! builder works on concrete spans instead, so each named set is
//! expanded once: every (rule, year) occurrence becomes one span whose
//! end is the start of the next occurrence. A rule whose year range is
//! open contributes a final open span, which is what the dynamic
//! materialization of far-future years later reworks.

use alloc::borrow::ToOwned;
use alloc::string::String;
use alloc::vec::Vec;

use crate::calendar;
use crate::types::{Bound, CivilDateTime, TimeKind};

#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum Month {
    Jan = 1,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum WeekDay {
    Sun = 0,
    Mon,
    Tues,
    Wed,
    Thurs,
    Fri,
    Sat,
}

/// The ON column of a rule: a plain day of month or a weekday pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DayOfMonth {
    Day(u8),
    Last(WeekDay),
    /// The given weekday on or after the given day of month.
    OnOrAfter(WeekDay, u8),
    /// The given weekday on or before the given day of month.
    OnOrBefore(WeekDay, u8),
}

/// The TO column of a rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuleYear {
    Only,
    Year(i32),
    Max,
}

/// A single recurring rule record.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRule {
    pub from_year: i32,
    pub to_year: RuleYear,
    pub in_month: Month,
    pub on_day: DayOfMonth,
    /// The AT column in seconds from midnight, read on `at_kind`.
    pub at_time: i64,
    pub at_kind: TimeKind,
    /// Saving applied on top of standard time, in seconds. Zero means
    /// standard time.
    pub save: i64,
    /// The LETTER column, substituted into `%s` abbreviation templates.
    pub letter: Option<String>,
}

impl RawRule {
    /// The concrete occurrence of this rule in the given year, along
    /// with a sort key. The key ignores offsets entirely; occurrences
    /// within one set are months apart, so the rough value orders them
    /// correctly.
    fn occurrence(&self, year: i32) -> (CivilDateTime, i64) {
        let day = resolve_on_day(year, self.in_month, self.on_day);
        let day_seconds = calendar::epoch_days(year, self.in_month as u8, day)
            * calendar::SECONDS_PER_DAY;
        let rough = day_seconds + self.at_time;
        (calendar::civil_from_unix(rough), rough)
    }
}

/// Resolves the ON column to a day of month for a concrete year.
fn resolve_on_day(year: i32, month: Month, on_day: DayOfMonth) -> u8 {
    let month = month as u8;
    let weekday_of = |day: u8| calendar::weekday_from_epoch_days(calendar::epoch_days(year, month, day));
    match on_day {
        DayOfMonth::Day(day) => day,
        DayOfMonth::Last(weekday) => {
            let mut day = calendar::days_in_month(year, month);
            while weekday_of(day) != weekday as u8 {
                day -= 1;
            }
            day
        }
        DayOfMonth::OnOrAfter(weekday, start) => {
            let mut day = start;
            while weekday_of(day) != weekday as u8 {
                day += 1;
            }
            day
        }
        DayOfMonth::OnOrBefore(weekday, start) => {
            let mut day = start;
            while weekday_of(day) != weekday as u8 {
                day -= 1;
            }
            day
        }
    }
}

/// A concrete dated span produced by expanding a rule set: the window
/// during which one saving value is in effect.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSpan {
    pub name: String,
    pub from: Bound,
    pub to: Bound,
    pub save: i64,
    pub letter: Option<String>,
    /// The record this span was expanded from. Synthetic spans the
    /// builder fabricates carry `None`.
    pub raw: Option<RawRule>,
}

/// All rule records sharing one NAME.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rules {
    rules: Vec<RawRule>,
}

struct Occurrence {
    key: i64,
    civil: CivilDateTime,
    kind: TimeKind,
    open: bool,
    rule: RawRule,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rule: RawRule) {
        self.rules.push(rule);
    }

    /// The last year any record of this set names explicitly.
    pub(crate) fn last_named_year(&self) -> i32 {
        let mut year = i32::MIN;
        for rule in &self.rules {
            year = year.max(rule.from_year);
            if let RuleYear::Year(to) = rule.to_year {
                year = year.max(to);
            }
        }
        year
    }

    /// Expands the set into ordered spans. Open-ended rules produce
    /// concrete occurrences through `horizon - 1` and a final open
    /// occurrence at `horizon`; the chronologically last span is always
    /// open, so a set that simply ends leaves a single trailing span
    /// with no further transitions.
    pub(crate) fn expand(&self, name: &str, horizon: i32) -> Vec<RuleSpan> {
        let mut occurrences = Vec::new();
        for rule in &self.rules {
            let (last, open) = match rule.to_year {
                RuleYear::Only => (rule.from_year, false),
                RuleYear::Year(year) => (year, false),
                RuleYear::Max => (horizon.max(rule.from_year), true),
            };
            for year in rule.from_year..=last {
                let (civil, key) = rule.occurrence(year);
                occurrences.push(Occurrence {
                    key,
                    civil,
                    kind: rule.at_kind,
                    open: open && year == last,
                    rule: rule.clone(),
                });
            }
        }
        occurrences.sort_by_key(|occurrence| occurrence.key);
        spans_from(name, &occurrences)
    }

    /// Expands the set as if every record covered exactly the years
    /// `lo..=hi`. Used when rematerializing the open tail for one query
    /// year; only the final span stays open.
    pub(crate) fn expand_window(&self, name: &str, lo: i32, hi: i32) -> Vec<RuleSpan> {
        let mut occurrences = Vec::new();
        for rule in &self.rules {
            for year in lo..=hi {
                let (civil, key) = rule.occurrence(year);
                occurrences.push(Occurrence {
                    key,
                    civil,
                    kind: rule.at_kind,
                    open: false,
                    rule: rule.clone(),
                });
            }
        }
        occurrences.sort_by_key(|occurrence| occurrence.key);
        spans_from(name, &occurrences)
    }
}

fn spans_from(name: &str, occurrences: &[Occurrence]) -> Vec<RuleSpan> {
    let mut spans = Vec::with_capacity(occurrences.len());
    for (i, occurrence) in occurrences.iter().enumerate() {
        let to = if occurrence.open {
            Bound::Max
        } else {
            match occurrences.get(i + 1) {
                Some(next) => Bound::At(next.civil, next.kind),
                None => Bound::Max,
            }
        };
        spans.push(RuleSpan {
            name: name.to_owned(),
            from: Bound::At(occurrence.civil, occurrence.kind),
            to,
            save: occurrence.rule.save,
            letter: occurrence.rule.letter.clone(),
            raw: Some(occurrence.rule.clone()),
        });
    }
    spans
}
