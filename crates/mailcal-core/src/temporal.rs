//! Temporal extraction: find the start time of an event in free text.
//!
//! The extractor scans text for date and time expressions and normalizes the
//! first usable one to an absolute instant in the configured timezone.
//!
//! # Pattern families
//!
//! Families are tried strictly in this order and the first one that yields
//! a valid instant wins. Later families are never consulted once one
//! succeeds, even if they would match "better".
//!
//! | Family | Example | Resolution |
//! |--------|---------|------------|
//! | [`PatternFamily::DateWithTime`] | `Dec 15 at 2:30pm` | date + time |
//! | [`PatternFamily::RelativeDayWithTime`] | `tomorrow at 10 AM` | reference date + offset, time |
//! | [`PatternFamily::DateOnly`] | `25th of December`, `tomorrow` | date at the default hour |
//! | [`PatternFamily::TimeOnly`] | `@ 15:00` | reference date, time |
//!
//! Within a family, candidates are taken in scan order (position in the
//! text). A candidate that names an impossible date (Feb 30) or a local time
//! skipped by DST is discarded and the next candidate is tried; when the
//! family runs out, the next family is tried.
//!
//! Recognised forms: full and abbreviated month names, ordinal day suffixes
//! (`1st`, `22nd`), an optional `of` (`3rd of May`), optional years
//! (`Dec 15, 2025`), ISO dates (`2025-12-15`, `2025-12-15T14:30`), 12-hour
//! times (`3pm`, `3:30 p.m.`), 24-hour times (`15:00`), with or without an
//! `at`/`@` introducer. A UTC offset after an ISO time is ignored; the time
//! is read in the configured timezone.
//!
//! # Pairing a date with a time
//!
//! A date takes, in order of preference: the time embedded in an ISO
//! timestamp, the nearest time following it within
//! [`PAIRING_WINDOW_CHARS`] on the same line, the first time introduced by
//! `at` or `@`, and finally the first time anywhere in the text.

use std::ops::Range;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{debug, trace};

use crate::defaults;
use crate::models::{PatternFamily, TemporalCandidate};

const MONTH: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sept?(?:ember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";

/// `25th December 2025`, `3rd of May`, `1 Jan`
static DAY_FIRST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?{MONTH}\b\.?(?:,?\s+(\d{{4}})\b)?"
    ))
    .expect("day-first date pattern is valid")
});

/// `Dec 15`, `December 15th, 2025`
static MONTH_FIRST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b{MONTH}\b\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+(\d{{4}})\b)?"
    ))
    .expect("month-first date pattern is valid")
});

/// `2025-12-15`, `2025-12-15T14:30`, `2025-12-15T14:30:00+05:30`
static ISO_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})(?:T(\d{1,2}):(\d{2})(?::\d{2})?|\b)")
        .expect("ISO date pattern is valid")
});

static RELATIVE_DAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(today|tomorrow)\b").expect("relative day pattern is valid")
});

/// 12-hour form first so `2:30pm` is not read as 02:30.
static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})(?:[:.](\d{2}))?\s*([ap])\.?\s?m\b\.?|\b(\d{1,2}):(\d{2})\b",
    )
    .expect("time pattern is valid")
});

/// Longest gap between a date and a following time that still pairs them.
pub const PAIRING_WINDOW_CHARS: usize = 16;

/// A candidate that resolved to a concrete instant.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTemporal {
    pub candidate: TemporalCandidate,
    pub family: PatternFamily,
    pub start: DateTime<Tz>,
}

/// Calendar date as written, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DateMatch {
    year: i32,
    month: u32,
    day: u32,
    /// Time written inside the same token (`2025-12-15T14:30`).
    time: Option<TimeMatch>,
    span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RelativeMatch {
    offset_days: i64,
    span: Range<usize>,
}

/// Time of day, already converted to 24-hour form and range-checked.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TimeMatch {
    hour: u32,
    minute: u32,
    /// Preceded by `at` or `@`.
    introduced: bool,
    span: Range<usize>,
}

/// Everything found in one scan of the text.
struct Scan<'t> {
    text: &'t str,
    dates: Vec<DateMatch>,
    relatives: Vec<RelativeMatch>,
    times: Vec<TimeMatch>,
}

/// Extracts an event start time from free text.
#[derive(Debug, Clone)]
pub struct TemporalExtractor {
    tz: Tz,
    default_hour: u32,
}

impl TemporalExtractor {
    /// Create an extractor for `tz`. Dates without a time get `default_hour`.
    pub fn new(tz: Tz, default_hour: u32) -> Self {
        Self {
            tz,
            default_hour: default_hour.min(23),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Find the event start in `text`, relative to `now`.
    ///
    /// Returns `None` when nothing resolves; that is an ordinary outcome.
    pub fn extract(&self, text: &str, now: DateTime<Utc>) -> Option<ResolvedTemporal> {
        let today = now.with_timezone(&self.tz).date_naive();
        let scan = self.scan(text, today.year());

        for family in PatternFamily::ORDERED {
            trace!(family = %family, "Trying pattern family");
            if let Some(resolved) = self.try_family(family, &scan, today) {
                debug!(
                    family = %family,
                    start = %resolved.start.to_rfc3339(),
                    "Temporal candidate resolved"
                );
                return Some(resolved);
            }
        }

        debug!("No temporal candidate found");
        None
    }

    fn try_family(
        &self,
        family: PatternFamily,
        scan: &Scan,
        today: NaiveDate,
    ) -> Option<ResolvedTemporal> {
        match family {
            PatternFamily::DateWithTime => scan.dates.iter().find_map(|date| {
                let time = date.time.as_ref().or_else(|| scan.time_for(&date.span))?;
                let candidate = TemporalCandidate {
                    year: date.year,
                    month: date.month,
                    day: date.day,
                    hour: time.hour,
                    minute: time.minute,
                    is_relative: false,
                    source_span: union(&date.span, &time.span),
                };
                self.resolve(candidate, family)
            }),
            PatternFamily::RelativeDayWithTime => scan.relatives.iter().find_map(|rel| {
                let time = scan.time_for(&rel.span)?;
                let date = today + Duration::days(rel.offset_days);
                let candidate = TemporalCandidate {
                    year: date.year(),
                    month: date.month(),
                    day: date.day(),
                    hour: time.hour,
                    minute: time.minute,
                    is_relative: true,
                    source_span: union(&rel.span, &time.span),
                };
                self.resolve(candidate, family)
            }),
            PatternFamily::DateOnly => scan
                .dates
                .iter()
                .find_map(|date| {
                    let candidate = TemporalCandidate {
                        year: date.year,
                        month: date.month,
                        day: date.day,
                        hour: self.default_hour,
                        minute: 0,
                        is_relative: false,
                        source_span: date.span.clone(),
                    };
                    self.resolve(candidate, family)
                })
                .or_else(|| {
                    scan.relatives.iter().find_map(|rel| {
                        let date = today + Duration::days(rel.offset_days);
                        let candidate = TemporalCandidate {
                            year: date.year(),
                            month: date.month(),
                            day: date.day(),
                            hour: self.default_hour,
                            minute: 0,
                            is_relative: true,
                            source_span: rel.span.clone(),
                        };
                        self.resolve(candidate, family)
                    })
                }),
            PatternFamily::TimeOnly => scan.times.iter().find_map(|time| {
                let candidate = TemporalCandidate {
                    year: today.year(),
                    month: today.month(),
                    day: today.day(),
                    hour: time.hour,
                    minute: time.minute,
                    is_relative: false,
                    source_span: time.span.clone(),
                };
                self.resolve(candidate, family)
            }),
        }
    }

    fn resolve(
        &self,
        candidate: TemporalCandidate,
        family: PatternFamily,
    ) -> Option<ResolvedTemporal> {
        match candidate.resolve(&self.tz) {
            Some(start) => Some(ResolvedTemporal {
                candidate,
                family,
                start,
            }),
            None => {
                debug!(
                    family = %family,
                    year = candidate.year,
                    month = candidate.month,
                    day = candidate.day,
                    "Discarding candidate that is not a real instant"
                );
                None
            }
        }
    }

    fn scan<'t>(&self, text: &'t str, reference_year: i32) -> Scan<'t> {
        let mut dates: Vec<DateMatch> = Vec::new();

        for caps in DAY_FIRST_RE.captures_iter(text) {
            let (Some(whole), Some(day), Some(month)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            let day = day.as_str().parse().ok();
            if let (Some(day), Some(month)) = (day, month_number(month.as_str())) {
                dates.push(DateMatch {
                    year: pick_year(&caps, 3, reference_year),
                    month,
                    day,
                    time: None,
                    span: whole.range(),
                });
            }
        }

        for caps in MONTH_FIRST_RE.captures_iter(text) {
            let (Some(whole), Some(month), Some(day)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            let day = day.as_str().parse().ok();
            if let (Some(day), Some(month)) = (day, month_number(month.as_str())) {
                dates.push(DateMatch {
                    year: pick_year(&caps, 3, reference_year),
                    month,
                    day,
                    time: None,
                    span: whole.range(),
                });
            }
        }

        for caps in ISO_DATE_RE.captures_iter(text) {
            let (Some(whole), Some(month), Some(day)) = (caps.get(0), caps.get(2), caps.get(3))
            else {
                continue;
            };
            if let (Ok(month), Ok(day)) = (month.as_str().parse(), day.as_str().parse()) {
                dates.push(DateMatch {
                    year: pick_year(&caps, 1, reference_year),
                    month,
                    day,
                    time: iso_time(&caps),
                    span: whole.range(),
                });
            }
        }

        // Scan order; on a tie the longer match carries more information.
        dates.sort_by(|a, b| {
            a.span
                .start
                .cmp(&b.span.start)
                .then(b.span.end.cmp(&a.span.end))
        });

        let relatives = RELATIVE_DAY_RE
            .find_iter(text)
            .map(|m| RelativeMatch {
                offset_days: if m.as_str().eq_ignore_ascii_case("tomorrow") {
                    1
                } else {
                    0
                },
                span: m.range(),
            })
            .collect();

        let times = TIME_RE
            .captures_iter(text)
            .filter_map(|caps| parse_time(text, &caps))
            .collect();

        Scan {
            text,
            dates,
            relatives,
            times,
        }
    }
}

impl Default for TemporalExtractor {
    fn default() -> Self {
        Self::new(defaults::TIMEZONE, defaults::DEFAULT_HOUR)
    }
}

impl Scan<'_> {
    /// The time that belongs with the date or relative day at `span`.
    fn time_for(&self, span: &Range<usize>) -> Option<&TimeMatch> {
        let outside = || self.times.iter().filter(move |t| !overlaps(&t.span, span));

        let following = outside().find(|t| {
            t.span.start >= span.end
                && t.span.start - span.end <= PAIRING_WINDOW_CHARS
                && !self.text[span.end..t.span.start].contains('\n')
        });

        following
            .or_else(|| outside().find(|t| t.introduced))
            .or_else(|| outside().next())
    }
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_ascii_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Explicit year if present and plausible, otherwise the reference year.
fn pick_year(caps: &Captures<'_>, group: usize, reference_year: i32) -> i32 {
    match caps.get(group).and_then(|m| m.as_str().parse::<i32>().ok()) {
        Some(year) if (year - reference_year).abs() <= defaults::YEAR_TOLERANCE => year,
        Some(year) => {
            debug!(year, reference_year, "Replacing implausible year");
            reference_year
        }
        None => reference_year,
    }
}

/// `at` or `@` directly before `start`, ignoring whitespace.
fn is_introduced(text: &str, start: usize) -> bool {
    let before = text[..start].trim_end();
    if before.ends_with('@') {
        return true;
    }
    before
        .rsplit(|c: char| !c.is_alphanumeric())
        .next()
        .is_some_and(|word| word.eq_ignore_ascii_case("at"))
}

fn iso_time(caps: &Captures<'_>) -> Option<TimeMatch> {
    let hour: u32 = caps.get(4)?.as_str().parse().ok()?;
    let minute: u32 = caps.get(5)?.as_str().parse().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some(TimeMatch {
        hour,
        minute,
        introduced: false,
        span: caps.get(0)?.range(),
    })
}

fn parse_time(text: &str, caps: &Captures<'_>) -> Option<TimeMatch> {
    let whole = caps.get(0)?;
    let introduced = is_introduced(text, whole.start());

    if let Some(meridiem) = caps.get(3) {
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        if !(1..=12).contains(&hour) || minute > 59 {
            return None;
        }
        let pm = meridiem.as_str().eq_ignore_ascii_case("p");
        let hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, false) => h,
            (h, true) => h + 12,
        };
        return Some(TimeMatch {
            hour,
            minute,
            introduced,
            span: whole.range(),
        });
    }

    let hour: u32 = caps.get(4)?.as_str().parse().ok()?;
    let minute: u32 = caps.get(5)?.as_str().parse().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some(TimeMatch {
        hour,
        minute,
        introduced,
        span: whole.range(),
    })
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

fn union(a: &Range<usize>, b: &Range<usize>) -> Range<usize> {
    a.start.min(b.start)..a.end.max(b.end)
}
