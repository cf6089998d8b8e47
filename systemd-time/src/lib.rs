//! Parsing for systemd.time(7)-style duration strings, e.g. "1h", "30min", "6h 30min".
//!
//! Used to parse the `GcInterval` and `VerifyInterval` configuration options into a
//! [`std::time::Duration`]. Calendar units (months, years) are not accepted: their
//! length is ambiguous without a reference date, and both interval settings operate
//! on an hours-to-days scale anyway.

use std::collections::HashMap;

use anyhow::{bail, Error};
use lazy_static::lazy_static;

use nom::{
    bytes::complete::take_while1,
    character::complete::{digit1, space0},
    combinator::{all_consuming, map_res, opt, recognize},
    error::{context, ContextError, VerboseError},
    IResult as NomIResult,
};

type IResult<I, O, E = VerboseError<I>> = NomIResult<I, O, E>;

lazy_static! {
    static ref TIME_SPAN_UNITS: HashMap<&'static str, ()> = {
        let mut map = HashMap::new();
        for unit in [
            "seconds", "second", "sec", "s", "msec", "ms", "usec", "us", "nsec", "ns", "minutes",
            "minute", "min", "m", "hours", "hour", "hr", "h", "days", "day", "d", "weeks", "week",
            "w",
        ] {
            map.insert(unit, ());
        }
        map
    };
}

/// A duration, broken down into the units systemd.time(7) accepts on input.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeSpan {
    pub nsec: u64,
    pub usec: u64,
    pub msec: u64,
    pub seconds: u64,
    pub minutes: u64,
    pub hours: u64,
    pub days: u64,
    pub weeks: u64,
}

impl From<TimeSpan> for std::time::Duration {
    fn from(ts: TimeSpan) -> Self {
        let secs = ts.seconds
            + ts.minutes * 60
            + ts.hours * 3600
            + ts.days * 3600 * 24
            + ts.weeks * 3600 * 24 * 7;
        let nanos = ts.nsec + ts.usec * 1_000 + ts.msec * 1_000_000;
        std::time::Duration::new(secs, 0) + std::time::Duration::from_nanos(nanos)
    }
}

impl std::fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        let mut do_write = |f: &mut std::fmt::Formatter<'_>, v: u64, unit: &str| {
            if v == 0 {
                return Ok(());
            }
            if !first {
                write!(f, " ")?;
            }
            first = false;
            write!(f, "{v}{unit}")
        };
        do_write(f, self.weeks, "w")?;
        do_write(f, self.days, "d")?;
        do_write(f, self.hours, "h")?;
        do_write(f, self.minutes, "min")?;
        do_write(f, self.seconds, "s")?;
        if first {
            write!(f, "0s")?;
        }
        Ok(())
    }
}

fn parse_error<'a>(i: &'a str, context: &'static str) -> nom::Err<VerboseError<&'a str>> {
    let err = VerboseError { errors: Vec::new() };
    let err = VerboseError::add_context(i, context, err);
    nom::Err::Error(err)
}

fn parse_u64(i: &str) -> IResult<&str, u64> {
    map_res(recognize(digit1), str::parse)(i)
}

fn parse_time_unit(i: &str) -> IResult<&str, &str> {
    let (n, text) = take_while1(|c: char| char::is_ascii_alphabetic(&c) || c == '\u{00b5}')(i)?;
    if TIME_SPAN_UNITS.contains_key(text) {
        Ok((n, text))
    } else {
        Err(parse_error(text, "time unit"))
    }
}

fn parse_time_span_incomplete(mut i: &str) -> IResult<&str, TimeSpan> {
    let mut ts = TimeSpan::default();

    loop {
        i = space0(i)?.0;
        if i.is_empty() {
            break;
        }
        let (n, num) = parse_u64(i)?;
        i = space0(n)?.0;

        if let (n, Some(unit)) = opt(parse_time_unit)(i)? {
            i = n;
            match unit {
                "seconds" | "second" | "sec" | "s" => ts.seconds += num,
                "msec" | "ms" => ts.msec += num,
                "usec" | "us" | "\u{00b5}s" => ts.usec += num,
                "nsec" | "ns" => ts.nsec += num,
                "minutes" | "minute" | "min" | "m" => ts.minutes += num,
                "hours" | "hour" | "hr" | "h" => ts.hours += num,
                "days" | "day" | "d" => ts.days += num,
                "weeks" | "week" | "w" => ts.weeks += num,
                _ => return Err(parse_error(unit, "internal error")),
            }
        } else {
            ts.seconds += num;
        }
    }

    Ok((i, ts))
}

/// Parse a systemd.time(7)-style duration, e.g. "30min" or "1h 30min".
pub fn parse_time_span(i: &str) -> Result<TimeSpan, Error> {
    match all_consuming(context("time span", parse_time_span_incomplete))(i.trim()) {
        Ok((_, ts)) => Ok(ts),
        Err(_) => bail!("unable to parse time span '{i}'"),
    }
}

/// Parse a duration directly into a [`std::time::Duration`].
pub fn parse_duration(i: &str) -> Result<std::time::Duration, Error> {
    Ok(parse_time_span(i)?.into())
}

#[test]
fn test_parse_time_span() {
    assert_eq!(parse_duration("30min").unwrap().as_secs(), 30 * 60);
    assert_eq!(parse_duration("1h").unwrap().as_secs(), 3600);
    assert_eq!(parse_duration("1h 30min").unwrap().as_secs(), 3600 + 30 * 60);
    assert_eq!(parse_duration("90").unwrap().as_secs(), 90);
    assert!(parse_duration("bogus").is_err());
}
