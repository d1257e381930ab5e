use std::str::FromStr;

use crate::error::P0fSynError;
use crate::options::{normalize_layout, OptionSet, OptionTag};
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, digit1, one_of};
use nom::combinator::{all_consuming, eof, map, map_res, opt, recognize, rest, value};
use nom::sequence::{pair, preceded, separated_pair, terminated};
use nom::{IResult, Parser};

/// TTL field of a `tcp:request` signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TtlRule {
    /// `*`
    Any,
    /// `n`: matches when the observed TTL, or the bucket it rounds up to, equals `n`.
    Exact(i64),
    /// `n-`: matches any observed TTL up to `n`.
    UpperBound(i64),
    /// `lo-hi`, inclusive on both ends.
    Range(i64, i64),
    /// Anything else. Never matches.
    Unrecognized,
}

/// Window size part of field 3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowExpr {
    /// `*`
    Any,
    /// Nothing before the comma. Compares as a wildcard.
    Empty,
    /// `mss*N`. `None` when `N` is not a number.
    Mss(Option<i64>),
    /// `mtu*N`. Never matches, MTU is not observed.
    Mtu(Option<i64>),
    Value(i64),
    Unrecognized,
}

/// Window scale part of field 3, after the first comma.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowScaleExpr {
    Absent,
    Any,
    Value(i64),
    Unrecognized,
}

/// The parts of a `tcp:request` signature the matcher scores against.
///
/// The raw form is `ver:ttl:olen:win[,wscale]:olayout:...`. Only fields 1, 3
/// and 4 are read; the rest is carried in the source text and ignored here.
#[derive(Clone, Debug, PartialEq)]
pub struct TcpRequestSignature {
    pub ttl: TtlRule,
    pub window: WindowExpr,
    pub window_scale: WindowScaleExpr,
    /// Normalized option layout, order and duplicates kept.
    pub options: Vec<OptionTag>,
    option_set: OptionSet,
}

impl TcpRequestSignature {
    pub fn option_set(&self) -> &OptionSet {
        &self.option_set
    }
}

impl FromStr for TcpRequestSignature {
    type Err = P0fSynError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(':').collect();
        let (ttl, win_field, layout) = match fields.as_slice() {
            [_, ttl, _, win, layout, ..] => (ttl.trim(), win.trim(), layout.trim()),
            _ => {
                return Err(P0fSynError::Parse(format!(
                    "tcp signature needs at least 5 fields, got {}: `{}`",
                    fields.len(),
                    s
                )))
            }
        };

        let (window, window_scale) = match win_field.split_once(',') {
            Some((win, scale)) => (win.trim(), scale.trim()),
            None => (win_field, ""),
        };

        let options = normalize_layout(layout);
        let option_set = options.iter().collect();

        Ok(TcpRequestSignature {
            ttl: TtlRule::from(ttl),
            window: WindowExpr::from(window),
            window_scale: WindowScaleExpr::from(window_scale),
            options,
            option_set,
        })
    }
}

impl From<&str> for TtlRule {
    fn from(input: &str) -> Self {
        parse_ttl_rule(input)
            .map(|(_, rule)| rule)
            .unwrap_or(TtlRule::Unrecognized)
    }
}

impl From<&str> for WindowExpr {
    fn from(input: &str) -> Self {
        parse_window_expr(input)
            .map(|(_, expr)| expr)
            .unwrap_or(WindowExpr::Unrecognized)
    }
}

impl From<&str> for WindowScaleExpr {
    fn from(input: &str) -> Self {
        match input {
            "" => WindowScaleExpr::Absent,
            "*" => WindowScaleExpr::Any,
            _ => parse_number(input)
                .map(WindowScaleExpr::Value)
                .unwrap_or(WindowScaleExpr::Unrecognized),
        }
    }
}

/// Optionally signed decimal integer.
fn signed_int(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), |s: &str| {
        s.parse::<i64>()
    })
    .parse(input)
}

/// Decimal integer that may carry a `+` sign but never a `-`.
fn unsigned_int(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(char('+')), digit1)), |s: &str| {
        s.parse::<i64>()
    })
    .parse(input)
}

fn parse_number(input: &str) -> Option<i64> {
    all_consuming(signed_int)
        .parse(input)
        .ok()
        .map(|(_, n)| n)
}

// A trailing dash always means an upper bound, and any other dash splits a
// range at its first occurrence, so a bare `-n` is never an exact value.
fn parse_ttl_rule(input: &str) -> IResult<&str, TtlRule> {
    alt((
        all_consuming(value(TtlRule::Any, tag("*"))),
        all_consuming(map(terminated(signed_int, char('-')), TtlRule::UpperBound)),
        all_consuming(map(
            separated_pair(unsigned_int, char('-'), signed_int),
            |(lo, hi)| TtlRule::Range(lo, hi),
        )),
        all_consuming(map(unsigned_int, TtlRule::Exact)),
    ))
    .parse(input)
}

fn parse_window_expr(input: &str) -> IResult<&str, WindowExpr> {
    alt((
        all_consuming(value(WindowExpr::Any, tag("*"))),
        value(WindowExpr::Empty, eof),
        map(preceded(tag("mss*"), rest), |n: &str| {
            WindowExpr::Mss(parse_number(n))
        }),
        map(preceded(tag("mtu*"), rest), |n: &str| {
            WindowExpr::Mtu(parse_number(n))
        }),
        all_consuming(map(signed_int, WindowExpr::Value)),
    ))
    .parse(input)
}
