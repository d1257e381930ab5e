use std::str::FromStr;

use crate::db::{Database, Entry};
use crate::error::P0fSynError;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::space0;
use nom::combinator::rest;
use nom::{IResult, Parser};
use tracing::{trace, warn};

impl FromStr for Database {
    type Err = P0fSynError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut entries = vec![];
        let mut section = String::new();
        let mut current: Option<Entry> = None;

        for (index, line) in s.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            if let Some(name) = parse_section(line) {
                section = name.to_string();
                continue;
            }

            let (_, (name, value)) = parse_named_value(line).map_err(|err| {
                P0fSynError::Parse(format!(
                    "line {}: fail to parse named value `{}`: {}",
                    index + 1,
                    line,
                    err
                ))
            })?;

            match name {
                "label" => {
                    if let Some(entry) = current.take() {
                        close_entry(entry, &mut entries);
                    }
                    current = Some(Entry::new(section.as_str(), value));
                }
                "sys" => match current.as_mut() {
                    Some(entry) => entry.sys = value.to_string(),
                    None => {
                        return Err(P0fSynError::Parse(format!(
                            "line {}: `sys` without `label`: {}",
                            index + 1,
                            value
                        )))
                    }
                },
                "sig" => match current.as_mut() {
                    Some(entry) => {
                        trace!("sig for `{}` {}: {}", entry.label, entry.section, value);
                        entry.sig.push(value.to_string());
                    }
                    None => {
                        return Err(P0fSynError::Parse(format!(
                            "line {}: `sig` without `label`: {}",
                            index + 1,
                            value
                        )))
                    }
                },
                _ => {
                    warn!("skip unknown named value: {} = {}", name, value);
                }
            }
        }

        if let Some(entry) = current.take() {
            close_entry(entry, &mut entries);
        }

        Ok(Database::new(entries))
    }
}

fn close_entry(entry: Entry, entries: &mut Vec<Entry>) {
    if entry.label.is_empty() {
        trace!(
            "drop unlabelled entry in `{}` with {} signatures",
            entry.section,
            entry.sig.len()
        );
    } else {
        entries.push(entry);
    }
}

fn parse_section(line: &str) -> Option<&str> {
    line.strip_prefix('[')?.strip_suffix(']')
}

fn parse_named_value(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, (name, _, _, _, value)) = (
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        space0,
        tag("="),
        space0,
        rest,
    )
        .parse(input)?;

    Ok((input, (name, value.trim_end())))
}
