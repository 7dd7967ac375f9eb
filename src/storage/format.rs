//! Template formatter for textual backends
//!
//! Records are rendered by substituting a closed set of `%` placeholders in
//! the configured templates:
//!
//! | template | placeholders                                        |
//! |----------|-----------------------------------------------------|
//! | metric   | `%job` `%timing` `%value` `%time` `%url` `%tags`    |
//! | event    | `%name` `%status` `%time` `%tags`                   |
//! | tag      | `%name` `%value`                                    |
//!
//! Substitution is a single left-to-right scan. Substituted values are never
//! scanned again, so a job called `%url` renders as the literal `%url`.
//! Anything after a `%` that is not a known placeholder is copied verbatim.

use std::fmt::{self, Write};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, Utc};
use chrono_tz::Tz;

use super::error::{StorageError, StorageResult};
use crate::config::{FormatConfig, TimeConfig};
use crate::{Event, Metric, Tags};

/// Significant digits used for `%value`
const VALUE_PRECISION: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    Job,
    Timing,
    Value,
    Time,
    Url,
    Tags,
    Name,
    Status,
    TagName,
    TagValue,
}

impl Placeholder {
    fn token(self) -> &'static str {
        match self {
            Placeholder::Job => "%job",
            Placeholder::Timing => "%timing",
            Placeholder::Value | Placeholder::TagValue => "%value",
            Placeholder::Time => "%time",
            Placeholder::Url => "%url",
            Placeholder::Tags => "%tags",
            Placeholder::Name | Placeholder::TagName => "%name",
            Placeholder::Status => "%status",
        }
    }
}

// `%timing` has to be tried before its prefix `%time`.
const METRIC_PLACEHOLDERS: &[Placeholder] = &[
    Placeholder::Job,
    Placeholder::Timing,
    Placeholder::Value,
    Placeholder::Time,
    Placeholder::Url,
    Placeholder::Tags,
];

const EVENT_PLACEHOLDERS: &[Placeholder] = &[
    Placeholder::Name,
    Placeholder::Status,
    Placeholder::Time,
    Placeholder::Tags,
];

const TAG_PLACEHOLDERS: &[Placeholder] = &[Placeholder::TagName, Placeholder::TagValue];

/// Zone records are rendered in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Named(Tz),
    /// The host's zone, as configured with `Local`
    Local,
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Named(tz) => write!(f, "{}", tz),
            Zone::Local => write!(f, "Local"),
        }
    }
}

/// Renders metrics and events for one backend.
///
/// Built once at backend construction; all fallible setup (zone lookup,
/// pattern validation) happens in [`Formatter::new`].
#[derive(Debug, Clone)]
pub struct Formatter {
    templates: FormatConfig,
    zone: Zone,
    time_format: String,
}

impl Formatter {
    pub fn new(templates: FormatConfig, time: &TimeConfig) -> StorageResult<Self> {
        let zone = resolve_zone(&time.location)?;
        validate_time_format(&time.format)?;

        Ok(Self {
            templates,
            zone,
            time_format: time.format.clone(),
        })
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    pub fn render_metric(&self, metric: &Metric) -> String {
        let mut out = String::with_capacity(self.templates.metric.len() + 64);
        substitute(
            &self.templates.metric,
            METRIC_PLACEHOLDERS,
            &mut out,
            |placeholder, out| match placeholder {
                Placeholder::Job => out.push_str(&metric.job),
                Placeholder::Timing => out.push_str(&metric.timing),
                Placeholder::Value => out.push_str(&format_value(metric.value)),
                Placeholder::Time => self.write_time(&metric.timestamp, out),
                Placeholder::Url => out.push_str(&metric.url),
                Placeholder::Tags => self.write_tags(&metric.tags, out),
                _ => {}
            },
        );
        out
    }

    pub fn render_event(&self, event: &Event) -> String {
        let mut out = String::with_capacity(self.templates.event.len() + 64);
        substitute(
            &self.templates.event,
            EVENT_PLACEHOLDERS,
            &mut out,
            |placeholder, out| match placeholder {
                Placeholder::Name => out.push_str(&event.name),
                Placeholder::Status => {
                    let _ = write!(out, "{}", event.server_status);
                }
                Placeholder::Time => self.write_time(&event.timestamp, out),
                Placeholder::Tags => self.write_tags(&event.tags, out),
                _ => {}
            },
        );
        out
    }

    /// Render every tag with the tag template, joined by the separator.
    ///
    /// An empty map renders as an empty string.
    pub fn render_tags(&self, tags: &Tags) -> String {
        let mut out = String::new();
        self.write_tags(tags, &mut out);
        out
    }

    /// Render an instant in the configured zone with the configured pattern
    pub fn render_time(&self, timestamp: &DateTime<Utc>) -> String {
        let mut out = String::new();
        self.write_time(timestamp, &mut out);
        out
    }

    fn write_tags(&self, tags: &Tags, out: &mut String) {
        for (index, (name, value)) in tags.iter().enumerate() {
            if index > 0 {
                out.push_str(&self.templates.tag_separator);
            }
            substitute(
                &self.templates.tag,
                TAG_PLACEHOLDERS,
                out,
                |placeholder, out| match placeholder {
                    Placeholder::TagName => out.push_str(name),
                    Placeholder::TagValue => out.push_str(value),
                    _ => {}
                },
            );
        }
    }

    fn write_time(&self, timestamp: &DateTime<Utc>, out: &mut String) {
        // the pattern was validated in `new`, so formatting cannot fail
        let _ = match self.zone {
            Zone::Named(tz) => write!(
                out,
                "{}",
                timestamp.with_timezone(&tz).format(&self.time_format)
            ),
            Zone::Local => write!(
                out,
                "{}",
                timestamp.with_timezone(&Local).format(&self.time_format)
            ),
        };
    }
}

/// Resolve a zone identifier.
///
/// An empty identifier means UTC and `Local` means the host's zone; anything
/// else must be an IANA name.
pub fn resolve_zone(location: &str) -> StorageResult<Zone> {
    match location {
        "" => return Ok(Zone::Named(Tz::UTC)),
        "Local" => return Ok(Zone::Local),
        _ => {}
    }

    location
        .parse::<Tz>()
        .map(Zone::Named)
        .map_err(|e| StorageError::UnknownTimeZone {
            location: location.to_string(),
            reason: e.to_string(),
        })
}

/// Reject strftime patterns containing unknown specifiers
pub fn validate_time_format(format: &str) -> StorageResult<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(StorageError::InvalidTimeFormat(format.to_string()));
    }
    Ok(())
}

/// Format a float with six significant digits in general notation.
///
/// Trailing zeros are dropped; exponent notation (`1e+06`) is used when the
/// decimal exponent is below -4 or at least the precision.
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        return String::from("NaN");
    }
    if value.is_infinite() {
        return String::from(if value > 0.0 { "+Inf" } else { "-Inf" });
    }

    let scientific = format!("{:.*e}", VALUE_PRECISION - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= VALUE_PRECISION as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (VALUE_PRECISION as i32 - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

fn substitute(
    template: &str,
    table: &[Placeholder],
    out: &mut String,
    mut write_value: impl FnMut(Placeholder, &mut String),
) {
    let mut rest = template;
    while let Some(position) = rest.find('%') {
        out.push_str(&rest[..position]);
        let tail = &rest[position..];

        match table.iter().find(|p| tail.starts_with(p.token())) {
            Some(placeholder) => {
                write_value(*placeholder, out);
                rest = &tail[placeholder.token().len()..];
            }
            None => {
                out.push('%');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
}
