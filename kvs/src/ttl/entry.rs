use std::time::Duration;

use serde_derive::{Deserialize, Serialize};

use crate::error::{Error, KvResult};

/// One entry of a TTL store.
///
/// `expires_at` is the wall-clock instant (milliseconds since the epoch) the
/// entry stops being visible, computed at commit time; `None` never expires.
/// `duration` is the originally requested lifetime, kept for audit and
/// reconstruction, serialized as an ISO-8601 duration. `encrypted` marks a
/// value stored as base64-wrapped ciphertext.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtlEntry {
    pub key: String,

    pub value: String,

    #[serde(with = "iso8601", default)]
    pub duration: Option<Duration>,

    pub expires_at: Option<i64>,

    #[serde(default)]
    pub encrypted: bool,
}

/// Formats a duration as an ISO-8601 duration string (`PT1.5S`, `PT2M30S`,
/// `P1DT2H`). Sub-millisecond precision is not preserved.
pub fn format_duration(duration: &Duration) -> String {
    let mut ms = duration.as_millis();
    let days = ms / 86_400_000;
    ms %= 86_400_000;
    let hours = ms / 3_600_000;
    ms %= 3_600_000;
    let minutes = ms / 60_000;
    ms %= 60_000;
    let seconds = ms / 1_000;
    let millis = ms % 1_000;

    let mut out = String::from("P");
    if days > 0 {
        out.push_str(&format!("{}D", days));
    }
    let seconds_needed = seconds > 0 || millis > 0 || (days == 0 && hours == 0 && minutes == 0);
    if hours > 0 || minutes > 0 || seconds_needed {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{}H", hours));
        }
        if minutes > 0 {
            out.push_str(&format!("{}M", minutes));
        }
        if seconds_needed {
            if millis > 0 {
                let frac = format!("{:03}", millis);
                out.push_str(&format!("{}.{}S", seconds, frac.trim_end_matches('0')));
            } else {
                out.push_str(&format!("{}S", seconds));
            }
        }
    }
    out
}

/// Parses the subset of ISO-8601 durations this crate emits: days in the
/// date part, hours/minutes/seconds (with an optional fraction) in the time
/// part. Years, months and weeks are rejected.
pub fn parse_duration(text: &str) -> KvResult<Duration> {
    let rest = text
        .strip_prefix('P')
        .ok_or_else(|| Error::Parse(format!("invalid ISO-8601 duration {:?}", text)))?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) => (date, time),
        None => (rest, ""),
    };

    let mut total = Duration::ZERO;
    let mut components = 0usize;

    let mut number = String::new();
    for c in date_part.chars() {
        if c.is_ascii_digit() {
            number.push(c);
        } else if c == 'D' {
            let days: u64 = number
                .parse()
                .map_err(|_| Error::Parse(format!("invalid ISO-8601 duration {:?}", text)))?;
            total += Duration::from_secs(days * 86_400);
            number.clear();
            components += 1;
        } else {
            return Err(Error::Parse(format!(
                "unsupported ISO-8601 duration component {:?} in {:?}",
                c, text
            )));
        }
    }
    if !number.is_empty() {
        return Err(Error::Parse(format!("invalid ISO-8601 duration {:?}", text)));
    }

    for c in time_part.chars() {
        if c.is_ascii_digit() || c == '.' {
            number.push(c);
        } else {
            match c {
                'H' | 'M' => {
                    let n: u64 = number
                        .parse()
                        .map_err(|_| Error::Parse(format!("invalid ISO-8601 duration {:?}", text)))?;
                    total += Duration::from_secs(n * if c == 'H' { 3_600 } else { 60 });
                }
                'S' => {
                    let secs: f64 = number
                        .parse()
                        .map_err(|_| Error::Parse(format!("invalid ISO-8601 duration {:?}", text)))?;
                    total += Duration::from_millis((secs * 1_000.0).round() as u64);
                }
                _ => {
                    return Err(Error::Parse(format!(
                        "unsupported ISO-8601 duration component {:?} in {:?}",
                        c, text
                    )))
                }
            }
            number.clear();
            components += 1;
        }
    }
    if !number.is_empty() || components == 0 {
        return Err(Error::Parse(format!("invalid ISO-8601 duration {:?}", text)));
    }

    Ok(total)
}

/// Serde adapter for `Option<Duration>` as an ISO-8601 string or null.
pub(crate) mod iso8601 {
    use std::time::Duration;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(duration) => serializer.serialize_some(&super::format_duration(duration)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text: Option<String> = Option::deserialize(deserializer)?;
        match text {
            None => Ok(None),
            Some(text) => super::parse_duration(&text).map(Some).map_err(D::Error::custom),
        }
    }
}
