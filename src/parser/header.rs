//! RFC 5322 header handling: folding, encoded-words (RFC 2047), address lists
//! and date parsing.

use std::collections::BTreeMap;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use tracing::warn;

use crate::model::address::EmailAddress;

/// Standard-alphabet engine for `B` encoded words; senders are sloppy with padding.
const B_WORD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
pub fn decode_header_bytes(bytes: &[u8]) -> String {
    // Strip BOM if present
    let bytes = if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &bytes[3..]
    } else {
        bytes
    };

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Unfold headers: join continuation lines (starting with space or tab) with the previous header.
///
/// Returns a list of `(lowercase_name, raw_value)` pairs in original order.
pub fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            // Continuation line
            if let Some(last) = result.last_mut() {
                last.1.push(' ');
                last.1.push_str(line.trim());
            }
        } else if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim().to_lowercase();
            let value = line[colon_pos + 1..].trim().to_string();
            result.push((name, value));
        }
        // Lines without a colon and not a continuation are silently skipped
    }

    result
}

/// Build the canonical header map: lower-cased names, decoded values.
///
/// Duplicate names keep the last value.
pub fn header_map<'a, I>(headers: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    headers
        .into_iter()
        .filter(|(name, _)| !name.trim().is_empty())
        .map(|(name, value)| (name.trim().to_lowercase(), decode_header_text(value)))
        .collect()
}

/// Look up a header case-insensitively in `(name, value)` pairs; the last
/// occurrence wins, matching [`header_map`].
pub fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .rev()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`
///
/// Literal text is kept in order around decoded words; whitespace between
/// two adjacent encoded words is dropped (RFC 2047 §6.2). Adjacent words in
/// the same charset are joined as bytes before decoding, so a character
/// split across two words survives. A token that does not parse as an
/// encoded word is left verbatim, so plain values come back unchanged.
pub fn decode_header_text(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut run: Option<EncodedRun> = None;
    let mut remaining = input;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        let after_start = &remaining[start + 2..];

        match try_decode_one_word(after_start) {
            Some(word) => {
                if run.is_none() || !before.trim().is_empty() {
                    flush_run(&mut result, run.take());
                    result.push_str(before);
                }
                match run.as_mut() {
                    Some(r) if r.charset.eq_ignore_ascii_case(&word.charset) => {
                        r.bytes.extend_from_slice(&word.bytes);
                    }
                    _ => {
                        flush_run(&mut result, run.take());
                        run = Some(EncodedRun {
                            charset: word.charset,
                            bytes: word.bytes,
                        });
                    }
                }
                remaining = &after_start[word.consumed..];
            }
            None => {
                flush_run(&mut result, run.take());
                result.push_str(before);
                result.push_str("=?");
                remaining = after_start;
            }
        }
    }

    flush_run(&mut result, run);
    result.push_str(remaining);
    result
}

/// Bytes of consecutive encoded words sharing one charset.
struct EncodedRun {
    charset: String,
    bytes: Vec<u8>,
}

fn flush_run(out: &mut String, run: Option<EncodedRun>) {
    if let Some(run) = run {
        out.push_str(&decode_charset(&run.charset, &run.bytes));
    }
}

struct EncodedWord {
    charset: String,
    bytes: Vec<u8>,
    consumed: usize, // bytes consumed from the string *after* the initial "=?"
}

fn try_decode_one_word(s: &str) -> Option<EncodedWord> {
    // Format: charset?encoding?encoded_text?=
    let first_q = s.find('?')?;
    let charset = &s[..first_q];
    if charset.contains(char::is_whitespace) {
        return None;
    }

    let rest = &s[first_q + 1..];
    let second_q = rest.find('?')?;
    let encoding = &rest[..second_q];

    let rest2 = &rest[second_q + 1..];
    let end = rest2.find("?=")?;
    let encoded_text = &rest2[..end];
    if encoded_text.contains(char::is_whitespace) {
        return None;
    }

    let bytes = match encoding {
        "B" | "b" => B_WORD_ENGINE.decode(encoded_text).ok()?,
        "Q" | "q" => decode_q_encoding(encoded_text),
        _ => return None,
    };

    Some(EncodedWord {
        // RFC 2231 language suffix (`utf-8*en`) is not part of the charset
        charset: charset.split('*').next().unwrap_or("").trim().to_string(),
        bytes,
        consumed: first_q + 1 + second_q + 1 + end + 2,
    })
}

/// Decode Q-encoding (RFC 2047): underscores → spaces, `=XX` → byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
                if let Ok(byte) = u8::from_str_radix(hex, 16) {
                    result.push(byte);
                    i += 3;
                } else {
                    result.push(b'=');
                    i += 1;
                }
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

/// Decode encoded-word bytes using its declared charset.
///
/// An empty charset means UTF-8. Unknown charsets decode as lossy UTF-8.
fn decode_charset(charset: &str, bytes: &[u8]) -> String {
    match charset.to_lowercase().as_str() {
        "" | "utf-8" | "utf8" => String::from_utf8_lossy(bytes).into_owned(),
        _ => {
            if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
                let (decoded, _, _) = encoding.decode(bytes);
                decoded.into_owned()
            } else {
                warn!(
                    charset = charset,
                    "Unknown charset, falling back to UTF-8 lossy"
                );
                String::from_utf8_lossy(bytes).into_owned()
            }
        }
    }
}

/// Normalize a Content-ID: surrounding whitespace and angle brackets removed,
/// `None` when nothing is left.
pub fn strip_angle_brackets(raw: &str) -> Option<String> {
    let id = raw.trim().trim_matches(|c| c == '<' || c == '>').trim();
    (!id.is_empty()).then(|| id.to_string())
}

/// Parse an address header into normalized `"Name <addr>"` strings.
///
/// Display names are RFC 2047 decoded after the list is split, so an
/// encoded comma cannot break an entry in two.
pub fn decode_address_list(raw: &str) -> Vec<String> {
    EmailAddress::parse_list(raw)
        .into_iter()
        .filter_map(|addr| {
            let address = addr.address.trim().to_string();
            if address.is_empty() {
                return None;
            }
            let decoded = EmailAddress {
                display_name: decode_header_text(&addr.display_name).trim().to_string(),
                address,
            };
            Some(decoded.display().trim().to_string())
        })
        .collect()
}

/// Turn a Date header into the canonical `date` field.
///
/// Returns the RFC 3339 form when the date parses, the decoded header
/// verbatim when it does not, and `None` for an empty header.
pub fn normalize_date(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match parse_date(trimmed) {
        Some(dt) => Some(dt.to_rfc3339()),
        None => Some(trimmed.to_string()),
    }
}

/// Layouts with a numeric zone, tried after RFC 2822 and RFC 3339.
const ZONED_FORMATS: [&str; 4] = [
    "%d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M %z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S %z",
];

/// Zone-less layouts; the result is taken as UTC.
const NAIVE_FORMATS: [&str; 6] = [
    "%d %b %Y %H:%M:%S",
    "%b %d %H:%M:%S %Y",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

/// Zone abbreviations accepted as the last token, with their UTC offset in hours.
const NAMED_ZONES: [(&str, i32); 14] = [
    ("UT", 0),
    ("UTC", 0),
    ("GMT", 0),
    ("EST", -5),
    ("EDT", -4),
    ("CST", -6),
    ("CDT", -5),
    ("MST", -7),
    ("MDT", -6),
    ("PST", -8),
    ("PDT", -7),
    ("CET", 1),
    ("CEST", 2),
    ("JST", 9),
];

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Parse a Date header, keeping its offset.
///
/// Strict RFC 2822 and RFC 3339 first, then a lenient pass over common
/// broken layouts (no weekday, IMAP `16-JUL-2025`, named zones), then
/// `mail-parser` as a last resort.
pub fn parse_date(date_str: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = DateTime::parse_from_rfc2822(trimmed)
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed))
        .ok()
        .or_else(|| parse_lenient(&expand_imap_date(strip_day_of_week(trimmed))))
        .or_else(|| mail_parser_date(trimmed));

    if parsed.is_none() {
        warn!(date = trimmed, "Could not parse date");
    }
    parsed
}

fn parse_lenient(s: &str) -> Option<DateTime<FixedOffset>> {
    let zoned = |text: &str| {
        ZONED_FORMATS
            .iter()
            .find_map(|fmt| DateTime::parse_from_str(text, fmt).ok())
    };

    zoned(s)
        .or_else(|| with_numeric_zone(s).as_deref().and_then(zoned))
        .or_else(|| {
            NAIVE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| naive.and_utc().fixed_offset())
        })
}

/// Wrap the value in a minimal message and let `mail-parser` try.
fn mail_parser_date(input: &str) -> Option<DateTime<FixedOffset>> {
    let wrapped = format!("Date: {input}\n\n");
    let parsed = mail_parser::MessageParser::default().parse(wrapped.as_bytes())?;
    DateTime::parse_from_rfc3339(&parsed.date()?.to_rfc3339()).ok()
}

/// `"16-JUL-2025 03:01:03"` → `"16 Jul 2025 03:01:03"`; other input unchanged.
fn expand_imap_date(s: &str) -> String {
    let (date, time) = s.split_once(' ').unwrap_or((s, ""));
    let mut fields = date.splitn(3, '-');
    let (Some(day), Some(month), Some(year)) = (fields.next(), fields.next(), fields.next()) else {
        return s.to_string();
    };
    if day.is_empty() || !day.bytes().all(|b| b.is_ascii_digit()) {
        return s.to_string();
    }
    match MONTHS.iter().find(|m| m.eq_ignore_ascii_case(month)) {
        Some(month) => format!("{day} {month} {year} {time}").trim_end().to_string(),
        None => s.to_string(),
    }
}

/// Drop a leading `"Thu, "` / `"Thu "`.
fn strip_day_of_week(s: &str) -> &str {
    let Some(head) = s.get(..3) else {
        return s;
    };
    let rest = &s[3..];
    if WEEKDAYS.iter().any(|d| d.eq_ignore_ascii_case(head)) && rest.starts_with([',', ' ']) {
        rest.trim_start_matches(|c: char| c == ',' || c.is_whitespace())
    } else {
        s
    }
}

/// `"... 10:00:00 CEST"` → `"... 10:00:00 +0200"`, when the last token is a known zone.
fn with_numeric_zone(s: &str) -> Option<String> {
    let (head, zone) = s.rsplit_once(' ')?;
    let (_, hours) = NAMED_ZONES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(zone))?;
    Some(format!("{head} {hours:+03}00"))
}
