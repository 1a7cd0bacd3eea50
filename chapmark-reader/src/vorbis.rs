//! Vorbis comment chapters
//!
//! Ogg Vorbis/Opus and FLAC files carry chapters as comment pairs:
//!
//! ```text
//! CHAPTER001=00:00:00.000
//! CHAPTER001NAME=Prologue
//! CHAPTER002=00:12:31.500
//! CHAPTER002NAME=The Road
//! ```
//!
//! Keys are case-insensitive. The comments themselves come from whatever
//! decoder the caller already uses; this module only interprets them.

use chapmark_common::time::parse_timestamp;
use chapmark_common::RawMark;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Default)]
struct Entry {
    start_ms: Option<i64>,
    name: Option<String>,
}

enum ChapterKey<'a> {
    Start(u32, &'a str),
    Name(u32, &'a str),
}

fn parse_key(key: &str) -> Option<ChapterKey<'_>> {
    if key.len() < 8 || !key.is_char_boundary(7) || !key[..7].eq_ignore_ascii_case("CHAPTER") {
        return None;
    }
    let rest = &key[7..];
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let (digits, suffix) = rest.split_at(digits_end);
    let index = digits.parse().ok()?;

    if suffix.is_empty() {
        Some(ChapterKey::Start(index, digits))
    } else if suffix.eq_ignore_ascii_case("NAME") {
        Some(ChapterKey::Name(index, digits))
    } else {
        None
    }
}

/// Chapters from `CHAPTERnnn` / `CHAPTERnnnNAME` comment pairs, ordered by index
///
/// Chapters without a parsable start are dropped; chapters without a name
/// are called `Chapter nnn` (using the digits as written in the key).
pub fn chapters_from_comments<K, V>(comments: &[(K, V)]) -> Vec<RawMark>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut entries: BTreeMap<u32, (String, Entry)> = BTreeMap::new();

    for (key, value) in comments {
        let value = value.as_ref().trim();
        match parse_key(key.as_ref()) {
            Some(ChapterKey::Start(index, digits)) => {
                let (_, entry) = entries
                    .entry(index)
                    .or_insert_with(|| (digits.to_string(), Entry::default()));
                if entry.start_ms.is_none() {
                    entry.start_ms = parse_timestamp(value);
                    if entry.start_ms.is_none() {
                        debug!(key = key.as_ref(), value, "Unparsable chapter timestamp");
                    }
                }
            }
            Some(ChapterKey::Name(index, digits)) => {
                let (_, entry) = entries
                    .entry(index)
                    .or_insert_with(|| (digits.to_string(), Entry::default()));
                if entry.name.is_none() && !value.is_empty() {
                    entry.name = Some(value.to_string());
                }
            }
            None => {}
        }
    }

    entries
        .into_values()
        .filter_map(|(digits, entry)| {
            let start_ms = entry.start_ms?;
            let name = entry.name.unwrap_or_else(|| format!("Chapter {digits}"));
            Some(RawMark::new(start_ms, name))
        })
        .collect()
}
