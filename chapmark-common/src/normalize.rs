//! Chapter mark normalization
//!
//! Turns whatever a container reader produced into a gapless, ordered
//! sequence of [`ChapterMark`]s covering a track from `0` to its duration.
//!
//! # Algorithm
//!
//! 1. Drop marks with a negative start.
//! 2. Stable-sort the rest by start.
//! 3. Cluster near-adjacent starts: a mark whose start is within the
//!    tolerance of the previous mark's start joins that mark's cluster.
//!    The first mark of a cluster represents it (position and name).
//! 4. Drop trailing representatives that start within the tolerance of the
//!    end of the track.
//! 5. Materialize spans. The first span always starts at `0`; every span
//!    ends one tick before the next one starts; the last ends at the
//!    duration.
//!
//! With nothing left after step 4 the result is a single span named after
//! the fallback name.
//!
//! Normalization is total: it never fails and always returns at least one
//! mark.
//!
//! # Examples
//!
//! ```rust
//! use chapmark_common::{normalize, RawMark};
//!
//! let marks = vec![RawMark::new(5, "A"), RawMark::new(10, "B")];
//! let spans = normalize(&marks, 20, "Chapter");
//!
//! assert_eq!(spans.len(), 2);
//! assert_eq!((spans[0].start_ms(), spans[0].end_ms()), (0, 9));
//! assert_eq!((spans[1].start_ms(), spans[1].end_ms()), (10, 20));
//! ```

use crate::marks::{ChapterMark, RawMark};

/// Default distance (ms) within which two starts count as the same instant
pub const DEFAULT_CLUSTER_TOLERANCE_MS: i64 = 1;

/// Tunables for [`normalize_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Starts at most this far apart are merged into one cluster.
    ///
    /// Values below 1 are treated as 1; a zero tolerance could produce
    /// spans with `start == end`.
    pub cluster_tolerance_ms: i64,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            cluster_tolerance_ms: DEFAULT_CLUSTER_TOLERANCE_MS,
        }
    }
}

impl NormalizeOptions {
    pub fn with_tolerance(cluster_tolerance_ms: i64) -> Self {
        Self {
            cluster_tolerance_ms,
        }
    }

    fn tolerance(&self) -> i64 {
        self.cluster_tolerance_ms.max(1)
    }
}

/// Normalize raw marks with the default options
pub fn normalize(raw_marks: &[RawMark], duration_ms: i64, fallback_name: &str) -> Vec<ChapterMark> {
    normalize_with(raw_marks, duration_ms, fallback_name, &NormalizeOptions::default())
}

/// Normalize raw marks into contiguous spans covering `0..=duration_ms`
///
/// A non-positive `duration_ms` is treated as `1` so the result always
/// holds at least one valid span.
pub fn normalize_with(
    raw_marks: &[RawMark],
    duration_ms: i64,
    fallback_name: &str,
    options: &NormalizeOptions,
) -> Vec<ChapterMark> {
    let tolerance = options.tolerance();
    let duration_ms = duration_ms.max(1);

    let mut valid: Vec<&RawMark> = raw_marks.iter().filter(|mark| mark.start_ms >= 0).collect();
    // slice::sort_by_key is stable: equal starts keep their input order
    valid.sort_by_key(|mark| mark.start_ms);

    let mut representatives: Vec<&RawMark> = Vec::with_capacity(valid.len());
    let mut previous_start: Option<i64> = None;
    for mark in valid {
        let opens_cluster = match previous_start {
            Some(previous) => mark.start_ms - previous > tolerance,
            None => true,
        };
        if opens_cluster {
            representatives.push(mark);
        }
        previous_start = Some(mark.start_ms);
    }

    let last_meaningful_start = duration_ms.saturating_sub(tolerance);
    while representatives
        .last()
        .is_some_and(|last| last.start_ms >= last_meaningful_start)
    {
        representatives.pop();
    }

    if representatives.is_empty() {
        return vec![ChapterMark::spanning(fallback_name.to_string(), 0, duration_ms)];
    }

    representatives
        .iter()
        .enumerate()
        .map(|(index, mark)| {
            let start = if index == 0 { 0 } else { mark.start_ms };
            let end = match representatives.get(index + 1) {
                Some(next) => next.start_ms - 1,
                None => duration_ms,
            };
            ChapterMark::spanning(mark.name.clone(), start, end)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(marks: &[ChapterMark]) -> Vec<(i64, i64)> {
        marks.iter().map(|m| (m.start_ms(), m.end_ms())).collect()
    }

    #[test]
    fn test_empty_input_yields_fallback() {
        let result = normalize(&[], 20, "Book");
        assert_eq!(spans(&result), vec![(0, 20)]);
        assert_eq!(result[0].name(), "Book");
    }

    #[test]
    fn test_negative_only_input_yields_fallback() {
        let marks = vec![RawMark::new(-5, "x")];
        assert_eq!(normalize(&marks, 20, "Book"), normalize(&[], 20, "Book"));
    }

    #[test]
    fn test_zero_duration_still_yields_valid_span() {
        let result = normalize(&[RawMark::new(0, "A")], 0, "Book");
        assert_eq!(spans(&result), vec![(0, 1)]);
    }

    #[test]
    fn test_negative_duration_still_yields_valid_span() {
        let result = normalize(&[], -40, "Book");
        assert_eq!(spans(&result), vec![(0, 1)]);
    }

    #[test]
    fn test_single_mark_keeps_its_name() {
        let result = normalize(&[RawMark::new(7, "Only")], 20, "Book");
        assert_eq!(spans(&result), vec![(0, 20)]);
        assert_eq!(result[0].name(), "Only");
    }

    #[test]
    fn test_marks_past_duration_are_dropped() {
        let marks = vec![
            RawMark::new(0, "A"),
            RawMark::new(30, "B"),
            RawMark::new(40, "C"),
        ];
        let result = normalize(&marks, 20, "Book");
        assert_eq!(spans(&result), vec![(0, 20)]);
    }

    #[test]
    fn test_tie_keeps_first_in_input_order() {
        let marks = vec![
            RawMark::new(0, "A"),
            RawMark::new(5, "B"),
            RawMark::new(5, "C"),
        ];
        let result = normalize(&marks, 20, "Book");
        assert_eq!(result[1].name(), "B");
    }

    #[test]
    fn test_unsorted_input_is_ordered() {
        let marks = vec![
            RawMark::new(10, "C"),
            RawMark::new(0, "A"),
            RawMark::new(5, "B"),
        ];
        let result = normalize(&marks, 20, "Book");
        let names: Vec<&str> = result.iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_wider_tolerance_merges_more() {
        let marks = vec![
            RawMark::new(0, "A"),
            RawMark::new(100, "B"),
            RawMark::new(103, "C"),
            RawMark::new(500, "D"),
        ];
        let options = NormalizeOptions::with_tolerance(5);
        let result = normalize_with(&marks, 1000, "Book", &options);
        assert_eq!(spans(&result), vec![(0, 99), (100, 499), (500, 1000)]);
    }

    #[test]
    fn test_zero_tolerance_is_clamped() {
        let marks = vec![RawMark::new(0, "A"), RawMark::new(1, "B"), RawMark::new(5, "C")];
        let options = NormalizeOptions::with_tolerance(0);
        let result = normalize_with(&marks, 20, "Book", &options);
        assert_eq!(spans(&result), vec![(0, 4), (5, 20)]);
    }

    #[test]
    fn test_deterministic() {
        let marks = vec![
            RawMark::new(3, "A"),
            RawMark::new(3, "B"),
            RawMark::new(9, "C"),
            RawMark::new(-1, "D"),
        ];
        assert_eq!(normalize(&marks, 50, "Book"), normalize(&marks, 50, "Book"));
    }
}
