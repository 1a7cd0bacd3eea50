//! Sample table boxes (`stco`, `co64`, `stts`, `stsc`)

use crate::error::{ReadError, Result};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;
use tracing::warn;

/// One `stts` run: `sample_count` samples lasting `sample_delta` ticks each
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeToSample {
    pub sample_count: u32,
    pub sample_delta: u32,
}

/// One `stsc` run, starting at 1-based chunk `first_chunk`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleToChunk {
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    pub sample_description_index: u32,
}

/// Skip version/flags and read the entry count, checking it fits the payload
fn entry_count(cursor: &mut Cursor<&[u8]>, entry_size: u64, kind: &str) -> Result<u32> {
    let _version_and_flags = cursor.read_u32::<BigEndian>()?;
    let count = cursor.read_u32::<BigEndian>()?;

    let available = cursor.get_ref().len() as u64 - cursor.position();
    if u64::from(count) * entry_size > available {
        return Err(ReadError::Structural(format!(
            "{} declares {} entries but holds only {} bytes",
            kind, count, available
        )));
    }
    Ok(count)
}

/// Chunk offsets from `stco` (32-bit) or `co64` (64-bit)
pub fn parse_chunk_offsets(payload: &[u8], large: bool) -> Result<Vec<u64>> {
    let mut cursor = Cursor::new(payload);
    let (entry_size, kind) = if large { (8, "co64") } else { (4, "stco") };
    let count = entry_count(&mut cursor, entry_size, kind)?;

    (0..count)
        .map(|_| {
            Ok(if large {
                cursor.read_u64::<BigEndian>()?
            } else {
                u64::from(cursor.read_u32::<BigEndian>()?)
            })
        })
        .collect()
}

pub fn parse_time_to_sample(payload: &[u8]) -> Result<Vec<TimeToSample>> {
    let mut cursor = Cursor::new(payload);
    let count = entry_count(&mut cursor, 8, "stts")?;

    (0..count)
        .map(|_| {
            Ok(TimeToSample {
                sample_count: cursor.read_u32::<BigEndian>()?,
                sample_delta: cursor.read_u32::<BigEndian>()?,
            })
        })
        .collect()
}

pub fn parse_sample_to_chunk(payload: &[u8]) -> Result<Vec<SampleToChunk>> {
    let mut cursor = Cursor::new(payload);
    let count = entry_count(&mut cursor, 12, "stsc")?;

    (0..count)
        .map(|_| {
            Ok(SampleToChunk {
                first_chunk: cursor.read_u32::<BigEndian>()?,
                samples_per_chunk: cursor.read_u32::<BigEndian>()?,
                sample_description_index: cursor.read_u32::<BigEndian>()?,
            })
        })
        .collect()
}

/// Check that `stsc` runs start at chunk 1 or later and strictly increase
fn check_sample_to_chunk(runs: &[SampleToChunk]) -> Result<()> {
    let mut previous = 0;
    for run in runs {
        if run.first_chunk <= previous {
            return Err(ReadError::Structural(format!(
                "stsc run starts at chunk {} after chunk {}",
                run.first_chunk, previous
            )));
        }
        previous = run.first_chunk;
    }
    Ok(())
}

/// Walks `stsc` runs forward alongside an increasing chunk number
///
/// A run covers chunks from its `first_chunk` up to the next run's
/// `first_chunk`. Chunks before the first run hold one sample.
struct ChunkSamples<'a> {
    runs: &'a [SampleToChunk],
    index: usize,
}

impl<'a> ChunkSamples<'a> {
    fn new(runs: &'a [SampleToChunk]) -> Self {
        Self { runs, index: 0 }
    }

    /// Samples in the 1-based chunk `chunk_number`; numbers must not decrease
    fn samples_in(&mut self, chunk_number: u64) -> u64 {
        while self
            .runs
            .get(self.index + 1)
            .is_some_and(|next| u64::from(next.first_chunk) <= chunk_number)
        {
            self.index += 1;
        }
        match self.runs.get(self.index) {
            Some(run) if u64::from(run.first_chunk) <= chunk_number => {
                u64::from(run.samples_per_chunk)
            }
            _ => 1,
        }
    }
}

/// Sample durations consumed from `stts` runs in bulk
struct SampleClock<'a> {
    runs: std::slice::Iter<'a, TimeToSample>,
    remaining: u64,
    delta: u64,
}

impl<'a> SampleClock<'a> {
    fn new(runs: &'a [TimeToSample]) -> Self {
        Self {
            runs: runs.iter(),
            remaining: 0,
            delta: 0,
        }
    }

    /// Add the ticks of the next `samples` samples to `position`
    ///
    /// Returns false once the runs end before all of them are counted.
    fn advance(&mut self, position: &mut u64, mut samples: u64) -> bool {
        while samples > 0 {
            if self.remaining == 0 {
                let Some(run) = self.runs.next() else {
                    return false;
                };
                self.remaining = u64::from(run.sample_count);
                self.delta = u64::from(run.sample_delta);
                continue;
            }
            let take = self.remaining.min(samples);
            *position = position.saturating_add(take.saturating_mul(self.delta));
            self.remaining -= take;
            samples -= take;
        }
        true
    }
}

/// Start tick of each of `chunk_count` chunks
///
/// Each chunk starts where the samples of all previous chunks end. The
/// work is linear in the chunk and run counts whatever the sample counts.
/// Once the durations run out, the remaining chunks start at the last
/// known position.
pub fn chunk_start_ticks(
    chunk_count: usize,
    time_to_sample: &[TimeToSample],
    sample_to_chunk: &[SampleToChunk],
) -> Result<Vec<u64>> {
    check_sample_to_chunk(sample_to_chunk)?;

    let mut chunks = ChunkSamples::new(sample_to_chunk);
    let mut clock = SampleClock::new(time_to_sample);
    let mut position: u64 = 0;
    let mut missing_durations = false;

    let mut starts = Vec::with_capacity(chunk_count);
    for chunk_number in (1..).take(chunk_count) {
        starts.push(position);
        if missing_durations {
            continue;
        }
        if !clock.advance(&mut position, chunks.samples_in(chunk_number)) {
            missing_durations = true;
        }
    }

    if missing_durations {
        warn!(chunks = chunk_count, "Not enough sample durations for all chunks");
    }
    Ok(starts)
}
