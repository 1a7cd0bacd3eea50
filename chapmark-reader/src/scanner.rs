//! Chapter scanning facade
//!
//! [`ChapterScanner`] picks the reader for a file's container format and is
//! the containment boundary for every failure below it: I/O errors,
//! malformed structures and panics inside a reader all end up as an empty
//! [`ChapterExtraction`] plus a `warn` event. Nothing propagates to the
//! caller, since chapters are an enhancement the player can do without.

use crate::codec::ReadLimits;
use crate::format::ContainerFormat;
use crate::id3::Id3Reader;
use crate::matroska::MatroskaReader;
use crate::mp4::Mp4Reader;
use crate::source::{ByteSource, ChapterExtraction, ChapterSource};
use chapmark_common::config::ChapmarkConfig;
use chapmark_common::{language, time, Chapter};
use rayon::prelude::*;
use std::any::Any;
use std::fs::File;
use std::io::BufReader;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ChapterScanner {
    limits: ReadLimits,
    preferred_languages: Vec<String>,
}

impl Default for ChapterScanner {
    /// Default limits, chapter names preferred in the locale's language
    fn default() -> Self {
        Self::new(language::preferred_languages(), ReadLimits::default())
    }
}

impl ChapterScanner {
    pub fn new(preferred_languages: Vec<String>, limits: ReadLimits) -> Self {
        Self {
            limits,
            preferred_languages,
        }
    }

    pub fn from_config(config: &ChapmarkConfig) -> Self {
        Self::new(config.preferred_languages(), ReadLimits::from(&config.scanner))
    }

    pub fn limits(&self) -> ReadLimits {
        self.limits
    }

    pub fn preferred_languages(&self) -> &[String] {
        &self.preferred_languages
    }

    /// The reader responsible for `format`
    pub fn reader_for(&self, format: ContainerFormat) -> Box<dyn ChapterSource> {
        match format {
            ContainerFormat::Matroska => Box::new(MatroskaReader::new(
                self.preferred_languages.clone(),
                self.limits,
            )),
            ContainerFormat::Mp4 => Box::new(Mp4Reader::new(self.limits)),
            ContainerFormat::Id3 => Box::new(Id3Reader::new(self.limits)),
        }
    }

    /// Extract chapters from an already opened stream of a known format
    pub fn scan_reader(
        &self,
        format: ContainerFormat,
        reader: &mut dyn ByteSource,
    ) -> ChapterExtraction {
        self.scan_source(self.reader_for(format).as_ref(), reader)
    }

    /// Run `source` over `reader`, containing any failure
    pub fn scan_source(
        &self,
        source: &dyn ChapterSource,
        reader: &mut dyn ByteSource,
    ) -> ChapterExtraction {
        let format = source.format();
        match panic::catch_unwind(AssertUnwindSafe(|| source.extract(reader))) {
            Ok(Ok(extraction)) => extraction,
            Ok(Err(e)) => {
                warn!(%format, error = %e, "Chapter extraction failed");
                ChapterExtraction::default()
            }
            Err(payload) => {
                warn!(%format, panic = panic_message(payload.as_ref()), "Chapter reader panicked");
                ChapterExtraction::default()
            }
        }
    }

    /// Detect the format of `path` and extract its chapters
    pub fn scan_file(&self, path: &Path) -> ChapterExtraction {
        let format = match ContainerFormat::from_path(path) {
            Ok(Some(format)) => format,
            Ok(None) => {
                debug!(file = %path.display(), "Not a chapter-capable container");
                return ChapterExtraction::default();
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Cannot read file");
                return ChapterExtraction::default();
            }
        };

        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Cannot open file");
                return ChapterExtraction::default();
            }
        };
        let mut reader = BufReader::new(file);

        let extraction = self.scan_reader(format, &mut reader);
        debug!(
            file = %path.display(),
            %format,
            marks = extraction.marks.len(),
            "Scanned file"
        );
        extraction
    }

    /// Scan many files in parallel, results in input order
    pub fn scan_batch<P>(&self, paths: &[P]) -> Vec<(PathBuf, ChapterExtraction)>
    where
        P: AsRef<Path> + Sync,
    {
        let results: Vec<(PathBuf, ChapterExtraction)> = paths
            .par_iter()
            .map(|path| {
                let path = path.as_ref();
                (path.to_path_buf(), self.scan_file(path))
            })
            .collect();

        debug!(
            files = results.len(),
            with_chapters = results.iter().filter(|(_, e)| !e.marks.is_empty()).count(),
            "Batch scan complete"
        );
        results
    }

    /// Build the [`Chapter`] for one audio file
    ///
    /// The id is the path, the name its file stem. The duration comes from
    /// the caller's decoder, since none of the readers measure it.
    pub fn scan_chapter(&self, path: &Path, duration_ms: i64) -> Chapter {
        let extraction = self.scan_file(path);

        let last_modified_ms = match path.metadata().and_then(|m| m.modified()) {
            Ok(modified) => time::system_time_to_ms(modified),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "No modification time");
                0
            }
        };

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Chapter::new(
            path.to_string_lossy(),
            name,
            duration_ms,
            last_modified_ms,
            extraction.marks,
        )
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ReadError, Result};
    use std::io::Cursor;

    struct Panicking;

    impl ChapterSource for Panicking {
        fn format(&self) -> ContainerFormat {
            ContainerFormat::Mp4
        }

        fn extract(&self, _source: &mut dyn ByteSource) -> Result<ChapterExtraction> {
            panic!("index out of bounds")
        }
    }

    struct Failing;

    impl ChapterSource for Failing {
        fn format(&self) -> ContainerFormat {
            ContainerFormat::Id3
        }

        fn extract(&self, _source: &mut dyn ByteSource) -> Result<ChapterExtraction> {
            Err(ReadError::Structural("broken".into()))
        }
    }

    fn scanner() -> ChapterScanner {
        ChapterScanner::new(vec!["eng".to_string()], ReadLimits::default())
    }

    #[test]
    fn test_panic_is_contained() {
        let mut reader = Cursor::new(Vec::new());
        let extraction = scanner().scan_source(&Panicking, &mut reader);
        assert!(extraction.is_empty());
    }

    #[test]
    fn test_error_is_contained() {
        let mut reader = Cursor::new(Vec::new());
        assert!(scanner().scan_source(&Failing, &mut reader).is_empty());
    }

    #[test]
    fn test_reader_for_each_format() {
        let scanner = scanner();
        for format in [ContainerFormat::Matroska, ContainerFormat::Mp4, ContainerFormat::Id3] {
            assert_eq!(scanner.reader_for(format).format(), format);
        }
    }

    #[test]
    fn test_garbage_input_is_empty() {
        let scanner = scanner();
        for format in [ContainerFormat::Matroska, ContainerFormat::Mp4, ContainerFormat::Id3] {
            let mut reader = Cursor::new(vec![0xFFu8; 7]);
            assert!(scanner.scan_reader(format, &mut reader).is_empty(), "{format}");
        }
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("boom"));
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(3u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
