//! Matroska / WebM chapter extraction
//!
//! Walks `Segment/Chapters/EditionEntry/ChapterAtom` for chapters and
//! `Segment/Info/Title` plus `Segment/Tags/Tag/SimpleTag` for tags.
//!
//! # Edition selection
//!
//! Ordered editions are discarded (playback order handling differs too
//! much between players), as are hidden ones. Of the remaining editions
//! the first one flagged default that has chapters wins, otherwise the
//! first one with chapters. An empty default edition is passed over rather
//! than chosen, so a file whose default edition is a placeholder still
//! yields the chapters of its other editions.

use crate::codec::ReadLimits;
use crate::ebml::{ids, read_document, EbmlDocument};
use crate::error::Result;
use crate::format::ContainerFormat;
use crate::source::{ByteSource, ChapterExtraction, ChapterSource};
use crate::tree::NodeId;
use chapmark_common::language::DEFAULT_LANGUAGE;
use chapmark_common::time::ns_to_ms;
use chapmark_common::{MediaTags, RawMark};
use std::io::{Read, Seek};
use tracing::{debug, trace};

#[derive(Debug, Clone)]
pub struct MatroskaReader {
    preferred_languages: Vec<String>,
    limits: ReadLimits,
}

struct Edition {
    default: bool,
    marks: Vec<RawMark>,
}

struct Display {
    languages: Vec<String>,
    name: String,
}

impl MatroskaReader {
    /// Create a reader preferring chapter names in `preferred_languages`
    /// (ISO 639-2 codes, most preferred first)
    pub fn new(preferred_languages: Vec<String>, limits: ReadLimits) -> Self {
        Self {
            preferred_languages,
            limits,
        }
    }

    pub fn read<R: Read + Seek + ?Sized>(&self, reader: &mut R) -> Result<ChapterExtraction> {
        let document = read_document(reader, &self.limits)?;

        let editions = self.read_editions(&document, reader)?;
        let marks = select_edition(editions);

        let tags = match read_tags(&document, reader) {
            Ok(tags) => tags,
            Err(e) => {
                debug!(error = %e, "Ignoring unreadable Matroska tags");
                MediaTags::default()
            }
        };

        debug!(marks = marks.len(), "Extracted Matroska chapters");
        Ok(ChapterExtraction::new(marks, tags))
    }

    fn read_editions<R: Read + Seek + ?Sized>(
        &self,
        document: &EbmlDocument,
        reader: &mut R,
    ) -> Result<Vec<Edition>> {
        let tree = &document.tree;
        let edition_nodes: Vec<NodeId> = tree
            .children_of_kind(Some(document.segment), ids::CHAPTERS)
            .flat_map(|chapters| tree.children_of_kind(Some(chapters), ids::EDITION_ENTRY))
            .collect();

        let mut editions = Vec::new();
        for (index, edition) in edition_nodes.into_iter().enumerate() {
            if document.flag(reader, edition, ids::EDITION_FLAG_ORDERED)? {
                debug!(edition = index, "Skipping ordered edition");
                continue;
            }
            if document.flag(reader, edition, ids::EDITION_FLAG_HIDDEN)? {
                debug!(edition = index, "Skipping hidden edition");
                continue;
            }

            let default = document.flag(reader, edition, ids::EDITION_FLAG_DEFAULT)?;
            let mut marks = Vec::new();
            self.collect_atoms(document, reader, edition, &mut marks)?;
            trace!(edition = index, default, marks = marks.len(), "Read edition");
            editions.push(Edition { default, marks });
        }
        Ok(editions)
    }

    /// Append the chapters below `parent` in pre-order
    fn collect_atoms<R: Read + Seek + ?Sized>(
        &self,
        document: &EbmlDocument,
        reader: &mut R,
        parent: NodeId,
        marks: &mut Vec<RawMark>,
    ) -> Result<()> {
        let atoms: Vec<NodeId> = document
            .tree
            .children_of_kind(Some(parent), ids::CHAPTER_ATOM)
            .collect();

        for atom in atoms {
            if document.flag(reader, atom, ids::CHAPTER_FLAG_HIDDEN)? {
                trace!("Skipping hidden chapter and its children");
                continue;
            }

            let start_ns = match document.child_uint(reader, Some(atom), ids::CHAPTER_TIME_START) {
                Ok(Some(start_ns)) => start_ns,
                Ok(None) => {
                    debug!("Skipping chapter without ChapterTimeStart");
                    continue;
                }
                Err(e) if !e.is_io() => {
                    debug!(error = %e, "Skipping chapter with malformed ChapterTimeStart");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let name = match self.display_name(document, reader, atom)? {
                Some(name) => name,
                None => format!("Chapter {}", marks.len() + 1),
            };
            marks.push(RawMark::new(ns_to_ms(start_ns), name));

            self.collect_atoms(document, reader, atom, marks)?;
        }
        Ok(())
    }

    /// Name from the best matching `ChapterDisplay`
    fn display_name<R: Read + Seek + ?Sized>(
        &self,
        document: &EbmlDocument,
        reader: &mut R,
        atom: NodeId,
    ) -> Result<Option<String>> {
        let display_nodes: Vec<NodeId> = document
            .tree
            .children_of_kind(Some(atom), ids::CHAPTER_DISPLAY)
            .collect();

        let mut displays = Vec::with_capacity(display_nodes.len());
        for node in display_nodes {
            let Some(name) = document.child_string(reader, Some(node), ids::CHAP_STRING)? else {
                continue;
            };
            let mut languages = Vec::new();
            for language in document.tree.children_of_kind(Some(node), ids::CHAP_LANGUAGE) {
                languages.push(document.string(reader, language)?);
            }
            if languages.is_empty() {
                languages.push(DEFAULT_LANGUAGE.to_string());
            }
            displays.push(Display { languages, name });
        }

        let preferred = self.preferred_languages.iter().find_map(|wanted| {
            displays.iter().position(|display| {
                display
                    .languages
                    .iter()
                    .any(|language| language.eq_ignore_ascii_case(wanted))
            })
        });
        let index = match preferred {
            Some(index) => index,
            None if !displays.is_empty() => 0,
            None => return Ok(None),
        };
        Ok(Some(displays.swap_remove(index).name))
    }
}

impl ChapterSource for MatroskaReader {
    fn format(&self) -> ContainerFormat {
        ContainerFormat::Matroska
    }

    fn extract(&self, source: &mut dyn ByteSource) -> Result<ChapterExtraction> {
        self.read(source)
    }
}

/// Default editions without chapters never win over editions that have them
fn select_edition(editions: Vec<Edition>) -> Vec<RawMark> {
    let chosen = editions
        .iter()
        .position(|edition| edition.default && !edition.marks.is_empty())
        .or_else(|| editions.iter().position(|edition| !edition.marks.is_empty()));

    match chosen {
        Some(index) => editions.into_iter().nth(index).map(|e| e.marks).unwrap_or_default(),
        None => Vec::new(),
    }
}

/// `Info/Title` overridden by `TITLE`, `ALBUM`, `ARTIST`/`PERFORMER` tags
fn read_tags<R: Read + Seek + ?Sized>(
    document: &EbmlDocument,
    reader: &mut R,
) -> Result<MediaTags> {
    let tree = &document.tree;
    let mut tags = MediaTags::default();

    let simple_tags: Vec<NodeId> = tree
        .children_of_kind(Some(document.segment), ids::TAGS)
        .flat_map(|tags| tree.children_of_kind(Some(tags), ids::TAG))
        .flat_map(|tag| tree.children_of_kind(Some(tag), ids::SIMPLE_TAG))
        .collect();

    for simple_tag in simple_tags {
        let Some(name) = document.child_string(reader, Some(simple_tag), ids::TAG_NAME)? else {
            continue;
        };
        let Some(value) = document.child_string(reader, Some(simple_tag), ids::TAG_STRING)? else {
            continue;
        };
        if value.is_empty() {
            continue;
        }

        let slot = match name.to_ascii_uppercase().as_str() {
            "TITLE" => &mut tags.title,
            "ALBUM" => &mut tags.album,
            "ARTIST" | "PERFORMER" => &mut tags.artist,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    if let Some(info) = tree.child(Some(document.segment), ids::INFO) {
        let title = document
            .child_string(reader, Some(info), ids::TITLE)?
            .filter(|title| !title.is_empty());
        tags.merge_missing(MediaTags {
            title,
            ..MediaTags::default()
        });
    }

    Ok(tags)
}
