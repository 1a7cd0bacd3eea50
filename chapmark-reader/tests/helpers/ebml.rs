//! Matroska fixtures

use chapmark_reader::ebml::ids;

/// Element id bytes as stored (marker bits kept, leading zero bytes dropped)
pub fn id_bytes(id: u32) -> Vec<u8> {
    let bytes = id.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(3);
    bytes[first..].to_vec()
}

/// Size as an 8-byte vint
pub fn size_bytes(size: usize) -> Vec<u8> {
    let mut out = vec![0x01];
    out.extend_from_slice(&(size as u64).to_be_bytes()[1..]);
    out
}

pub fn element(id: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = id_bytes(id);
    out.extend(size_bytes(payload.len()));
    out.extend_from_slice(payload);
    out
}

/// Element whose size is the reserved "unknown" value
pub fn unknown_size_element(id: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = id_bytes(id);
    out.push(0xFF);
    out.extend_from_slice(payload);
    out
}

pub fn master(id: u32, children: &[Vec<u8>]) -> Vec<u8> {
    element(id, &children.concat())
}

pub fn uint(id: u32, value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(7);
    element(id, &bytes[first..])
}

pub fn string(id: u32, value: &str) -> Vec<u8> {
    element(id, value.as_bytes())
}

pub fn display(name: &str, language: Option<&str>) -> Vec<u8> {
    let mut children = vec![string(ids::CHAP_STRING, name)];
    if let Some(language) = language {
        children.push(string(ids::CHAP_LANGUAGE, language));
    }
    master(ids::CHAPTER_DISPLAY, &children)
}

/// Chapter atom with an English display and optional nested atoms
pub fn atom(start_ms: u64, name: &str, nested: &[Vec<u8>]) -> Vec<u8> {
    let mut children = vec![
        uint(ids::CHAPTER_TIME_START, start_ms * 1_000_000),
        display(name, Some("eng")),
    ];
    children.extend_from_slice(nested);
    master(ids::CHAPTER_ATOM, &children)
}

pub fn edition(flags: &[(u32, u64)], atoms: &[Vec<u8>]) -> Vec<u8> {
    let mut children: Vec<Vec<u8>> = flags.iter().map(|(id, value)| uint(*id, *value)).collect();
    children.extend_from_slice(atoms);
    master(ids::EDITION_ENTRY, &children)
}

pub fn chapters(editions: &[Vec<u8>]) -> Vec<u8> {
    master(ids::CHAPTERS, editions)
}

pub fn simple_tag(name: &str, value: &str) -> Vec<u8> {
    master(
        ids::SIMPLE_TAG,
        &[string(ids::TAG_NAME, name), string(ids::TAG_STRING, value)],
    )
}

pub fn header(doc_type: &str) -> Vec<u8> {
    master(ids::EBML, &[string(ids::DOC_TYPE, doc_type)])
}

/// A complete file: EBML header plus one Segment holding `children`
pub fn file(children: &[Vec<u8>]) -> Vec<u8> {
    let mut out = header("matroska");
    out.extend(master(ids::SEGMENT, children));
    out
}
