//! MP4 fixtures

pub fn mp4_box(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
    out.extend_from_slice(kind);
    out.extend_from_slice(payload);
    out
}

pub fn container(kind: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
    mp4_box(kind, &children.concat())
}

/// Box with version and zero flags before `payload`
pub fn full_box(kind: &[u8; 4], version: u8, payload: &[u8]) -> Vec<u8> {
    let mut body = vec![version, 0, 0, 0];
    body.extend_from_slice(payload);
    mp4_box(kind, &body)
}

pub fn ftyp() -> Vec<u8> {
    mp4_box(b"ftyp", b"M4B \0\0\0\0M4B isom")
}

fn u32_table(entries: &[&[u32]]) -> Vec<u8> {
    let mut out = (entries.len() as u32).to_be_bytes().to_vec();
    for entry in entries {
        for value in *entry {
            out.extend_from_slice(&value.to_be_bytes());
        }
    }
    out
}

/// Nero chapter box (version 1) with starts in milliseconds
pub fn chpl(entries: &[(u64, &str)]) -> Vec<u8> {
    let mut body = vec![0, 0, 0, 0, entries.len() as u8];
    for (start_ms, title) in entries {
        body.extend_from_slice(&(start_ms * 10_000).to_be_bytes());
        body.push(title.len() as u8);
        body.extend_from_slice(title.as_bytes());
    }
    full_box(b"chpl", 1, &body)
}

/// `ilst` item with a single `data` box
pub fn ilst_item(kind: &[u8; 4], data_type: u32, value: &[u8]) -> Vec<u8> {
    let mut data = data_type.to_be_bytes().to_vec();
    data.extend_from_slice(&[0, 0, 0, 0]);
    data.extend_from_slice(value);
    container(kind, &[mp4_box(b"data", &data)])
}

pub fn freeform_item(name: &str, value: &str) -> Vec<u8> {
    let mut data = 1u32.to_be_bytes().to_vec();
    data.extend_from_slice(&[0, 0, 0, 0]);
    data.extend_from_slice(value.as_bytes());
    container(
        b"----",
        &[
            full_box(b"mean", 0, b"com.apple.iTunes"),
            full_box(b"name", 0, name.as_bytes()),
            mp4_box(b"data", &data),
        ],
    )
}

/// `udta/meta/ilst` with the given items (meta as an ISO full box)
pub fn udta_with_ilst(items: &[Vec<u8>]) -> Vec<u8> {
    let mut meta = vec![0, 0, 0, 0];
    meta.extend(full_box(b"hdlr", 0, b"\0\0\0\0mdirappl\0\0\0\0\0\0\0\0\0"));
    meta.extend(container(b"ilst", items));
    container(b"udta", &[mp4_box(b"meta", &meta)])
}

fn tkhd(track_id: u32) -> Vec<u8> {
    let mut body = vec![0; 8];
    body.extend_from_slice(&track_id.to_be_bytes());
    body.extend_from_slice(&[0; 12]);
    full_box(b"tkhd", 0, &body)
}

fn mdhd(timescale: u32) -> Vec<u8> {
    let mut body = vec![0; 8];
    body.extend_from_slice(&timescale.to_be_bytes());
    body.extend_from_slice(&[0; 8]);
    full_box(b"mdhd", 0, &body)
}

/// Chapter text track layout
pub struct ChapterTrack<'a> {
    pub titles: &'a [&'a str],
    /// `(sample_count, sample_delta)` runs
    pub durations: &'a [(u32, u32)],
    pub timescale: u32,
    /// `(first_chunk, samples_per_chunk)` runs
    pub sample_to_chunk: &'a [(u32, u32)],
    pub large_offsets: bool,
}

impl ChapterTrack<'_> {
    /// A file with an audio track (id 1) referencing this text track (id 2)
    ///
    /// Layout: ftyp, mdat (one text sample per chunk), moov. `extra_moov`
    /// boxes are appended inside moov.
    pub fn file(&self, extra_moov: &[Vec<u8>]) -> Vec<u8> {
        let ftyp = ftyp();

        let mut samples = Vec::new();
        let mut offsets = Vec::new();
        for title in self.titles {
            offsets.push((ftyp.len() + 8 + samples.len()) as u64);
            samples.extend_from_slice(&(title.len() as u16).to_be_bytes());
            samples.extend_from_slice(title.as_bytes());
        }
        let mdat = mp4_box(b"mdat", &samples);

        let chunk_offsets = if self.large_offsets {
            let mut body = (offsets.len() as u32).to_be_bytes().to_vec();
            for offset in &offsets {
                body.extend_from_slice(&offset.to_be_bytes());
            }
            full_box(b"co64", 0, &body)
        } else {
            let entries: Vec<[u32; 1]> = offsets.iter().map(|o| [*o as u32]).collect();
            let rows: Vec<&[u32]> = entries.iter().map(|e| &e[..]).collect();
            full_box(b"stco", 0, &u32_table(&rows))
        };

        let stts_rows: Vec<[u32; 2]> = self.durations.iter().map(|(c, d)| [*c, *d]).collect();
        let stts_rows: Vec<&[u32]> = stts_rows.iter().map(|e| &e[..]).collect();
        let stsc_rows: Vec<[u32; 3]> = self
            .sample_to_chunk
            .iter()
            .map(|(first, count)| [*first, *count, 1])
            .collect();
        let stsc_rows: Vec<&[u32]> = stsc_rows.iter().map(|e| &e[..]).collect();

        let stbl = container(
            b"stbl",
            &[
                full_box(b"stts", 0, &u32_table(&stts_rows)),
                full_box(b"stsc", 0, &u32_table(&stsc_rows)),
                chunk_offsets,
            ],
        );
        let text_track = container(
            b"trak",
            &[
                tkhd(2),
                container(b"mdia", &[mdhd(self.timescale), container(b"minf", &[stbl])]),
            ],
        );
        let audio_track = container(
            b"trak",
            &[tkhd(1), container(b"tref", &[mp4_box(b"chap", &2u32.to_be_bytes())])],
        );

        let mut moov_children = vec![audio_track, text_track];
        moov_children.extend_from_slice(extra_moov);

        let mut out = ftyp;
        out.extend(mdat);
        out.extend(container(b"moov", &moov_children));
        out
    }
}

/// A file with only a moov box holding `children`
pub fn file(moov_children: &[Vec<u8>]) -> Vec<u8> {
    let mut out = ftyp();
    out.extend(container(b"moov", moov_children));
    out
}
