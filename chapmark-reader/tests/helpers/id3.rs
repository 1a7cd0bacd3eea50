//! ID3v2 fixtures

pub fn synchsafe(value: u32) -> [u8; 4] {
    [
        ((value >> 21) & 0x7F) as u8,
        ((value >> 14) & 0x7F) as u8,
        ((value >> 7) & 0x7F) as u8,
        (value & 0x7F) as u8,
    ]
}

/// Frame with a size encoding matching `major` (synchsafe from 4 on)
pub fn frame(major: u8, id: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = id.to_vec();
    if major >= 4 {
        out.extend_from_slice(&synchsafe(body.len() as u32));
    } else {
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    }
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(body);
    out
}

/// Text frame body (encoding byte, text)
pub fn text(encoding: u8, value: &[u8]) -> Vec<u8> {
    let mut out = vec![encoding];
    out.extend_from_slice(value);
    out
}

pub fn title(major: u8, value: &str) -> Vec<u8> {
    frame(major, b"TIT2", &text(3, value.as_bytes()))
}

pub fn user_text(major: u8, description: &str, value: &str) -> Vec<u8> {
    let mut body = vec![3];
    body.extend_from_slice(description.as_bytes());
    body.push(0);
    body.extend_from_slice(value.as_bytes());
    frame(major, b"TXXX", &body)
}

pub fn chap(
    major: u8,
    element_id: &str,
    start_ms: u32,
    end_ms: u32,
    sub_frames: &[Vec<u8>],
) -> Vec<u8> {
    let mut body = element_id.as_bytes().to_vec();
    body.push(0);
    body.extend_from_slice(&start_ms.to_be_bytes());
    body.extend_from_slice(&end_ms.to_be_bytes());
    body.extend_from_slice(&[0xFF; 8]);
    body.extend(sub_frames.concat());
    frame(major, b"CHAP", &body)
}

/// A tag followed by some fake audio
pub fn tag(major: u8, flags: u8, frames: &[Vec<u8>], padding: usize) -> Vec<u8> {
    let mut body = frames.concat();
    body.extend(std::iter::repeat(0).take(padding));

    let mut out = b"ID3".to_vec();
    out.extend_from_slice(&[major, 0, flags]);
    out.extend_from_slice(&synchsafe(body.len() as u32));
    out.extend(body);
    out.extend_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
    out
}
