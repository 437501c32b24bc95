//! Signature based media type detection over the first bytes of a payload.

/// Upper bound on how many leading bytes are inspected.
pub const SNIFF_LEN: usize = 512;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

enum Signature {
    /// Case-insensitive markup tag, matched after leading whitespace and
    /// followed by a space or `>`.
    Html(&'static [u8]),
    Masked {
        mask: &'static [u8],
        pattern: &'static [u8],
        skip_ws: bool,
        content_type: &'static str,
    },
    Exact(&'static [u8], &'static str),
    /// ISO base media file (`ftyp` box), covers AVIF/HEIC/MP4.
    Ftyp,
}

const SIGNATURES: &[Signature] = &[
    Signature::Html(b"<!DOCTYPE HTML"),
    Signature::Html(b"<HTML"),
    Signature::Html(b"<HEAD"),
    Signature::Html(b"<SCRIPT"),
    Signature::Html(b"<IFRAME"),
    Signature::Html(b"<H1"),
    Signature::Html(b"<DIV"),
    Signature::Html(b"<FONT"),
    Signature::Html(b"<TABLE"),
    Signature::Html(b"<A"),
    Signature::Html(b"<STYLE"),
    Signature::Html(b"<TITLE"),
    Signature::Html(b"<B"),
    Signature::Html(b"<BODY"),
    Signature::Html(b"<BR"),
    Signature::Html(b"<P"),
    Signature::Html(b"<!--"),
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\xFF",
        pattern: b"<?xml",
        skip_ws: true,
        content_type: "text/xml; charset=utf-8",
    },
    Signature::Exact(b"%PDF-", "application/pdf"),
    Signature::Exact(b"%!PS-Adobe-", "application/postscript"),
    Signature::Masked {
        mask: b"\xFF\xFF\x00\x00",
        pattern: b"\xFE\xFF\x00\x00",
        skip_ws: false,
        content_type: "text/plain; charset=utf-16be",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\x00\x00",
        pattern: b"\xFF\xFE\x00\x00",
        skip_ws: false,
        content_type: "text/plain; charset=utf-16le",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\x00",
        pattern: b"\xEF\xBB\xBF\x00",
        skip_ws: false,
        content_type: TEXT_PLAIN,
    },
    Signature::Exact(b"GIF87a", "image/gif"),
    Signature::Exact(b"GIF89a", "image/gif"),
    Signature::Exact(b"\x89PNG\x0D\x0A\x1A\x0A", "image/png"),
    Signature::Exact(b"\xFF\xD8\xFF", "image/jpeg"),
    Signature::Exact(b"BM", "image/bmp"),
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00WEBPVP",
        skip_ws: false,
        content_type: "image/webp",
    },
    Signature::Exact(b"\x00\x00\x01\x00", "image/x-icon"),
    Signature::Exact(b"\x00\x00\x02\x00", "image/x-icon"),
    Signature::Ftyp,
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00WAVE",
        skip_ws: false,
        content_type: "audio/wave",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00AVI\x20",
        skip_ws: false,
        content_type: "video/avi",
    },
    Signature::Exact(b"OggS\x00", "application/ogg"),
    Signature::Exact(b"ID3", "audio/mpeg"),
    Signature::Exact(b"\x1A\x45\xDF\xA3", "video/webm"),
    Signature::Exact(b"PK\x03\x04", "application/zip"),
    Signature::Exact(b"\x1F\x8B\x08", "application/x-gzip"),
    Signature::Exact(b"Rar!\x1A\x07", "application/x-rar-compressed"),
    Signature::Exact(b"\x00asm", "application/wasm"),
];

fn is_ws(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

fn is_tag_terminator(b: u8) -> bool {
    b == b' ' || b == b'>'
}

fn is_binary(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

impl Signature {
    fn matches(&self, data: &[u8], first_non_ws: usize) -> Option<&'static str> {
        match self {
            Signature::Html(tag) => {
                let data = &data[first_non_ws..];
                if data.len() < tag.len() + 1 {
                    return None;
                }
                let same = tag
                    .iter()
                    .zip(data)
                    .all(|(t, d)| *t == d.to_ascii_uppercase());
                (same && is_tag_terminator(data[tag.len()])).then_some("text/html; charset=utf-8")
            }
            Signature::Masked {
                mask,
                pattern,
                skip_ws,
                content_type,
            } => {
                let data = if *skip_ws { &data[first_non_ws..] } else { data };
                if data.len() < pattern.len() {
                    return None;
                }
                let same = pattern
                    .iter()
                    .zip(mask.iter())
                    .zip(data)
                    .all(|((p, m), d)| d & m == *p);
                same.then_some(*content_type)
            }
            Signature::Exact(prefix, content_type) => {
                data.starts_with(prefix).then_some(*content_type)
            }
            Signature::Ftyp => match_ftyp(data),
        }
    }
}

fn match_ftyp(data: &[u8]) -> Option<&'static str> {
    if data.len() < 16 || &data[4..8] != b"ftyp" {
        return None;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if box_size < 16 || box_size % 4 != 0 || data.len() < box_size {
        return None;
    }

    // Major brand at 8..12, minor version at 12..16, compatible brands after.
    let brands: Vec<&[u8]> = std::iter::once(&data[8..12])
        .chain(data[16..box_size].chunks_exact(4))
        .collect();

    if brands.iter().any(|b| *b == b"avif" || *b == b"avis") {
        return Some("image/avif");
    }
    if brands
        .iter()
        .any(|b| matches!(*b, b"heic" | b"heix" | b"heim" | b"heis" | b"mif1"))
    {
        return Some("image/heic");
    }
    if brands
        .iter()
        .any(|b| b.starts_with(b"mp4") || matches!(*b, b"isom" | b"iso2" | b"avc1" | b"M4V "))
    {
        return Some("video/mp4");
    }
    None
}

/// Classifies a payload prefix. Only the first [`SNIFF_LEN`] bytes are
/// looked at; anything unrecognized that contains binary bytes is
/// `application/octet-stream`.
pub fn detect_content_type(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];
    let first_non_ws = data.iter().position(|b| !is_ws(*b)).unwrap_or(data.len());

    for signature in SIGNATURES {
        if let Some(content_type) = signature.matches(data, first_non_ws) {
            return content_type;
        }
    }

    if data[first_non_ws..].iter().any(|b| is_binary(*b)) {
        DEFAULT_CONTENT_TYPE
    } else {
        TEXT_PLAIN
    }
}
