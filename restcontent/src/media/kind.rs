//! Content type classification and image header sniffing.

pub const CONTENT_TYPE_IMAGE: &str = "image";
pub const CONTENT_TYPE_AUDIO: &str = "audio";
pub const CONTENT_TYPE_VIDEO: &str = "video";
pub const CONTENT_TYPE_FILE: &str = "file";

/// Lowercased extension of `name` including the dot, or "" when absent.
pub fn extension(name: &str) -> String {
    match name.rfind('.') {
        Some(idx) if !name[idx..].contains('/') => name[idx..].to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// Content type for an extension, plus whether its dimensions can be read.
pub fn classify(ext: &str) -> (&'static str, bool) {
    match ext {
        ".jpg" | ".jpeg" | ".png" | ".gif" => (CONTENT_TYPE_IMAGE, true),
        ".webp" | ".svg" | ".ico" | ".bmp" => (CONTENT_TYPE_IMAGE, false),
        ".mp3" | ".wav" | ".ogg" | ".aac" | ".flac" => (CONTENT_TYPE_AUDIO, false),
        ".mp4" | ".webm" | ".avi" | ".mov" | ".wmv" | ".mkv" => (CONTENT_TYPE_VIDEO, false),
        _ => (CONTENT_TYPE_FILE, false),
    }
}

/// Width and height from a PNG, GIF or JPEG header.
pub fn image_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        if data.len() < 24 || &data[12..16] != b"IHDR" {
            return None;
        }
        let w = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
        let h = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
        return Some((w, h));
    }

    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        if data.len() < 10 {
            return None;
        }
        let w = u16::from_le_bytes([data[6], data[7]]) as u32;
        let h = u16::from_le_bytes([data[8], data[9]]) as u32;
        return Some((w, h));
    }

    if data.starts_with(&[0xFF, 0xD8]) {
        return jpeg_dimensions(data);
    }

    None
}

fn jpeg_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let mut i = 2;
    while i + 1 < data.len() {
        if data[i] != 0xFF {
            return None;
        }
        let marker = data[i + 1];
        match marker {
            0xFF => {
                i += 1;
                continue;
            }
            0x01 | 0xD0..=0xD7 => {
                i += 2;
                continue;
            }
            0xD9 | 0xDA => return None,
            _ => {}
        }

        if i + 4 > data.len() {
            return None;
        }
        let len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;

        let is_sof = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            if i + 9 > data.len() {
                return None;
            }
            let h = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
            let w = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
            return Some((w, h));
        }
        i += 2 + len;
    }
    None
}
