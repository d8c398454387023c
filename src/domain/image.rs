//! Image content sniffing
//!
//! Media type is detected from the leading bytes, never from a client-supplied
//! filename or content type. Formats with short magic numbers (BMP, ICO) are
//! only accepted when the header that follows is consistent.

/// (media type, signature at offset 0)
const SIGNATURES: &[(&str, &[u8])] = &[
    ("image/png", b"\x89PNG\r\n\x1a\n"),
    ("image/jpeg", b"\xFF\xD8\xFF"),
    ("image/gif", b"GIF87a"),
    ("image/gif", b"GIF89a"),
    ("image/tiff", b"II*\x00"),
    ("image/tiff", b"MM\x00*"),
];

/// RIFF container with a WEBP form type at offset 8
const RIFF: &[u8] = b"RIFF";
const WEBP: &[u8] = b"WEBP";

/// BITMAPFILEHEADER length; the DIB header follows it
const BMP_FILE_HEADER_LEN: usize = 14;

/// Known DIB header sizes (CORE, INFO, V2, V3, OS/2 v2, V4, V5)
const BMP_DIB_HEADER_SIZES: &[u32] = &[12, 40, 52, 56, 64, 108, 124];

/// ICONDIR header and one ICONDIRENTRY
const ICO_HEADER_LEN: usize = 6;
const ICO_ENTRY_LEN: usize = 16;

fn u16_le(bytes: &[u8], offset: usize) -> Option<u16> {
    let raw = bytes.get(offset..offset + 2)?;
    Some(u16::from_le_bytes([raw[0], raw[1]]))
}

fn u32_le(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

/// `BM`, a declared file size that covers both headers, reserved fields
/// zeroed, a pixel offset past the headers and a known DIB header size
fn is_bmp(bytes: &[u8]) -> bool {
    if !bytes.starts_with(b"BM") {
        return false;
    }
    let (Some(file_size), Some(reserved), Some(pixel_offset), Some(dib_size)) = (
        u32_le(bytes, 2),
        u32_le(bytes, 6),
        u32_le(bytes, 10),
        u32_le(bytes, 14),
    ) else {
        return false;
    };
    if !BMP_DIB_HEADER_SIZES.contains(&dib_size) {
        return false;
    }

    let headers = BMP_FILE_HEADER_LEN as u64 + u64::from(dib_size);
    reserved == 0 && u64::from(pixel_offset) >= headers && u64::from(file_size) >= headers
}

/// ICONDIR with type 1, at least one entry, and a first entry whose
/// reserved byte is zero, planes are 0 or 1 and image data starts after the
/// directory
fn is_ico(bytes: &[u8]) -> bool {
    if !bytes.starts_with(b"\x00\x00\x01\x00") {
        return false;
    }
    let Some(count) = u16_le(bytes, 4).filter(|count| *count > 0) else {
        return false;
    };

    let entry = ICO_HEADER_LEN;
    let (Some(reserved), Some(planes), Some(data_offset)) = (
        bytes.get(entry + 3),
        u16_le(bytes, entry + 4),
        u32_le(bytes, entry + 12),
    ) else {
        return false;
    };

    let directory = (ICO_HEADER_LEN + ICO_ENTRY_LEN * usize::from(count)) as u64;
    *reserved == 0 && planes <= 1 && u64::from(data_offset) >= directory
}

/// Detect an image media type from content, `None` when the bytes are not a
/// recognized image.
pub fn detect_image_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(RIFF) && bytes.get(8..12) == Some(WEBP) {
        return Some("image/webp");
    }
    if is_bmp(bytes) {
        return Some("image/bmp");
    }
    if is_ico(bytes) {
        return Some("image/x-icon");
    }

    SIGNATURES
        .iter()
        .find(|(_, signature)| bytes.starts_with(signature))
        .map(|(media_type, _)| *media_type)
}

pub fn is_image(bytes: &[u8]) -> bool {
    detect_image_type(bytes).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1x1 24-bit BMP with a BITMAPINFOHEADER
    fn bmp() -> Vec<u8> {
        let mut bytes = b"BM".to_vec();
        bytes.extend_from_slice(&58u32.to_le_bytes()); // file size
        bytes.extend_from_slice(&0u32.to_le_bytes()); // reserved
        bytes.extend_from_slice(&54u32.to_le_bytes()); // pixel offset
        bytes.extend_from_slice(&40u32.to_le_bytes()); // DIB header size
        bytes.extend_from_slice(&1i32.to_le_bytes()); // width
        bytes.extend_from_slice(&1i32.to_le_bytes()); // height
        bytes.extend_from_slice(&1u16.to_le_bytes()); // planes
        bytes.extend_from_slice(&24u16.to_le_bytes()); // bits per pixel
        bytes.resize(58, 0);
        bytes
    }

    /// One 16x16 entry whose data starts right after the directory
    fn ico() -> Vec<u8> {
        let mut bytes = b"\x00\x00\x01\x00".to_vec();
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&[16, 16, 0, 0]);
        bytes.extend_from_slice(&1u16.to_le_bytes()); // planes
        bytes.extend_from_slice(&32u16.to_le_bytes()); // bits per pixel
        bytes.extend_from_slice(&40u32.to_le_bytes()); // data size
        bytes.extend_from_slice(&22u32.to_le_bytes()); // data offset
        bytes
    }

    #[test]
    fn test_detect_png() {
        let png = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";
        assert_eq!(detect_image_type(png), Some("image/png"));
        assert!(is_image(png));
    }

    #[test]
    fn test_detect_jpeg_and_gif() {
        assert_eq!(detect_image_type(b"\xFF\xD8\xFF\xE0\x00\x10JFIF"), Some("image/jpeg"));
        assert_eq!(detect_image_type(b"GIF89a\x01\x00"), Some("image/gif"));
    }

    #[test]
    fn test_detect_webp() {
        let webp = b"RIFF\x24\x00\x00\x00WEBPVP8 ";
        assert_eq!(detect_image_type(webp), Some("image/webp"));

        // RIFF but not WEBP (e.g. WAV audio)
        assert_eq!(detect_image_type(b"RIFF\x24\x00\x00\x00WAVEfmt "), None);
    }

    #[test]
    fn test_detect_bmp() {
        assert_eq!(detect_image_type(&bmp()), Some("image/bmp"));
    }

    #[test]
    fn test_text_starting_with_bm_is_not_bmp() {
        assert!(!is_image(b"BMI report: 24.1, normal weight\n"));
        assert!(!is_image(b"BM"));

        let mut unknown_dib = bmp();
        unknown_dib[14..18].copy_from_slice(&41u32.to_le_bytes());
        assert!(!is_image(&unknown_dib));

        let mut short_file = bmp();
        short_file[2..6].copy_from_slice(&20u32.to_le_bytes());
        assert!(!is_image(&short_file));
    }

    #[test]
    fn test_detect_ico() {
        assert_eq!(detect_image_type(&ico()), Some("image/x-icon"));

        let mut empty_directory = ico();
        empty_directory[4..6].copy_from_slice(&0u16.to_le_bytes());
        assert!(!is_image(&empty_directory));

        let mut overlapping_data = ico();
        overlapping_data[18..22].copy_from_slice(&4u32.to_le_bytes());
        assert!(!is_image(&overlapping_data));

        assert!(!is_image(b"\x00\x00\x01\x00"));
    }

    #[test]
    fn test_rejects_non_images() {
        assert!(!is_image(b"%PDF-1.7"));
        assert!(!is_image(b"hello, plain text"));
        assert!(!is_image(b"PK\x03\x04"));
        assert!(!is_image(b""));
        // Truncated PNG signature
        assert!(!is_image(b"\x89PN"));
    }
}
