//! DIB-to-BMP packaging for clipboard captures.
//!
//! The clipboard hands back a packed DIB (a BITMAPINFOHEADER followed by
//! an optional palette/masks block and the pixel data) with no file
//! header. Prepending the 14-byte BITMAPFILEHEADER makes it a .bmp any
//! consumer can open.

#![cfg_attr(not(windows), allow(dead_code))]

const FILE_HEADER_LEN: u32 = 14;
/// biCompression value indicating explicit RGB bit masks follow the header.
const BI_BITFIELDS: u32 = 3;
/// The classic 40-byte BITMAPINFOHEADER; only this layout carries masks
/// outside the header itself.
const INFO_HEADER_LEN: u32 = 40;

/// Wrap a packed DIB in a BMP file header.
pub fn dib_to_bmp(dib: &[u8]) -> Result<Vec<u8>, String> {
    if dib.len() < INFO_HEADER_LEN as usize {
        return Err(format!("DIB too short: {} bytes", dib.len()));
    }

    let header_size = read_u32(dib, 0);
    let bit_count = u16::from_le_bytes([dib[14], dib[15]]);
    let compression = read_u32(dib, 16);
    let colors_used = read_u32(dib, 32);

    // Palette entry count: explicit when biClrUsed is set, otherwise the
    // full index space for palettized depths, none for true color.
    let palette_entries = if colors_used != 0 {
        colors_used
    } else if bit_count <= 8 {
        1u32 << bit_count
    } else {
        0
    };

    let mut pixel_offset = FILE_HEADER_LEN + header_size + palette_entries * 4;
    if compression == BI_BITFIELDS && header_size == INFO_HEADER_LEN {
        pixel_offset += 12; // three u32 channel masks
    }

    let file_size = FILE_HEADER_LEN + dib.len() as u32;
    let mut bmp = Vec::with_capacity(file_size as usize);
    bmp.extend_from_slice(b"BM");
    bmp.extend_from_slice(&file_size.to_le_bytes());
    bmp.extend_from_slice(&[0u8; 4]); // reserved
    bmp.extend_from_slice(&pixel_offset.to_le_bytes());
    bmp.extend_from_slice(dib);
    Ok(bmp)
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A minimal 40-byte BITMAPINFOHEADER with the given depth/compression.
    fn info_header(bit_count: u16, compression: u32, colors_used: u32) -> Vec<u8> {
        let mut h = vec![0u8; 40];
        h[0..4].copy_from_slice(&40u32.to_le_bytes());
        h[4..8].copy_from_slice(&1i32.to_le_bytes()); // width
        h[8..12].copy_from_slice(&1i32.to_le_bytes()); // height
        h[12..14].copy_from_slice(&1u16.to_le_bytes()); // planes
        h[14..16].copy_from_slice(&bit_count.to_le_bytes());
        h[16..20].copy_from_slice(&compression.to_le_bytes());
        h[32..36].copy_from_slice(&colors_used.to_le_bytes());
        h
    }

    #[test]
    fn test_truecolor_dib() {
        let mut dib = info_header(24, 0, 0);
        dib.extend_from_slice(&[0u8; 4]); // one padded pixel row
        let bmp = dib_to_bmp(&dib).unwrap();

        assert_eq!(&bmp[0..2], b"BM");
        let file_size = u32::from_le_bytes([bmp[2], bmp[3], bmp[4], bmp[5]]);
        assert_eq!(file_size as usize, bmp.len());
        let offset = u32::from_le_bytes([bmp[10], bmp[11], bmp[12], bmp[13]]);
        // No palette: pixels start right after both headers
        assert_eq!(offset, 14 + 40);
        assert_eq!(&bmp[14..], &dib[..]);
    }

    #[test]
    fn test_palettized_dib_offsets_past_palette() {
        let mut dib = info_header(8, 0, 0);
        dib.extend_from_slice(&vec![0u8; 256 * 4]); // implied full palette
        dib.extend_from_slice(&[0u8; 4]);
        let bmp = dib_to_bmp(&dib).unwrap();
        let offset = u32::from_le_bytes([bmp[10], bmp[11], bmp[12], bmp[13]]);
        assert_eq!(offset, 14 + 40 + 256 * 4);
    }

    #[test]
    fn test_bitfields_dib_offsets_past_masks() {
        let mut dib = info_header(32, BI_BITFIELDS, 0);
        dib.extend_from_slice(&[0u8; 12]); // channel masks
        dib.extend_from_slice(&[0u8; 4]);
        let bmp = dib_to_bmp(&dib).unwrap();
        let offset = u32::from_le_bytes([bmp[10], bmp[11], bmp[12], bmp[13]]);
        assert_eq!(offset, 14 + 40 + 12);
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        assert!(dib_to_bmp(&[0u8; 12]).is_err());
    }
}
