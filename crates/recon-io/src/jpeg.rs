use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
    path::Path,
};

use crate::error::DatasetError;

const SOI_MARKER: [u8; 2] = [0xFF, 0xD8];
const APP0_MARKER: [u8; 2] = [0xFF, 0xE0];
const JFIF_IDENTIFIER: &[u8; 5] = b"JFIF\0";

// offset of the APP0 length field, right after the SOI and APP0 markers
const APP0_LENGTH_OFFSET: u64 = 4;

/// Error types for the JPEG header reader.
#[derive(Debug, thiserror::Error)]
pub enum JpegHeaderError {
    /// Error reading the image
    #[error("Failed to read the image. {0}")]
    Io(#[from] std::io::Error),

    /// The data does not start with the JPEG start of image marker
    #[error("Missing JPEG start of image marker")]
    NotJpeg,

    /// The first segment is not a JFIF application segment
    #[error("Missing JFIF application segment")]
    MissingJfifMarker,

    /// A segment does not start with a marker byte
    #[error("Invalid segment marker 0x{byte:02X} at offset {offset}")]
    InvalidMarker {
        /// Offset of the segment.
        offset: u64,
        /// The byte found instead of `0xFF`.
        byte: u8,
    },

    /// The image data starts before any frame header
    #[error("No frame header before the image data")]
    MissingFrameHeader,

    /// The data ends before the frame header
    #[error("Unexpected end of data")]
    Truncated,
}

/// Size of an image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Read the size of a JFIF image from its header without decoding the image.
///
/// # Arguments
///
/// * `file_path` - The path to the JPEG image.
///
/// # Returns
///
/// The width and height stored in the frame header.
pub fn read_jpeg_size(file_path: impl AsRef<Path>) -> Result<ImageSize, DatasetError> {
    let file_path = file_path.as_ref();
    if !file_path.is_file() {
        return Err(DatasetError::FileDoesNotExist(file_path.to_path_buf()));
    }

    let mut reader = BufReader::new(File::open(file_path)?);
    decode_jpeg_size(&mut reader).map_err(|source| DatasetError::JpegHeader {
        path: file_path.to_path_buf(),
        source,
    })
}

/// Decode the size of a JFIF image by walking its segments.
///
/// Checks the start of image marker and the `JFIF` application segment, then skips
/// segments by their declared length until a baseline, extended or progressive
/// start of frame segment is found.
///
/// # Arguments
///
/// * `reader` - The JPEG data, positioned at its first byte.
pub fn decode_jpeg_size<R: Read + Seek>(reader: &mut R) -> Result<ImageSize, JpegHeaderError> {
    let mut markers = [0u8; 4];
    read_bytes(reader, &mut markers)?;
    if markers[..2] != SOI_MARKER {
        return Err(JpegHeaderError::NotJpeg);
    }
    if markers[2..] != APP0_MARKER {
        return Err(JpegHeaderError::MissingJfifMarker);
    }

    // APP0 length followed by the identifier
    let mut app0 = [0u8; 7];
    read_bytes(reader, &mut app0)?;
    if &app0[2..] != JFIF_IDENTIFIER {
        return Err(JpegHeaderError::MissingJfifMarker);
    }

    let mut offset = APP0_LENGTH_OFFSET + u64::from(u16::from_be_bytes([app0[0], app0[1]]));
    loop {
        reader.seek(SeekFrom::Start(offset))?;

        // marker and segment length
        let mut segment = [0u8; 4];
        read_bytes(reader, &mut segment)?;
        if segment[0] != 0xFF {
            return Err(JpegHeaderError::InvalidMarker {
                offset,
                byte: segment[0],
            });
        }

        match segment[1] {
            // start of frame: precision, height, width
            0xC0..=0xC2 => {
                let mut frame = [0u8; 5];
                read_bytes(reader, &mut frame)?;
                return Ok(ImageSize {
                    height: u32::from(u16::from_be_bytes([frame[1], frame[2]])),
                    width: u32::from(u16::from_be_bytes([frame[3], frame[4]])),
                });
            }
            // start of scan or end of image
            0xDA | 0xD9 => return Err(JpegHeaderError::MissingFrameHeader),
            _ => {
                let length = u16::from_be_bytes([segment[2], segment[3]]);
                offset += 2 + u64::from(length);
            }
        }
    }
}

fn read_bytes<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), JpegHeaderError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => JpegHeaderError::Truncated,
        _ => JpegHeaderError::Io(e),
    })
}

/// Build the header of a JFIF image with a quantization table and a baseline frame.
#[cfg(test)]
pub(crate) fn jfif_header_bytes(width: u16, height: u16) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    data.extend_from_slice(JFIF_IDENTIFIER);
    data.extend_from_slice(&[0x01, 0x01, 0x00, 0x00, 0x48, 0x00, 0x48, 0x00, 0x00]);
    // quantization table segment with a 2 byte payload
    data.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x04, 0x00, 0x01]);
    // baseline frame, 8 bit precision
    data.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08]);
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&[0x03, 0x01, 0x22, 0x00, 0x02, 0x11, 0x01, 0x03, 0x11, 0x01]);
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}
