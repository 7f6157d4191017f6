//! Handler for PackBits (Macintosh RLE) compressed data

use crate::error::{RasterError, RasterResult};
use crate::tiff::constants::compression;
use super::handler::CompressionHandler;

const MAX_RUN: usize = 128;

/// PackBits compression handler (compression code 32773)
pub struct PackBitsHandler;

impl CompressionHandler for PackBitsHandler {
    fn decompress(&self, data: &[u8]) -> RasterResult<Vec<u8>> {
        let mut output = Vec::with_capacity(data.len() * 2);
        let mut pos = 0;

        while pos < data.len() {
            let header = data[pos] as i8;
            pos += 1;

            match header {
                0..=127 => {
                    let count = header as usize + 1;
                    let literal = data.get(pos..pos + count).ok_or_else(|| {
                        RasterError::Generic(format!("PackBits literal run of {} overruns input at {}", count, pos))
                    })?;
                    output.extend_from_slice(literal);
                    pos += count;
                }
                -127..=-1 => {
                    let count = (1 - header as isize) as usize;
                    let value = *data.get(pos).ok_or_else(|| {
                        RasterError::Generic("PackBits repeat run missing its value byte".to_string())
                    })?;
                    output.resize(output.len() + count, value);
                    pos += 1;
                }
                // -128 is a no-op
                _ => {}
            }
        }

        Ok(output)
    }

    fn compress(&self, data: &[u8]) -> RasterResult<Vec<u8>> {
        let mut output = Vec::with_capacity(data.len() + data.len() / MAX_RUN + 1);
        let mut i = 0;

        while i < data.len() {
            let mut run = 1;
            while i + run < data.len() && run < MAX_RUN && data[i + run] == data[i] {
                run += 1;
            }

            if run >= 2 {
                output.push((1 - run as i16) as i8 as u8);
                output.push(data[i]);
                i += run;
                continue;
            }

            let start = i;
            let mut end = i;
            while end < data.len() && end - start < MAX_RUN {
                if end + 1 < data.len() && data[end] == data[end + 1] && end > start {
                    break;
                }
                end += 1;
            }

            output.push((end - start - 1) as u8);
            output.extend_from_slice(&data[start..end]);
            i = end;
        }

        Ok(output)
    }

    fn name(&self) -> &'static str {
        "PackBits"
    }

    fn code(&self) -> u16 {
        compression::PACKBITS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_reference_sample() {
        // Sample stream from the TIFF 6.0 specification, section 9
        let packed = [
            0xFE, 0xAA, 0x02, 0x80, 0x00, 0x2A, 0xFD, 0xAA, 0x03, 0x80, 0x00, 0x2A, 0x22, 0xF7, 0xAA,
        ];
        let expected = [
            0xAA, 0xAA, 0xAA, 0x80, 0x00, 0x2A, 0xAA, 0xAA, 0xAA, 0xAA, 0x80, 0x00, 0x2A, 0x22,
            0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
        ];
        assert_eq!(PackBitsHandler.decompress(&packed).unwrap(), expected);
    }

    #[test]
    fn test_compress_mixed_runs() {
        let mut data = vec![7u8; 300];
        data.extend_from_slice(&[1, 2, 3, 4, 4]);
        data.extend((0..200u32).map(|i| (i % 251) as u8));

        let packed = PackBitsHandler.compress(&data).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(PackBitsHandler.decompress(&packed).unwrap(), data);
    }

    #[test]
    fn test_truncated_literal_is_an_error() {
        assert!(PackBitsHandler.decompress(&[0x05, 0x01, 0x02]).is_err());
    }
}
