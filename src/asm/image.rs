//! ROM image files.
//!
//! Images are raw binary: byte `n` is the opcode at program address `n`.
//! [`load_program`] also accepts assembly (`.asm`) and listing (`.lst`)
//! sources and builds the image from them.

use crate::asm::assembler::{assemble, AssemblerError};
use crate::asm::listing::{parse_listing, ListingError, LISTING_IMAGE_SIZE};
use crate::cpu::memory::ROM_SIZES;
use std::path::Path;
use thiserror::Error;

/// Load a raw binary ROM image, checking its size.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, ImageError> {
    let bytes = std::fs::read(path.as_ref())
        .map_err(|e| ImageError::IoError(e.to_string()))?;
    check_size(&bytes)?;
    Ok(bytes)
}

/// Save a raw binary ROM image.
pub fn save_image<P: AsRef<Path>>(path: P, image: &[u8]) -> Result<(), ImageError> {
    check_size(image)?;
    std::fs::write(path.as_ref(), image)
        .map_err(|e| ImageError::IoError(e.to_string()))
}

/// Load a program from an image, assembly source or listing.
///
/// The kind is chosen by extension: `.asm` is assembled into a 1024-byte
/// image, `.lst`/`.txt` is read as a listing, anything else is binary.
pub fn load_program<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, ImageError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("asm") => {
            let source = read_text(path)?;
            Ok(assemble(&source, LISTING_IMAGE_SIZE)?.image)
        }
        Some("lst") | Some("txt") => {
            let source = read_text(path)?;
            Ok(parse_listing(&source)?)
        }
        _ => load_image(path),
    }
}

fn read_text(path: &Path) -> Result<String, ImageError> {
    std::fs::read_to_string(path).map_err(|e| ImageError::IoError(e.to_string()))
}

fn check_size(image: &[u8]) -> Result<(), ImageError> {
    if !ROM_SIZES.contains(&image.len()) {
        return Err(ImageError::BadSize(image.len()));
    }
    Ok(())
}

/// Errors that can occur during image operations.
#[derive(Debug, Clone, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("ROM image of {0} bytes (expected 512, 768 or 1024)")]
    BadSize(usize),

    #[error(transparent)]
    Assembler(#[from] AssemblerError),

    #[error(transparent)]
    Listing(#[from] ListingError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("cic-emu-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_image_roundtrip() {
        let path = temp_path("roundtrip.bin");
        let mut image = vec![0u8; 768];
        image[0x40] = 0x3C;
        save_image(&path, &image).unwrap();
        assert_eq!(load_image(&path).unwrap(), image);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_bad_size_rejected() {
        let path = temp_path("short.bin");
        assert!(matches!(save_image(&path, &[0; 10]), Err(ImageError::BadSize(10))));

        std::fs::write(&path, [0u8; 100]).unwrap();
        assert!(matches!(load_image(&path), Err(ImageError::BadSize(100))));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_program_by_extension() {
        let asm = temp_path("prog.asm");
        std::fs::write(&asm, "LAI 3\nADI 1\n").unwrap();
        let image = load_program(&asm).unwrap();
        assert_eq!(image.len(), LISTING_IMAGE_SIZE);
        assert_eq!(image[0x00], 0x33);
        assert_eq!(image[0x40], 0x01);
        std::fs::remove_file(&asm).ok();

        let lst = temp_path("prog.lst");
        std::fs::write(&lst, "000: 3A\n").unwrap();
        assert_eq!(load_program(&lst).unwrap()[0], 0x3A);
        std::fs::remove_file(&lst).ok();

        let bad = temp_path("bad.asm");
        std::fs::write(&bad, "FOO 1\n").unwrap();
        assert!(matches!(load_program(&bad), Err(ImageError::Assembler(_))));
        std::fs::remove_file(&bad).ok();
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_image(temp_path("does-not-exist.bin")),
            Err(ImageError::IoError(_))
        ));
    }
}
