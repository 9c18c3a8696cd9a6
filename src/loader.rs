use std::{fs::File, io::Read, path::Path};

use tracing::{info, warn};

use crate::constants::{LOADER_STACK_RESERVE, LOADER_WINDOW_SIZE};
use crate::error::{BootError, BootResult};

/// Second-stage loader binary, read once and handed to
/// [`BootClient::enter_boot`](crate::BootClient::enter_boot).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderImage {
    bytes: Vec<u8>,
}

impl LoaderImage {
    /// Wrap raw loader bytes; fails if they do not fit the SRAM window
    pub fn from_bytes(bytes: Vec<u8>) -> BootResult<Self> {
        check_loader_size(bytes.len())?;
        Ok(LoaderImage { bytes })
    }

    /// Read a raw loader binary from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> BootResult<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| {
            BootError::LoaderError(format!("Failed to open {}: {}", path.display(), e))
        })?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(|e| {
            BootError::LoaderError(format!("Could not read {}: {}", path.display(), e))
        })?;

        info!("{}: {} bytes", path.display(), bytes.len());
        Self::from_bytes(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

pub(crate) fn check_loader_size(len: usize) -> BootResult<()> {
    if len > LOADER_WINDOW_SIZE {
        return Err(BootError::LoaderError(format!(
            "Loader too large: {} bytes (limit {} bytes)",
            len, LOADER_WINDOW_SIZE
        )));
    }
    if len > LOADER_WINDOW_SIZE - LOADER_STACK_RESERVE {
        warn!("Loader is {} bytes; its stack might clobber code", len);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_full_window() {
        let image = LoaderImage::from_bytes(vec![0xaa; LOADER_WINDOW_SIZE]).unwrap();
        assert_eq!(image.len(), LOADER_WINDOW_SIZE);
    }

    #[test]
    fn accepts_empty_image() {
        let image = LoaderImage::from_bytes(Vec::new()).unwrap();
        assert!(image.is_empty());
    }

    #[test]
    fn rejects_oversized_image() {
        let err = LoaderImage::from_bytes(vec![0; LOADER_WINDOW_SIZE + 1]).unwrap_err();
        assert!(matches!(err, BootError::LoaderError(_)));
    }

    #[test]
    fn reads_image_from_disk() {
        let path = std::env::temp_dir().join(format!("epboot-loader-{}.bin", std::process::id()));
        std::fs::write(&path, [1u8, 2, 3, 4, 5]).unwrap();

        let image = LoaderImage::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(image.as_bytes(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn missing_file_is_a_loader_error() {
        let err = LoaderImage::from_file("/nonexistent/epboot/loader.bin").unwrap_err();
        assert!(matches!(err, BootError::LoaderError(_)));
    }
}
