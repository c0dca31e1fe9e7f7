use std::{
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use fs_err::File;
use log::info;
use zip::{result::ZipError, ZipArchive};

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("{path:?} is not a zip file")]
    InvalidArchive {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
    #[error("Failed to extract {path:?} into {destination:?}")]
    Extract {
        path: PathBuf,
        destination: PathBuf,
        #[source]
        source: ZipError,
    },
    #[error("An I/O error occurred while handling the archive: {0}")]
    Io(#[from] io::Error),
}

/// Extracts every entry of the zip file at `path` into `destination`,
/// creating the directory if needed.  Returns the number of entries.
///
/// The archive is validated before anything is written, so an invalid file
/// leaves `destination` untouched.
pub fn extract_archive(path: &Path, destination: &Path) -> Result<usize, ArchiveError> {
    let reader = BufReader::new(File::open(path)?);
    let mut archive = ZipArchive::new(reader).map_err(|source| match source {
        ZipError::Io(e) => ArchiveError::Io(e),
        source => ArchiveError::InvalidArchive {
            path: path.to_owned(),
            source,
        },
    })?;

    fs_err::create_dir_all(destination)?;
    archive
        .extract(destination)
        .map_err(|source| ArchiveError::Extract {
            path: path.to_owned(),
            destination: destination.to_owned(),
            source,
        })?;
    info!(
        "Extracted {} entries from {path:?} into {destination:?}",
        archive.len()
    );
    Ok(archive.len())
}
