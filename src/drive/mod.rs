use std::{io, path::Path};

use async_trait::async_trait;
use log::{info, warn};
use serde::Deserialize;

use crate::archive::{self, ArchiveError};

pub mod google;

pub use google::GoogleDrive;

#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
}

/// A cloud storage account that archives can be downloaded from.
#[async_trait]
pub trait CloudStorage: Send + Sync {
    /// Files whose name is exactly `name`.
    async fn find_by_name(&self, name: &str) -> Result<Vec<RemoteFile>, FetchError>;
    /// Writes the content of `file` to `destination`, replacing whatever is there.
    async fn download(&self, file: &RemoteFile, destination: &Path) -> Result<(), FetchError>;
}

/// Stand-in used when no real client could be set up.  Every operation fails
/// with [`FetchError::MissingCollaborator`].
#[derive(Debug)]
pub struct UnavailableStorage {
    reason: String,
}
impl UnavailableStorage {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl CloudStorage for UnavailableStorage {
    async fn find_by_name(&self, _name: &str) -> Result<Vec<RemoteFile>, FetchError> {
        Err(FetchError::MissingCollaborator(self.reason.clone()))
    }
    async fn download(&self, _file: &RemoteFile, _destination: &Path) -> Result<(), FetchError> {
        Err(FetchError::MissingCollaborator(self.reason.clone()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Google Drive support not available: {0}")]
    MissingCollaborator(String),
    #[error("No file named {0} found in Google Drive")]
    FileNotFoundRemote(String),
    #[error("{0} is not a zip file")]
    InvalidArchive(String),
    #[error("Failed to extract the downloaded archive")]
    Archive(#[source] ArchiveError),
    #[error("Request to the storage service failed")]
    Transport(#[from] reqwest::Error),
    #[error("Invalid storage url")]
    Url(#[from] url::ParseError),
    #[error("An I/O error occurred while fetching the archive: {0}")]
    Io(#[from] io::Error),
}
impl FetchError {
    /// Whether this is an expected outcome to show to the user rather than a failure.
    pub fn is_reportable(&self) -> bool {
        matches!(
            self,
            Self::MissingCollaborator(_) | Self::FileNotFoundRemote(_) | Self::InvalidArchive(_)
        )
    }
}

/// Uses Google Drive if the credentials at `credentials_path` can be loaded,
/// and [`UnavailableStorage`] otherwise.
pub fn connect(credentials_path: &Path) -> Box<dyn CloudStorage> {
    match GoogleDrive::load(credentials_path) {
        Ok(drive) => Box::new(drive),
        Err(e) => {
            warn!("Could not set up the Google Drive client: {e:#}");
            Box::new(UnavailableStorage::new(format!(
                "put an OAuth access token in {credentials_path:?} as `access_token = \"...\"` to enable it"
            )))
        }
    }
}

/// Downloads the archive called `name` and extracts it into `destination`.
/// Returns the number of extracted entries.
pub async fn fetch_from_cloud(
    storage: &dyn CloudStorage,
    name: &str,
    destination: &Path,
) -> Result<usize, FetchError> {
    fetch_from_cloud_via(storage, name, destination, &std::env::temp_dir()).await
}

/// Same as [`fetch_from_cloud`], with the temporary download placed in `scratch_dir`.
/// The download is removed whether or not the extraction succeeds.
pub async fn fetch_from_cloud_via(
    storage: &dyn CloudStorage,
    name: &str,
    destination: &Path,
    scratch_dir: &Path,
) -> Result<usize, FetchError> {
    let files = storage.find_by_name(name).await?;
    if files.len() > 1 {
        warn!(
            "{} files are named {name:?}; using the first one ({})",
            files.len(),
            files[0].id
        );
    }
    let file = files
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::FileNotFoundRemote(name.to_owned()))?;

    let download = tempfile::Builder::new()
        .prefix("drive-download-")
        .suffix(".zip")
        .tempfile_in(scratch_dir)?;
    info!("Downloading {:?} (id {}) to {:?}", file.name, file.id, download.path());
    storage.download(&file, download.path()).await?;

    let extracted =
        archive::extract_archive(download.path(), destination).map_err(|e| match e {
            ArchiveError::InvalidArchive { .. } => FetchError::InvalidArchive(name.to_owned()),
            e => FetchError::Archive(e),
        })?;
    download.close()?;
    Ok(extracted)
}
