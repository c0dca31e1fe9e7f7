use std::{fmt::Debug, path::Path};

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use url::Url;

use super::{CloudStorage, FetchError, RemoteFile};
use crate::fs_toml_util::read_toml;

const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files/";

/// Content of the drive credentials file.
#[derive(Debug, Deserialize)]
pub struct DriveCredentials {
    pub access_token: AccessToken,
}

/// OAuth bearer token with the `drive.readonly` scope.
#[derive(Deserialize)]
pub struct AccessToken(String);
impl Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// Google Drive v3 REST client.
pub struct GoogleDrive {
    client: reqwest::Client,
    access_token: AccessToken,
    files_url: Url,
}

#[derive(Deserialize)]
struct FileList {
    files: Vec<RemoteFile>,
}

impl GoogleDrive {
    pub const DEFAULT_CREDENTIALS_PATH: &'static str = "credentials/drive.toml";

    pub fn new(credentials: DriveCredentials) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            access_token: credentials.access_token,
            files_url: Url::parse(FILES_URL)?,
        })
    }

    pub fn load(credentials_path: &Path) -> anyhow::Result<Self> {
        Self::new(read_toml(credentials_path)?)
    }
}

/// Drive search expression matching a non-trashed file by exact name.
fn name_query(name: &str) -> String {
    let escaped = name.replace('\\', r"\\").replace('\'', r"\'");
    format!("name = '{escaped}' and trashed = false")
}

#[async_trait]
impl CloudStorage for GoogleDrive {
    async fn find_by_name(&self, name: &str) -> Result<Vec<RemoteFile>, FetchError> {
        let query = name_query(name);
        debug!("Searching Google Drive with q={query:?}");
        let list: FileList = self
            .client
            .get(self.files_url.clone())
            .bearer_auth(&self.access_token.0)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id,name)"),
                ("spaces", "drive"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(list.files)
    }

    async fn download(&self, file: &RemoteFile, destination: &Path) -> Result<(), FetchError> {
        let url = self.files_url.join(&file.id)?;
        let bytes = self
            .client
            .get(url)
            .bearer_auth(&self.access_token.0)
            .query(&[("alt", "media")])
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        debug!("Downloaded {} bytes of {:?}", bytes.len(), file.name);
        fs_err::write(destination, &bytes)?;
        Ok(())
    }
}
