//! `BlobStore`s reales para el archivo de auditoría.

use conf_core::{BlobStore, WorkflowError};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

use crate::error::AdapterError;

/// Guarda cada blob en `{root}/{bucket}/{key}`.
///
/// Se escribe a un temporal en el mismo directorio y se renombra, así un
/// lector nunca ve un blob a medias y no quedan archivos sueltos si falla.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }

    fn write(&self, bucket: &str, key: &str, body: &[u8]) -> Result<PathBuf, AdapterError> {
        if key.contains(['/', '\\']) || key.starts_with('.') || bucket.contains(['/', '\\']) {
            return Err(AdapterError::Config(format!("invalid blob location '{bucket}/{key}'")));
        }
        let dir = self.root.join(bucket);
        std::fs::create_dir_all(&dir)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(body)?;
        tmp.as_file().sync_all()?;
        let target = dir.join(key);
        tmp.persist(&target).map_err(|e| AdapterError::Io(e.error))?;
        Ok(target)
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), WorkflowError> {
        let target = self.write(bucket, key, body)
                         .map_err(|e| WorkflowError::Audit(e.to_string()))?;
        log::debug!("blob:fs stored path={}", target.display());
        Ok(())
    }
}

/// `PUT {endpoint}/{bucket}/{key}` con el cuerpo JSON.
pub struct HttpBlobStore {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpBlobStore {
    pub fn new(client: reqwest::blocking::Client, endpoint: &str) -> Self {
        Self { client,
               endpoint: endpoint.trim_end_matches('/').to_string() }
    }

    fn upload(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), AdapterError> {
        let url = format!("{}/{bucket}/{key}", self.endpoint);
        let response = self.client
                           .put(&url)
                           .header(reqwest::header::CONTENT_TYPE, "application/json")
                           .body(body.to_vec())
                           .send()?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AdapterError::Status { status: status.as_u16(), url })
        }
    }
}

impl BlobStore for HttpBlobStore {
    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), WorkflowError> {
        self.upload(bucket, key, body)
            .map_err(|e| WorkflowError::Audit(e.to_string()))
    }
}
