//! Archivo de auditoría de intentos de cambio.
//!
//! Cada intento confirmado deja exactamente un `AuditRecord` serializado como
//! JSON en `{bucket}/{uid}.json`. El logger no decide cuándo auditar: eso lo
//! hace el workflow; aquí sólo se construye y sube el registro.

use chrono::Utc;
use conf_domain::{AuditRecord, ConfigMap, Environment, ProbeResult};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::errors::WorkflowError;

/// Cliente opaco de almacenamiento de objetos.
pub trait BlobStore {
    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), WorkflowError>;
}

impl<T: BlobStore + ?Sized> BlobStore for Box<T> {
    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), WorkflowError> {
        (**self).put(bucket, key, body)
    }
}

/// Blob store en memoria; los clones comparten contenido.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBlobStore {
    blobs: Arc<Mutex<BTreeMap<(String, String), Vec<u8>>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.blobs
            .lock()
            .map(|b| b.keys().filter(|(bk, _)| bk == bucket).map(|(_, k)| k.clone()).collect())
            .unwrap_or_default()
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.blobs.lock().ok()?.get(&(bucket.to_string(), key.to_string())).cloned()
    }

    /// Decodifica todos los registros de auditoría de un bucket.
    pub fn audit_records(&self, bucket: &str) -> Vec<AuditRecord> {
        self.keys(bucket)
            .iter()
            .filter_map(|k| self.get(bucket, k))
            .filter_map(|body| serde_json::from_slice(&body).ok())
            .collect()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), WorkflowError> {
        let mut blobs = self.blobs
                            .lock()
                            .map_err(|_| WorkflowError::Audit("in-memory blob store poisoned".into()))?;
        blobs.insert((bucket.to_string(), key.to_string()), body.to_vec());
        Ok(())
    }
}

pub struct AuditLogger {
    blob_store: Box<dyn BlobStore>,
    bucket: String,
}

impl AuditLogger {
    pub fn new(blob_store: Box<dyn BlobStore>, bucket: &str) -> Self {
        Self { blob_store,
               bucket: bucket.to_string() }
    }

    /// Construye y sube el registro. `probe_result` puede faltar si el probe
    /// no llegó a correr.
    pub fn record(&self,
                  environment: Environment,
                  entries: &ConfigMap,
                  schema_valid: bool,
                  probe_result: Option<&ProbeResult>)
                  -> Result<AuditRecord, WorkflowError> {
        self.upload(AuditRecord { uid: Uuid::new_v4(),
                                  environment,
                                  entries: entries.clone(),
                                  schema_valid,
                                  probe_result: probe_result.cloned(),
                                  failure: None,
                                  recorded_at: Utc::now() })
    }

    /// Variante para intentos cortados por un error fatal.
    pub fn record_failure(&self,
                          environment: Environment,
                          entries: &ConfigMap,
                          schema_valid: bool,
                          probe_result: Option<&ProbeResult>,
                          failure: &WorkflowError)
                          -> Result<AuditRecord, WorkflowError> {
        self.upload(AuditRecord { uid: Uuid::new_v4(),
                                  environment,
                                  entries: entries.clone(),
                                  schema_valid,
                                  probe_result: probe_result.cloned(),
                                  failure: Some(failure.to_string()),
                                  recorded_at: Utc::now() })
    }

    fn upload(&self, record: AuditRecord) -> Result<AuditRecord, WorkflowError> {
        let body = serde_json::to_vec_pretty(&record).map_err(|e| WorkflowError::Audit(format!("serialize: {e}")))?;
        let key = record.blob_key();
        self.blob_store.put(&self.bucket, &key, &body)?;
        log::info!("audit:logged bucket={} key={key}", self.bucket);
        Ok(record)
    }
}
