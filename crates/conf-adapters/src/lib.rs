//! conf-adapters: colaboradores externos del workflow sobre HTTP y
//! filesystem.
//!
//! - `refresh`: `HttpRefreshNotifier` (`GET /config-refresh`, N veces).
//! - `predict`: `HttpPredictionClient` (`POST /predict`).
//! - `blob`: `FsBlobStore` y `HttpBlobStore` para el archivo de auditoría.
//! - `config`: mapa entorno → URL base (`EndpointConfig`).
//!
//! Todos los clientes son blocking: el workflow es síncrono y de un solo
//! operador.

pub mod blob;
pub mod config;
pub mod error;
pub mod predict;
pub mod refresh;

pub use blob::{FsBlobStore, HttpBlobStore};
pub use config::EndpointConfig;
pub use error::AdapterError;
pub use predict::HttpPredictionClient;
pub use refresh::HttpRefreshNotifier;
