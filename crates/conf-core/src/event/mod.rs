//! Definiciones de eventos de promoción y trait EventStore.

mod store;
mod types;

pub use store::{EventStore, InMemoryEventStore};
pub use types::{PromotionEvent, PromotionEventKind};
