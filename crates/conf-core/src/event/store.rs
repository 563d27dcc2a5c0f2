use chrono::Utc;
use std::collections::HashMap;
use uuid::Uuid;

use super::{PromotionEvent, PromotionEventKind};

/// Almacenamiento de eventos append-only.
pub trait EventStore {
    /// Agrega un evento a partir de su kind y devuelve el evento completo (con seq y ts).
    fn append_kind(&mut self, session_id: Uuid, kind: PromotionEventKind) -> PromotionEvent;
    /// Lista eventos de una sesión (orden ascendente por seq).
    fn list(&self, session_id: Uuid) -> Vec<PromotionEvent>;
}

#[derive(Default)]
pub struct InMemoryEventStore {
    pub inner: HashMap<Uuid, Vec<PromotionEvent>>,
}

impl EventStore for InMemoryEventStore {
    fn append_kind(&mut self, session_id: Uuid, kind: PromotionEventKind) -> PromotionEvent {
        let vec = self.inner.entry(session_id).or_default();
        let seq = vec.len() as u64;
        let ev = PromotionEvent { seq, session_id, kind, ts: Utc::now() };
        vec.push(ev.clone());
        ev
    }
    fn list(&self, session_id: Uuid) -> Vec<PromotionEvent> { self.inner.get(&session_id).cloned().unwrap_or_default() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conf_domain::Environment;

    #[test]
    fn seq_is_contiguous_per_session() {
        let mut store = InMemoryEventStore::default();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        store.append_kind(a, PromotionEventKind::Confirmed { environment: Environment::Prod });
        store.append_kind(b, PromotionEventKind::Confirmed { environment: Environment::Stage });
        store.append_kind(a, PromotionEventKind::PromotionSkipped { environment: Environment::Stage });
        let seqs: Vec<u64> = store.list(a).iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![0, 1]);
        assert_eq!(store.list(b).len(), 1);
        assert!(store.list(Uuid::new_v4()).is_empty());
    }
}
