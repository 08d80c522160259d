//! Session Registry
//!
//! Owns every live participant and its rate-limit record.
//! Uses BTreeMap keyed by connection id; rosters are returned in join order.

use std::collections::BTreeMap;
use std::time::Instant;

use crate::presence::participant::{ConnectionId, Participant};

/// Per-connection throttle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RateRecord {
    /// When the last position update was accepted (None until the first).
    pub last_accepted: Option<Instant>,
}

#[derive(Debug)]
struct Entry {
    participant: Participant,
    rate: RateRecord,
    joined_seq: u64,
}

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Identity is already registered.
    #[error("connection {0} is already registered")]
    Duplicate(ConnectionId),
}

/// In-memory map from connection identity to participant state.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    entries: BTreeMap<ConnectionId, Entry>,
    next_seq: u64,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fully constructed participant with a fresh rate record.
    pub fn insert(&mut self, participant: Participant) -> Result<(), RegistryError> {
        let id = participant.id;
        if self.entries.contains_key(&id) {
            return Err(RegistryError::Duplicate(id));
        }

        let joined_seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(id, Entry {
            participant,
            rate: RateRecord::default(),
            joined_seq,
        });
        Ok(())
    }

    /// Look up a participant. Unknown ids yield `None`.
    pub fn get(&self, id: &ConnectionId) -> Option<&Participant> {
        self.entries.get(id).map(|e| &e.participant)
    }

    /// Check whether an identity is registered.
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.entries.contains_key(id)
    }

    /// Remove a participant and its rate record.
    /// Returns the removed participant; unknown ids are a no-op.
    pub fn remove(&mut self, id: &ConnectionId) -> Option<Participant> {
        self.entries.remove(id).map(|e| e.participant)
    }

    /// Every participant except `id`, in join order.
    pub fn all_except(&self, id: &ConnectionId) -> Vec<&Participant> {
        self.sorted()
            .into_iter()
            .filter(|e| e.participant.id != *id)
            .map(|e| &e.participant)
            .collect()
    }

    /// Every participant, in join order.
    pub fn all(&self) -> Vec<&Participant> {
        self.sorted().into_iter().map(|e| &e.participant).collect()
    }

    /// Identities of every participant except `id`, in join order.
    pub fn ids_except(&self, id: &ConnectionId) -> Vec<ConnectionId> {
        self.all_except(id).into_iter().map(|p| p.id).collect()
    }

    /// Get participant count.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no participants are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rate record for a connection.
    pub fn rate_record(&self, id: &ConnectionId) -> Option<RateRecord> {
        self.entries.get(id).map(|e| e.rate)
    }

    /// Mutable access for the rate/bounds guard.
    pub(crate) fn entry_mut(&mut self, id: &ConnectionId) -> Option<(&mut Participant, &mut RateRecord)> {
        self.entries
            .get_mut(id)
            .map(|e| (&mut e.participant, &mut e.rate))
    }

    fn sorted(&self) -> Vec<&Entry> {
        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_by_key(|e| e.joined_seq);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::participant::{AvatarKind, HslColor};

    fn participant(name: &str) -> Participant {
        Participant::new(
            ConnectionId::new_v4(),
            name.to_string(),
            HslColor::from_hue(0.0),
            AvatarKind::Alien,
        )
    }

    #[test]
    fn test_insert_get_remove() {
        let mut registry = SessionRegistry::new();
        let p = participant("CalmOwl1");
        let id = p.id;

        registry.insert(p.clone()).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&id), Some(&p));
        assert_eq!(registry.rate_record(&id), Some(RateRecord::default()));

        assert_eq!(registry.remove(&id), Some(p));
        assert!(registry.is_empty());
        assert!(registry.get(&id).is_none());
        assert!(registry.rate_record(&id).is_none());
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut registry = SessionRegistry::new();
        registry.insert(participant("BoldBear2")).unwrap();

        assert!(registry.remove(&ConnectionId::new_v4()).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_twice() {
        let mut registry = SessionRegistry::new();
        let p = participant("WildHawk3");
        let id = p.id;
        registry.insert(p).unwrap();

        assert!(registry.remove(&id).is_some());
        assert!(registry.remove(&id).is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = SessionRegistry::new();
        let p = participant("FreeLion4");
        registry.insert(p.clone()).unwrap();

        assert_eq!(registry.insert(p.clone()), Err(RegistryError::Duplicate(p.id)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_rosters_in_join_order() {
        let mut registry = SessionRegistry::new();
        let a = participant("A");
        let b = participant("B");
        let c = participant("C");
        for p in [&a, &b, &c] {
            registry.insert(p.clone()).unwrap();
        }

        let names: Vec<_> = registry.all().iter().map(|p| p.username.as_str()).collect();
        assert_eq!(names, ["A", "B", "C"]);

        let others: Vec<_> = registry.all_except(&b.id).iter().map(|p| p.username.as_str()).collect();
        assert_eq!(others, ["A", "C"]);
        assert_eq!(registry.ids_except(&a.id), vec![b.id, c.id]);
    }

    #[test]
    fn test_all_except_unknown_returns_everyone() {
        let mut registry = SessionRegistry::new();
        registry.insert(participant("A")).unwrap();
        registry.insert(participant("B")).unwrap();

        assert_eq!(registry.all_except(&ConnectionId::new_v4()).len(), 2);
    }
}
