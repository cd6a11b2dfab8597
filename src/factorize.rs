//! Identity factorization: distinct cleaned identities to dense integer codes.
//!
//! Codes follow first appearance while walking events in order (sender, then
//! receiver, row by row). They are stable within a run only.

use indexmap::IndexSet;
use tracing::info;

use crate::config::IdentityLayout;
use crate::data::{CleanEvent, NamedEvent};
use crate::types::{Identity, UserCode};

/// Dense code -> identity lookup table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdentityTable {
    identities: IndexSet<Identity>,
}

impl IdentityTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the code of `identity`, assigning the next free code if unseen.
    pub fn intern(&mut self, identity: &str) -> UserCode {
        if let Some(idx) = self.identities.get_index_of(identity) {
            return idx as UserCode;
        }
        let (idx, _) = self.identities.insert_full(identity.to_string());
        idx as UserCode
    }

    /// Code previously assigned to `identity`.
    pub fn code(&self, identity: &str) -> Option<UserCode> {
        self.identities
            .get_index_of(identity)
            .map(|idx| idx as UserCode)
    }

    /// Identity behind `code`.
    pub fn identity(&self, code: UserCode) -> Option<&str> {
        self.identities
            .get_index(code as usize)
            .map(String::as_str)
    }

    /// Number of distinct identities.
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// True when no identity has been assigned.
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// `(code, identity)` pairs in code order.
    pub fn iter(&self) -> impl Iterator<Item = (UserCode, &str)> {
        self.identities
            .iter()
            .enumerate()
            .map(|(idx, identity)| (idx as UserCode, identity.as_str()))
    }
}

/// Lookup tables produced by one factorization pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdentityTables {
    /// Senders and receivers share one code space.
    Shared(IdentityTable),
    /// Sender codes and receiver codes index separate tables.
    Split {
        /// Decodes sender codes.
        senders: IdentityTable,
        /// Decodes receiver codes.
        receivers: IdentityTable,
    },
}

impl IdentityTables {
    /// Table that resolves sender codes.
    pub fn senders(&self) -> &IdentityTable {
        match self {
            IdentityTables::Shared(table) => table,
            IdentityTables::Split { senders, .. } => senders,
        }
    }

    /// Table that resolves receiver codes.
    pub fn receivers(&self) -> &IdentityTable {
        match self {
            IdentityTables::Shared(table) => table,
            IdentityTables::Split { receivers, .. } => receivers,
        }
    }
}

/// Coded events plus the tables needed to decode them.
#[derive(Clone, Debug)]
pub struct Factorized {
    /// Coded events in input order.
    pub events: Vec<CleanEvent>,
    /// Tables that decode the codes in `events`.
    pub tables: IdentityTables,
}

/// Replace identity strings with dense codes.
///
/// Event order is preserved; call [`sort_events`] for the clean-artifact order.
pub fn factorize(events: &[NamedEvent], layout: IdentityLayout) -> Factorized {
    let mut senders = IdentityTable::new();
    let mut receivers = IdentityTable::new();
    let coded: Vec<CleanEvent> = events
        .iter()
        .map(|event| {
            let sender = senders.intern(&event.sender);
            let receiver = match layout {
                IdentityLayout::Shared => senders.intern(&event.receiver),
                IdentityLayout::Split => receivers.intern(&event.receiver),
            };
            CleanEvent {
                sender,
                receiver,
                submit: event.submit,
            }
        })
        .collect();

    let tables = match layout {
        IdentityLayout::Shared => {
            info!("[metaclean:factorize] users: {}", senders.len());
            IdentityTables::Shared(senders)
        }
        IdentityLayout::Split => {
            info!(
                "[metaclean:factorize] senders: {}, receivers: {}",
                senders.len(),
                receivers.len()
            );
            IdentityTables::Split { senders, receivers }
        }
    };
    Factorized {
        events: coded,
        tables,
    }
}

/// Stable sort by `(submit, sender, receiver)`.
pub fn sort_events(events: &mut [CleanEvent]) {
    events.sort_by_key(|event| (event.submit, event.sender, event.receiver));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(sender: &str, receiver: &str, submit: i64) -> NamedEvent {
        NamedEvent {
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            submit,
        }
    }

    #[test]
    fn shared_codes_follow_first_appearance() {
        let events = vec![named("a", "b", 5), named("c", "a", 6), named("b", "d", 7)];
        let factorized = factorize(&events, IdentityLayout::Shared);
        let IdentityTables::Shared(table) = &factorized.tables else {
            panic!("expected shared tables");
        };
        let order: Vec<&str> = table.iter().map(|(_, identity)| identity).collect();
        assert_eq!(order, vec!["a", "b", "c", "d"]);
        assert_eq!(
            factorized.events,
            vec![
                CleanEvent {
                    sender: 0,
                    receiver: 1,
                    submit: 5
                },
                CleanEvent {
                    sender: 2,
                    receiver: 0,
                    submit: 6
                },
                CleanEvent {
                    sender: 1,
                    receiver: 3,
                    submit: 7
                },
            ]
        );
    }

    #[test]
    fn codes_round_trip_and_are_dense() {
        let events = vec![named("x", "y", 1), named("y", "z", 2), named("x", "z", 3)];
        let factorized = factorize(&events, IdentityLayout::Shared);
        let table = factorized.tables.senders();
        for (event, original) in factorized.events.iter().zip(&events) {
            assert_eq!(table.identity(event.sender), Some(original.sender.as_str()));
            assert_eq!(
                table.identity(event.receiver),
                Some(original.receiver.as_str())
            );
        }
        let codes: Vec<UserCode> = table.iter().map(|(code, _)| code).collect();
        assert_eq!(codes, (0..table.len() as UserCode).collect::<Vec<_>>());
    }

    #[test]
    fn split_layout_numbers_each_side_independently() {
        let events = vec![named("a", "a", 1), named("b", "c", 2), named("a", "c", 3)];
        let factorized = factorize(&events, IdentityLayout::Split);
        assert_eq!(factorized.tables.senders().len(), 2);
        assert_eq!(factorized.tables.receivers().len(), 2);
        assert_eq!(factorized.tables.receivers().identity(1), Some("c"));
        assert_eq!(factorized.events[1].receiver, 1);
        assert_eq!(factorized.events[2].sender, 0);
    }

    #[test]
    fn sort_orders_by_time_then_codes() {
        let mut events = vec![
            CleanEvent {
                sender: 2,
                receiver: 0,
                submit: 10,
            },
            CleanEvent {
                sender: 1,
                receiver: 3,
                submit: 10,
            },
            CleanEvent {
                sender: 1,
                receiver: 2,
                submit: 10,
            },
            CleanEvent {
                sender: 0,
                receiver: 1,
                submit: 5,
            },
        ];
        sort_events(&mut events);
        let keys: Vec<_> = events
            .iter()
            .map(|e| (e.submit, e.sender, e.receiver))
            .collect();
        assert_eq!(keys, vec![(5, 0, 1), (10, 1, 2), (10, 1, 3), (10, 2, 0)]);
    }

    #[test]
    fn intern_is_idempotent() {
        let mut table = IdentityTable::new();
        assert!(table.is_empty());
        assert_eq!(table.intern("a"), 0);
        assert_eq!(table.intern("b"), 1);
        assert_eq!(table.intern("a"), 0);
        assert_eq!(table.code("b"), Some(1));
        assert_eq!(table.code("z"), None);
        assert_eq!(table.identity(9), None);
    }
}
