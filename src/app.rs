//! View-side catalog state
//!
//! Holds the rendered catalog and per-entry feedback, applies worker
//! events, and turns user actions into runtime commands. All mutating
//! actions are wallet-gated here: no wallet, no command.

use std::collections::BTreeMap;
use std::sync::Arc;

use alloy::primitives::U256;

use crate::core::feedback::FeedbackBoard;
use crate::core::session::WalletSession;
use crate::domain::market::{IntentKind, OperationIntent, Record};
use crate::infrastructure::runtime::{NoticeLevel, RuntimeCommand, RuntimeEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warn,
    Error,
}

/// What the user asked to do to one catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogAction {
    Buy,
    ToggleRead,
    Remove,
}

pub struct App {
    pub endpoint: String,
    pub node_kind: String,
    pub count: u64,
    pub records: BTreeMap<u64, Record>,
    pub feedback: FeedbackBoard,
    pub status: Option<(String, StatusLevel)>,
    wallet: Arc<dyn WalletSession>,
}

impl App {
    pub fn new(wallet: Arc<dyn WalletSession>) -> Self {
        Self {
            endpoint: String::new(),
            node_kind: "connecting".to_string(),
            count: 0,
            records: BTreeMap::new(),
            feedback: FeedbackBoard::new(),
            status: None,
            wallet,
        }
    }

    pub fn set_status(&mut self, text: impl Into<String>, level: StatusLevel) {
        self.status = Some((text.into(), level));
    }

    /// Apply one worker event to the view state.
    pub fn apply_event(&mut self, event: RuntimeEvent) {
        match event {
            RuntimeEvent::Connected {
                endpoint,
                node_kind,
                ..
            } => {
                self.endpoint = endpoint;
                self.node_kind = node_kind.clone();
                self.set_status(format!("Connected ({node_kind})"), StatusLevel::Info);
            }
            RuntimeEvent::CatalogCount { count } => {
                self.count = count;
                // Entries past the new end no longer exist.
                self.records.retain(|index, _| *index < count);
            }
            RuntimeEvent::RecordReady { index, record } => match record {
                Some(record) => {
                    self.records.insert(index, record);
                }
                None => {
                    self.records.remove(&index);
                }
            },
            RuntimeEvent::OperationPhase { index, label } => {
                self.feedback.set_phase(index, label);
            }
            RuntimeEvent::OperationSucceeded { index, message } => {
                self.feedback.succeed(index, message);
            }
            RuntimeEvent::OperationFailed { index, message } => {
                self.feedback.fail(index, message);
            }
            RuntimeEvent::ListingSettled { message, ok } => {
                let level = if ok { StatusLevel::Info } else { StatusLevel::Error };
                self.set_status(message, level);
            }
            RuntimeEvent::Notice { message, level } => {
                let level = match level {
                    NoticeLevel::Info => StatusLevel::Info,
                    NoticeLevel::Warn => StatusLevel::Warn,
                    NoticeLevel::Error => StatusLevel::Error,
                };
                self.set_status(message, level);
            }
        }
    }

    /// Loaded entries in index order.
    pub fn catalog(&self) -> impl Iterator<Item = (u64, &Record)> {
        self.records.iter().map(|(index, record)| (*index, record))
    }

    /// True once every entry in `[0, count)` has a loaded record.
    pub fn catalog_complete(&self) -> bool {
        (0..self.count).all(|index| self.records.contains_key(&index))
    }

    /// Turn a user action into a runtime command.
    ///
    /// With no wallet address available this prompts the connect flow and
    /// yields nothing: the action is aborted before any transaction.
    /// Otherwise the entry's feedback slot is reset and begun.
    pub fn request(&mut self, index: u64, action: CatalogAction) -> Option<RuntimeCommand> {
        let from = match self.wallet.address() {
            Some(address) => address,
            None => {
                self.wallet.prompt_connect();
                self.set_status("Connect a wallet to continue", StatusLevel::Warn);
                return None;
            }
        };

        let kind = match action {
            CatalogAction::Buy => IntentKind::Purchase,
            // Toggling reads the current snapshot: an unread book gets
            // marked, a read one unmarked.
            CatalogAction::ToggleRead => {
                let read = self.records.get(&index).map(|r| r.read).unwrap_or(false);
                IntentKind::SetRead(!read)
            }
            CatalogAction::Remove => IntentKind::Remove,
        };

        let intent = OperationIntent { index, kind };
        self.feedback.begin(index, kind.opening_phase());
        Some(RuntimeCommand::Operate { intent, from })
    }

    /// Turn a new-listing request into a runtime command, wallet-gated
    /// like every other mutating action.
    pub fn request_listing(
        &mut self,
        title: String,
        author: String,
        image: String,
        price: U256,
    ) -> Option<RuntimeCommand> {
        let from = match self.wallet.address() {
            Some(address) => address,
            None => {
                self.wallet.prompt_connect();
                self.set_status("Connect a wallet to continue", StatusLevel::Warn);
                return None;
            }
        };

        Some(RuntimeCommand::ListBook {
            title,
            author,
            image,
            price,
            from,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use alloy::primitives::Address;

    use super::*;

    struct StubWallet {
        address: Option<Address>,
        prompts: AtomicUsize,
    }

    impl StubWallet {
        fn connected() -> Self {
            Self {
                address: Some(Address::repeat_byte(0x44)),
                prompts: AtomicUsize::new(0),
            }
        }

        fn disconnected() -> Self {
            Self {
                address: None,
                prompts: AtomicUsize::new(0),
            }
        }
    }

    impl WalletSession for StubWallet {
        fn address(&self) -> Option<Address> {
            self.address
        }

        fn prompt_connect(&self) {
            self.prompts.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn record(read: bool) -> Record {
        Record {
            owner: Address::repeat_byte(0x11),
            title: "One".to_string(),
            author: "Author".to_string(),
            image_url: "https://example.com/one.png".to_string(),
            price: U256::from(100u64),
            sold: 0,
            read,
        }
    }

    #[test]
    fn test_no_wallet_prompts_once_and_aborts() {
        let wallet = Arc::new(StubWallet::disconnected());
        let mut app = App::new(Arc::clone(&wallet) as Arc<dyn WalletSession>);

        let command = app.request(0, CatalogAction::Buy);

        assert!(command.is_none());
        assert_eq!(wallet.prompts.load(Ordering::SeqCst), 1);
        assert!(app.feedback.get(0).is_idle());
    }

    #[test]
    fn test_toggle_on_unread_record_requests_mark() {
        let wallet = Arc::new(StubWallet::connected());
        let mut app = App::new(wallet);
        app.apply_event(RuntimeEvent::CatalogCount { count: 1 });
        app.apply_event(RuntimeEvent::RecordReady {
            index: 0,
            record: Some(record(false)),
        });

        let command = app.request(0, CatalogAction::ToggleRead);

        match command {
            Some(RuntimeCommand::Operate { intent, .. }) => {
                assert_eq!(intent.kind, IntentKind::SetRead(true));
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(app.feedback.get(0).phase.as_deref(), Some("Marking…"));
    }

    #[test]
    fn test_request_resets_stale_feedback() {
        let wallet = Arc::new(StubWallet::connected());
        let mut app = App::new(wallet);
        app.apply_event(RuntimeEvent::OperationFailed {
            index: 2,
            message: "insufficient funds".to_string(),
        });

        let command = app.request(2, CatalogAction::Remove);

        assert!(command.is_some());
        let slot = app.feedback.get(2);
        assert!(slot.error.is_none());
        assert_eq!(slot.phase.as_deref(), Some("Removing book…"));
    }

    #[test]
    fn test_failure_on_one_entry_leaves_records_alone() {
        let wallet = Arc::new(StubWallet::connected());
        let mut app = App::new(wallet);
        app.apply_event(RuntimeEvent::CatalogCount { count: 2 });
        app.apply_event(RuntimeEvent::RecordReady {
            index: 0,
            record: Some(record(false)),
        });
        app.apply_event(RuntimeEvent::RecordReady {
            index: 1,
            record: Some(record(true)),
        });

        app.apply_event(RuntimeEvent::OperationFailed {
            index: 0,
            message: "insufficient funds".to_string(),
        });

        assert_eq!(
            app.feedback.get(0).error.as_deref(),
            Some("insufficient funds")
        );
        assert!(app.feedback.get(1).is_idle());
        assert_eq!(app.records.len(), 2);
        assert!(app.catalog_complete());
    }

    #[test]
    fn test_count_shrink_drops_tail_records() {
        let wallet = Arc::new(StubWallet::connected());
        let mut app = App::new(wallet);
        app.apply_event(RuntimeEvent::CatalogCount { count: 2 });
        app.apply_event(RuntimeEvent::RecordReady {
            index: 0,
            record: Some(record(false)),
        });
        app.apply_event(RuntimeEvent::RecordReady {
            index: 1,
            record: Some(record(false)),
        });

        app.apply_event(RuntimeEvent::CatalogCount { count: 1 });

        assert_eq!(app.records.len(), 1);
        assert!(app.catalog_complete());
    }
}
