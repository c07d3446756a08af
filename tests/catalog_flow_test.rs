//! Test the catalog action flow without a node
//!
//! The binary does not expose a library target, so this exercises the
//! same state transitions the view side performs, using the same
//! structures as app.rs.

mod test_catalog_flow {
    use std::collections::BTreeMap;

    // Mirror of the per-entry feedback slot in core/feedback.rs
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    struct Feedback {
        phase: Option<String>,
        error: Option<String>,
        success: Option<String>,
    }

    #[derive(Debug, Default)]
    struct FeedbackBoard {
        slots: BTreeMap<u64, Feedback>,
    }

    impl FeedbackBoard {
        fn begin(&mut self, index: u64, phase: &str) {
            let slot = self.slots.entry(index).or_default();
            *slot = Feedback::default();
            slot.phase = Some(phase.to_string());
        }

        fn succeed(&mut self, index: u64, message: &str) {
            let slot = self.slots.entry(index).or_default();
            slot.phase = None;
            slot.error = None;
            slot.success = Some(message.to_string());
        }

        fn fail(&mut self, index: u64, reason: &str) {
            let slot = self.slots.entry(index).or_default();
            slot.phase = None;
            slot.success = None;
            slot.error = Some(reason.to_string());
        }

        fn clear(&mut self, index: u64) {
            self.slots.remove(&index);
        }

        fn get(&self, index: u64) -> Feedback {
            self.slots.get(&index).cloned().unwrap_or_default()
        }
    }

    // Simplified record matching domain/market
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Record {
        title: String,
        price: u128,
        read: bool,
    }

    struct App {
        count: u64,
        records: BTreeMap<u64, Record>,
        feedback: FeedbackBoard,
        wallet: Option<&'static str>,
        connect_prompts: usize,
        issued_writes: Vec<&'static str>,
    }

    impl App {
        fn new(wallet: Option<&'static str>) -> Self {
            Self {
                count: 0,
                records: BTreeMap::new(),
                feedback: FeedbackBoard::default(),
                wallet,
                connect_prompts: 0,
                issued_writes: Vec::new(),
            }
        }

        fn load(&mut self, records: Vec<Record>) {
            self.count = records.len() as u64;
            self.records = records
                .into_iter()
                .enumerate()
                .map(|(index, record)| (index as u64, record))
                .collect();
        }

        /// The wallet gate in front of every mutating action.
        fn request_toggle(&mut self, index: u64) -> bool {
            if self.wallet.is_none() {
                self.connect_prompts += 1;
                return false;
            }
            let read = self.records.get(&index).map(|r| r.read).unwrap_or(false);
            self.feedback
                .begin(index, if read { "Unmarking…" } else { "Marking…" });
            self.issued_writes
                .push(if read { "markAsUnread" } else { "markAsRead" });
            true
        }
    }

    #[test]
    fn test_no_wallet_issues_no_writes_and_prompts_once() {
        let mut app = App::new(None);
        app.load(vec![Record {
            title: "One".to_string(),
            price: 100,
            read: false,
        }]);

        assert!(!app.request_toggle(0));

        assert_eq!(app.connect_prompts, 1);
        assert!(app.issued_writes.is_empty());
        assert!(app.feedback.get(0) == Feedback::default());
    }

    #[test]
    fn test_toggle_unread_book_issues_mark_as_read() {
        let mut app = App::new(Some("0x44"));
        app.load(vec![Record {
            title: "One".to_string(),
            price: 100,
            read: false,
        }]);

        assert!(app.request_toggle(0));
        assert_eq!(app.issued_writes, vec!["markAsRead"]);
        assert_eq!(app.feedback.get(0).phase.as_deref(), Some("Marking…"));
    }

    #[test]
    fn test_failed_purchase_leaves_other_entries_alone() {
        let mut app = App::new(Some("0x44"));
        app.load(vec![
            Record {
                title: "One".to_string(),
                price: 100,
                read: false,
            },
            Record {
                title: "Two".to_string(),
                price: 200,
                read: true,
            },
        ]);

        app.feedback.begin(0, "Approving…");
        app.feedback.fail(0, "insufficient funds");

        assert_eq!(
            app.feedback.get(0).error.as_deref(),
            Some("insufficient funds")
        );
        assert_eq!(app.feedback.get(1), Feedback::default());
        assert_eq!(app.records.get(&1).unwrap().title, "Two");
    }

    #[test]
    fn test_clear_then_failure_keeps_only_the_error() {
        let mut app = App::new(Some("0x44"));
        app.feedback.begin(0, "Approving…");
        app.feedback.clear(0);
        app.feedback.fail(0, "user declined");

        let slot = app.feedback.get(0);
        assert!(slot.phase.is_none());
        assert!(slot.success.is_none());
        assert_eq!(slot.error.as_deref(), Some("user declined"));

        app.feedback.clear(0);
        assert_eq!(app.feedback.get(0), Feedback::default());
    }

    #[test]
    fn test_success_then_new_operation_resets_the_slot() {
        let mut app = App::new(Some("0x44"));
        app.load(vec![Record {
            title: "One".to_string(),
            price: 100,
            read: true,
        }]);

        app.feedback.begin(0, "Marking…");
        app.feedback.succeed(0, "Book read status changed successfully");
        assert!(app.request_toggle(0));

        let slot = app.feedback.get(0);
        assert!(slot.success.is_none());
        assert_eq!(slot.phase.as_deref(), Some("Unmarking…"));
        assert_eq!(app.issued_writes, vec!["markAsUnread"]);
    }
}
