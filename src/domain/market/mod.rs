//! Book stall domain: records, intents, and operation planning

mod calls;

pub use calls::{CallTarget, ContractGateway, PendingTx, ReadCall, TxOutcome, WriteCall};

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, U256};

use crate::core::sequencer::{Sequence, Step};

/// Decoded snapshot of one catalog entry.
///
/// Never mutated in place: a state change is always re-derived from a
/// fresh read after the write that caused it has confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub owner: Address,
    pub title: String,
    pub author: String,
    pub image_url: String,
    /// Price in the settlement token's smallest unit.
    pub price: U256,
    pub sold: u64,
    pub read: bool,
}

/// Decode the positional tuple returned by `getBook`.
///
/// Field order is fixed: owner, title, author, image, price, sold, read.
/// Fails closed: an absent tuple or one of the wrong shape yields `None`
/// ("not loaded"), never a partially populated record.
pub fn decode_record(raw: Option<&[DynSolValue]>) -> Option<Record> {
    let raw = raw?;
    if raw.len() != 7 {
        return None;
    }

    let owner = match &raw[0] {
        DynSolValue::Address(addr) => *addr,
        _ => return None,
    };
    let title = as_string(&raw[1])?;
    let author = as_string(&raw[2])?;
    let image_url = as_string(&raw[3])?;
    let price = match &raw[4] {
        DynSolValue::Uint(value, _) => *value,
        _ => return None,
    };
    let sold = match &raw[5] {
        DynSolValue::Uint(value, _) => value.saturating_to::<u64>(),
        _ => return None,
    };
    let read = match &raw[6] {
        DynSolValue::Bool(flag) => *flag,
        _ => return None,
    };

    Some(Record {
        owner,
        title,
        author,
        image_url,
        price,
        sold,
        read,
    })
}

/// Decode the catalog size returned by `getBooksLength`.
/// An unresolved read counts as an empty catalog.
pub fn decode_count(raw: Option<&[DynSolValue]>) -> u64 {
    match raw.and_then(|values| values.first().cloned()) {
        Some(DynSolValue::Uint(value, _)) => value.saturating_to::<u64>(),
        _ => 0,
    }
}

fn as_string(value: &DynSolValue) -> Option<String> {
    match value {
        DynSolValue::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// What the user asked to do to one catalog entry.
/// Carries no state; constructed fresh per action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationIntent {
    pub index: u64,
    pub kind: IntentKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentKind {
    Purchase,
    SetRead(bool),
    Remove,
}

impl IntentKind {
    /// Phase label set before anything is submitted.
    pub fn opening_phase(&self) -> &'static str {
        match self {
            IntentKind::Purchase => "Approving…",
            IntentKind::SetRead(true) => "Marking…",
            IntentKind::SetRead(false) => "Unmarking…",
            IntentKind::Remove => "Removing book…",
        }
    }

    pub fn pending_message(&self) -> &'static str {
        match self {
            IntentKind::Purchase => "Purchasing book…",
            IntentKind::SetRead(_) => "Marking book…",
            IntentKind::Remove => "Removing book…",
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            IntentKind::Purchase => "Book purchased successfully",
            IntentKind::SetRead(_) => "Book read status changed successfully",
            IntentKind::Remove => "Book has been removed successfully",
        }
    }

    fn unavailable_message(&self) -> &'static str {
        match self {
            IntentKind::Purchase => "Failed to purchase this book",
            IntentKind::SetRead(true) => "Failed to mark this book as read",
            IntentKind::SetRead(false) => "Failed to unmark this book as read",
            IntentKind::Remove => "Failed to remove this book",
        }
    }
}

/// Plan the transaction sequence for an intent.
///
/// Purchase is the one two-step sequence: approve spending of exactly the
/// record's price, then execute the purchase. The approve step can only be
/// prepared from a loaded record, so a missing record plans to an
/// unavailable sequence rather than a zero-amount approval.
pub fn plan_sequence(
    intent: &OperationIntent,
    record: Option<&Record>,
    stall: Address,
    from: Address,
    confirmations: u64,
) -> Sequence {
    let index = intent.index;
    let steps = match intent.kind {
        IntentKind::Purchase => vec![
            Step {
                phase: "Approving…",
                call: record.map(|r| WriteCall::approve(from, stall, r.price)),
                confirmations,
            },
            Step {
                phase: "Purchasing…",
                call: Some(WriteCall::buy_book(from, index)),
                confirmations,
            },
        ],
        IntentKind::SetRead(true) => vec![Step {
            phase: "Marking…",
            call: Some(WriteCall::mark_as_read(from, index)),
            confirmations,
        }],
        IntentKind::SetRead(false) => vec![Step {
            phase: "Unmarking…",
            call: Some(WriteCall::mark_as_unread(from, index)),
            confirmations,
        }],
        IntentKind::Remove => vec![Step {
            phase: "Removing book…",
            call: Some(WriteCall::remove_book(from, index)),
            confirmations,
        }],
    };

    Sequence {
        unavailable: intent.kind.unavailable_message(),
        steps,
    }
}

/// Plan the single-step sequence that lists a new book.
pub fn plan_listing(
    title: &str,
    author: &str,
    image: &str,
    price: U256,
    from: Address,
    confirmations: u64,
) -> Sequence {
    Sequence {
        unavailable: "Failed to list this book",
        steps: vec![Step {
            phase: "Listing book…",
            call: Some(WriteCall::add_book(from, title, author, image, price)),
            confirmations,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_book(read: bool) -> Vec<DynSolValue> {
        vec![
            DynSolValue::Address(Address::repeat_byte(0x11)),
            DynSolValue::String("The Left Hand of Darkness".to_string()),
            DynSolValue::String("Ursula K. Le Guin".to_string()),
            DynSolValue::String("https://example.com/lhod.png".to_string()),
            DynSolValue::Uint(U256::from(1_500_000_000_000_000_000u128), 256),
            DynSolValue::Uint(U256::from(3u64), 256),
            DynSolValue::Bool(read),
        ]
    }

    #[test]
    fn test_decode_absent_is_none() {
        assert_eq!(decode_record(None), None);
    }

    #[test]
    fn test_decode_full_tuple() {
        let raw = raw_book(true);
        let record = decode_record(Some(&raw)).unwrap();

        assert_eq!(record.owner, Address::repeat_byte(0x11));
        assert_eq!(record.title, "The Left Hand of Darkness");
        assert_eq!(record.author, "Ursula K. Le Guin");
        assert_eq!(record.image_url, "https://example.com/lhod.png");
        assert_eq!(record.price, U256::from(1_500_000_000_000_000_000u128));
        assert_eq!(record.sold, 3);
        assert!(record.read);
    }

    #[test]
    fn test_decode_fails_closed_on_wrong_shape() {
        let mut short = raw_book(false);
        short.pop();
        assert_eq!(decode_record(Some(&short)), None);

        let mut wrong_kind = raw_book(false);
        wrong_kind[0] = DynSolValue::Uint(U256::from(1u64), 256);
        assert_eq!(decode_record(Some(&wrong_kind)), None);
    }

    #[test]
    fn test_decode_sold_is_bounded() {
        let mut raw = raw_book(false);
        raw[5] = DynSolValue::Uint(U256::MAX, 256);
        assert_eq!(decode_record(Some(&raw)).unwrap().sold, u64::MAX);
    }

    #[test]
    fn test_decode_count() {
        let raw = vec![DynSolValue::Uint(U256::from(4u64), 256)];
        assert_eq!(decode_count(Some(&raw)), 4);
        assert_eq!(decode_count(None), 0);
    }

    #[test]
    fn test_purchase_plans_approve_for_exact_price() {
        let raw = raw_book(false);
        let record = decode_record(Some(&raw)).unwrap();
        let stall = Address::repeat_byte(0x22);
        let from = Address::repeat_byte(0x33);
        let intent = OperationIntent {
            index: 0,
            kind: IntentKind::Purchase,
        };

        let sequence = plan_sequence(&intent, Some(&record), stall, from, 1);
        assert_eq!(sequence.steps.len(), 2);

        let approve = sequence.steps[0].call.as_ref().unwrap();
        assert_eq!(approve.name, "approve");
        assert_eq!(approve.target, CallTarget::SettlementToken);
        assert_eq!(
            approve.args[1],
            DynSolValue::Uint(U256::from(1_500_000_000_000_000_000u128), 256)
        );

        let buy = sequence.steps[1].call.as_ref().unwrap();
        assert_eq!(buy.name, "buyBook");
        assert_eq!(buy.target, CallTarget::Stall);
    }

    #[test]
    fn test_purchase_without_record_is_unprepared() {
        let intent = OperationIntent {
            index: 1,
            kind: IntentKind::Purchase,
        };
        let sequence = plan_sequence(&intent, None, Address::ZERO, Address::ZERO, 1);
        assert!(sequence.steps[0].call.is_none());
    }

    #[test]
    fn test_set_read_picks_the_right_entry_point() {
        let from = Address::repeat_byte(0x33);
        let mark = plan_sequence(
            &OperationIntent {
                index: 2,
                kind: IntentKind::SetRead(true),
            },
            None,
            Address::ZERO,
            from,
            1,
        );
        assert_eq!(mark.steps.len(), 1);
        assert_eq!(mark.steps[0].call.as_ref().unwrap().name, "markAsRead");

        let unmark = plan_sequence(
            &OperationIntent {
                index: 2,
                kind: IntentKind::SetRead(false),
            },
            None,
            Address::ZERO,
            from,
            1,
        );
        assert_eq!(unmark.steps[0].call.as_ref().unwrap().name, "markAsUnread");
    }
}
