//! Service-level tests for the transition protocol

use std::sync::Arc;

use crate::domain::TransitionInput;
use crate::errors::WaybillError;
use crate::ledger::{Ledger, LedgerFeed, LedgerPolicy};
use crate::permissions::PermissionDirectory;
use crate::schemas::fixtures::draft;
use crate::schemas::permission::WAYBILL_DISPATCH;
use crate::schemas::{Outcome, User, Waybill, WaybillId, WaybillState};
use crate::store::{MemoryStore, WaybillRepository};

use super::{seed_organization, TransitionRequest, WaybillService};

struct Harness {
    service: WaybillService,
    store: Arc<MemoryStore>,
    ledger: Arc<Ledger>,
}

impl Harness {
    fn new() -> Self {
        let (forest, users) = seed_organization().unwrap();
        let directory = Arc::new(PermissionDirectory::new(forest, users));
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(Ledger::new(LedgerPolicy::default()));
        let service = WaybillService::new(directory, store.clone(), ledger.clone());
        Harness {
            service,
            store,
            ledger,
        }
    }

    fn user(&self, id: &str) -> User {
        self.service.permissions().user(id).unwrap()
    }

    fn create(&self) -> Waybill {
        self.service
            .create_waybill(&self.user("clerk_1"), draft())
            .unwrap()
    }

    fn step(&self, actor: &str, id: WaybillId, input: TransitionInput) -> Waybill {
        self.service
            .transition(&self.user(actor), TransitionRequest::new(id, input))
            .unwrap()
            .waybill
    }

    /// Create a waybill and walk it forward to `state`
    fn at(&self, state: WaybillState) -> Waybill {
        let mut waybill = self.create();
        let path = [
            (WaybillState::Dispatched, "dispatcher_1", TransitionInput::Dispatch),
            (WaybillState::InTransit, "zxg_1", load()),
            (WaybillState::ArrivedAtBranch, "branch_1", receive("east-branch")),
            (WaybillState::SignedByCustomer, "branch_1", sign()),
        ];
        for (target, actor, input) in path {
            if waybill.state == state {
                break;
            }
            waybill = self.step(actor, waybill.id, input);
            assert_eq!(waybill.state, target);
        }
        waybill
    }
}

fn load() -> TransitionInput {
    TransitionInput::Load {
        loading_complete: true,
        vehicle: Some("HU-A1234".to_string()),
    }
}

fn receive(branch: &str) -> TransitionInput {
    TransitionInput::ReceiveAtBranch {
        branch: branch.to_string(),
    }
}

fn sign() -> TransitionInput {
    TransitionInput::CustomerSign {
        signer_name: "Zhang Min".to_string(),
        credential_number: "110101199001011234".to_string(),
    }
}

fn void(reason: &str) -> TransitionInput {
    TransitionInput::Void {
        reason: reason.to_string(),
    }
}

// ===== END TO END =====

#[test]
fn test_dock_worker_denied_dispatch_then_loads() {
    let h = Harness::new();
    let w1 = h.create();
    let zxg = h.user("zxg_1");

    let err = h
        .service
        .transition(&zxg, TransitionRequest::new(w1.id, TransitionInput::Dispatch))
        .unwrap_err();
    match err {
        WaybillError::PermissionDenied {
            actor, permission, ..
        } => {
            assert_eq!(actor, "zxg_1");
            assert_eq!(permission, WAYBILL_DISPATCH);
        }
        other => panic!("expected PermissionDenied, got {:?}", other),
    }
    assert_eq!(h.service.waybill(w1.id).unwrap().state, WaybillState::Created);

    h.step("dispatcher_1", w1.id, TransitionInput::Dispatch);
    let loaded = h
        .service
        .transition(&zxg, TransitionRequest::new(w1.id, load()))
        .unwrap();
    assert_eq!(loaded.waybill.state, WaybillState::InTransit);
    assert_eq!(loaded.record.actor, "zxg_1");
    assert!(loaded.ledger_event.is_none());

    let outcomes: Vec<_> = h
        .service
        .history(w1.id)
        .unwrap()
        .into_iter()
        .map(|r| (r.actor, r.outcome))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            ("zxg_1".to_string(), Outcome::Denied),
            ("dispatcher_1".to_string(), Outcome::Applied),
            ("zxg_1".to_string(), Outcome::Applied),
        ]
    );
}

#[test]
fn test_full_lifecycle_emits_one_ledger_event() {
    let h = Harness::new();
    let arrived = h.at(WaybillState::ArrivedAtBranch);

    let signed = h
        .service
        .transition(&h.user("branch_1"), TransitionRequest::new(arrived.id, sign()))
        .unwrap();
    assert_eq!(signed.waybill.state, WaybillState::SignedByCustomer);
    assert_eq!(signed.waybill.version, 5);

    let event = signed.ledger_event.unwrap();
    assert_eq!(event.waybill, arrived.id);
    assert_eq!(event.receivable, 2150);
    assert_eq!(h.ledger.events(), vec![event.clone()]);

    let accountant = h.user("acct_1");
    assert_eq!(h.service.ledger_events(&accountant).unwrap(), vec![event]);
    assert!(matches!(
        h.service.ledger_events(&h.user("zxg_1")),
        Err(WaybillError::PermissionDenied { .. })
    ));
}

// ===== PROTOCOL RULES =====

#[test]
fn test_created_cannot_jump_to_arrived_even_with_permission() {
    let h = Harness::new();
    let w = h.create();
    let branch = h.user("branch_1");
    assert!(h.service.authorize(&branch, "waybill.receive_at_branch").unwrap());

    let err = h
        .service
        .transition(&branch, TransitionRequest::new(w.id, receive("east-branch")))
        .unwrap_err();
    assert!(matches!(err, WaybillError::InvalidTransition { .. }));

    let current = h.service.waybill(w.id).unwrap();
    assert_eq!(current.state, WaybillState::Created);
    assert_eq!(current.version, w.version);

    let records = h.service.history(w.id).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].outcome, Outcome::Rejected);
    assert!(records[0].reason.as_deref().unwrap().contains("cannot transition"));
}

#[test]
fn test_wrong_branch_is_rejected() {
    let h = Harness::new();
    let w = h.at(WaybillState::InTransit);
    let err = h
        .service
        .transition(&h.user("branch_1"), TransitionRequest::new(w.id, receive("west-branch")))
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_TRANSITION");
    assert_eq!(h.service.waybill(w.id).unwrap().state, WaybillState::InTransit);
}

#[test]
fn test_void_from_signed_fails() {
    let h = Harness::new();
    let signed = h.at(WaybillState::SignedByCustomer);
    let err = h
        .service
        .transition(&h.user("clerk_1"), TransitionRequest::new(signed.id, void("too late")))
        .unwrap_err();
    assert!(matches!(err, WaybillError::InvalidTransition { .. }));
    assert_eq!(h.ledger.len(), 1);
}

#[test]
fn test_void_from_each_non_terminal_state() {
    let h = Harness::new();
    for state in [
        WaybillState::Created,
        WaybillState::Dispatched,
        WaybillState::InTransit,
        WaybillState::ArrivedAtBranch,
    ] {
        let w = h.at(state);
        let voided = h.step("clerk_1", w.id, void("customer cancelled"));
        assert_eq!(voided.state, WaybillState::Voided, "from {}", state);
        assert_eq!(voided.void_reason.as_deref(), Some("customer cancelled"));
    }
    assert!(h.ledger.is_empty());
}

#[test]
fn test_void_requires_permission_and_reason() {
    let h = Harness::new();
    let w = h.create();
    let denied = h
        .service
        .transition(&h.user("zxg_1"), TransitionRequest::new(w.id, void("nope")))
        .unwrap_err();
    assert_eq!(denied.code(), "PERMISSION_DENIED");

    let blank = h
        .service
        .transition(&h.user("clerk_1"), TransitionRequest::new(w.id, void("  ")))
        .unwrap_err();
    assert_eq!(blank.code(), "INVALID_TRANSITION");
}

#[test]
fn test_second_sign_keeps_single_ledger_event() {
    let h = Harness::new();
    let signed = h.at(WaybillState::SignedByCustomer);
    let again = h
        .service
        .transition(&h.user("branch_1"), TransitionRequest::new(signed.id, sign()));
    assert!(again.is_err());

    let replay = h.ledger.on_signed(&h.service.waybill(signed.id).unwrap()).unwrap();
    assert_eq!(replay.seq, 1);
    assert_eq!(h.ledger.len(), 1);
}

#[test]
fn test_stale_version_fails_without_record() {
    let h = Harness::new();
    let w = h.at(WaybillState::Dispatched);
    let err = h
        .service
        .transition(
            &h.user("zxg_1"),
            TransitionRequest::new(w.id, load()).at_version(w.version - 1),
        )
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(h.service.history(w.id).unwrap().len(), 1);
}

#[test]
fn test_deactivated_user_is_denied() {
    let h = Harness::new();
    let w = h.create();
    let gone = h.user("admin").deactivated();
    let err = h
        .service
        .transition(&gone, TransitionRequest::new(w.id, TransitionInput::Dispatch))
        .unwrap_err();
    assert_eq!(err.code(), "PERMISSION_DENIED");
}

#[test]
fn test_superuser_may_do_anything_valid() {
    let h = Harness::new();
    let w = h.create();
    let admin = h.user("admin");
    let dispatched = h
        .service
        .transition(&admin, TransitionRequest::new(w.id, TransitionInput::Dispatch))
        .unwrap();
    assert_eq!(dispatched.waybill.state, WaybillState::Dispatched);
}

#[test]
fn test_admin_edit_applies_to_next_request() {
    let h = Harness::new();
    let w = h.create();
    let dock = h.service.permissions().snapshot().forest.group_by_name("dock").unwrap().id;
    h.service
        .permissions()
        .update_forest(|forest| forest.grant(dock, WAYBILL_DISPATCH))
        .unwrap();

    let dispatched = h.step("zxg_1", w.id, TransitionInput::Dispatch);
    assert_eq!(dispatched.state, WaybillState::Dispatched);
}

// ===== ENTRY AND DISPUTES =====

#[test]
fn test_create_requires_permission_and_valid_draft() {
    let h = Harness::new();
    assert!(matches!(
        h.service.create_waybill(&h.user("zxg_1"), draft()),
        Err(WaybillError::PermissionDenied { .. })
    ));

    let mut same = draft();
    same.destination = same.origin.clone();
    assert!(matches!(
        h.service.create_waybill(&h.user("clerk_1"), same),
        Err(WaybillError::Validation(_))
    ));

    let first = h.create();
    let second = h.create();
    assert_eq!(first.id.to_string(), "00000001");
    assert_eq!(second.id, WaybillId(2));
    assert_eq!(first.created_by, "clerk_1");
}

#[test]
fn test_open_dispute_blocks_dispatch_until_resolved() {
    let h = Harness::new();
    let w = h.create();
    let clerk = h.user("clerk_1");
    let disputed = h.service.open_dispute(&clerk, w.id, "wrong address", None).unwrap();
    assert_eq!(disputed.version, 2);

    let err = h
        .service
        .transition(&h.user("dispatcher_1"), TransitionRequest::new(w.id, TransitionInput::Dispatch))
        .unwrap_err();
    assert!(err.to_string().contains("open disputes"));

    let dispute_id = disputed.disputes[0].id;
    h.service
        .resolve_dispute(&clerk, w.id, dispute_id, Some(disputed.version))
        .unwrap();
    assert!(h
        .service
        .resolve_dispute(&clerk, w.id, dispute_id, None)
        .is_err());

    let dispatched = h.step("dispatcher_1", w.id, TransitionInput::Dispatch);
    assert_eq!(dispatched.state, WaybillState::Dispatched);
}

#[test]
fn test_dispute_rules() {
    let h = Harness::new();
    let w = h.create();
    assert_eq!(
        h.service
            .open_dispute(&h.user("zxg_1"), w.id, "damaged", None)
            .unwrap_err()
            .code(),
        "PERMISSION_DENIED"
    );
    assert_eq!(
        h.service
            .open_dispute(&h.user("clerk_1"), w.id, "damaged", Some(9))
            .unwrap_err()
            .code(),
        "CONCURRENT_MODIFICATION"
    );

    let voided = h.step("clerk_1", w.id, void("duplicate entry"));
    assert_eq!(
        h.service
            .open_dispute(&h.user("clerk_1"), voided.id, "damaged", None)
            .unwrap_err()
            .code(),
        "INVALID_TRANSITION"
    );
}

#[test]
fn test_unknown_waybill_is_not_found() {
    let h = Harness::new();
    let err = h
        .service
        .transition(&h.user("admin"), TransitionRequest::new(WaybillId(42), TransitionInput::Dispatch))
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    assert!(h.service.history(WaybillId(42)).is_err());
    assert!(h.store.records().is_empty());
}

#[test]
fn test_list_filters_by_state() {
    let h = Harness::new();
    h.at(WaybillState::Created);
    h.at(WaybillState::InTransit);
    h.at(WaybillState::InTransit);
    assert_eq!(h.service.waybills(None).len(), 3);
    assert_eq!(h.service.waybills(Some(WaybillState::InTransit)).len(), 2);
    assert!(h.service.waybills(Some(WaybillState::Voided)).is_empty());
}

// ===== CONCURRENCY =====

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_loads_exactly_one_applies() {
    let h = Harness::new();
    let w = h.at(WaybillState::Dispatched);
    let barrier = Arc::new(tokio::sync::Barrier::new(2));

    let mut handles = Vec::new();
    for _ in 0..2 {
        let service = h.service.clone();
        let barrier = Arc::clone(&barrier);
        let zxg = h.user("zxg_1");
        let request = TransitionRequest::new(w.id, load()).at_version(w.version);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            service.transition(&zxg, request)
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = results.into_iter().find_map(|r| r.err()).unwrap();
    assert!(
        matches!(loser, WaybillError::ConcurrentModification { .. }),
        "unexpected error: {:?}",
        loser
    );
    assert!(loser.is_retryable());

    let applied_loads = h
        .store
        .records_for(w.id)
        .into_iter()
        .filter(|r| r.to == WaybillState::InTransit && r.outcome == Outcome::Applied)
        .count();
    assert_eq!(applied_loads, 1);
    assert_eq!(h.service.waybill(w.id).unwrap().version, w.version + 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unversioned_concurrent_loads_lose_with_concurrent_modification() {
    let h = Harness::new();
    for _ in 0..25 {
        let w = h.at(WaybillState::Dispatched);
        let barrier = Arc::new(tokio::sync::Barrier::new(2));

        let mut handles = Vec::new();
        for _ in 0..2 {
            let service = h.service.clone();
            let barrier = Arc::clone(&barrier);
            let zxg = h.user("zxg_1");
            let request = TransitionRequest::new(w.id, load());
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                service.transition(&zxg, request)
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let loser = results.into_iter().find_map(|r| r.err()).unwrap();
        assert!(
            matches!(loser, WaybillError::ConcurrentModification { .. }),
            "unexpected error: {:?}",
            loser
        );

        let records = h.store.records_for(w.id);
        assert!(records.iter().all(|r| r.outcome == Outcome::Applied));
        assert_eq!(records.iter().filter(|r| r.to == WaybillState::InTransit).count(), 1);
    }
}

#[test]
fn test_repeated_load_without_version_is_a_lost_race() {
    let h = Harness::new();
    let w = h.at(WaybillState::InTransit);
    let before = h.service.history(w.id).unwrap().len();

    let err = h
        .service
        .transition(&h.user("zxg_1"), TransitionRequest::new(w.id, load()))
        .unwrap_err();
    assert!(matches!(
        err,
        WaybillError::ConcurrentModification { expected: None, .. }
    ));
    assert_eq!(h.service.history(w.id).unwrap().len(), before);
}

#[test]
fn test_repeated_load_at_current_version_is_rejected() {
    let h = Harness::new();
    let w = h.at(WaybillState::InTransit);
    let err = h
        .service
        .transition(
            &h.user("zxg_1"),
            TransitionRequest::new(w.id, load()).at_version(w.version),
        )
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_TRANSITION");
    let records = h.service.history(w.id).unwrap();
    assert_eq!(records.last().unwrap().outcome, Outcome::Rejected);
}

#[test]
fn test_unauthorized_stale_caller_is_denied_first() {
    let h = Harness::new();
    let w = h.at(WaybillState::Dispatched);
    let err = h
        .service
        .transition(
            &h.user("acct_1"),
            TransitionRequest::new(w.id, load()).at_version(w.version - 1),
        )
        .unwrap_err();
    assert_eq!(err.code(), "PERMISSION_DENIED");

    let records = h.service.history(w.id).unwrap();
    assert_eq!(records.last().unwrap().outcome, Outcome::Denied);
    assert_eq!(records.last().unwrap().actor, "acct_1");
}
