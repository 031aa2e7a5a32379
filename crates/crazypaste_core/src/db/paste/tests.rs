//! Unit tests for paste storage operations.

use super::PasteDb;
use crate::constants::DEFAULT_MAX_PASTE_CHARS;
use crate::events::EventBus;
use crate::models::paste::{CreatePasteRequest, Expiration, Paste, DEFAULT_TITLE};
use crate::models::user::User;
use crate::roles::Role;
use crate::store::{KeyValueStore, MemoryStore};
use crate::test_support::{memory_db, register};
use crate::AppError;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

fn owner() -> User {
    User::new(
        "owner-1".to_string(),
        "owner@example.com".to_string(),
        "owner".to_string(),
        "pw".to_string(),
    )
}

fn paste_db_with_store(store: Arc<dyn KeyValueStore>) -> PasteDb {
    PasteDb::new(store, Arc::new(EventBus::new()), DEFAULT_MAX_PASTE_CHARS)
}

fn expire_now(db: &PasteDb, paste: &Paste) {
    let mut expired = paste.clone();
    expired.expires = Some(Utc::now().timestamp_millis() - 1_000);
    assert!(db.update(&expired).expect("update"));
}

#[test]
fn create_assigns_unique_ids_and_zero_views() {
    let db = memory_db();
    let user = register(&db, "alice");

    let mut ids = HashSet::new();
    for i in 0..25 {
        let paste = db
            .pastes
            .create(CreatePasteRequest::from_content(format!("paste {}", i)), &user)
            .expect("create");
        assert_eq!(paste.views, 0);
        assert_eq!(paste.user_id.as_deref(), Some(user.id.as_str()));
        assert!(ids.insert(paste.id));
    }
    assert_eq!(db.pastes.list_all().expect("list").len(), 25);
}

#[test]
fn create_prepends_newest_first_and_applies_defaults() {
    let db = memory_db();
    let user = register(&db, "alice");
    let first = db
        .pastes
        .create(CreatePasteRequest::from_content("one"), &user)
        .expect("first");
    let second = db
        .pastes
        .create(
            CreatePasteRequest {
                title: Some("  Second  ".to_string()),
                content: "two".to_string(),
                language: Some("Rust".to_string()),
                ..CreatePasteRequest::default()
            },
            &user,
        )
        .expect("second");

    let all = db.pastes.list_all().expect("list");
    assert_eq!(all[0].id, second.id);
    assert_eq!(all[1].id, first.id);
    assert_eq!(first.title, DEFAULT_TITLE);
    assert_eq!(first.language, "plaintext");
    assert_eq!(second.title, "Second");
    assert_eq!(second.language, "rust");
    assert_eq!(first.expires, None);
}

#[test]
fn blank_content_is_rejected_before_write() {
    let db = memory_db();
    let user = register(&db, "alice");
    for content in ["", "   \n\t "] {
        let err = db
            .pastes
            .create(CreatePasteRequest::from_content(content), &user)
            .expect_err("blank content must fail");
        assert!(matches!(err, AppError::BadRequest(_)));
    }
    assert!(db.pastes.list_all().expect("list").is_empty());
}

#[test]
fn inactive_owner_is_rejected() {
    let db = paste_db_with_store(Arc::new(MemoryStore::new()));
    let mut user = owner();
    user.is_active = false;
    let err = db
        .create(CreatePasteRequest::from_content("x"), &user)
        .expect_err("inactive owner");
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[test]
fn size_ceiling_is_inclusive() {
    let db = paste_db_with_store(Arc::new(MemoryStore::new()));
    let user = owner();

    let at_limit = "a".repeat(DEFAULT_MAX_PASTE_CHARS);
    db.create(CreatePasteRequest::from_content(at_limit), &user)
        .expect("content at the ceiling is accepted");

    let over = "a".repeat(DEFAULT_MAX_PASTE_CHARS + 1);
    let err = db
        .create(CreatePasteRequest::from_content(over), &user)
        .expect_err("oversized content");
    assert!(matches!(err, AppError::PayloadTooLarge(_)));
    assert_eq!(db.list_all().expect("list").len(), 1);
}

#[test]
fn size_ceiling_counts_characters_not_bytes() {
    let db = PasteDb::new(Arc::new(MemoryStore::new()), Arc::new(EventBus::new()), 4);
    db.create(CreatePasteRequest::from_content("ññññ"), &owner())
        .expect("four multibyte characters fit");
}

#[test]
fn staff_roles_get_a_larger_limit() {
    let db = PasteDb::new(Arc::new(MemoryStore::new()), Arc::new(EventBus::new()), 10);
    let mut admin = owner();
    admin.role = Role::Admin;
    db.create(CreatePasteRequest::from_content("x".repeat(50)), &admin)
        .expect("admin limit exceeds the default ceiling");

    let mut guest = owner();
    guest.role = Role::Admin;
    guest.is_guest = true;
    assert_eq!(db.limit_for(&guest), 10);
}

#[test]
fn ten_minute_expiry_is_six_hundred_thousand_ms() {
    let db = memory_db();
    let user = register(&db, "alice");
    let paste = db
        .pastes
        .create(
            CreatePasteRequest {
                content: "soon gone".to_string(),
                expiration: Expiration::TenMinutes,
                ..CreatePasteRequest::default()
            },
            &user,
        )
        .expect("create");

    let fetched = db
        .pastes
        .get_by_id(&paste.id)
        .expect("get")
        .expect("fresh paste is readable");
    assert_eq!(fetched.expires, Some(fetched.created + 600_000));
}

#[test]
fn expired_paste_is_evicted_on_read() {
    let db = memory_db();
    let user = register(&db, "alice");
    let paste = db
        .pastes
        .create(CreatePasteRequest::from_content("old"), &user)
        .expect("create");
    expire_now(&db.pastes, &paste);

    assert!(db.pastes.get_by_id(&paste.id).expect("get").is_none());
    assert!(db.pastes.list_all().expect("list").is_empty());
    assert!(db.pastes.peek(&paste.id).expect("peek").is_none());
}

#[test]
fn expired_pastes_are_absent_from_listings_and_purged() {
    let db = memory_db();
    let user = register(&db, "alice");
    let keep = db
        .pastes
        .create(CreatePasteRequest::from_content("keep"), &user)
        .expect("keep");
    let old = db
        .pastes
        .create(CreatePasteRequest::from_content("old"), &user)
        .expect("old");
    expire_now(&db.pastes, &old);

    let ids: Vec<String> = db
        .pastes
        .list_public(10)
        .expect("public")
        .into_iter()
        .map(|paste| paste.id)
        .collect();
    assert_eq!(ids, vec![keep.id.clone()]);
    assert_eq!(db.pastes.purge_expired().expect("purge"), 0);
    assert_eq!(db.pastes.list_by_user(&user.id).expect("by user").len(), 1);
}

#[test]
fn purge_expired_reports_removed_rows() {
    let db = memory_db();
    let user = register(&db, "alice");
    for i in 0..3 {
        let paste = db
            .pastes
            .create(CreatePasteRequest::from_content(format!("{}", i)), &user)
            .expect("create");
        if i > 0 {
            expire_now(&db.pastes, &paste);
        }
    }
    assert_eq!(db.pastes.purge_expired().expect("purge"), 2);
    assert_eq!(db.pastes.snapshot().expect("snapshot").len(), 1);
}

#[test]
fn burn_after_reading_serves_exactly_once() {
    let db = memory_db();
    let user = register(&db, "alice");
    let paste = db
        .pastes
        .create(
            CreatePasteRequest {
                content: "secret".to_string(),
                expiration: Expiration::Burn,
                ..CreatePasteRequest::default()
            },
            &user,
        )
        .expect("create");
    assert!(paste.burn_after_reading);
    assert_eq!(paste.expires, None);

    let first = db
        .pastes
        .get_by_id(&paste.id)
        .expect("get")
        .expect("first read succeeds");
    assert_eq!(first.views, 1);
    assert!(db.pastes.get_by_id(&paste.id).expect("get").is_none());
    assert!(db.pastes.peek(&paste.id).expect("peek").is_none());
}

#[test]
fn peek_does_not_consume_burn_view() {
    let db = memory_db();
    let user = register(&db, "alice");
    let paste = db
        .pastes
        .create(
            CreatePasteRequest {
                content: "secret".to_string(),
                burn_after_reading: true,
                ..CreatePasteRequest::default()
            },
            &user,
        )
        .expect("create");

    assert_eq!(db.pastes.peek(&paste.id).expect("peek").expect("present").views, 0);
    assert!(db.pastes.get_by_id(&paste.id).expect("get").is_some());
}

#[test]
fn returned_paste_is_a_copy() {
    let db = memory_db();
    let user = register(&db, "alice");
    let paste = db
        .pastes
        .create(CreatePasteRequest::from_content("body"), &user)
        .expect("create");

    let mut fetched = db.pastes.get_by_id(&paste.id).expect("get").expect("present");
    fetched.content = "mutated locally".to_string();
    fetched.views = 99;

    let again = db.pastes.get_by_id(&paste.id).expect("get").expect("present");
    assert_eq!(again.content, "body");
    assert_eq!(again.views, 0);
}

#[test]
fn password_check_is_exact() {
    let db = memory_db();
    let user = register(&db, "alice");
    let paste = db
        .pastes
        .create(
            CreatePasteRequest {
                content: "locked".to_string(),
                password: Some("Hunter2".to_string()),
                ..CreatePasteRequest::default()
            },
            &user,
        )
        .expect("create");

    assert!(db.pastes.verify_password(&paste.id, "Hunter2").expect("verify"));
    for wrong in ["hunter2", "Hunter2 ", " Hunter2", ""] {
        assert!(!db.pastes.verify_password(&paste.id, wrong).expect("verify"));
    }
    assert!(!db.pastes.verify_password("missing", "Hunter2").expect("verify"));

    let open = db
        .pastes
        .create(CreatePasteRequest::from_content("open"), &user)
        .expect("create open");
    assert!(!db.pastes.verify_password(&open.id, "").expect("verify"));
}

#[test]
fn increment_views_and_delete() {
    let db = memory_db();
    let user = register(&db, "alice");
    let paste = db
        .pastes
        .create(CreatePasteRequest::from_content("counted"), &user)
        .expect("create");

    assert_eq!(db.pastes.increment_views(&paste.id).expect("inc"), Some(1));
    assert_eq!(db.pastes.increment_views(&paste.id).expect("inc"), Some(2));
    assert_eq!(db.pastes.increment_views("missing").expect("inc"), None);

    assert!(db.pastes.delete(&paste.id).expect("delete"));
    assert!(!db.pastes.delete(&paste.id).expect("delete again"));
    assert!(db.pastes.get_by_id(&paste.id).expect("get").is_none());
}

#[test]
fn list_public_excludes_private_and_sorts_by_created() {
    let db = memory_db();
    let user = register(&db, "alice");
    let mut created = Vec::new();
    for i in 0..4 {
        created.push(
            db.pastes
                .create(CreatePasteRequest::from_content(format!("public {}", i)), &user)
                .expect("create"),
        );
    }
    db.pastes
        .create(
            CreatePasteRequest {
                content: "locked".to_string(),
                password: Some("pw".to_string()),
                ..CreatePasteRequest::default()
            },
            &user,
        )
        .expect("locked");
    db.pastes
        .create(
            CreatePasteRequest {
                content: "burn".to_string(),
                burn_after_reading: true,
                ..CreatePasteRequest::default()
            },
            &user,
        )
        .expect("burn");

    // Spread creation times so ordering does not depend on same-millisecond ties.
    for (offset, paste) in created.iter().enumerate() {
        let mut adjusted = paste.clone();
        adjusted.created = 1_000 + offset as i64;
        db.pastes.update(&adjusted).expect("update");
    }

    let public = db.pastes.list_public(3).expect("public");
    let ids: Vec<&str> = public.iter().map(|paste| paste.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            created[3].id.as_str(),
            created[2].id.as_str(),
            created[1].id.as_str()
        ]
    );
    assert!(db.pastes.list_public(0).expect("public").is_empty());
}

#[test]
fn quota_exhaustion_is_reported_distinctly() {
    let db = PasteDb::new(
        Arc::new(MemoryStore::with_quota(512)),
        Arc::new(EventBus::new()),
        DEFAULT_MAX_PASTE_CHARS,
    );
    let user = owner();
    db.create(CreatePasteRequest::from_content("small"), &user)
        .expect("small paste fits");

    let err = db
        .create(CreatePasteRequest::from_content("x".repeat(1_000)), &user)
        .expect_err("quota exceeded");
    assert!(matches!(err, AppError::QuotaExceeded(_)));
    assert_eq!(db.list_all().expect("list").len(), 1);
}

#[test]
fn corrupt_collection_is_reset_to_empty() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    store
        .set(crate::constants::PASTES_KEY, "[{\"id\": broken")
        .expect("seed corrupt blob");
    let db = paste_db_with_store(store.clone());

    assert!(db.list_all().expect("list").is_empty());
    db.create(CreatePasteRequest::from_content("fresh"), &owner())
        .expect("create after repair");
    assert_eq!(db.list_all().expect("list").len(), 1);
}

#[test]
fn mutations_emit_events() {
    let db = memory_db();
    let rx = db.events.subscribe();
    let user = register(&db, "alice");
    let paste = db
        .pastes
        .create(CreatePasteRequest::from_content("evented"), &user)
        .expect("create");
    db.pastes.update(&paste).expect("update");
    db.pastes.delete(&paste.id).expect("delete");

    let names: Vec<&str> = rx.try_iter().map(|event| event.name()).collect();
    assert_eq!(names, vec!["paste-created", "paste-updated", "paste-deleted"]);
}

#[test]
fn peek_eviction_emits_delete() {
    let db = memory_db();
    let user = register(&db, "alice");
    let paste = db
        .pastes
        .create(CreatePasteRequest::from_content("short lived"), &user)
        .expect("create");
    expire_now(&db.pastes, &paste);
    let rx = db.events.subscribe();

    assert!(db.pastes.peek(&paste.id).expect("peek").is_none());
    let names: Vec<&str> = rx.try_iter().map(|event| event.name()).collect();
    assert_eq!(names, vec!["paste-deleted"]);
}

#[test]
fn sparse_rows_load_with_defaults_and_bad_rows_are_skipped() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let db = paste_db_with_store(store.clone());
    let kept = db
        .create(CreatePasteRequest::from_content("current"), &owner())
        .expect("create");

    let raw = store
        .get(crate::constants::PASTES_KEY)
        .expect("get")
        .expect("collection");
    let mut rows: Vec<serde_json::Value> = serde_json::from_str(&raw).expect("rows");
    rows.push(serde_json::json!({ "id": "legacy1", "content": "old paste" }));
    rows.push(serde_json::json!({ "content": "row without an id" }));
    store
        .set(
            crate::constants::PASTES_KEY,
            &serde_json::to_string(&rows).expect("encode"),
        )
        .expect("seed");

    let pastes = db.list_all().expect("list");
    let ids: Vec<&str> = pastes.iter().map(|paste| paste.id.as_str()).collect();
    assert_eq!(ids, vec![kept.id.as_str(), "legacy1"]);

    let legacy = db.peek("legacy1").expect("peek").expect("legacy row");
    assert_eq!(legacy.content, "old paste");
    assert_eq!(legacy.created, 0);
    assert_eq!(legacy.views, 0);
    assert!(!legacy.is_private());
}

#[test]
fn view_counter_saturates() {
    let db = memory_db();
    let user = register(&db, "alice");
    let mut paste = db
        .pastes
        .create(CreatePasteRequest::from_content("popular"), &user)
        .expect("create");
    paste.views = u64::MAX;
    db.pastes.update(&paste).expect("update");

    assert_eq!(
        db.pastes.increment_views(&paste.id).expect("increment"),
        Some(u64::MAX)
    );
}
