//! Model-level unit tests.

use super::paste::*;
use super::stats::UserStats;
use super::user::*;
use crate::roles::Role;
use chrono::{TimeZone, Utc};

#[test]
fn expiration_presets_parse_and_display() {
    for preset in ["10m", "1h", "1d", "1w", "1m", "never", "burn"] {
        let parsed: Expiration = preset.parse().expect("known preset");
        assert_eq!(parsed.to_string(), preset);
    }
    assert_eq!(" NEVER ".parse::<Expiration>(), Ok(Expiration::Never));
    assert!("2y".parse::<Expiration>().is_err());
}

#[test]
fn fixed_durations_add_exact_milliseconds() {
    let created = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
    let base = created.timestamp_millis();
    assert_eq!(Expiration::TenMinutes.expires_at(created), Some(base + 600_000));
    assert_eq!(Expiration::OneHour.expires_at(created), Some(base + 3_600_000));
    assert_eq!(Expiration::OneDay.expires_at(created), Some(base + 86_400_000));
    assert_eq!(
        Expiration::OneWeek.expires_at(created),
        Some(base + 7 * 86_400_000)
    );
    assert_eq!(Expiration::Never.expires_at(created), None);
    assert_eq!(Expiration::Burn.expires_at(created), None);
}

#[test]
fn one_month_uses_calendar_arithmetic() {
    let jan_31 = Utc.with_ymd_and_hms(2024, 1, 31, 8, 30, 0).unwrap();
    let expected = Utc.with_ymd_and_hms(2024, 2, 29, 8, 30, 0).unwrap();
    assert_eq!(
        Expiration::OneMonth.expires_at(jan_31),
        Some(expected.timestamp_millis())
    );

    let mid_april = Utc.with_ymd_and_hms(2023, 4, 15, 0, 0, 0).unwrap();
    let mid_may = Utc.with_ymd_and_hms(2023, 5, 15, 0, 0, 0).unwrap();
    assert_eq!(
        Expiration::OneMonth.expires_at(mid_april),
        Some(mid_may.timestamp_millis())
    );
}

#[test]
fn paste_serializes_with_camel_case_keys() {
    let paste = Paste {
        id: "abc12345".to_string(),
        title: "t".to_string(),
        content: "c".to_string(),
        language: "rust".to_string(),
        created: 1,
        expires: None,
        password: None,
        burn_after_reading: true,
        views: 0,
        user_id: Some("u1".to_string()),
    };
    let value = serde_json::to_value(&paste).expect("encode");
    assert_eq!(value["burnAfterReading"], true);
    assert_eq!(value["userId"], "u1");
    assert!(value["expires"].is_null());
}

#[test]
fn paste_privacy_and_expiry_helpers() {
    let mut paste: Paste = serde_json::from_str(
        r#"{"id":"p1","content":"x","created":1000,"expires":2000}"#,
    )
    .expect("decode sparse paste");
    assert_eq!(paste.language, DEFAULT_LANGUAGE);
    assert!(!paste.is_private());
    assert!(!paste.is_expired_at(1999));
    assert!(paste.is_expired_at(2000));

    paste.password = Some("pw".to_string());
    assert!(paste.is_private());
}

#[test]
fn language_and_password_normalization() {
    assert_eq!(normalize_language(Some("  Rust ")), "rust");
    assert_eq!(normalize_language(Some("   ")), DEFAULT_LANGUAGE);
    assert_eq!(normalize_language(None), DEFAULT_LANGUAGE);
    assert_eq!(normalize_password(Some("")), None);
    assert_eq!(normalize_password(Some(" pw ")), Some(" pw ".to_string()));
}

#[test]
fn sparse_user_records_are_repaired_on_decode() {
    let user: User = serde_json::from_str(
        r#"{"id":"u1","email":"a@x.com","username":"alice","password":"pw"}"#,
    )
    .expect("decode sparse user");
    assert_eq!(user.role, Role::User);
    assert!(user.is_active);
    assert!(!user.is_guest);
    assert!(user.is_registered());
    assert!(user.profile.is_none());
}

#[test]
fn sparse_paste_rows_decode_with_defaults() {
    let paste: Paste =
        serde_json::from_str(r#"{"id":"legacy1","content":"old paste"}"#).expect("decode");
    assert_eq!(paste.title, "");
    assert_eq!(paste.language, DEFAULT_LANGUAGE);
    assert_eq!(paste.created, 0);
    assert_eq!(paste.views, 0);
    assert!(paste.expires.is_none());

    let bare: Paste = serde_json::from_str(r#"{"id":"legacy2"}"#).expect("decode");
    assert!(bare.content.is_empty());
    assert!(serde_json::from_str::<Paste>(r#"{"content":"no id"}"#).is_err());
}

#[test]
fn user_matching_ignores_case_and_whitespace() {
    let user = User::new(
        "u1".to_string(),
        "Alice@Example.com".to_string(),
        "Alice".to_string(),
        "pw".to_string(),
    );
    assert!(user.email_matches(" alice@example.COM"));
    assert!(user.username_matches("ALICE"));
    assert!(!user.username_matches("alicia"));
}

#[test]
fn profile_resolution_applies_overrides_in_precedence_order() {
    let base = Profile {
        bio: Some("base bio".to_string()),
        location: Some("Base City".to_string()),
        website: Some("https://base.example".to_string()),
        ..Profile::default()
    };
    let contact = ProfileUpdate {
        location: Some("Contact City".to_string()),
        website: Some("https://contact.example".to_string()),
        ..ProfileUpdate::default()
    };
    let profile_override = ProfileUpdate {
        website: Some("https://override.example".to_string()),
        github: Some("octo".to_string()),
        ..ProfileUpdate::default()
    };

    let resolved = resolve_profile(Some(&base), Some(&contact), Some(&profile_override));
    assert_eq!(resolved.bio.as_deref(), Some("base bio"));
    assert_eq!(resolved.location.as_deref(), Some("Contact City"));
    assert_eq!(resolved.website.as_deref(), Some("https://override.example"));
    assert_eq!(resolved.github.as_deref(), Some("octo"));
}

#[test]
fn empty_override_field_clears_value() {
    let base = Profile {
        bio: Some("old".to_string()),
        ..Profile::default()
    };
    let clear = ProfileUpdate {
        bio: Some(String::new()),
        ..ProfileUpdate::default()
    };
    assert_eq!(resolve_profile(Some(&base), None, Some(&clear)).bio, None);
}

#[test]
fn merged_updates_prefer_newer_fields() {
    let older = ProfileUpdate {
        bio: Some("one".to_string()),
        location: Some("here".to_string()),
        ..ProfileUpdate::default()
    };
    let newer = ProfileUpdate {
        bio: Some("two".to_string()),
        ..ProfileUpdate::default()
    };
    let merged = older.merged_with(&newer);
    assert_eq!(merged.bio.as_deref(), Some("two"));
    assert_eq!(merged.location.as_deref(), Some("here"));
    assert!(!merged.is_empty());
    assert!(ProfileUpdate::default().is_empty());
}

#[test]
fn stats_counter_comparison_ignores_timestamp() {
    let a = UserStats {
        total_pastes: 2,
        last_updated: Some(Utc::now()),
        ..UserStats::default()
    };
    let b = UserStats {
        total_pastes: 2,
        last_updated: None,
        ..UserStats::default()
    };
    assert!(a.same_counters(&b));
}
