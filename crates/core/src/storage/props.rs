//! Property-based tests for key layout, public URLs, upload policy and
//! listing.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use super::config::StorageSettings;
use super::error::StorageError;
use super::prefix::StoragePrefix;
use super::service::{ListOptions, UnifiedStorage};
use crate::testing::MemoryBackend;

fn prefix_strategy() -> impl Strategy<Value = StoragePrefix> {
    prop_oneof![Just(StoragePrefix::Avatars), Just(StoragePrefix::Diaries)]
}

/// Relative paths, including leading slashes and empty strings.
fn relative_path() -> impl Strategy<Value = String> {
    "/{0,3}[a-z0-9._-]{0,12}(/[a-z0-9._-]{1,12}){0,3}"
}

fn settings_strategy() -> impl Strategy<Value = StorageSettings> {
    prop_oneof![
        Just(StorageSettings::minio(
            "http://127.0.0.1:9000",
            "app",
            "minioadmin",
            "minioadmin",
            None,
        )),
        Just(StorageSettings::r2(
            "acct",
            "kiroku",
            "key",
            "secret",
            "https://cdn.example.com/",
        )),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every key lands under its own prefix and never under another one.
    #[test]
    fn prop_object_key_stays_inside_prefix(
        settings in settings_strategy(),
        prefix in prefix_strategy(),
        path in relative_path(),
    ) {
        let key = settings.resolve_object_key(prefix, &path);
        let own = format!("{}/", prefix.as_str());
        prop_assert!(key.starts_with(&own));

        for other in StoragePrefix::ALL.into_iter().filter(|p| *p != prefix) {
            let foreign = format!("{}/", other.as_str());
            prop_assert!(!key.starts_with(&foreign));
        }
    }

    /// Stripping the public base from a public URL yields the object key.
    #[test]
    fn prop_public_url_round_trip(
        settings in settings_strategy(),
        prefix in prefix_strategy(),
        path in relative_path(),
    ) {
        let url = settings.build_public_url(prefix, &path);
        let base = format!("{}/", settings.public_base_url());
        let stripped = url.strip_prefix(&base);
        prop_assert!(stripped.is_some());

        let key = settings.resolve_object_key(prefix, &path);
        prop_assert_eq!(stripped.unwrap_or_default(), key.trim_end_matches('/'));
    }

    /// Sizes up to the limit pass; one byte more fails.
    #[test]
    fn prop_size_boundary(prefix in prefix_strategy(), size in 0u64..=5 * 1024 * 1024) {
        let config = prefix.config();
        prop_assert!(config.validate_file("image/png", size).is_ok());
        let over = config.validate_file("image/png", config.max_file_size + 1 + size);
        prop_assert!(
            matches!(over, Err(StorageError::FileTooLarge { .. })),
            "expected FileTooLarge"
        );
    }

    /// MIME types outside the allow list are rejected at any size.
    #[test]
    fn prop_unknown_mime_rejected(
        prefix in prefix_strategy(),
        mime in "[a-z]{1,10}/[a-z0-9.+-]{1,10}",
        size in 0u64..10 * 1024 * 1024,
    ) {
        let config = prefix.config();
        prop_assume!(!config.allowed_mime_types.contains(&mime.as_str()));

        let result = config.validate_file(&mime, size);
        prop_assert!(
            matches!(result, Err(StorageError::InvalidMimeType { .. })),
            "expected InvalidMimeType"
        );
    }

    /// Keys ending in `/` never appear in a listing.
    #[test]
    fn prop_directory_markers_never_listed(
        names in prop::collection::btree_set("[a-z]{1,6}/?", 0..20),
    ) {
        let settings = Arc::new(StorageSettings::minio("http://m:9000", "app", "a", "s", None));
        let backend = Arc::new(MemoryBackend::new());
        for (i, name) in names.iter().enumerate() {
            let ts = Utc.timestamp_opt(1_700_000_000 + i64::try_from(i).unwrap_or(0), 0).unwrap();
            backend.insert(&format!("diaries/u1/{name}"), ts);
        }
        let storage = UnifiedStorage::new(StoragePrefix::Diaries, settings, backend);

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let items = runtime
            .block_on(storage.list(Some("u1"), ListOptions::default()))
            .unwrap();

        let files = names.iter().filter(|n| !n.ends_with('/')).count();
        prop_assert_eq!(items.len(), files);
        prop_assert!(items.iter().all(|item| !item.path.ends_with('/')));
    }
}
