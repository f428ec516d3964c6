//! 集成测试共用的夹具与通用用例
//!
//! 通用用例对任意 [`TokenStore`] 实现都应成立，由各个后端的测试文件调用。

#![allow(dead_code)]

use passwordless_store::{
    Algorithm, Authentication, CollectionTokenStore, FileTokenStore, MemoryProvider, StoreConfig,
    TokenHasher, TokenStore,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const ALICE: &str = "alice@example.com";
pub const BOB: &str = "bob@example.com";
pub const ONE_MINUTE: Duration = Duration::from_secs(60);

/// 测试夹具，持有临时目录直到测试结束
pub struct Fixture<S> {
    pub store: Arc<S>,
    pub dir: Option<TempDir>,
}

/// 低 cost 哈希器，加快测试
pub fn fast_hasher() -> TokenHasher {
    TokenHasher::new(Algorithm::Bcrypt).with_bcrypt_cost(4)
}

pub fn memory_store() -> Fixture<CollectionTokenStore<MemoryProvider>> {
    let store =
        CollectionTokenStore::with_parts(MemoryProvider::new(), fast_hasher(), StoreConfig::default())
            .unwrap();
    Fixture {
        store: Arc::new(store),
        dir: None,
    }
}

pub fn file_store() -> Fixture<FileTokenStore> {
    let dir = tempfile::tempdir().unwrap();
    let location = dir.path().join("tokenstore-test.json");
    let store =
        FileTokenStore::with_hasher(location.to_str().unwrap(), fast_hasher(), StoreConfig::default())
            .unwrap();
    Fixture {
        store: Arc::new(store),
        dir: Some(dir),
    }
}

// ============================================================================
// 通用用例
// ============================================================================

pub async fn issue_then_authenticate<S: TokenStore>(store: &S) {
    store
        .issue("tok-A", ALICE, ONE_MINUTE, Some("https://x/page"))
        .await
        .unwrap();

    let result = store.authenticate("tok-A", ALICE).await.unwrap();
    assert_eq!(
        result,
        Authentication::Granted {
            origin_url: "https://x/page".to_string()
        }
    );

    let wrong = store.authenticate("wrong-token", ALICE).await.unwrap();
    assert_eq!(wrong, Authentication::Denied);
    assert_eq!(wrong.origin_url(), None);

    assert_eq!(store.count().await.unwrap(), 1);

    store.invalidate(ALICE).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 0);
    assert_eq!(
        store.authenticate("tok-A", ALICE).await.unwrap(),
        Authentication::Denied
    );
}

pub async fn unknown_user_is_denied<S: TokenStore>(store: &S) {
    let result = store.authenticate("tok-A", ALICE).await.unwrap();
    assert!(!result.is_valid());
    assert_eq!(result.origin_url(), None);
}

pub async fn token_of_other_user_is_denied<S: TokenStore>(store: &S) {
    store.issue("tok-A", ALICE, ONE_MINUTE, None).await.unwrap();
    store.issue("tok-B", BOB, ONE_MINUTE, None).await.unwrap();

    assert!(!store.authenticate("tok-A", BOB).await.unwrap().is_valid());
    assert!(!store.authenticate("tok-B", ALICE).await.unwrap().is_valid());
    assert!(store.authenticate("tok-A", ALICE).await.unwrap().is_valid());
    assert!(store.authenticate("tok-B", BOB).await.unwrap().is_valid());
}

pub async fn missing_origin_url_is_empty_string<S: TokenStore>(store: &S) {
    store.issue("tok-A", ALICE, ONE_MINUTE, None).await.unwrap();
    store.issue("tok-B", BOB, ONE_MINUTE, Some("")).await.unwrap();

    let alice = store.authenticate("tok-A", ALICE).await.unwrap();
    assert_eq!(alice.origin_url(), Some(""));

    let bob = store.authenticate("tok-B", BOB).await.unwrap();
    assert_eq!(bob.origin_url(), Some(""));
}

pub async fn expired_token_is_denied<S: TokenStore>(store: &S) {
    store
        .issue("tok-A", ALICE, Duration::from_millis(50), Some("https://x/page"))
        .await
        .unwrap();
    assert!(store.authenticate("tok-A", ALICE).await.unwrap().is_valid());

    tokio::time::sleep(Duration::from_millis(150)).await;

    // 记录仍在，但已经无效
    assert_eq!(store.count().await.unwrap(), 1);
    assert!(!store.authenticate("tok-A", ALICE).await.unwrap().is_valid());
}

pub async fn reissue_invalidates_previous_token<S: TokenStore>(store: &S) {
    store
        .issue("tok-old", ALICE, ONE_MINUTE, Some("https://x/old"))
        .await
        .unwrap();
    store
        .issue("tok-new", ALICE, ONE_MINUTE, Some("https://x/new"))
        .await
        .unwrap();

    assert_eq!(store.count().await.unwrap(), 1);
    assert!(!store.authenticate("tok-old", ALICE).await.unwrap().is_valid());

    let result = store.authenticate("tok-new", ALICE).await.unwrap();
    assert_eq!(result.origin_url(), Some("https://x/new"));
}

pub async fn reissue_after_expiry_works<S: TokenStore>(store: &S) {
    store
        .issue("tok-old", ALICE, Duration::from_millis(30), None)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(80)).await;

    store.issue("tok-new", ALICE, ONE_MINUTE, None).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 1);
    assert!(store.authenticate("tok-new", ALICE).await.unwrap().is_valid());
}

pub async fn invalidate_is_scoped_and_idempotent<S: TokenStore>(store: &S) {
    store.issue("tok-A", ALICE, ONE_MINUTE, None).await.unwrap();
    store.issue("tok-B", BOB, ONE_MINUTE, None).await.unwrap();

    store.invalidate(ALICE).await.unwrap();
    store.invalidate(ALICE).await.unwrap();
    store.invalidate("nobody@example.com").await.unwrap();

    assert_eq!(store.count().await.unwrap(), 1);
    assert!(!store.authenticate("tok-A", ALICE).await.unwrap().is_valid());
    assert!(store.authenticate("tok-B", BOB).await.unwrap().is_valid());
}

pub async fn clear_removes_everything<S: TokenStore>(store: &S) {
    for i in 0..5 {
        let uid = format!("user{}@example.com", i);
        store
            .issue(&format!("tok-{}", i), &uid, ONE_MINUTE, None)
            .await
            .unwrap();
    }
    assert_eq!(store.count().await.unwrap(), 5);

    store.clear().await.unwrap();
    assert_eq!(store.count().await.unwrap(), 0);
    for i in 0..5 {
        let uid = format!("user{}@example.com", i);
        assert!(
            !store
                .authenticate(&format!("tok-{}", i), &uid)
                .await
                .unwrap()
                .is_valid()
        );
    }

    // 清空后可以继续签发
    store.issue("tok-A", ALICE, ONE_MINUTE, None).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 1);
}

pub async fn authenticate_does_not_consume<S: TokenStore>(store: &S) {
    store.issue("tok-A", ALICE, ONE_MINUTE, None).await.unwrap();

    for _ in 0..3 {
        assert!(store.authenticate("tok-A", ALICE).await.unwrap().is_valid());
    }
    assert_eq!(store.count().await.unwrap(), 1);
}

pub async fn contract_violations_are_errors<S: TokenStore>(store: &S) {
    let err = store.issue("", ALICE, ONE_MINUTE, None).await.unwrap_err();
    assert!(err.is_contract_violation());

    let err = store
        .issue("tok-A", ALICE, Duration::ZERO, None)
        .await
        .unwrap_err();
    assert!(err.is_contract_violation());

    let err = store.authenticate("tok-A", "").await.unwrap_err();
    assert!(err.is_contract_violation());

    let err = store.invalidate("").await.unwrap_err();
    assert!(err.is_contract_violation());

    assert_eq!(store.count().await.unwrap(), 0);
}

pub async fn concurrent_issue_keeps_one_record<S: TokenStore + 'static>(store: Arc<S>) {
    let mut handles = Vec::new();
    for i in 0..4 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .issue(&format!("tok-{}", i), ALICE, ONE_MINUTE, None)
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // 最后写入者获胜，只有一个 token 有效
    assert_eq!(store.count().await.unwrap(), 1);
    let mut valid = 0;
    for i in 0..4 {
        if store
            .authenticate(&format!("tok-{}", i), ALICE)
            .await
            .unwrap()
            .is_valid()
        {
            valid += 1;
        }
    }
    assert_eq!(valid, 1);
}
