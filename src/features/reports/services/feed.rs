//! Live jurisdiction-scoped report feed.
//!
//! One `DashboardSession` exists per signed-in organisation. Its runtime
//! task watches the session identity; on every change it tears down the
//! current store subscription (cancel flag + abort), resolves the new
//! jurisdiction, and subscribes afresh. Jurisdiction resolution is strictly
//! sequenced after identity resolution, and the subscription after
//! jurisdiction resolution. The cancel flag is checked before every publish
//! so a superseded subscription can never overwrite current state, even
//! transiently.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::config::StoreConfig;
use crate::features::auth::model::Identity;
use crate::features::auth::SessionProvider;
use crate::features::jurisdiction::JurisdictionService;
use crate::features::reports::models::Report;
use crate::modules::store::{Document, DocumentStore};

/// Recompute the jurisdiction-scoped list from a full collection snapshot.
///
/// A report is visible iff its trimmed pincode is a member of the
/// jurisdiction set; reports without a pincode are never visible, and an
/// empty set scopes everything out. The result is sorted newest first, the
/// canonical baseline order.
pub fn scope_reports(documents: &[Document], pincodes: &[String]) -> Vec<Report> {
    if pincodes.is_empty() {
        return Vec::new();
    }

    let mut reports: Vec<Report> = documents
        .iter()
        .map(Report::from_document)
        .filter(|report| {
            report
                .pincode
                .as_deref()
                .is_some_and(|p| pincodes.iter().any(|j| j == p))
        })
        .collect();

    reports.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));
    reports
}

/// A signed-in organisation's live dashboard session
pub struct DashboardSession {
    provider: SessionProvider,
    feed: watch::Receiver<Vec<Report>>,
}

impl DashboardSession {
    pub fn provider(&self) -> &SessionProvider {
        &self.provider
    }

    /// Current scoped snapshot
    pub fn snapshot(&self) -> Vec<Report> {
        self.feed.borrow().clone()
    }

    /// Live subscription to scoped snapshots
    pub fn feed(&self) -> watch::Receiver<Vec<Report>> {
        self.feed.clone()
    }
}

/// Creates and tracks one `DashboardSession` per organisation email.
pub struct SessionRegistry {
    store: Arc<dyn DocumentStore>,
    jurisdiction: Arc<JurisdictionService>,
    reports_collection: String,
    sessions: Mutex<HashMap<String, Arc<DashboardSession>>>,
}

impl SessionRegistry {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        jurisdiction: Arc<JurisdictionService>,
        config: &StoreConfig,
    ) -> Self {
        Self {
            store,
            jurisdiction,
            reports_collection: config.reports_collection.clone(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Session for an authenticated identity, creating it on first touch
    pub fn session_for(&self, identity: &Identity) -> Arc<DashboardSession> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(session) = sessions.get(&identity.email) {
            // Rebinds after an earlier sign-out, and is a no-op otherwise
            session.provider.publish(identity.clone());
            return Arc::clone(session);
        }

        let provider = SessionProvider::new(Some(identity.clone()));
        let feed = FeedRuntime::new(
            Arc::clone(&self.store),
            Arc::clone(&self.jurisdiction),
            self.reports_collection.clone(),
        )
        .spawn(provider.watch());

        let session = Arc::new(DashboardSession { provider, feed });
        sessions.insert(identity.email.clone(), Arc::clone(&session));
        tracing::info!("Dashboard session started for {}", identity.email);
        session
    }

    /// Sign the identity out and drop its session; the runtime tears the
    /// feed down and exits once the last handle is gone.
    pub fn sign_out(&self, email: &str) {
        let removed = {
            let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
            sessions.remove(email)
        };
        if let Some(session) = removed {
            session.provider.sign_out();
            tracing::info!("Dashboard session ended for {}", email);
        }
    }
}

/// Owns the identity -> jurisdiction -> subscription sequencing for one
/// session.
pub struct FeedRuntime {
    store: Arc<dyn DocumentStore>,
    jurisdiction: Arc<JurisdictionService>,
    reports_collection: String,
}

impl FeedRuntime {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        jurisdiction: Arc<JurisdictionService>,
        reports_collection: String,
    ) -> Self {
        Self {
            store,
            jurisdiction,
            reports_collection,
        }
    }

    /// Spawn the runtime task; the returned receiver yields scoped
    /// snapshots for the identity currently bound to `identity_rx`.
    pub fn spawn(self, identity_rx: watch::Receiver<Option<Identity>>) -> watch::Receiver<Vec<Report>> {
        let (feed_tx, feed_rx) = watch::channel(Vec::new());
        tokio::spawn(self.run(identity_rx, feed_tx));
        feed_rx
    }

    async fn run(
        self,
        mut identity_rx: watch::Receiver<Option<Identity>>,
        feed_tx: watch::Sender<Vec<Report>>,
    ) {
        let mut active: Option<ActiveSubscription> = None;

        loop {
            let identity = identity_rx.borrow_and_update().clone();

            // Tear down the superseded subscription before anything else;
            // no stale-jurisdiction data may be shown after a change.
            if let Some(previous) = active.take() {
                previous.teardown();
            }
            let _ = feed_tx.send(Vec::new());

            if let Some(identity) = identity {
                // Jurisdiction resolution is sequenced after identity
                // resolution; the subscription after both.
                match self.jurisdiction.resolve(&identity.email).await {
                    Ok(pincodes) => {
                        // The identity may have changed while resolving;
                        // if so, skip straight to the next iteration.
                        if !identity_rx.has_changed().unwrap_or(true) {
                            active = Some(self.subscribe_scoped(pincodes, feed_tx.clone()).await);
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            "Jurisdiction resolution failed for {}: {}; feed degrades to empty",
                            identity.email,
                            e
                        );
                    }
                }
            }

            if identity_rx.changed().await.is_err() {
                // Session provider is gone; final teardown.
                if let Some(previous) = active.take() {
                    previous.teardown();
                }
                return;
            }
        }
    }

    async fn subscribe_scoped(
        &self,
        pincodes: Vec<String>,
        feed_tx: watch::Sender<Vec<Report>>,
    ) -> ActiveSubscription {
        let cancelled = Arc::new(AtomicBool::new(false));
        let task = SubscriptionTask {
            store: Arc::clone(&self.store),
            collection: self.reports_collection.clone(),
            pincodes,
            feed_tx,
            cancelled: Arc::clone(&cancelled),
        };
        let handle = tokio::spawn(task.run());
        ActiveSubscription { cancelled, handle }
    }
}

struct ActiveSubscription {
    cancelled: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl ActiveSubscription {
    fn teardown(self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.handle.abort();
    }
}

struct SubscriptionTask {
    store: Arc<dyn DocumentStore>,
    collection: String,
    pincodes: Vec<String>,
    feed_tx: watch::Sender<Vec<Report>>,
    cancelled: Arc<AtomicBool>,
}

impl SubscriptionTask {
    async fn run(self) {
        // Subscribe before the initial fetch so a change landing in between
        // is not missed; each notification is a full snapshot anyway.
        let mut subscription = match self.store.subscribe(&self.collection).await {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::error!("Report subscription failed: {}; feed degrades to empty", e);
                return;
            }
        };

        match self.store.list(&self.collection).await {
            Ok(documents) => self.publish(&documents),
            Err(e) => {
                tracing::error!("Initial report fetch failed: {}; feed degrades to empty", e);
            }
        }

        while let Some(snapshot) = subscription.recv().await {
            if self.cancelled.load(Ordering::SeqCst) {
                return;
            }
            self.publish(&snapshot);
        }
    }

    fn publish(&self, documents: &[Document]) {
        // Checked immediately before every state update
        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }
        let _ = self.feed_tx.send(scope_reports(documents, &self.pincodes));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::store::MemoryDocumentStore;
    use serde_json::json;
    use std::time::Duration;

    fn store_config() -> StoreConfig {
        StoreConfig {
            base_url: "http://store.local".to_string(),
            api_key: "test".to_string(),
            reports_collection: "reports".to_string(),
            pincodes_collection: "pincodes".to_string(),
            organisations_collection: "organisations".to_string(),
            poll_interval: Duration::from_secs(5),
        }
    }

    fn doc(id: &str, fields: serde_json::Value) -> Document {
        Document::new(id, fields.as_object().cloned().unwrap())
    }

    fn report_doc(id: &str, pincode: &str, ts: i64) -> Document {
        doc(id, json!({ "pincode": pincode, "status": "pending", "timestamp": ts }))
    }

    fn identity(email: &str) -> Identity {
        Identity {
            uid: format!("uid-{}", email),
            email: email.to_string(),
        }
    }

    async fn wait_for<F>(rx: &mut watch::Receiver<Vec<Report>>, predicate: F) -> Vec<Report>
    where
        F: Fn(&[Report]) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                {
                    let current = rx.borrow_and_update();
                    if predicate(&current) {
                        return current.clone();
                    }
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .expect("feed did not converge")
    }

    #[test]
    fn scoping_keeps_only_member_pincodes_and_sorts_newest_first() {
        let documents = vec![
            report_doc("a", "110001", 100),
            report_doc("b", "110002", 300),
            doc("c", json!({ "status": "pending", "timestamp": 200 })),
            report_doc("d", "110003", 400),
        ];
        let pincodes = vec!["110001".to_string(), "110002".to_string()];

        let scoped = scope_reports(&documents, &pincodes);
        let ids: Vec<&str> = scoped.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn scoping_trims_report_pincodes() {
        let documents = vec![doc(
            "a",
            json!({ "pincode": " 110002 ", "timestamp": 1 }),
        )];
        let pincodes = vec!["110002".to_string()];
        assert_eq!(scope_reports(&documents, &pincodes).len(), 1);
    }

    #[test]
    fn empty_jurisdiction_scopes_everything_out() {
        let documents = vec![report_doc("a", "110001", 100)];
        assert!(scope_reports(&documents, &[]).is_empty());
    }

    #[tokio::test]
    async fn feed_converges_to_the_scoped_snapshot() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.put(
            "pincodes",
            doc("p1", json!({ "email": "org@example.org", "pincodes": ["110001", " 110002 "] })),
        );
        store.put("reports", report_doc("r1", "110002", 100));
        store.put("reports", report_doc("r2", "110003", 200));

        let jurisdiction = Arc::new(JurisdictionService::new(
            store.clone() as Arc<dyn DocumentStore>,
            &store_config(),
        ));
        let registry = SessionRegistry::new(
            store.clone() as Arc<dyn DocumentStore>,
            jurisdiction,
            &store_config(),
        );

        let session = registry.session_for(&identity("org@example.org"));
        let mut feed = session.feed();

        let scoped = wait_for(&mut feed, |reports| reports.len() == 1).await;
        assert_eq!(scoped[0].id, "r1");

        // A store mutation reaches the feed
        store.put("reports", report_doc("r3", "110001", 300));
        let scoped = wait_for(&mut feed, |reports| reports.len() == 2).await;
        assert_eq!(scoped[0].id, "r3");
    }

    #[tokio::test]
    async fn sign_out_clears_the_feed() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.put(
            "pincodes",
            doc("p1", json!({ "email": "org@example.org", "pincodes": ["110001"] })),
        );
        store.put("reports", report_doc("r1", "110001", 100));

        let jurisdiction = Arc::new(JurisdictionService::new(
            store.clone() as Arc<dyn DocumentStore>,
            &store_config(),
        ));
        let registry = SessionRegistry::new(
            store.clone() as Arc<dyn DocumentStore>,
            jurisdiction,
            &store_config(),
        );

        let session = registry.session_for(&identity("org@example.org"));
        let mut feed = session.feed();
        wait_for(&mut feed, |reports| reports.len() == 1).await;

        registry.sign_out("org@example.org");
        wait_for(&mut feed, |reports| reports.is_empty()).await;

        // Mutations after sign-out never resurface in the torn-down feed
        store.put("reports", report_doc("r2", "110001", 200));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(feed.borrow().is_empty());
    }

    #[tokio::test]
    async fn empty_jurisdiction_keeps_feed_empty_regardless_of_reports() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.put("reports", report_doc("r1", "110001", 100));

        let jurisdiction = Arc::new(JurisdictionService::new(
            store.clone() as Arc<dyn DocumentStore>,
            &store_config(),
        ));
        let registry = SessionRegistry::new(
            store.clone() as Arc<dyn DocumentStore>,
            jurisdiction,
            &store_config(),
        );

        let session = registry.session_for(&identity("unconfigured@example.org"));
        let mut feed = session.feed();

        store.put("reports", report_doc("r2", "110002", 200));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(wait_for(&mut feed, |reports| reports.is_empty())
            .await
            .is_empty());
    }
}
