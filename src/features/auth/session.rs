//! Session provider: the observable identity a live dashboard session is
//! keyed on.
//!
//! The identity provider owns authentication; this type only republishes the
//! identity it handed us, and notifies watchers when it changes. Watchers
//! (the report feed runtime) tear down and rebuild their subscriptions on
//! every change.

use tokio::sync::watch;

use crate::features::auth::model::Identity;

pub struct SessionProvider {
    identity: watch::Sender<Option<Identity>>,
}

impl SessionProvider {
    pub fn new(initial: Option<Identity>) -> Self {
        let (identity, _) = watch::channel(initial);
        Self { identity }
    }

    /// The identity currently bound to this session, if any
    pub fn current_identity(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }

    /// Change-notification subscription. The receiver yields on every
    /// identity change, including sign-out.
    pub fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.subscribe()
    }

    /// Bind a new identity to the session
    pub fn publish(&self, identity: Identity) {
        self.identity.send_if_modified(|current| {
            if current.as_ref() == Some(&identity) {
                return false;
            }
            *current = Some(identity);
            true
        });
    }

    /// Clear the session identity; watchers tear down their feeds
    pub fn sign_out(&self) {
        self.identity.send_if_modified(|current| {
            if current.is_none() {
                return false;
            }
            *current = None;
            true
        });
    }
}

impl Default for SessionProvider {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(email: &str) -> Identity {
        Identity {
            uid: format!("uid-{}", email),
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn watchers_are_notified_on_change_and_sign_out() {
        let provider = SessionProvider::new(None);
        let mut rx = provider.watch();

        provider.publish(identity("org@example.org"));
        rx.changed().await.unwrap();
        assert_eq!(
            rx.borrow_and_update().as_ref().map(|i| i.email.clone()),
            Some("org@example.org".to_string())
        );

        provider.sign_out();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
    }

    #[tokio::test]
    async fn republishing_the_same_identity_is_not_a_change() {
        let provider = SessionProvider::new(Some(identity("org@example.org")));
        let mut rx = provider.watch();

        provider.publish(identity("org@example.org"));
        assert!(!rx.has_changed().unwrap());
    }
}
