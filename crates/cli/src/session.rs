use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum Role {
    SuperAdmin,
    Admin,
    ReadOnly,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super-admin",
            Role::Admin => "admin",
            Role::ReadOnly => "read-only",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i64,
    pub login: String,
    pub role: Role,
}

/// Process-wide current user. Views subscribe when they mount and drop or
/// `unsubscribe` their handle when they unmount.
pub struct SessionHub {
    tx: watch::Sender<Option<SessionUser>>,
}

impl SessionHub {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn login(&self, user: SessionUser) {
        self.tx.send_replace(Some(user));
    }

    pub fn logout(&self) {
        self.tx.send_if_modified(|current| current.take().is_some());
    }

    pub fn current(&self) -> Option<SessionUser> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscribers(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SessionSubscription {
    rx: watch::Receiver<Option<SessionUser>>,
}

impl SessionSubscription {
    /// Latest user; marks the value as seen.
    pub fn current(&mut self) -> Option<SessionUser> {
        self.rx.borrow_and_update().clone()
    }

    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Wait for the next login/logout. `None` once the hub is gone.
    pub async fn changed(&mut self) -> Option<Option<SessionUser>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    pub fn unsubscribe(self) {}
}
