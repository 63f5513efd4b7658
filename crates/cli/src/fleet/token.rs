use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::error::FleetError;
use crate::transport::DynFleetTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenPhase {
    Hidden,
    Loading,
    Shown,
    /// Regeneration in flight; the instruction stays visible.
    Regenerating,
}

/// Fleet-wide agent installation token as seen by the UI.
///
/// Renderers must check `visible` before showing `value`: closing keeps the
/// last value around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenState {
    pub phase: TokenPhase,
    pub visible: bool,
    pub value: String,
}

impl Default for TokenState {
    fn default() -> Self {
        Self {
            phase: TokenPhase::Hidden,
            visible: false,
            value: String::new(),
        }
    }
}

pub struct TokenLifecycleManager {
    transport: DynFleetTransport,
    tx: watch::Sender<TokenState>,
    fetch_attempt: AtomicU64,
}

impl TokenLifecycleManager {
    pub fn new(transport: DynFleetTransport) -> Self {
        let (tx, _) = watch::channel(TokenState::default());
        Self {
            transport,
            tx,
            fetch_attempt: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> TokenState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TokenState> {
        self.tx.subscribe()
    }

    /// Hidden -> Loading -> Shown. A no-op while loading or shown.
    pub async fn show(&self) -> Result<(), FleetError> {
        match self.begin_show() {
            Some(attempt) => self.complete_show(attempt).await,
            None => Ok(()),
        }
    }

    /// Enter Loading and return the fetch attempt, or `None` when the
    /// instruction is already loading or open.
    pub fn begin_show(&self) -> Option<u64> {
        let started = self.tx.send_if_modified(|state| {
            if state.phase != TokenPhase::Hidden {
                return false;
            }
            state.phase = TokenPhase::Loading;
            true
        });
        if !started {
            debug!("token instruction already open or loading");
            return None;
        }
        Some(self.fetch_attempt.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub async fn complete_show(&self, attempt: u64) -> Result<(), FleetError> {
        let outcome = self.transport.fetch_installation_token().await;
        let current = self.fetch_attempt.load(Ordering::SeqCst) == attempt;

        match outcome {
            Ok(token) => {
                let shown = self.tx.send_if_modified(|state| {
                    if !current || state.phase != TokenPhase::Loading {
                        return false;
                    }
                    state.phase = TokenPhase::Shown;
                    state.visible = true;
                    state.value = token;
                    true
                });
                if !shown {
                    debug!(attempt, "token fetched after the instruction was closed");
                }
                Ok(())
            }
            Err(err) if current => {
                self.tx.send_modify(|state| {
                    if state.phase == TokenPhase::Loading {
                        state.phase = TokenPhase::Hidden;
                    }
                    state.visible = false;
                    state.value.clear();
                });
                Err(err)
            }
            Err(err) => {
                debug!(attempt, %err, "ignoring failure of superseded token fetch");
                Ok(())
            }
        }
    }

    /// Shown -> Regenerating -> Shown. On failure the previous token stays.
    pub async fn regenerate(&self) -> Result<(), FleetError> {
        if self.begin_regenerate() {
            self.complete_regenerate().await
        } else {
            Ok(())
        }
    }

    /// Enter Regenerating; false unless the instruction is open and idle.
    pub fn begin_regenerate(&self) -> bool {
        let started = self.tx.send_if_modified(|state| {
            if state.phase != TokenPhase::Shown {
                return false;
            }
            state.phase = TokenPhase::Regenerating;
            true
        });
        if !started {
            debug!("token regeneration requires an open instruction");
        }
        started
    }

    pub async fn complete_regenerate(&self) -> Result<(), FleetError> {
        match self.transport.regenerate_installation_token().await {
            Ok(token) => {
                // A closed instruction is frozen until the next fetch.
                let applied = self.tx.send_if_modified(|state| {
                    if state.phase != TokenPhase::Regenerating {
                        return false;
                    }
                    state.phase = TokenPhase::Shown;
                    state.value = token;
                    true
                });
                if !applied {
                    debug!("token regenerated after the instruction was closed");
                }
                Ok(())
            }
            Err(err) => {
                self.tx.send_modify(|state| {
                    if state.phase == TokenPhase::Regenerating {
                        state.phase = TokenPhase::Shown;
                    }
                });
                Err(err)
            }
        }
    }

    /// Hide the instruction. The value is kept until the next fetch.
    pub fn close(&self) {
        self.tx.send_if_modified(|state| {
            if state.phase == TokenPhase::Hidden {
                return false;
            }
            state.phase = TokenPhase::Hidden;
            state.visible = false;
            true
        });
    }
}
