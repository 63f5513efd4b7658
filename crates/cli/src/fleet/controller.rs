use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use common::api::Machine;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::dump::{DumpOrchestrator, DynDumpSink};
use super::list::{MachineListState, MachineListStore, QueryClass, RequestTag};
use super::query::{validate_limit, MachineQuery, DEFAULT_PAGE_SIZE};
use super::selector::{view_options, MachineView, ViewOption, ViewSelector};
use super::token::{TokenLifecycleManager, TokenState};
use crate::error::FleetError;
use crate::loading::LoadingGauge;
use crate::notify::{Notification, Notifier};
use crate::transport::DynFleetTransport;

pub const LIST_FAILED: &str = "Cannot get machines list";
pub const PROBE_FAILED: &str = "Cannot get unauthorized machines count";
pub const TOKEN_FETCH_FAILED: &str = "Cannot get server token";
pub const TOKEN_REGENERATE_FAILED: &str = "Cannot regenerate server token";
pub const DUMP_FAILED: &str = "Cannot download machine dump";
pub const INVALID_QUERY: &str = "Invalid machines query";

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub page_size: u32,
    pub text_filter: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            text_filter: None,
        }
    }
}

/// Composition root of the machines page.
///
/// Every public operation converts failures into exactly one error
/// notification and returns quietly; successes never notify. List requests
/// may overlap freely: only the response to the latest request of each class
/// is applied.
pub struct FleetController {
    transport: DynFleetTransport,
    notifier: Arc<dyn Notifier>,
    selector: Mutex<ViewSelector>,
    list: MachineListStore,
    tokens: TokenLifecycleManager,
    dumps: DumpOrchestrator,
    loading: LoadingGauge,
}

impl FleetController {
    pub fn new(
        transport: DynFleetTransport,
        notifier: Arc<dyn Notifier>,
        sink: DynDumpSink,
        config: ControllerConfig,
    ) -> Result<Self, FleetError> {
        validate_limit(config.page_size)?;
        Ok(Self {
            tokens: TokenLifecycleManager::new(transport.clone()),
            dumps: DumpOrchestrator::new(transport.clone(), sink),
            selector: Mutex::new(ViewSelector::new(config.page_size, config.text_filter)),
            list: MachineListStore::new(),
            loading: LoadingGauge::new(),
            transport,
            notifier,
        })
    }

    fn selector(&self) -> MutexGuard<'_, ViewSelector> {
        self.selector.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn active_view(&self) -> MachineView {
        self.selector().active()
    }

    pub fn view_options(&self) -> [ViewOption; 2] {
        view_options(self.list.snapshot().unauthorized_total)
    }

    pub fn machines(&self) -> watch::Receiver<MachineListState> {
        self.list.subscribe()
    }

    pub fn machines_snapshot(&self) -> MachineListState {
        self.list.snapshot()
    }

    pub fn token(&self) -> watch::Receiver<TokenState> {
        self.tokens.subscribe()
    }

    pub fn token_snapshot(&self) -> TokenState {
        self.tokens.snapshot()
    }

    pub fn loading(&self) -> watch::Receiver<usize> {
        self.loading.subscribe()
    }

    /// Switch between the authorized and unauthorized views.
    pub async fn set_view(&self, authorized: bool) {
        let request = self
            .selector()
            .select(MachineView::from_authorized(authorized));
        let probe = request
            .probe
            .map(|query| (self.list.issue(QueryClass::Probe), query));
        let primary_tag = self.list.issue(QueryClass::Primary);
        let primary = self.load(QueryClass::Primary, primary_tag, request.primary);

        match probe {
            Some((tag, query)) => {
                tokio::join!(self.load(QueryClass::Probe, tag, query), primary);
            }
            None => primary.await,
        }
    }

    pub async fn set_page(&self, offset: u32, limit: u32) {
        if let Err(err) = validate_limit(limit) {
            self.report(INVALID_QUERY, &err);
            return;
        }
        let query = self.selector().page(offset, limit);
        let tag = self.list.issue(QueryClass::Primary);
        self.load(QueryClass::Primary, tag, query).await;
    }

    pub async fn set_filter(&self, text: Option<&str>) {
        let query = self.selector().filter(text);
        let tag = self.list.issue(QueryClass::Primary);
        self.load(QueryClass::Primary, tag, query).await;
    }

    async fn load(&self, class: QueryClass, tag: RequestTag, query: MachineQuery) {
        let outcome = {
            let _busy = self.loading.start();
            self.transport.list_machines(&query).await
        };

        match outcome {
            Ok(page) => {
                let applied = match class {
                    QueryClass::Primary => self.list.apply_primary(tag, page),
                    QueryClass::Probe => self.list.apply_probe(tag, page),
                };
                if !applied {
                    debug!(tag = tag.value(), ?class, "dropping stale machines response");
                }
            }
            Err(err) if self.list.is_current(class, tag) => {
                let summary = match class {
                    QueryClass::Primary => LIST_FAILED,
                    QueryClass::Probe => PROBE_FAILED,
                };
                self.report(summary, &err);
            }
            Err(err) => {
                debug!(tag = tag.value(), ?class, %err, "dropping stale machines failure");
            }
        }
    }

    pub async fn show_token(&self) {
        let Some(attempt) = self.tokens.begin_show() else {
            return;
        };
        let _busy = self.loading.start();
        if let Err(err) = self.tokens.complete_show(attempt).await {
            self.report(TOKEN_FETCH_FAILED, &err);
        }
    }

    pub async fn regenerate_token(&self) {
        if !self.tokens.begin_regenerate() {
            return;
        }
        let _busy = self.loading.start();
        if let Err(err) = self.tokens.complete_regenerate().await {
            self.report(TOKEN_REGENERATE_FAILED, &err);
        }
    }

    pub fn close_token(&self) {
        self.tokens.close();
    }

    /// Export a machine from the current listing. Returns where the artifact
    /// was stored, or `None` after reporting the failure.
    pub async fn download_dump(&self, machine: &Machine) -> Option<PathBuf> {
        if self.list.snapshot().find(machine.id).is_none() {
            self.report(DUMP_FAILED, &FleetError::UnknownMachine(machine.id));
            return None;
        }
        let _busy = self.loading.start();
        match self.dumps.download_dump(machine).await {
            Ok(path) => Some(path),
            Err(err) => {
                self.report(DUMP_FAILED, &err);
                None
            }
        }
    }

    fn report(&self, summary: &str, err: &FleetError) {
        warn!(summary, error = %err, "fleet operation failed");
        self.notifier.notify(Notification::error(summary, err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::dump::FileDumpSink;
    use crate::notify::{drain, ChannelNotifier, Severity};
    use crate::test_support::{machine, page, server_error, ScriptedTransport};
    use crate::transport::DumpArtifact;
    use bytes::Bytes;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Harness {
        transport: Arc<ScriptedTransport>,
        controller: FleetController,
        notifications: UnboundedReceiver<Notification>,
        _dir: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let transport = Arc::new(ScriptedTransport::default());
        let (notifier, notifications) = ChannelNotifier::new();
        let dir = tempfile::tempdir().expect("tempdir");
        let controller = FleetController::new(
            transport.clone(),
            Arc::new(notifier),
            Arc::new(FileDumpSink::new(dir.path())),
            ControllerConfig::default(),
        )
        .expect("controller");
        Harness {
            transport,
            controller,
            notifications,
            _dir: dir,
        }
    }

    fn unauthorized(limit: u32) -> MachineQuery {
        MachineQuery::page(0, limit, None, false)
    }

    fn authorized(limit: u32) -> MachineQuery {
        MachineQuery::page(0, limit, None, true)
    }

    #[test]
    fn new_rejects_invalid_page_size() {
        let (notifier, _rx) = ChannelNotifier::new();
        let result = FleetController::new(
            Arc::new(ScriptedTransport::default()),
            Arc::new(notifier),
            Arc::new(FileDumpSink::new(".")),
            ControllerConfig {
                page_size: 0,
                text_filter: None,
            },
        );
        assert!(matches!(result, Err(FleetError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn switching_views_keeps_unauthorized_count() {
        let mut h = harness();
        let probe = MachineQuery::unauthorized_probe();
        h.transport.push_list(probe.clone(), Ok(page(&["aaa", "bbb", "ccc"], 3)));
        h.transport.push_list(unauthorized(10), Ok(page(&["aaa", "bbb", "ccc"], 3)));

        h.controller.set_view(false).await;
        let state = h.controller.machines_snapshot();
        assert_eq!(h.controller.active_view(), MachineView::Unauthorized);
        assert_eq!(state.total, 3);
        assert_eq!(state.unauthorized_total, 3);
        assert_eq!(h.controller.view_options()[1].label, "Unauthorized (3)");
        assert!(state.items.iter().any(|m| m.hostname == "aaa"));

        h.transport.push_list(probe, Ok(page(&["aaa", "bbb", "ccc"], 3)));
        h.transport.push_list(authorized(10), Ok(page(&["zzz", "xxx"], 2)));
        h.controller.set_view(true).await;

        let state = h.controller.machines_snapshot();
        assert_eq!(state.total, 2);
        assert_eq!(state.unauthorized_total, 3);
        assert_eq!(h.controller.view_options()[1].label, "Unauthorized (3)");
        let hostnames: Vec<_> = state.items.iter().map(|m| m.hostname.as_str()).collect();
        assert_eq!(hostnames, vec!["zzz", "xxx"]);
        assert!(drain(&mut h.notifications).is_empty());
    }

    #[tokio::test]
    async fn same_view_reload_skips_probe() {
        let h = harness();
        h.transport.push_list(MachineQuery::unauthorized_probe(), Ok(page(&[], 0)));
        h.transport.push_list(authorized(10), Ok(page(&["zzz"], 1)));
        h.transport.push_list(authorized(10), Ok(page(&["zzz"], 1)));

        h.controller.set_view(true).await;
        h.controller.set_view(true).await;

        let probes = h
            .transport
            .list_calls()
            .into_iter()
            .filter(|q| *q == MachineQuery::unauthorized_probe())
            .count();
        assert_eq!(probes, 1);
    }

    #[tokio::test]
    async fn late_response_of_superseded_filter_is_ignored() {
        let mut h = harness();
        h.transport.push_list(MachineQuery::unauthorized_probe(), Ok(page(&[], 0)));
        h.transport.push_list(authorized(10), Ok(page(&["zzz"], 1)));
        h.controller.set_view(true).await;

        let first = MachineQuery::page(0, 10, Some("a".into()), true);
        let second = MachineQuery::page(0, 10, Some("ab".into()), true);
        let slow = h.transport.push_gated_list(first, Ok(page(&["alpha", "abc"], 2)));
        h.transport.push_list(second, Ok(page(&["abc"], 1)));

        let c = &h.controller;
        tokio::join!(c.set_filter(Some("a")), async {
            // Second filter resolves first, then the first one arrives late.
            c.set_filter(Some("ab")).await;
            slow.release();
        });

        let state = c.machines_snapshot();
        assert_eq!(state.total, 1);
        assert_eq!(state.items[0].hostname, "abc");
        assert!(drain(&mut h.notifications).is_empty());
    }

    #[tokio::test]
    async fn late_responses_of_previous_view_do_not_override_counts() {
        let mut h = harness();
        let probe = MachineQuery::unauthorized_probe();
        let slow_probe = h.transport.push_gated_list(probe.clone(), Ok(page(&["old"], 9)));
        let slow_page = h
            .transport
            .push_gated_list(authorized(10), Ok(page(&["zzz", "xxx"], 2)));
        h.transport.push_list(probe, Ok(page(&["aaa"], 3)));
        h.transport.push_list(unauthorized(10), Ok(page(&["aaa", "bbb", "ccc"], 3)));

        let c = &h.controller;
        tokio::join!(c.set_view(true), async {
            // The unauthorized view settles before the authorized one answers.
            c.set_view(false).await;
            slow_probe.release();
            slow_page.release();
        });

        let state = c.machines_snapshot();
        assert_eq!(c.active_view(), MachineView::Unauthorized);
        assert_eq!(state.total, 3);
        assert_eq!(state.unauthorized_total, 3);
        let hostnames: Vec<_> = state.items.iter().map(|m| m.hostname.as_str()).collect();
        assert_eq!(hostnames, vec!["aaa", "bbb", "ccc"]);
        assert_eq!(h.transport.list_calls().len(), 4);
        assert!(drain(&mut h.notifications).is_empty());
    }

    #[tokio::test]
    async fn stale_failure_is_not_reported() {
        let mut h = harness();
        h.transport.push_list(MachineQuery::unauthorized_probe(), Ok(page(&[], 0)));
        h.transport.push_list(authorized(10), Ok(page(&["zzz"], 1)));
        h.controller.set_view(true).await;

        let first = MachineQuery::page(10, 10, None, true);
        let second = MachineQuery::page(20, 10, None, true);
        let slow = h.transport.push_gated_list(first, Err(server_error("boom")));
        h.transport.push_list(second, Ok(page(&["page-3"], 21)));

        let c = &h.controller;
        tokio::join!(c.set_page(10, 10), async {
            c.set_page(20, 10).await;
            slow.release();
        });

        assert_eq!(c.machines_snapshot().items[0].hostname, "page-3");
        assert!(drain(&mut h.notifications).is_empty());
    }

    #[tokio::test]
    async fn list_failure_notifies_once_and_keeps_state() {
        let mut h = harness();
        h.transport.push_list(MachineQuery::unauthorized_probe(), Ok(page(&["aaa"], 1)));
        h.transport.push_list(authorized(10), Ok(page(&["zzz", "xxx"], 2)));
        h.controller.set_view(true).await;
        let before = h.controller.machines_snapshot();

        h.transport
            .push_list(MachineQuery::page(10, 10, None, true), Err(server_error("db down")));
        h.controller.set_page(10, 10).await;

        assert_eq!(h.controller.machines_snapshot(), before);
        let notes = drain(&mut h.notifications);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].severity, Severity::Error);
        assert_eq!(notes[0].summary, LIST_FAILED);
        assert_eq!(notes[0].detail, "db down");
    }

    #[tokio::test]
    async fn probe_failure_uses_probe_summary() {
        let mut h = harness();
        h.transport
            .push_list(MachineQuery::unauthorized_probe(), Err(server_error("nope")));
        h.transport.push_list(authorized(10), Ok(page(&["zzz"], 1)));
        h.controller.set_view(true).await;

        let state = h.controller.machines_snapshot();
        assert_eq!(state.total, 1);
        assert_eq!(state.unauthorized_total, 0);
        let notes = drain(&mut h.notifications);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].summary, PROBE_FAILED);
    }

    #[tokio::test]
    async fn invalid_page_size_is_reported_without_request() {
        let mut h = harness();
        h.controller.set_page(0, 0).await;
        assert!(h.transport.list_calls().is_empty());
        let notes = drain(&mut h.notifications);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].summary, INVALID_QUERY);
    }

    #[tokio::test]
    async fn token_show_failure_notifies_once() {
        let mut h = harness();
        h.transport.push_token(Err(server_error("some error")));

        h.controller.show_token().await;

        let token = h.controller.token_snapshot();
        assert!(!token.visible);
        assert_eq!(token.value, "");
        let notes = drain(&mut h.notifications);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].severity, Severity::Error);
        assert_eq!(notes[0].summary, TOKEN_FETCH_FAILED);
    }

    #[tokio::test]
    async fn token_show_regenerate_close() {
        let mut h = harness();
        h.transport.push_token(Ok("ABC".into()));
        h.transport.push_regenerated(Ok("DEF".into()));

        h.controller.show_token().await;
        assert_eq!(h.controller.token_snapshot().value, "ABC");
        assert!(h.controller.token_snapshot().visible);

        h.controller.regenerate_token().await;
        let token = h.controller.token_snapshot();
        assert_eq!(token.value, "DEF");
        assert!(token.visible);

        h.controller.close_token();
        assert!(!h.controller.token_snapshot().visible);
        assert!(drain(&mut h.notifications).is_empty());
    }

    #[tokio::test]
    async fn token_regenerate_failure_keeps_token() {
        let mut h = harness();
        h.transport.push_token(Ok("ABC".into()));
        h.transport.push_regenerated(Err(server_error("some error")));

        h.controller.show_token().await;
        h.controller.regenerate_token().await;

        let token = h.controller.token_snapshot();
        assert_eq!(token.value, "ABC");
        assert!(token.visible);
        let notes = drain(&mut h.notifications);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].summary, TOKEN_REGENERATE_FAILED);
    }

    #[tokio::test]
    async fn dump_targets_only_the_chosen_machine() {
        let mut h = harness();
        h.transport.push_list(MachineQuery::unauthorized_probe(), Ok(page(&[], 0)));
        h.transport.push_list(authorized(10), Ok(page(&["zzz", "xxx"], 2)));
        h.controller.set_view(true).await;
        h.transport.push_dump(Ok(DumpArtifact {
            machine_id: 1,
            file_name: "machine-1.tar.gz".into(),
            bytes: Bytes::from_static(b"dump"),
        }));

        let first = h.controller.machines_snapshot().items[0].clone();
        assert_eq!(first.id, 1);
        let path = h.controller.download_dump(&first).await;

        assert!(path.expect("stored").ends_with("machine-1.tar.gz"));
        assert_eq!(h.transport.dump_calls(), vec![1]);
        assert!(drain(&mut h.notifications).is_empty());
    }

    #[tokio::test]
    async fn dump_of_unlisted_machine_is_reported() {
        let mut h = harness();
        let stranger = machine(99, "ghost");
        assert!(h.controller.download_dump(&stranger).await.is_none());
        assert!(h.transport.dump_calls().is_empty());
        let notes = drain(&mut h.notifications);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].summary, DUMP_FAILED);
    }

    #[tokio::test]
    async fn dump_failure_is_reported() {
        let mut h = harness();
        h.transport.push_list(MachineQuery::unauthorized_probe(), Ok(page(&[], 0)));
        h.transport.push_list(authorized(10), Ok(page(&["zzz"], 1)));
        h.controller.set_view(true).await;
        h.transport.push_dump(Err(server_error("export failed")));

        let target = h.controller.machines_snapshot().items[0].clone();
        assert!(h.controller.download_dump(&target).await.is_none());
        let notes = drain(&mut h.notifications);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].detail, "export failed");
    }

    #[tokio::test]
    async fn loading_gauge_settles_after_requests() {
        let h = harness();
        h.transport.push_list(MachineQuery::unauthorized_probe(), Ok(page(&[], 0)));
        h.transport.push_list(authorized(10), Ok(page(&[], 0)));
        let loading = h.controller.loading();
        h.controller.set_view(true).await;
        assert_eq!(*loading.borrow(), 0);
    }

    #[tokio::test]
    async fn guarded_token_calls_do_not_touch_loading_gauge() {
        let h = harness();
        let gate = h.transport.push_gated_token(Ok("ABC".into()));
        let mut loading = h.controller.loading();
        let c = &h.controller;

        tokio::join!(c.show_token(), async {
            tokio::task::yield_now().await;
            assert_eq!(*loading.borrow_and_update(), 1);
            // Already loading: neither call may publish a gauge change.
            c.show_token().await;
            c.regenerate_token().await;
            assert!(!loading.has_changed().expect("gauge alive"));
            gate.release();
        });

        assert_eq!(*loading.borrow(), 0);
        assert_eq!(h.transport.token_fetches(), 1);
        assert_eq!(h.transport.token_regenerations(), 0);
        assert_eq!(c.token_snapshot().value, "ABC");
    }
}
