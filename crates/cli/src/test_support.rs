use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use common::api::{Machine, MachinePage};
use tokio::sync::oneshot;

use crate::error::FleetError;
use crate::fleet::query::MachineQuery;
use crate::transport::{DumpArtifact, FleetTransport};

pub(crate) fn machine(id: i64, hostname: &str) -> Machine {
    Machine {
        id,
        hostname: hostname.to_string(),
        address: format!("10.0.0.{id}"),
        agent_port: 8080,
        ..Machine::default()
    }
}

/// Page whose machines get ids 1..=n in the given order.
pub(crate) fn page(hostnames: &[&str], total: u64) -> MachinePage {
    MachinePage {
        items: hostnames
            .iter()
            .enumerate()
            .map(|(idx, name)| machine(idx as i64 + 1, name))
            .collect(),
        total,
    }
}

pub(crate) fn server_error(message: &str) -> FleetError {
    FleetError::Server {
        status: 500,
        message: message.to_string(),
    }
}

/// Holds a scripted response back until released.
pub(crate) struct Gate {
    tx: oneshot::Sender<()>,
}

impl Gate {
    pub(crate) fn release(self) {
        let _ = self.tx.send(());
    }
}

struct Scripted<T> {
    gate: Option<oneshot::Receiver<()>>,
    outcome: Result<T, FleetError>,
}

impl<T> Scripted<T> {
    fn ready(outcome: Result<T, FleetError>) -> Self {
        Self {
            gate: None,
            outcome,
        }
    }

    fn gated(outcome: Result<T, FleetError>) -> (Self, Gate) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                gate: Some(rx),
                outcome,
            },
            Gate { tx },
        )
    }

    async fn resolve(self) -> Result<T, FleetError> {
        if let Some(gate) = self.gate {
            let _ = gate.await;
        }
        self.outcome
    }
}

fn missing(what: &str) -> FleetError {
    FleetError::Transport(format!("no scripted response for {what}"))
}

/// In-memory transport answering from per-operation scripts.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    lists: Mutex<Vec<(MachineQuery, Scripted<MachinePage>)>>,
    list_calls: Mutex<Vec<MachineQuery>>,
    tokens: Mutex<VecDeque<Scripted<String>>>,
    token_fetches: Mutex<usize>,
    regenerated: Mutex<VecDeque<Scripted<String>>>,
    token_regenerations: Mutex<usize>,
    dumps: Mutex<VecDeque<Scripted<DumpArtifact>>>,
    dump_calls: Mutex<Vec<i64>>,
}

impl ScriptedTransport {
    pub(crate) fn push_list(&self, query: MachineQuery, outcome: Result<MachinePage, FleetError>) {
        self.lists
            .lock()
            .unwrap()
            .push((query, Scripted::ready(outcome)));
    }

    pub(crate) fn push_gated_list(
        &self,
        query: MachineQuery,
        outcome: Result<MachinePage, FleetError>,
    ) -> Gate {
        let (scripted, gate) = Scripted::gated(outcome);
        self.lists.lock().unwrap().push((query, scripted));
        gate
    }

    pub(crate) fn push_token(&self, outcome: Result<String, FleetError>) {
        self.tokens
            .lock()
            .unwrap()
            .push_back(Scripted::ready(outcome));
    }

    pub(crate) fn push_gated_token(&self, outcome: Result<String, FleetError>) -> Gate {
        let (scripted, gate) = Scripted::gated(outcome);
        self.tokens.lock().unwrap().push_back(scripted);
        gate
    }

    pub(crate) fn push_regenerated(&self, outcome: Result<String, FleetError>) {
        self.regenerated
            .lock()
            .unwrap()
            .push_back(Scripted::ready(outcome));
    }

    pub(crate) fn push_gated_regenerated(&self, outcome: Result<String, FleetError>) -> Gate {
        let (scripted, gate) = Scripted::gated(outcome);
        self.regenerated.lock().unwrap().push_back(scripted);
        gate
    }

    pub(crate) fn push_dump(&self, outcome: Result<DumpArtifact, FleetError>) {
        self.dumps
            .lock()
            .unwrap()
            .push_back(Scripted::ready(outcome));
    }

    pub(crate) fn list_calls(&self) -> Vec<MachineQuery> {
        self.list_calls.lock().unwrap().clone()
    }

    pub(crate) fn token_fetches(&self) -> usize {
        *self.token_fetches.lock().unwrap()
    }

    pub(crate) fn token_regenerations(&self) -> usize {
        *self.token_regenerations.lock().unwrap()
    }

    pub(crate) fn dump_calls(&self) -> Vec<i64> {
        self.dump_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FleetTransport for ScriptedTransport {
    async fn list_machines(&self, query: &MachineQuery) -> Result<MachinePage, FleetError> {
        self.list_calls.lock().unwrap().push(query.clone());
        let scripted = {
            let mut lists = self.lists.lock().unwrap();
            let idx = lists.iter().position(|(q, _)| q == query);
            idx.map(|idx| lists.remove(idx).1)
        };
        match scripted {
            Some(scripted) => scripted.resolve().await,
            None => Err(missing(&format!("{query:?}"))),
        }
    }

    async fn fetch_installation_token(&self) -> Result<String, FleetError> {
        *self.token_fetches.lock().unwrap() += 1;
        let scripted = self.tokens.lock().unwrap().pop_front();
        match scripted {
            Some(scripted) => scripted.resolve().await,
            None => Err(missing("token fetch")),
        }
    }

    async fn regenerate_installation_token(&self) -> Result<String, FleetError> {
        *self.token_regenerations.lock().unwrap() += 1;
        let scripted = self.regenerated.lock().unwrap().pop_front();
        match scripted {
            Some(scripted) => scripted.resolve().await,
            None => Err(missing("token regeneration")),
        }
    }

    async fn export_machine_dump(&self, machine_id: i64) -> Result<DumpArtifact, FleetError> {
        self.dump_calls.lock().unwrap().push(machine_id);
        let scripted = self.dumps.lock().unwrap().pop_front();
        match scripted {
            Some(scripted) => scripted.resolve().await,
            None => Err(missing("dump export")),
        }
    }
}
