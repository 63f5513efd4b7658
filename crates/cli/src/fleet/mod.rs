//! Machine fleet view: listing state, view toggle, installation token and
//! dump export, composed by [`FleetController`].

pub mod controller;
pub mod dump;
pub mod list;
pub mod query;
pub mod selector;
pub mod token;

pub use controller::{ControllerConfig, FleetController};
pub use dump::{DumpOrchestrator, DumpSink, FileDumpSink};
pub use list::{MachineListState, MachineListStore, QueryClass, RequestTag};
pub use query::MachineQuery;
pub use selector::{view_options, MachineView, ViewOption, ViewSelector};
pub use token::{TokenLifecycleManager, TokenPhase, TokenState};
