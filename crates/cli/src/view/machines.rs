use common::api::Machine;

use super::format::{format_address, format_bool, format_optional_str, format_timestamp};
use super::table::render_table;
use crate::fleet::{MachineListState, MachineView, ViewOption};

pub fn render_machines_table(machines: &[Machine], wide: bool) -> String {
    let mut headers = vec!["ID", "HOSTNAME", "ADDRESS", "AGENT_VERSION", "LAST_VISITED"];
    if wide {
        headers.push("AUTHORIZED");
        headers.push("ERROR");
    }

    let mut rows = Vec::with_capacity(machines.len());
    for machine in machines {
        let mut row = vec![
            machine.id.to_string(),
            format_optional_str(Some(&machine.hostname)),
            format_address(&machine.address, machine.agent_port),
            format_optional_str(machine.agent_version.as_deref()),
            format_timestamp(machine.last_visited_at),
        ];
        if wide {
            row.push(format_bool(machine.authorized).to_string());
            row.push(format_optional_str(machine.error.as_deref()));
        }
        rows.push(row);
    }

    render_table(&headers, &rows)
}

/// Toggle line with the active view marked, e.g. `[Authorized]  Unauthorized (3)`.
pub fn render_view_toggle(options: &[ViewOption], active: MachineView) -> String {
    options
        .iter()
        .map(|opt| {
            if opt.view == active {
                format!("[{}]", opt.label)
            } else {
                opt.label.clone()
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}

pub fn render_listing(
    state: &MachineListState,
    options: &[ViewOption],
    active: MachineView,
    wide: bool,
) -> String {
    let mut out = render_view_toggle(options, active);
    out.push('\n');
    out.push_str(&format!("total: {}\n", state.total));
    if state.items.is_empty() {
        out.push_str("no machines found");
    } else {
        out.push_str(&render_machines_table(&state.items, wide));
    }
    out
}
