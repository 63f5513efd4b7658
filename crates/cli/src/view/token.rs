use crate::fleet::{TokenPhase, TokenState};

/// Agent installation instruction; empty while the token is hidden.
pub fn render_installation_instruction(state: &TokenState, server_url: &str) -> String {
    if !state.visible {
        return String::new();
    }
    let token = match state.phase {
        TokenPhase::Loading => "(loading)",
        _ => state.value.as_str(),
    };
    format!(
        "Install the agent on the machine and register it with this server:\n  \
         server url:   {}\n  \
         server token: {}",
        server_url.trim_end_matches('/'),
        token
    )
}
