use crate::menu::MenuBinding;
use crate::session::{Role, SessionHub, SessionUser};

pub fn handle_menu(role: Option<Role>) {
    let hub = SessionHub::new();
    let mut binding = MenuBinding::mount(hub.subscribe());
    if let Some(role) = role {
        hub.login(SessionUser {
            id: 0,
            login: role.as_str().to_string(),
            role,
        });
        binding.refresh();
    }
    println!("{}", binding.menu().render());
    binding.unmount();
}
