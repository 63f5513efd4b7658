use serde::Serialize;

use crate::session::{Role, SessionSubscription};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub label: String,
    pub icon: String,
    pub route: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuGroup {
    pub label: String,
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct MenuTree {
    pub groups: Vec<MenuGroup>,
}

impl MenuTree {
    pub fn routes(&self) -> Vec<&str> {
        self.groups
            .iter()
            .flat_map(|g| g.items.iter().map(|i| i.route.as_str()))
            .collect()
    }

    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        for group in &self.groups {
            lines.push(group.label.clone());
            for item in &group.items {
                lines.push(format!("  {:<10} {}", item.label, item.route));
            }
        }
        lines.join("\n")
    }
}

fn item(label: &str, icon: &str, route: &str) -> MenuItem {
    MenuItem {
        label: label.to_string(),
        icon: icon.to_string(),
        route: route.to_string(),
    }
}

/// Navigation tree for a role. Only super-admins see server configuration.
pub fn build_menu(role: Option<Role>) -> MenuTree {
    let mut groups = Vec::new();
    if role == Some(Role::SuperAdmin) {
        groups.push(MenuGroup {
            label: "Configuration".to_string(),
            items: vec![
                item("Kea DHCP", "fa fa-server", "/apps/kea/all"),
                item("Machines", "fa fa-server", "/machines/all"),
            ],
        });
    }
    groups.push(MenuGroup {
        label: "Configuration".to_string(),
        items: vec![item("Users", "fa fa-user", "/users")],
    });
    groups.push(MenuGroup {
        label: "Profile".to_string(),
        items: vec![
            item("Settings", "fa fa-cog", "/settings"),
            item("Logout", "pi pi-sign-out", "/logout"),
        ],
    });
    MenuTree { groups }
}

/// Keeps a menu in sync with the session it was mounted against.
pub struct MenuBinding {
    subscription: SessionSubscription,
    menu: MenuTree,
}

impl MenuBinding {
    pub fn mount(mut subscription: SessionSubscription) -> Self {
        let role = subscription.current().map(|u| u.role);
        Self {
            subscription,
            menu: build_menu(role),
        }
    }

    pub fn menu(&self) -> &MenuTree {
        &self.menu
    }

    /// Rebuild if the session changed since the last look.
    pub fn refresh(&mut self) -> bool {
        if !self.subscription.has_changed() {
            return false;
        }
        let role = self.subscription.current().map(|u| u.role);
        self.menu = build_menu(role);
        true
    }

    pub fn unmount(self) {
        self.subscription.unsubscribe();
    }
}
