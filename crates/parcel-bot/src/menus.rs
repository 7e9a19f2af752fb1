//! Inline keyboards for each role.

use parcel_telegram::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use parcel_types::Role;

pub const ACCEPT_PRIVACY: &str = "accept_privacy";
pub const TOGGLE_NOTIFICATIONS: &str = "toggle_notifications";

#[derive(Debug, Clone, Default)]
pub struct Menus {
    webapp_url: Option<String>,
}

impl Menus {
    /// Telegram only opens WebApps over HTTPS, so any other URL is dropped.
    pub fn new(webapp_url: Option<String>) -> Self {
        Self {
            webapp_url: webapp_url.filter(|url| url.starts_with("https://")),
        }
    }

    fn webapp_row(&self, label: &str) -> Option<Vec<InlineKeyboardButton>> {
        self.webapp_url
            .as_ref()
            .map(|url| vec![InlineKeyboardButton::web_app(label, url.clone())])
    }

    pub fn main(&self, role: Role) -> InlineKeyboardMarkup {
        match role {
            Role::Client => self.client(),
            Role::Manager => self.manager(),
            Role::Admin => self.admin(),
        }
    }

    pub fn privacy(&self) -> InlineKeyboardMarkup {
        InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
            "✅ Accept",
            ACCEPT_PRIVACY,
        )]])
    }

    pub fn client(&self) -> InlineKeyboardMarkup {
        let mut rows: Vec<_> = self.webapp_row("🌐 Open app").into_iter().collect();
        rows.extend([
            vec![
                InlineKeyboardButton::callback("📦 My orders", "client_orders"),
                InlineKeyboardButton::callback("📊 Profile", "client_profile"),
            ],
            vec![
                InlineKeyboardButton::callback("📋 Rules", "client_rules"),
                InlineKeyboardButton::callback("⚙️ Settings", "client_settings"),
            ],
        ]);
        InlineKeyboardMarkup::new(rows)
    }

    pub fn manager(&self) -> InlineKeyboardMarkup {
        let mut rows: Vec<_> = self.webapp_row("🌐 Control panel").into_iter().collect();
        rows.extend([
            vec![
                InlineKeyboardButton::callback("📦 My orders", "manager_orders"),
                InlineKeyboardButton::callback("📋 New orders", "manager_new_orders"),
            ],
            vec![
                InlineKeyboardButton::callback("🚚 In progress", "manager_in_progress"),
                InlineKeyboardButton::callback("✅ Completed", "manager_completed"),
            ],
            vec![
                InlineKeyboardButton::callback("📊 Statistics", "manager_stats"),
                InlineKeyboardButton::callback("👤 Profile", "manager_profile"),
            ],
            vec![InlineKeyboardButton::callback("⚙️ Settings", "manager_settings")],
        ]);
        InlineKeyboardMarkup::new(rows)
    }

    pub fn admin(&self) -> InlineKeyboardMarkup {
        let mut rows: Vec<_> = self.webapp_row("🌐 Admin panel").into_iter().collect();
        rows.extend([
            vec![
                InlineKeyboardButton::callback("👥 Users", "admin_users"),
                InlineKeyboardButton::callback("📦 All orders", "admin_orders"),
            ],
            vec![
                InlineKeyboardButton::callback("📊 Statistics", "admin_stats"),
                InlineKeyboardButton::callback("👤 Profile", "admin_profile"),
            ],
            vec![InlineKeyboardButton::callback("⚙️ System settings", "admin_system_settings")],
        ]);
        InlineKeyboardMarkup::new(rows)
    }

    pub fn admin_users(&self) -> InlineKeyboardMarkup {
        InlineKeyboardMarkup::new(vec![
            vec![
                InlineKeyboardButton::callback("👥 Clients", "admin_list_clients"),
                InlineKeyboardButton::callback("👨‍💼 Managers", "admin_list_managers"),
            ],
            vec![back_button(Role::Admin)],
        ])
    }

    pub fn client_settings(&self, notifications_enabled: bool) -> InlineKeyboardMarkup {
        let label = if notifications_enabled {
            "🔕 Turn notifications off"
        } else {
            "🔔 Turn notifications on"
        };
        InlineKeyboardMarkup::new(vec![
            vec![InlineKeyboardButton::callback(label, TOGGLE_NOTIFICATIONS)],
            vec![back_button(Role::Client)],
        ])
    }

    pub fn back(&self, role: Role) -> InlineKeyboardMarkup {
        InlineKeyboardMarkup::new(vec![vec![back_button(role)]])
    }
}

pub fn back_data(role: Role) -> &'static str {
    match role {
        Role::Client => "back_to_client_menu",
        Role::Manager => "back_to_manager_menu",
        Role::Admin => "back_to_admin_menu",
    }
}

fn back_button(role: Role) -> InlineKeyboardButton {
    InlineKeyboardButton::callback("🔙 Back", back_data(role))
}
