//! Command, callback and WebApp handling. Every entry point registers (or
//! refreshes) the sender first, so the role and privacy state always come
//! from the store. Handlers block on the store and return what to show;
//! sending it is the poller's job.

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use parcel_core::{Config, Logistics, OpError, OpResult, OrderFilter};
use parcel_telegram::types::{InlineKeyboardMarkup, TgUser};
use parcel_types::{NewOrder, OrderStatus, Role, User, UserProfile};

use crate::menus::{ACCEPT_PRIVACY, Menus, TOGGLE_NOTIFICATIONS, back_data};
use crate::views;

pub const NO_ACCESS: &str = "❌ You don't have access to this function";

/// A message body with its keyboard.
#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    pub text: String,
    pub keyboard: Option<InlineKeyboardMarkup>,
}

impl Screen {
    fn new(text: impl Into<String>, keyboard: InlineKeyboardMarkup) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }

    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallbackReply {
    /// Replace the message the button belongs to.
    Edit(Screen),
    /// Pop-up alert; nothing else changes.
    Alert(&'static str),
    /// Acknowledge silently.
    Ignore,
}

#[derive(Clone)]
pub struct Handlers {
    logistics: Logistics,
    menus: Menus,
    webapp_url: Option<String>,
    log_group_id: Option<i64>,
}

impl Handlers {
    pub fn new(logistics: Logistics, config: &Config) -> Self {
        Self {
            logistics,
            menus: Menus::new(config.webapp_url.clone()),
            webapp_url: config.webapp_url.clone(),
            log_group_id: config.log_group_id,
        }
    }

    fn register(&self, from: &TgUser) -> OpResult<User> {
        self.logistics.register_user(&UserProfile {
            user_id: from.id,
            username: from.username.clone(),
            first_name: from.first_name.clone(),
            last_name: from.last_name.clone(),
        })
    }

    fn privacy_screen(&self, user: &User) -> Screen {
        Screen::new(views::privacy(user), self.menus.privacy())
    }

    fn main_menu(&self, user: &User) -> Screen {
        Screen::new("Main menu", self.menus.main(user.role))
    }

    /// Handles a text message. Returns `None` for anything that is not a
    /// known command.
    pub fn command(&self, from: &TgUser, text: &str) -> OpResult<Option<Screen>> {
        let Some(command) = text.trim().strip_prefix('/') else {
            return Ok(None);
        };
        let mut parts = command.split_whitespace();
        let name = parts
            .next()
            .unwrap_or_default()
            .split('@')
            .next()
            .unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        let user = self.register(from)?;
        let screen = match name {
            "start" if !user.privacy_accepted => self.privacy_screen(&user),
            "start" => Screen::new(views::welcome(&user), self.menus.main(user.role)),
            "menu" if !user.privacy_accepted => self.privacy_screen(&user),
            "menu" => self.main_menu(&user),
            "my_role" => Screen::plain(format!(
                "Your role: {}\n\nUser ID: {}",
                views::role_label(user.role),
                user.user_id
            )),
            "set_role" => self.set_role_command(&user, &args)?,
            "add_manager" => self.add_manager_command(&user, &args)?,
            _ => return Ok(None),
        };
        Ok(Some(screen))
    }

    fn set_role_command(&self, admin: &User, args: &[&str]) -> OpResult<Screen> {
        if !admin.is_admin() {
            return Ok(Screen::plain("❌ Only administrators can use this command."));
        }
        let [target, role] = args else {
            return Ok(Screen::plain(
                "Usage: /set_role &lt;user_id&gt; &lt;role&gt;\n\n\
                 Roles: client, manager, admin\n\n\
                 Example: /set_role 123456789 manager",
            ));
        };
        let Ok(target) = target.parse::<i64>() else {
            return Ok(Screen::plain("❌ user_id must be a number."));
        };
        let Ok(role) = role.to_lowercase().parse::<Role>() else {
            return Ok(Screen::plain("❌ Unknown role. Available roles: client, manager, admin"));
        };

        self.logistics.set_role(target, role)?;
        info!("Admin {} set role of {} to {}", admin.user_id, target, role);
        Ok(Screen::plain(format!("✅ User {} is now {}", target, role)))
    }

    fn add_manager_command(&self, admin: &User, args: &[&str]) -> OpResult<Screen> {
        if !admin.is_admin() {
            return Ok(Screen::plain("❌ Only administrators can use this command."));
        }
        let Some(target) = args.first() else {
            return Ok(Screen::plain("Usage: /add_manager &lt;user_id&gt;"));
        };
        let Ok(target) = target.parse::<i64>() else {
            return Ok(Screen::plain("❌ user_id must be a number."));
        };

        match self.logistics.get_user(target) {
            Ok(existing) if existing.is_manager() => {
                return Ok(Screen::plain("ℹ️ This user is already a manager."));
            }
            Ok(_) | Err(OpError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        self.logistics.set_role(target, Role::Manager)?;
        info!("Admin {} added manager {}", admin.user_id, target);
        Ok(Screen::plain(format!("✅ User {} is now a manager.", target)))
    }

    /// Handles an inline button press.
    pub fn callback(&self, from: &TgUser, data: &str) -> OpResult<CallbackReply> {
        let user = self.register(from)?;

        if data == ACCEPT_PRIVACY {
            let user = self.logistics.accept_privacy(user.user_id)?;
            info!("User {} accepted the privacy policy", user.user_id);
            return Ok(CallbackReply::Edit(Screen::new(
                views::welcome(&user),
                self.menus.main(user.role),
            )));
        }
        if !user.privacy_accepted {
            return Ok(CallbackReply::Edit(self.privacy_screen(&user)));
        }

        let Some(required) = callback_role(data) else {
            warn!("Unknown callback {:?} from {}", data, user.user_id);
            return Ok(CallbackReply::Ignore);
        };
        if user.role != required {
            return Ok(CallbackReply::Alert(NO_ACCESS));
        }

        let screen = match user.role {
            Role::Client => self.client_callback(&user, data)?,
            Role::Manager => self.manager_callback(&user, data)?,
            Role::Admin => self.admin_callback(&user, data)?,
        };
        Ok(screen.map_or(CallbackReply::Ignore, CallbackReply::Edit))
    }

    fn client_callback(&self, user: &User, data: &str) -> OpResult<Option<Screen>> {
        let back = self.menus.back(Role::Client);
        let screen = match data {
            "client_profile" => {
                let orders = self.logistics.orders(OrderFilter::Client(user.user_id))?;
                Screen::new(views::profile(user, orders.len()), self.menus.client())
            }
            "client_orders" => {
                let orders = self.logistics.orders(OrderFilter::Client(user.user_id))?;
                let empty = "📦 You have no orders yet.\n\nCreate your first one in the app!";
                Screen::new(views::order_list("📦 Your orders", empty, &orders), back)
            }
            "client_rules" => Screen::new(views::RULES, back),
            "client_settings" => Screen::new(
                views::settings(user),
                self.menus.client_settings(user.notifications_enabled),
            ),
            TOGGLE_NOTIFICATIONS => {
                let user = self.logistics.toggle_notifications(user.user_id)?;
                Screen::new(
                    views::settings(&user),
                    self.menus.client_settings(user.notifications_enabled),
                )
            }
            "back_to_client_menu" => self.main_menu(user),
            _ => return Ok(None),
        };
        Ok(Some(screen))
    }

    fn manager_callback(&self, user: &User, data: &str) -> OpResult<Option<Screen>> {
        let back = self.menus.back(Role::Manager);
        let assigned = || self.logistics.orders(OrderFilter::ManagerAssigned(user.user_id));
        let screen = match data {
            "manager_orders" => {
                let orders = assigned()?;
                Screen::new(views::order_list("📦 Your orders", "📦 You have no orders yet", &orders), back)
            }
            "manager_new_orders" => {
                let mut orders = self.logistics.orders(OrderFilter::ManagerVisible(user.user_id))?;
                orders.retain(|o| o.status == OrderStatus::Pending);
                Screen::new(views::order_list("📋 New orders", "📋 No new orders", &orders), back)
            }
            "manager_in_progress" => {
                let mut orders = assigned()?;
                orders.retain(|o| o.status == OrderStatus::InTransit);
                Screen::new(
                    views::order_list("🚚 In progress", "🚚 Nothing in progress", &orders),
                    back,
                )
            }
            "manager_completed" => {
                let mut orders = assigned()?;
                orders.retain(|o| matches!(o.status, OrderStatus::Delivered | OrderStatus::Completed));
                Screen::new(
                    views::order_list("✅ Completed", "✅ No completed orders", &orders),
                    back,
                )
            }
            "manager_stats" => Screen::new(views::stats(&self.logistics.stats_for(user)?), back),
            "manager_profile" => {
                let orders = assigned()?;
                Screen::new(views::profile(user, orders.len()), self.menus.manager())
            }
            "manager_settings" => Screen::new(views::settings(user), back),
            "back_to_manager_menu" => self.main_menu(user),
            _ => return Ok(None),
        };
        Ok(Some(screen))
    }

    fn admin_callback(&self, user: &User, data: &str) -> OpResult<Option<Screen>> {
        let back = self.menus.back(Role::Admin);
        let screen = match data {
            "admin_users" => Screen::new("👥 <b>Users</b>\n\nChoose a list:", self.menus.admin_users()),
            "admin_list_clients" => {
                let users = self.logistics.list_users(Some(Role::Client))?;
                Screen::new(views::user_list("👥 Clients", &users), back)
            }
            "admin_list_managers" => {
                let users = self.logistics.list_users(Some(Role::Manager))?;
                Screen::new(views::user_list("👨‍💼 Managers", &users), back)
            }
            "admin_orders" => {
                let orders = self.logistics.orders(OrderFilter::All)?;
                Screen::new(views::order_list("📦 All orders", "📦 No orders yet", &orders), back)
            }
            "admin_stats" => Screen::new(views::stats(&self.logistics.stats_for(user)?), back),
            "admin_profile" => Screen::new(views::profile(user, 0), self.menus.admin()),
            "admin_system_settings" => Screen::new(
                views::system_settings(self.webapp_url.as_deref(), self.log_group_id),
                back,
            ),
            "back_to_admin_menu" => self.main_menu(user),
            _ => return Ok(None),
        };
        Ok(Some(screen))
    }

    /// Handles data posted back by the WebApp.
    pub fn web_app_data(&self, from: &TgUser, data: &str) -> OpResult<Screen> {
        let user = self.register(from)?;

        let Ok(payload) = serde_json::from_str::<Value>(data) else {
            warn!("Malformed WebApp data from {}: {}", user.user_id, data);
            return Ok(Screen::plain("❌ Could not process the data"));
        };
        let action = payload.get("action").and_then(Value::as_str).unwrap_or_default();

        match action {
            "create_order" => {
                if !user.is_client() {
                    return Ok(Screen::plain("❌ Only clients can create orders"));
                }
                let Ok(form) = serde_json::from_value::<OrderForm>(payload) else {
                    return Ok(Screen::plain("❌ Could not process the data"));
                };
                if form.description.trim().is_empty() {
                    return Ok(Screen::plain("❌ Order description must not be empty"));
                }
                let created = self.logistics.intake_manager().and_then(|manager_id| {
                    self.logistics.create_order(user.user_id, &form.into_new_order(), manager_id)
                });
                match created {
                    Ok(order) => Ok(Screen::plain(views::order_created(&order))),
                    Err(OpError::Invalid(msg)) => Ok(Screen::plain(format!("❌ {}", msg))),
                    Err(e) => Err(e),
                }
            }
            "test" => Ok(Screen::plain("✅ Data received from the app!")),
            other => Ok(Screen::plain(format!(
                "Received action: {}",
                parcel_core::format::escape_html(other)
            ))),
        }
    }
}

/// The role a callback belongs to, from its data prefix.
fn callback_role(data: &str) -> Option<Role> {
    if data == TOGGLE_NOTIFICATIONS || data.starts_with("client_") {
        return Some(Role::Client);
    }
    if data.starts_with("manager_") {
        return Some(Role::Manager);
    }
    if data.starts_with("admin_") {
        return Some(Role::Admin);
    }
    Role::ALL.iter().copied().find(|role| back_data(*role) == data)
}

#[derive(Debug, Deserialize)]
struct OrderForm {
    #[serde(default)]
    description: String,
    from_address: Option<String>,
    to_address: Option<String>,
    from_contact: Option<String>,
    to_contact: Option<String>,
    #[serde(default)]
    weight: Option<FormNumber>,
    #[serde(default)]
    price: Option<FormNumber>,
}

/// Form inputs arrive as numbers or as the raw text of the field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FormNumber {
    Number(f64),
    Text(String),
}

impl FormNumber {
    fn value(&self) -> Option<f64> {
        match self {
            FormNumber::Number(n) => Some(*n),
            FormNumber::Text(t) => t.trim().replace(',', ".").parse().ok(),
        }
    }
}

impl OrderForm {
    fn into_new_order(self) -> NewOrder {
        let text = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        NewOrder {
            description: self.description.trim().to_string(),
            from_address: text(self.from_address),
            to_address: text(self.to_address),
            from_contact: text(self.from_contact),
            to_contact: text(self.to_contact),
            weight: self.weight.as_ref().and_then(FormNumber::value),
            price: self.price.as_ref().and_then(FormNumber::value),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use parcel_core::{Database, Notifier, Settings};

    fn handlers() -> Handlers {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let settings = Settings {
            log_group_id: None,
            admin_ids: vec![1],
            ..Settings::default()
        };
        let logistics = Logistics::new(db, Notifier::disabled(), settings);
        let config = Config {
            webapp_url: Some("https://parcel.example".to_string()),
            ..Config::default()
        };
        Handlers::new(logistics, &config)
    }

    fn tg(id: i64) -> TgUser {
        TgUser {
            id,
            username: Some(format!("user{}", id)),
            first_name: Some(format!("User {}", id)),
            last_name: None,
        }
    }

    fn accept(h: &Handlers, id: i64) {
        let reply = h.callback(&tg(id), ACCEPT_PRIVACY).unwrap();
        assert!(matches!(reply, CallbackReply::Edit(_)));
    }

    fn edited(reply: CallbackReply) -> Screen {
        match reply {
            CallbackReply::Edit(screen) => screen,
            other => panic!("expected an edit, got {:?}", other),
        }
    }

    #[test]
    fn start_asks_for_privacy_until_accepted() {
        let h = handlers();
        let screen = h.command(&tg(5), "/start").unwrap().unwrap();
        assert!(screen.text.contains("Privacy policy"));
        let button = &screen.keyboard.unwrap().inline_keyboard[0][0];
        assert_eq!(button.callback_data.as_deref(), Some(ACCEPT_PRIVACY));

        // Menu buttons are held back as well.
        let screen = edited(h.callback(&tg(5), "client_orders").unwrap());
        assert!(screen.text.contains("Privacy policy"));

        accept(&h, 5);
        let screen = h.command(&tg(5), "/start@parcel_bot").unwrap().unwrap();
        assert!(screen.text.contains("Client"));
        assert!(!screen.text.contains("Privacy policy"));
    }

    #[test]
    fn other_roles_callbacks_alert_without_changes() {
        let h = handlers();
        accept(&h, 5);

        assert_eq!(h.callback(&tg(5), "admin_stats").unwrap(), CallbackReply::Alert(NO_ACCESS));
        assert_eq!(h.callback(&tg(5), "manager_orders").unwrap(), CallbackReply::Alert(NO_ACCESS));
        assert_eq!(
            h.callback(&tg(5), "back_to_admin_menu").unwrap(),
            CallbackReply::Alert(NO_ACCESS)
        );
        assert_eq!(h.callback(&tg(5), "nonsense").unwrap(), CallbackReply::Ignore);

        // Listed admin ids get the admin menus.
        accept(&h, 1);
        let screen = edited(h.callback(&tg(1), "admin_list_clients").unwrap());
        assert!(screen.text.contains("User 5"));
    }

    #[test]
    fn client_toggles_notifications() {
        let h = handlers();
        accept(&h, 5);

        let screen = edited(h.callback(&tg(5), TOGGLE_NOTIFICATIONS).unwrap());
        assert!(screen.text.contains("<b>off</b>"));
        assert!(!h.logistics.get_user(5).unwrap().notifications_enabled);

        edited(h.callback(&tg(5), TOGGLE_NOTIFICATIONS).unwrap());
        assert!(h.logistics.get_user(5).unwrap().notifications_enabled);
    }

    #[test]
    fn set_role_is_admin_only() {
        let h = handlers();
        let screen = h.command(&tg(5), "/set_role 6 manager").unwrap().unwrap();
        assert!(screen.text.contains("Only administrators"));
        assert!(h.logistics.get_user(6).is_err());

        let screen = h.command(&tg(1), "/set_role 6 courier").unwrap().unwrap();
        assert!(screen.text.contains("Unknown role"));
        let screen = h.command(&tg(1), "/set_role six manager").unwrap().unwrap();
        assert!(screen.text.contains("must be a number"));
        let screen = h.command(&tg(1), "/set_role 6").unwrap().unwrap();
        assert!(screen.text.starts_with("Usage"));

        h.command(&tg(1), "/set_role 6 Manager").unwrap().unwrap();
        assert_eq!(h.logistics.get_user(6).unwrap().role, Role::Manager);

        let screen = h.command(&tg(6), "/my_role").unwrap().unwrap();
        assert!(screen.text.contains("Manager"));
    }

    #[test]
    fn add_manager_creates_or_promotes() {
        let h = handlers();
        h.command(&tg(7), "/start").unwrap();

        let screen = h.command(&tg(1), "/add_manager 7").unwrap().unwrap();
        assert!(screen.text.contains("now a manager"));
        assert_eq!(h.logistics.get_user(7).unwrap().role, Role::Manager);

        let screen = h.command(&tg(1), "/add_manager 7").unwrap().unwrap();
        assert!(screen.text.contains("already a manager"));

        h.command(&tg(1), "/add_manager 8").unwrap().unwrap();
        assert_eq!(h.logistics.get_user(8).unwrap().role, Role::Manager);
    }

    #[test]
    fn plain_text_and_unknown_commands_are_ignored() {
        let h = handlers();
        assert_eq!(h.command(&tg(5), "hello").unwrap(), None);
        assert_eq!(h.command(&tg(5), "/dance").unwrap(), None);
    }

    #[test]
    fn webapp_creates_order() {
        let h = handlers();
        let data = r#"{"action":"create_order","description":"Books","from_address":"Kazan",
            "to_address":"Samara","weight":"2,5","price":1500}"#;
        let screen = h.web_app_data(&tg(5), data).unwrap();
        assert!(screen.text.contains("Order #1 created"));

        let order = h.logistics.get_order(1).unwrap();
        assert_eq!(order.client_id, 5);
        assert_eq!(order.weight, Some(2.5));
        assert_eq!(order.price, Some(1500.0));
        assert_eq!(h.logistics.tracking(1).unwrap().len(), 1);

        let screen = edited(h.callback(&tg(5), "client_orders").unwrap());
        assert!(screen.text.contains("Privacy policy"));
    }

    #[test]
    fn webapp_rejects_bad_payloads() {
        let h = handlers();
        let screen = h.web_app_data(&tg(5), r#"{"action":"create_order","description":"  "}"#).unwrap();
        assert!(screen.text.contains("must not be empty"));

        let screen = h.web_app_data(&tg(5), "not json").unwrap();
        assert!(screen.text.contains("Could not process"));

        let screen = h.web_app_data(&tg(5), r#"{"action":"test"}"#).unwrap();
        assert!(screen.text.contains("Data received"));

        let screen = h.web_app_data(&tg(1), r#"{"action":"create_order","description":"x"}"#).unwrap();
        assert!(screen.text.contains("Only clients"));
        assert!(h.logistics.orders(OrderFilter::All).unwrap().is_empty());
    }

    #[test]
    fn manager_lists_new_orders() {
        let h = handlers();
        h.command(&tg(1), "/set_role 2 manager").unwrap();
        accept(&h, 2);
        h.web_app_data(&tg(5), r#"{"action":"create_order","description":"Piano"}"#)
            .unwrap();

        let screen = edited(h.callback(&tg(2), "manager_new_orders").unwrap());
        assert!(screen.text.contains("Order #1"));
        let screen = edited(h.callback(&tg(2), "manager_orders").unwrap());
        assert!(screen.text.contains("no orders"));
        let screen = edited(h.callback(&tg(2), "manager_stats").unwrap());
        assert!(screen.text.contains("Tickets: 0"));
    }
}
