use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use parcel_db::{Database, OrderFilter, TicketAcceptance, TrackingEntry};
use parcel_types::api::{OfferDecision, ProfileUpdate};
use parcel_types::{
    Address, ChatMessage, NewAddress, NewOrder, Offer, OfferStatus, Order, OrderStatus, Payment,
    Role, Stats, Ticket, TicketStatus, TicketWithOrder, TrackingEvent, User, UserProfile,
};

use crate::config::Config;
use crate::error::{OpError, OpResult};
use crate::format;
use crate::notify::Notifier;
use crate::session;
use crate::tracking::{generate_tracking_number, status_description};

/// Location recorded on an order's first tracking row.
const CREATED_LOCATION: &str = "Created";

/// What the domain layer needs from configuration.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub log_group_id: Option<i64>,
    pub admin_ids: Vec<i64>,
    pub auto_assign_orders: bool,
}

impl From<&Config> for Settings {
    fn from(config: &Config) -> Self {
        Self {
            log_group_id: config.log_group_id,
            admin_ids: config.admin_ids.clone(),
            auto_assign_orders: config.auto_assign_orders,
        }
    }
}

/// Price, currency and delivery time a manager proposes.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferInput {
    pub price: f64,
    pub currency: String,
    pub delivery_days: i64,
    pub comment: Option<String>,
}

/// The domain operations shared by both front-ends. All methods block on
/// the store; async callers run them on the blocking pool.
#[derive(Clone)]
pub struct Logistics {
    db: Arc<Database>,
    notifier: Notifier,
    settings: Arc<Settings>,
}

impl Logistics {
    pub fn new(db: Arc<Database>, notifier: Notifier, settings: Settings) -> Self {
        Self {
            db,
            notifier,
            settings: Arc::new(settings),
        }
    }

    // -- Users --

    /// First-contact registration. Existing users keep their role; ids in
    /// the configured admin list are always admins.
    pub fn register_user(&self, profile: &UserProfile) -> OpResult<User> {
        let listed_admin = self.settings.admin_ids.contains(&profile.user_id);
        let initial = if listed_admin { Role::Admin } else { Role::Client };
        let user = self.db.upsert_user(profile, initial)?;

        if listed_admin && !user.is_admin() {
            self.db.set_user_role(user.user_id, Role::Admin)?;
            info!("Promoted listed admin {}", user.user_id);
            return self.get_user(user.user_id);
        }
        Ok(user)
    }

    pub fn get_user(&self, user_id: i64) -> OpResult<User> {
        self.db.get_user(user_id)?.ok_or(OpError::NotFound("user"))
    }

    /// Sets the role, creating a bare user row when the id is unknown.
    pub fn set_role(&self, user_id: i64, role: Role) -> OpResult<User> {
        if !self.db.set_user_role(user_id, role)? {
            let profile = UserProfile {
                user_id,
                ..UserProfile::default()
            };
            self.db.upsert_user(&profile, role)?;
        }
        info!("User {} is now {}", user_id, role);
        self.get_user(user_id)
    }

    pub fn accept_privacy(&self, user_id: i64) -> OpResult<User> {
        self.update_profile(
            user_id,
            &ProfileUpdate {
                privacy_accepted: Some(true),
                ..ProfileUpdate::default()
            },
        )
    }

    /// Flips the notification preference and returns the new user row.
    pub fn toggle_notifications(&self, user_id: i64) -> OpResult<User> {
        let user = self.get_user(user_id)?;
        self.update_profile(
            user_id,
            &ProfileUpdate {
                notifications_enabled: Some(!user.notifications_enabled),
                ..ProfileUpdate::default()
            },
        )
    }

    pub fn update_profile(&self, user_id: i64, update: &ProfileUpdate) -> OpResult<User> {
        if !self.db.update_profile(user_id, update)? {
            return Err(OpError::NotFound("user"));
        }
        self.get_user(user_id)
    }

    pub fn list_users(&self, role: Option<Role>) -> OpResult<Vec<User>> {
        Ok(self.db.list_users(role)?)
    }

    pub fn add_address(&self, user_id: i64, address: &NewAddress) -> OpResult<Vec<Address>> {
        if address.address.trim().is_empty() {
            return Err(OpError::invalid("address must not be empty"));
        }
        self.db.add_address(user_id, address)?;
        self.addresses(user_id)
    }

    pub fn addresses(&self, user_id: i64) -> OpResult<Vec<Address>> {
        Ok(self.db.addresses_for_user(user_id)?)
    }

    // -- Orders --

    /// Creates the order with its initial tracking row (and a ticket when a
    /// manager is given), then queues the log and client notifications.
    pub fn create_order(
        &self,
        client_id: i64,
        new: &NewOrder,
        manager_id: Option<i64>,
    ) -> OpResult<Order> {
        if new.description.trim().is_empty() {
            return Err(OpError::invalid("description must not be empty"));
        }
        check_amount("weight", new.weight)?;
        check_amount("price", new.price)?;

        let tracking_number = generate_tracking_number();
        let initial = TrackingEntry {
            status: OrderStatus::Pending.as_str(),
            location: Some(CREATED_LOCATION),
            description: status_description(OrderStatus::Pending.as_str()),
        };
        let (order_id, ticket_id) =
            self.db
                .create_order(client_id, new, manager_id, &tracking_number, initial)?;
        let order = self.get_order(order_id)?;
        info!("Order {} ({}) created by {}", order.id, order.tracking_number, client_id);

        self.notify_log(format::order_created_log(&order));
        if let Some(ticket_id) = ticket_id {
            if let Some(ticket) = self.db.get_ticket(ticket_id)? {
                self.notify_log(format::ticket_created_log(&ticket, &order));
            }
        }
        self.notify_user(client_id, format::order_created_client(&order));
        Ok(order)
    }

    /// Manager a new client order is handed to: the longest-registered one
    /// when auto-assignment is on, otherwise nobody.
    pub fn intake_manager(&self) -> OpResult<Option<i64>> {
        if !self.settings.auto_assign_orders {
            return Ok(None);
        }
        Ok(self.db.first_manager_id()?)
    }

    pub fn get_order(&self, order_id: i64) -> OpResult<Order> {
        self.db.get_order(order_id)?.ok_or(OpError::NotFound("order"))
    }

    pub fn orders(&self, filter: OrderFilter) -> OpResult<Vec<Order>> {
        Ok(self.db.list_orders(filter)?)
    }

    /// Orders visible to `user` on their default listing.
    pub fn orders_for(&self, user: &User) -> OpResult<Vec<Order>> {
        let filter = match user.role {
            Role::Client => OrderFilter::Client(user.user_id),
            Role::Manager => OrderFilter::ManagerVisible(user.user_id),
            Role::Admin => OrderFilter::All,
        };
        self.orders(filter)
    }

    /// Sets the status, appends the tracking row and tells the client.
    /// Returns false when the order does not exist.
    pub fn update_order_status(
        &self,
        order_id: i64,
        status: OrderStatus,
        manager_id: Option<i64>,
    ) -> OpResult<bool> {
        let entry = TrackingEntry {
            status: status.as_str(),
            location: None,
            description: status_description(status.as_str()),
        };
        if !self.db.update_order_status(order_id, status, manager_id, entry)? {
            return Ok(false);
        }
        let order = self.get_order(order_id)?;
        info!("Order {} moved to {}", order_id, status);
        self.notify_user(order.client_id, format::status_changed_client(&order));
        Ok(true)
    }

    /// Stores a `sent` offer. Fails (returns false) when another manager
    /// already owns the order; the check and the write are one statement.
    pub fn set_order_offer(&self, order_id: i64, manager_id: i64, input: &OfferInput) -> OpResult<bool> {
        if !input.price.is_finite() || input.price < 0.0 {
            return Err(OpError::invalid("price must not be negative"));
        }
        if input.delivery_days < 0 {
            return Err(OpError::invalid("delivery_days must not be negative"));
        }
        let currency = input.currency.trim();
        if currency.is_empty() {
            return Err(OpError::invalid("currency must not be empty"));
        }

        let offer = Offer {
            price: input.price,
            currency: currency.to_uppercase(),
            delivery_days: input.delivery_days,
            comment: input.comment.clone().filter(|c| !c.trim().is_empty()),
            status: OfferStatus::Sent,
        };
        if !self.db.set_order_offer(order_id, manager_id, &offer)? {
            warn!("Offer on order {} by manager {} rejected", order_id, manager_id);
            return Ok(false);
        }

        let order = self.get_order(order_id)?;
        self.notify_user(order.client_id, format::offer_received_client(&order));
        Ok(true)
    }

    /// The client's answer to a sent offer.
    pub fn respond_to_offer(&self, order_id: i64, decision: OfferDecision) -> OpResult<Order> {
        let order = self.get_order(order_id)?;
        if order.offer_status != OfferStatus::Sent {
            return Err(OpError::conflict("order has no pending offer"));
        }

        let applied = match decision {
            OfferDecision::Accept => {
                let entry = TrackingEntry {
                    status: OrderStatus::Accepted.as_str(),
                    location: None,
                    description: status_description(OrderStatus::Accepted.as_str()),
                };
                self.db.accept_offer(order_id, entry)?
            }
            OfferDecision::Reject => self.db.reject_offer(order_id)?,
        };
        if !applied {
            return Err(OpError::conflict("order has no pending offer"));
        }

        let order = self.get_order(order_id)?;
        if let Some(manager_id) = order.manager_id {
            let verdict = match decision {
                OfferDecision::Accept => "accepted",
                OfferDecision::Reject => "rejected",
            };
            self.notify_user(
                manager_id,
                format!("💬 The client {} your offer for order #{}", verdict, order.id),
            );
        }
        Ok(order)
    }

    // -- Tickets --

    pub fn get_ticket(&self, ticket_id: i64) -> OpResult<Ticket> {
        self.db.get_ticket(ticket_id)?.ok_or(OpError::NotFound("ticket"))
    }

    pub fn tickets(&self, manager_id: i64, status: Option<TicketStatus>) -> OpResult<Vec<TicketWithOrder>> {
        Ok(self.db.tickets_for_manager(manager_id, status)?)
    }

    /// Accepts a `new` ticket, which moves its order to `accepted`.
    pub fn accept_ticket(&self, ticket_id: i64) -> OpResult<Order> {
        let entry = TrackingEntry {
            status: OrderStatus::Accepted.as_str(),
            location: None,
            description: status_description(OrderStatus::Accepted.as_str()),
        };
        let order_id = match self.db.accept_ticket(ticket_id, entry)? {
            Some(TicketAcceptance::Accepted(order_id)) => order_id,
            Some(TicketAcceptance::NotPending) => {
                return Err(OpError::conflict("ticket is already accepted"));
            }
            None => return Err(OpError::NotFound("ticket")),
        };

        let order = self.get_order(order_id)?;
        info!("Ticket {} accepted, order {} accepted", ticket_id, order_id);
        self.notify_user(order.client_id, format::status_changed_client(&order));
        Ok(order)
    }

    /// Points the order (and its ticket) at `manager_id`.
    pub fn assign_order_to_manager(&self, order_id: i64, manager_id: i64) -> OpResult<Order> {
        let manager = self.get_user(manager_id)?;
        if !manager.is_manager() {
            return Err(OpError::invalid(format!("user {} is not a manager", manager_id)));
        }
        if !self.db.assign_order(order_id, manager_id)? {
            return Err(OpError::NotFound("order"));
        }
        info!("Order {} assigned to manager {}", order_id, manager_id);
        self.get_order(order_id)
    }

    /// Opens a ticket so a manager contacts the client: the order's own
    /// manager, or the longest-registered one when unassigned.
    pub fn request_contact(&self, order_id: i64) -> OpResult<Ticket> {
        let order = self.get_order(order_id)?;
        let manager_id = match order.manager_id {
            Some(id) => id,
            None => self
                .db
                .first_manager_id()?
                .ok_or_else(|| OpError::conflict("no manager is available"))?,
        };

        let ticket_id = self.db.open_ticket(order_id, manager_id)?;
        let ticket = self.get_ticket(ticket_id)?;
        self.notify_log(format::ticket_created_log(&ticket, &order));
        self.notify_user(manager_id, format::contact_requested_manager(&order));
        Ok(ticket)
    }

    pub fn tracking(&self, order_id: i64) -> OpResult<Vec<TrackingEvent>> {
        Ok(self.db.tracking_for_order(order_id)?)
    }

    // -- Payments --

    /// Records a pending payment with a fresh transaction id.
    /// Returns `(payment_id, transaction_id)`.
    pub fn create_payment(&self, order_id: i64, amount: f64, method: &str) -> OpResult<(i64, String)> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(OpError::invalid("amount must be positive"));
        }
        let method = method.trim();
        if method.is_empty() {
            return Err(OpError::invalid("payment_method must not be empty"));
        }
        self.get_order(order_id)?;

        let transaction_id = Uuid::new_v4().to_string();
        let payment_id = self.db.create_payment(order_id, amount, method, &transaction_id)?;
        info!("Payment {} created for order {}", payment_id, order_id);
        Ok((payment_id, transaction_id))
    }

    pub fn complete_payment(&self, payment_id: i64) -> OpResult<Payment> {
        if !self.db.complete_payment(payment_id)? {
            return Err(OpError::NotFound("payment"));
        }
        self.get_payment(payment_id)
    }

    pub fn get_payment(&self, payment_id: i64) -> OpResult<Payment> {
        self.db.get_payment(payment_id)?.ok_or(OpError::NotFound("payment"))
    }

    pub fn payments(&self, order_id: i64) -> OpResult<Vec<Payment>> {
        Ok(self.db.payments_for_order(order_id)?)
    }

    // -- Chat --

    pub fn send_message(&self, order_id: i64, sender: &User, text: &str) -> OpResult<ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            return Err(OpError::invalid("message must not be empty"));
        }
        self.get_order(order_id)?;

        let id = self.db.add_chat_message(order_id, sender.user_id, sender.role, text)?;
        self.db.get_chat_message(id)?.ok_or(OpError::NotFound("message"))
    }

    pub fn chat_messages(&self, order_id: i64, limit: Option<u32>, offset: u32) -> OpResult<Vec<ChatMessage>> {
        Ok(self.db.chat_messages(order_id, limit, offset)?)
    }

    // -- Stats --

    pub fn stats_for(&self, user: &User) -> OpResult<Stats> {
        let stats = match user.role {
            Role::Client => self.db.client_stats(user.user_id)?,
            Role::Manager => self.db.manager_stats(user.user_id)?,
            Role::Admin => self.db.admin_stats()?,
        };
        Ok(stats)
    }

    // -- Web sessions --

    /// Issues a new token for the user; any earlier token stops working.
    pub fn open_session(&self, user_id: i64) -> OpResult<String> {
        let token = session::new_token();
        self.db.replace_session(user_id, &token)?;
        Ok(token)
    }

    pub fn session_user(&self, token: &str) -> OpResult<Option<User>> {
        Ok(self.db.user_for_session(token)?)
    }

    pub fn close_session(&self, token: &str) -> OpResult<()> {
        self.db.delete_session(token)?;
        Ok(())
    }

    // -- Maintenance --

    pub(crate) fn db(&self) -> &Database {
        &self.db
    }

    fn notify_log(&self, text: String) {
        if let Some(chat_id) = self.settings.log_group_id {
            self.notifier.send(chat_id, text);
        }
    }

    /// Queues a message to a user who has notifications enabled.
    fn notify_user(&self, user_id: i64, text: String) {
        match self.db.get_user(user_id) {
            Ok(Some(user)) if user.notifications_enabled => {
                self.notifier.send(user_id, text);
            }
            Ok(_) => {}
            Err(e) => warn!("Could not load user {} for notification: {}", user_id, e),
        }
    }
}

fn check_amount(field: &str, value: Option<f64>) -> OpResult<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => {
            Err(OpError::invalid(format!("{} must not be negative", field)))
        }
        _ => Ok(()),
    }
}
