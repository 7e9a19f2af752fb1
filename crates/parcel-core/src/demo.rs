//! Fixed demo dataset for local runs and API smoke tests.

use tracing::info;

use parcel_types::api::DemoSummary;
use parcel_types::{NewOrder, Role, UserProfile};

use crate::error::{OpError, OpResult};
use crate::logistics::{Logistics, OfferInput};

pub const DEMO_ADMIN_ID: i64 = 91001;
pub const DEMO_MANAGER_ID: i64 = 92001;
pub const DEMO_CLIENT_ID: i64 = 93001;

/// Removes every order and the rows hanging off them. Users stay.
pub fn clear_demo_data(logistics: &Logistics) -> OpResult<()> {
    logistics.db().clear_order_data()?;
    info!("Order data cleared");
    Ok(())
}

/// Creates the three demo users and one assigned order with chat history
/// and a sent offer.
pub fn seed_demo_data(logistics: &Logistics) -> OpResult<DemoSummary> {
    let users = [
        (DEMO_ADMIN_ID, "demo_admin", "DemoAdmin", Role::Admin),
        (DEMO_MANAGER_ID, "demo_manager", "DemoManager", Role::Manager),
        (DEMO_CLIENT_ID, "demo_client", "DemoClient", Role::Client),
    ];
    for (user_id, username, first_name, role) in users {
        logistics.register_user(&UserProfile {
            user_id,
            username: Some(username.to_string()),
            first_name: Some(first_name.to_string()),
            last_name: None,
        })?;
        logistics.set_role(user_id, role)?;
    }

    let new = NewOrder {
        description: "Demo order".to_string(),
        from_address: Some("Moscow, Testovaya 1".to_string()),
        to_address: Some("St Petersburg, Proverochnaya 2".to_string()),
        from_contact: Some("Demo Client".to_string()),
        to_contact: Some("Recipient".to_string()),
        weight: Some(3.5),
        price: Some(7500.0),
    };
    let order = logistics.create_order(DEMO_CLIENT_ID, &new, None)?;
    logistics.assign_order_to_manager(order.id, DEMO_MANAGER_ID)?;

    let client = logistics.get_user(DEMO_CLIENT_ID)?;
    let manager = logistics.get_user(DEMO_MANAGER_ID)?;
    logistics.send_message(order.id, &client, "When will you pick it up?")?;
    logistics.send_message(order.id, &manager, "This evening.")?;

    let offer = OfferInput {
        price: 7800.0,
        currency: "RUB".to_string(),
        delivery_days: 4,
        comment: Some("Fragile cargo".to_string()),
    };
    if !logistics.set_order_offer(order.id, DEMO_MANAGER_ID, &offer)? {
        return Err(OpError::conflict("demo offer was rejected"));
    }

    info!("Demo data seeded, order {}", order.id);
    Ok(DemoSummary {
        admin_id: DEMO_ADMIN_ID,
        manager_id: DEMO_MANAGER_ID,
        client_id: DEMO_CLIENT_ID,
        order_id: order.id,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{Database, Notifier, Settings};
    use parcel_types::OfferStatus;

    fn logistics() -> Logistics {
        let db = Arc::new(Database::open_in_memory().unwrap());
        Logistics::new(db, Notifier::disabled(), Settings::default())
    }

    #[test]
    fn seed_then_clear() {
        let logistics = logistics();
        let summary = seed_demo_data(&logistics).unwrap();

        let order = logistics.get_order(summary.order_id).unwrap();
        assert_eq!(order.manager_id, Some(DEMO_MANAGER_ID));
        assert_eq!(order.offer_status, OfferStatus::Sent);
        assert_eq!(order.offer_price, Some(7800.0));
        assert_eq!(logistics.chat_messages(order.id, None, 0).unwrap().len(), 2);
        assert_eq!(logistics.get_user(DEMO_ADMIN_ID).unwrap().role, Role::Admin);

        clear_demo_data(&logistics).unwrap();
        assert!(matches!(logistics.get_order(order.id), Err(OpError::NotFound("order"))));
        assert_eq!(logistics.get_user(DEMO_CLIENT_ID).unwrap().role, Role::Client);

        // Seeding again after a clear works.
        seed_demo_data(&logistics).unwrap();
    }
}
