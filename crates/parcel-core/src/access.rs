//! Who may see or act on an order.

use parcel_types::{Order, Role, User};

/// Clients see their own orders; managers see their own and unassigned
/// ones; admins see everything.
pub fn can_view_order(user: &User, order: &Order) -> bool {
    match user.role {
        Role::Admin => true,
        Role::Manager => order.manager_id.is_none() || order.manager_id == Some(user.user_id),
        Role::Client => order.client_id == user.user_id,
    }
}

/// Admins may update any order; managers only orders assigned to them.
pub fn can_update_status(user: &User, order: &Order) -> bool {
    match user.role {
        Role::Admin => true,
        Role::Manager => order.manager_id == Some(user.user_id),
        Role::Client => false,
    }
}

/// Chat participants: the order's client, its manager, and admins.
pub fn can_chat(user: &User, order: &Order) -> bool {
    match user.role {
        Role::Admin => true,
        Role::Manager => order.manager_id == Some(user.user_id),
        Role::Client => order.client_id == user.user_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parcel_types::{OfferStatus, OrderStatus, PaymentStatus};

    fn user(id: i64, role: Role) -> User {
        User {
            user_id: id,
            username: None,
            first_name: None,
            last_name: None,
            role,
            privacy_accepted: true,
            notifications_enabled: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn order(client_id: i64, manager_id: Option<i64>) -> Order {
        Order {
            id: 1,
            client_id,
            manager_id,
            status: OrderStatus::Pending,
            description: None,
            from_address: None,
            to_address: None,
            from_contact: None,
            to_contact: None,
            weight: None,
            price: None,
            payment_status: PaymentStatus::Unpaid,
            payment_method: None,
            tracking_number: "AAAAAAAAAA".to_string(),
            offer_price: None,
            offer_currency: None,
            offer_delivery_days: None,
            offer_comment: None,
            offer_status: OfferStatus::Draft,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn visibility_by_role() {
        let unassigned = order(1, None);
        let theirs = order(1, Some(3));

        assert!(can_view_order(&user(1, Role::Client), &unassigned));
        assert!(!can_view_order(&user(2, Role::Client), &unassigned));
        assert!(can_view_order(&user(2, Role::Manager), &unassigned));
        assert!(!can_view_order(&user(2, Role::Manager), &theirs));
        assert!(can_view_order(&user(9, Role::Admin), &theirs));
    }

    #[test]
    fn only_the_assigned_manager_updates() {
        let theirs = order(1, Some(3));
        assert!(can_update_status(&user(3, Role::Manager), &theirs));
        assert!(!can_update_status(&user(2, Role::Manager), &theirs));
        assert!(!can_update_status(&user(1, Role::Client), &theirs));
        assert!(can_update_status(&user(9, Role::Admin), &theirs));
        assert!(!can_chat(&user(2, Role::Manager), &order(1, None)));
    }
}
