//! Tracking numbers and the status → description table.

use rand::Rng;

const TRACKING_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const TRACKING_NUMBER_LEN: usize = 10;

/// Random 10-character `[A-Z0-9]` tracking number. Collisions are not
/// checked here; the store's UNIQUE constraint rejects a duplicate.
pub fn generate_tracking_number() -> String {
    let mut rng = rand::rng();
    (0..TRACKING_NUMBER_LEN)
        .map(|_| TRACKING_ALPHABET[rng.random_range(0..TRACKING_ALPHABET.len())] as char)
        .collect()
}

/// Human-readable text for a status; unknown statuses describe themselves.
pub fn status_description(status: &str) -> &str {
    match status {
        "pending" => "Awaiting processing",
        "accepted" => "Accepted for work",
        "in_transit" => "In transit",
        "delivered" => "Delivered",
        "completed" => "Completed",
        "cancelled" => "Cancelled",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcel_types::OrderStatus;

    #[test]
    fn tracking_numbers_are_uppercase_alphanumeric() {
        for _ in 0..200 {
            let number = generate_tracking_number();
            assert_eq!(number.len(), TRACKING_NUMBER_LEN);
            assert!(number.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
        }
    }

    #[test]
    fn every_status_has_a_description() {
        for status in OrderStatus::ALL {
            assert_ne!(status_description(status.as_str()), status.as_str());
        }
        assert_eq!(status_description("lost"), "lost");
    }
}
