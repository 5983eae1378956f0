// Agents and subscriptions use UUIDv7 keys generated app-side, so key order
// follows creation order. Postgres only defaults to v4.

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn new_id() -> Uuid {
    Uuid::now_v7()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_id_is_v7() {
        assert_eq!(new_id().get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn ids_sort_by_creation() {
        let first = new_id();
        let second = new_id();
        assert!(first <= second);
    }
}
