#[cfg(test)]
mod tests {
    use flowdexing::sync_status::is_synced;

    #[test]
    fn the_lag_threshold_is_exclusive() {
        assert!(!is_synced(200, 100, 100));
        assert!(is_synced(200, 101, 100));
    }

    #[test]
    fn zero_lag_is_synced() {
        assert!(is_synced(100, 100, 1));
    }

    #[test]
    fn a_scan_position_past_the_head_counts_as_zero_lag() {
        assert!(is_synced(100, 150, 1));
    }

    #[test]
    fn a_negative_scan_position_clamps_to_zero() {
        assert!(!is_synced(100, -5, 100));
        assert!(is_synced(100, -5, 101));
    }
}
