/**
 * Configuration constants for the reflector and stream reader
 */
/// Default reconcile timeout in seconds (forced re-list on a silent watch)
pub const DEFAULT_RECONCILE_TIMEOUT_SECONDS: u64 = 15 * 60;

/// Delay in seconds between worker cycles so a broken loop does not
/// overwhelm the api-server
pub const RETRY_DELAY_SECONDS: u64 = 1;

/// Maximum redirect hops followed by the streaming HTTP client
pub const DEFAULT_HTTP_MAX_REDIRECTS: usize = 10;

/// Validate configuration constants at compile time
const _: () = {
    assert!(
        DEFAULT_RECONCILE_TIMEOUT_SECONDS > 0,
        "DEFAULT_RECONCILE_TIMEOUT_SECONDS must be greater than 0"
    );
    assert!(RETRY_DELAY_SECONDS > 0, "RETRY_DELAY_SECONDS must be greater than 0");
};
