/// Sees the final body of selected API responses. Never alters it.
pub trait ResponseObserver: Send + Sync {
    fn observe(&self, route: &str, body: &[u8]);
}

/// Logs observed bodies at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ResponseObserver for TracingObserver {
    fn observe(&self, route: &str, body: &[u8]) {
        tracing::debug!(
            target: "privy::tap",
            route = %route,
            body = %String::from_utf8_lossy(body),
            "response body"
        );
    }
}
