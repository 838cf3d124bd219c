//! The routing collaborator.

use partyline_room::Route;

/// Receives navigation effects after the snapshot that caused them has been
/// published.
///
/// Implemented for any `Fn(&Route)` closure. Use [`Route::path`] when the
/// router speaks URLs.
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, route: &Route);
}

impl<F> Navigator for F
where
    F: Fn(&Route) + Send + Sync + 'static,
{
    fn navigate(&self, route: &Route) {
        self(route)
    }
}

/// Ignores navigation. The default when no router is injected.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, route: &Route) {
        tracing::debug!(%route, "navigation ignored");
    }
}
