//! Per-scenario state.

use std::fmt;
use std::sync::Arc;

use crate::clock::FrozenClock;
use crate::http::HttpSimulator;
use crate::store::Store;

/// State owned by exactly one running scenario.
///
/// Holds the frozen clock handed to the system under test, the store shared
/// by fixtures, handler and verifier, and the HTTP exchange state. A context
/// is built fresh for each scenario and dropped when it ends.
pub struct ScenarioContext {
    clock: FrozenClock,
    store: Arc<dyn Store>,
    /// HTTP dispatch and captured exchange.
    pub http: HttpSimulator,
}

impl fmt::Debug for ScenarioContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioContext")
            .field("clock", &self.clock)
            .field("http", &self.http)
            .finish_non_exhaustive()
    }
}

impl ScenarioContext {
    /// Creates a context over `store` with time frozen by `clock`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, clock: FrozenClock) -> Self {
        Self {
            clock,
            store,
            http: HttpSimulator::new(),
        }
    }

    /// Returns the scenario clock.
    #[must_use]
    pub const fn clock(&self) -> FrozenClock {
        self.clock
    }

    /// Returns the scenario store.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}
