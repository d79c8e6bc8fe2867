use crate::actions::Navigator;
use log::info;
use std::sync::{Mutex, PoisonError};

pub const LIBRARY_ROUTE: &str = "/library";
const MAX_ROUTES: usize = 32;

/// Route history of the client UI, bounded to the most recent routes.
#[derive(Debug, Default)]
pub struct History {
    routes: Mutex<Vec<String>>,
}

impl History {
    pub fn current(&self) -> Option<String> {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Navigator for History {
    fn push(&self, route: &str) {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        if routes.last().is_some_and(|current| current == route) {
            return;
        }
        info!("Navigating to {}", route);
        routes.push(route.to_string());
        if routes.len() > MAX_ROUTES {
            let overflow = routes.len() - MAX_ROUTES;
            routes.drain(..overflow);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_moves_the_current_route() {
        let history = History::default();
        assert!(history.is_empty());
        history.push("/search");
        history.push(LIBRARY_ROUTE);
        assert_eq!(history.current().as_deref(), Some(LIBRARY_ROUTE));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn repeating_the_current_route_adds_nothing() {
        let history = History::default();
        history.push(LIBRARY_ROUTE);
        history.push(LIBRARY_ROUTE);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn history_keeps_only_recent_routes() {
        let history = History::default();
        for i in 0..(MAX_ROUTES + 10) {
            history.push(&format!("/page/{i}"));
        }
        assert_eq!(history.len(), MAX_ROUTES);
        assert_eq!(
            history.current(),
            Some(format!("/page/{}", MAX_ROUTES + 9))
        );
    }
}
