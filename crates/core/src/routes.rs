//! Console routes and the session guard in front of them.

use std::fmt;

use crate::{
    models::{EntityId, EntityKind},
    session::SessionStore,
};

/// A screen of the console. Paths follow `/dashboard/<collection>[/<id>][/edit|/new]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Credential entry; the only public screen.
    Login,
    /// Collection table.
    List(EntityKind),
    /// Read-only view of one record.
    Detail(EntityKind, EntityId),
    /// Blank form.
    New(EntityKind),
    /// Form pre-filled from an existing record.
    Edit(EntityKind, EntityId),
}

impl Route {
    /// Landing screen after login.
    pub const DASHBOARD: Route = Route::List(EntityKind::Student);

    /// Parse a console path. Unknown paths yield `None`.
    pub fn parse(path: &str) -> Option<Route> {
        let segments: Vec<&str> = path
            .trim()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();

        match segments.as_slice() {
            [] | ["dashboard"] => Some(Route::DASHBOARD),
            ["login"] => Some(Route::Login),
            ["dashboard", collection, rest @ ..] => {
                let kind = EntityKind::from_segment(collection)?;
                match rest {
                    [] => Some(Route::List(kind)),
                    ["new"] => Some(Route::New(kind)),
                    [id] => id.parse().ok().map(|id| Route::Detail(kind, id)),
                    [id, "edit"] => id.parse().ok().map(|id| Route::Edit(kind, id)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Canonical path for this route.
    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::List(kind) => format!("/dashboard/{}", kind.segment()),
            Route::Detail(kind, id) => format!("/dashboard/{}/{id}", kind.segment()),
            Route::New(kind) => format!("/dashboard/{}/new", kind.segment()),
            Route::Edit(kind, id) => format!("/dashboard/{}/{id}/edit", kind.segment()),
        }
    }

    /// Entity collection the route belongs to.
    pub fn kind(&self) -> Option<EntityKind> {
        match self {
            Route::Login => None,
            Route::List(kind)
            | Route::Detail(kind, _)
            | Route::New(kind)
            | Route::Edit(kind, _) => Some(*kind),
        }
    }

    /// Whether the route needs a session.
    pub fn requires_session(&self) -> bool {
        !matches!(self, Route::Login)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Decide where a navigation to `route` actually lands.
///
/// Protected routes without a session go to login; visiting login while
/// already logged in goes to the dashboard.
pub fn guard(route: Route, session: &SessionStore) -> Route {
    let logged_in = session.is_logged_in();
    match route {
        Route::Login if logged_in => Route::DASHBOARD,
        route if route.requires_session() && !logged_in => Route::Login,
        route => route,
    }
}
