//! Route table and authentication gate.
//!
//! Pages are addressed by path. Every route except `/login` requires an
//! authenticated session; navigating to a guarded route while anonymous
//! redirects to `/login?redirect=<path>` so the user can be sent back after
//! logging in. The transport uses the same router (through [`Navigator`]) to
//! bounce the user to the login page when a request comes back 401.

use std::sync::{Mutex, PoisonError};

use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use tracing::{debug, info};

pub const LOGIN_PATH: &str = "/login";
pub const DEFAULT_PATH: &str = "/dashboard";

/// Query parameter carrying the originally requested path
const REDIRECT_PARAM: &str = "redirect";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub name: &'static str,
    pub title: &'static str,
    pub requires_auth: bool,
}

const fn route(path: &'static str, name: &'static str, title: &'static str) -> Route {
    Route {
        path,
        name,
        title,
        requires_auth: true,
    }
}

// Static segments before parameterised ones: `/pipelines/create` must win
// over `/pipelines/:id`.
pub const ROUTES: &[Route] = &[
    Route {
        path: LOGIN_PATH,
        name: "Login",
        title: "Login",
        requires_auth: false,
    },
    route("/dashboard", "Dashboard", "Dashboard"),
    route("/pipelines", "Pipelines", "Pipelines"),
    route("/pipelines/create", "PipelineCreate", "Create pipeline"),
    route("/pipelines/:id", "PipelineDetail", "Pipeline detail"),
    route("/pipelines/:id/edit", "PipelineEdit", "Edit pipeline"),
    route("/builds/history", "BuildHistory", "Build history"),
    route("/builds/templates", "BuildTemplates", "Build templates"),
    route("/deploy/environments", "Environments", "Environments"),
    route("/deploy/releases", "Releases", "Releases"),
    route("/artifacts", "Artifacts", "Artifacts"),
    route("/hpa", "HpaPolicies", "HPA policies"),
    route("/clusters", "Clusters", "Clusters"),
    route("/settings", "Settings", "Settings"),
    route("/profile", "Profile", "Profile"),
];

/// A navigation the router performed on its own (redirects).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// To the login page, remembering where the user was headed
    Login { redirect: Option<String> },
    To(String),
}

impl Navigation {
    pub fn path(&self) -> String {
        match self {
            Navigation::Login { redirect: Some(target) } => format!(
                "{}?{}={}",
                LOGIN_PATH,
                REDIRECT_PARAM,
                utf8_percent_encode(target, NON_ALPHANUMERIC)
            ),
            Navigation::Login { redirect: None } => LOGIN_PATH.to_string(),
            Navigation::To(path) => path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Proceed(&'static Route),
    Redirect(Navigation),
    NotFound,
}

/// Receives the transport's request to send the user to the login page.
pub trait Navigator: Send + Sync {
    /// Returns whether a navigation happened; a navigator already on the
    /// login page stays put.
    fn redirect_to_login(&self) -> bool;
}

#[derive(Debug, Default)]
struct RouterState {
    current: String,
    navigations: Vec<Navigation>,
}

#[derive(Debug)]
pub struct Router {
    state: Mutex<RouterState>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RouterState {
                current: "/".to_string(),
                navigations: Vec::new(),
            }),
        }
    }

    /// Match a path (query string ignored) against the route table.
    pub fn resolve(path: &str) -> Option<&'static Route> {
        let (path, _) = split_query(path);
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        ROUTES.iter().find(|route| {
            let pattern: Vec<&str> = route.path.trim_matches('/').split('/').collect();
            pattern.len() == segments.len()
                && pattern.iter().zip(&segments).all(|(p, s)| {
                    if p.starts_with(':') {
                        !s.is_empty()
                    } else {
                        p == s
                    }
                })
        })
    }

    /// Run the auth gate for `path` and record where the user ends up.
    pub fn navigate(&self, path: &str, authenticated: bool) -> RouteDecision {
        let (route_path, query) = split_query(path);
        if route_path.is_empty() || route_path == "/" {
            return self.redirect(Navigation::To(DEFAULT_PATH.to_string()), DEFAULT_PATH);
        }

        let route = Self::resolve(route_path);
        // Unknown pages are guarded too; only the login page is public.
        if !authenticated && route.map_or(true, |route| route.requires_auth) {
            info!(path, "Guarded route while anonymous, redirecting to login");
            let navigation = Navigation::Login {
                redirect: Some(path.to_string()),
            };
            return self.redirect(navigation, LOGIN_PATH);
        }

        let Some(route) = route else {
            debug!(path, "No route matches");
            return RouteDecision::NotFound;
        };

        if route.path == LOGIN_PATH && authenticated {
            let target = query
                .and_then(redirect_target)
                .filter(|target| is_local_path(target) && !target.starts_with(LOGIN_PATH))
                .unwrap_or_else(|| DEFAULT_PATH.to_string());
            let current = target.clone();
            return self.redirect(Navigation::To(target), &current);
        }

        self.lock().current = path.to_string();
        RouteDecision::Proceed(route)
    }

    pub fn current(&self) -> String {
        self.lock().current.clone()
    }

    /// Every redirect performed so far, oldest first.
    pub fn navigations(&self) -> Vec<Navigation> {
        self.lock().navigations.clone()
    }

    fn redirect(&self, navigation: Navigation, landing: &str) -> RouteDecision {
        let mut state = self.lock();
        state.current = landing.to_string();
        state.navigations.push(navigation.clone());
        RouteDecision::Redirect(navigation)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RouterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Navigator for Router {
    fn redirect_to_login(&self) -> bool {
        let mut state = self.lock();
        if split_query(&state.current).0 == LOGIN_PATH {
            debug!("Already on the login page");
            return false;
        }
        let redirect = {
            let (path, _) = split_query(&state.current);
            (path != LOGIN_PATH && path != "/").then(|| state.current.clone())
        };
        let navigation = Navigation::Login { redirect };
        info!(target_path = %navigation.path(), "Redirecting to login");
        state.current = LOGIN_PATH.to_string();
        state.navigations.push(navigation);
        true
    }
}

fn split_query(path: &str) -> (&str, Option<&str>) {
    match path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path, None),
    }
}

/// Only same-origin absolute paths are followed after login.
fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//")
}

fn redirect_target(query: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == REDIRECT_PARAM)
            .then(|| percent_decode_str(value).decode_utf8().ok())
            .flatten()
            .map(|decoded| decoded.into_owned())
    })
}
