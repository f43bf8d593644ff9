//! Route table

use std::fmt;
use std::sync::Arc;

use http::Method;
use werval_api::http::Parameters;
use werval_api::{Result, Route, WervalError};

/// Ordered routes, the first matching route wins
#[derive(Debug, Default, Clone)]
pub struct Routes {
    routes: Vec<Arc<Route>>,
}

impl Routes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, route: Route) {
        self.routes.push(Arc::new(route));
    }

    /// Builder-style [`Routes::push`]
    pub fn with(mut self, route: Route) -> Self {
        self.push(route);
        self
    }

    /// First route matching the request, with its bound path parameters
    pub fn route(&self, method: &Method, path: &str) -> Result<(Arc<Route>, Parameters)> {
        self.routes
            .iter()
            .find_map(|route| {
                route
                    .matches(method, path)
                    .map(|parameters| (Arc::clone(route), parameters))
            })
            .ok_or_else(|| WervalError::RouteNotFound {
                method: method.clone(),
                path: path.to_string(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl fmt::Display for Routes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for route in &self.routes {
            writeln!(f, "{route}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use werval_api::{Context, ControllerMethod, ControllerType};

    #[derive(Default)]
    struct Users;

    fn users() -> Arc<ControllerType> {
        let method = |name: &str| {
            ControllerMethod::builder(name).handler(|_: Arc<Users>, context: Context| async move {
                context.outcomes().ok().build()
            })
        };
        ControllerType::builder("Users")
            .constructor::<Users>()
            .method(method("me"))
            .method(method("show"))
            .build()
    }

    #[test]
    fn test_first_match_wins() {
        let controller = users();
        let routes = Routes::new()
            .with(Route::new(Method::GET, "/users/me", &controller, "me").unwrap())
            .with(Route::new(Method::GET, "/users/:id", &controller, "show").unwrap());

        let (route, parameters) = routes.route(&Method::GET, "/users/me").unwrap();
        assert_eq!(route.controller_method().name(), "me");
        assert!(parameters.is_empty());

        let (route, parameters) = routes.route(&Method::GET, "/users/42").unwrap();
        assert_eq!(route.controller_method().name(), "show");
        assert_eq!(parameters.get_as::<u32>("id").unwrap(), Some(42));
    }

    #[test]
    fn test_no_route() {
        let routes = Routes::new()
            .with(Route::new(Method::GET, "/users/:id", &users(), "show").unwrap());
        let err = routes.route(&Method::DELETE, "/users/42").unwrap_err();
        assert!(matches!(err, WervalError::RouteNotFound { .. }));
        assert_eq!(err.status().as_u16(), 404);
    }

    #[test]
    fn test_display() {
        let routes = Routes::new()
            .with(Route::new(Method::GET, "/users/:id", &users(), "show").unwrap());
        assert_eq!(routes.to_string(), "GET /users/:id Users.show\n");
    }
}
