//! Routes: HTTP method and path pattern bound to a controller method
//!
//! Path patterns are made of `/` separated segments:
//!
//! - `users`: static segment, matched verbatim
//! - `:id`: parameter bound to one non-empty segment
//! - `*path`: parameter bound to the rest of the path, last segment only

use std::fmt;
use std::sync::Arc;

use http::Method;

use crate::controller::{ControllerMethod, ControllerType};
use crate::http::Parameters;
use crate::{Result, WervalError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
    Wildcard(String),
}

/// A route bound to a controller method
#[derive(Debug, Clone)]
pub struct Route {
    method: Method,
    path: String,
    segments: Vec<Segment>,
    controller_type: Arc<ControllerType>,
    controller_method: Arc<ControllerMethod>,
    modifiers: Vec<String>,
}

impl Route {
    /// Bind `method path` to the named method of a controller type
    ///
    /// Fails with a wiring error when the pattern is malformed or the
    /// controller has no such method.
    pub fn new(
        method: Method,
        path: &str,
        controller_type: &Arc<ControllerType>,
        method_name: &str,
    ) -> Result<Self> {
        let controller_method = controller_type.method(method_name).cloned().ok_or_else(|| {
            WervalError::wiring(format!(
                "controller '{}' has no method named '{method_name}'",
                controller_type.name()
            ))
        })?;
        Ok(Self {
            method,
            path: path.to_string(),
            segments: parse_pattern(path)?,
            controller_type: Arc::clone(controller_type),
            controller_method,
            modifiers: Vec::new(),
        })
    }

    /// Free-form route modifiers
    pub fn with_modifiers<I, S>(mut self, modifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modifiers = modifiers.into_iter().map(Into::into).collect();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn controller_type(&self) -> &Arc<ControllerType> {
        &self.controller_type
    }

    pub fn controller_method(&self) -> &Arc<ControllerMethod> {
        &self.controller_method
    }

    pub fn modifiers(&self) -> &[String] {
        &self.modifiers
    }

    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|m| m == modifier)
    }

    /// Path parameters bound when this route matches the request
    pub fn matches(&self, method: &Method, path: &str) -> Option<Parameters> {
        if self.method != *method {
            return None;
        }
        let request_segments = split(path);
        let mut parameters = Parameters::new();
        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Static(expected) => {
                    if request_segments.get(index) != Some(&expected.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let raw = request_segments.get(index).filter(|raw| !raw.is_empty())?;
                    parameters.insert(name.as_str(), decode(raw));
                }
                Segment::Wildcard(name) => {
                    let rest = request_segments.get(index..).unwrap_or_default();
                    let rest = rest.iter().map(|raw| decode(raw)).collect::<Vec<_>>();
                    parameters.insert(name.as_str(), rest.join("/"));
                    return Some(parameters);
                }
            }
        }
        (request_segments.len() == self.segments.len()).then_some(parameters)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}.{}",
            self.method,
            self.path,
            self.controller_type.name(),
            self.controller_method.name()
        )?;
        if !self.modifiers.is_empty() {
            write!(f, " {}", self.modifiers.join(" "))?;
        }
        Ok(())
    }
}

fn split(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

fn parse_pattern(path: &str) -> Result<Vec<Segment>> {
    if !path.starts_with('/') {
        return Err(WervalError::wiring(format!(
            "route path '{path}' must start with '/'"
        )));
    }
    let raw_segments = split(path);
    let last = raw_segments.len().saturating_sub(1);
    raw_segments
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            if let Some(name) = raw.strip_prefix(':') {
                parameter_name(path, name).map(|name| Segment::Param(name.to_string()))
            } else if let Some(name) = raw.strip_prefix('*') {
                if index != last {
                    return Err(WervalError::wiring(format!(
                        "wildcard '{raw}' must be the last segment of route path '{path}'"
                    )));
                }
                parameter_name(path, name).map(|name| Segment::Wildcard(name.to_string()))
            } else {
                Ok(Segment::Static(raw.to_string()))
            }
        })
        .collect()
}

fn parameter_name<'a>(path: &str, name: &'a str) -> Result<&'a str> {
    if name.is_empty() {
        Err(WervalError::wiring(format!(
            "unnamed parameter in route path '{path}'"
        )))
    } else {
        Ok(name)
    }
}
