//! Matching request paths against the path templates declared in a document.
//!
//! Templates such as `/users/{id}` are compiled to anchored, case-insensitive
//! patterns where every `{param}` placeholder accepts `[\w{}%]+`. When several
//! templates match, the one declared last wins.

use crate::document::Document;
use crate::error::{Error, Result};
use log::debug;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// HTTP methods an OpenAPI path item can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    /// All methods in the order OpenAPI lists them in a path item.
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Post,
        HttpMethod::Delete,
        HttpMethod::Options,
        HttpMethod::Head,
        HttpMethod::Patch,
        HttpMethod::Trace,
    ];

    /// The lowercase key used under a path item.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Put => "put",
            HttpMethod::Post => "post",
            HttpMethod::Delete => "delete",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
            HttpMethod::Patch => "patch",
            HttpMethod::Trace => "trace",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unsupported HTTP method: {}", s))
    }
}

/// A declared operation: path template plus method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub path_template: String,
    pub method: HttpMethod,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path_template)
    }
}

struct CompiledTemplate {
    template: String,
    pattern: Regex,
    methods: Vec<HttpMethod>,
}

/// Compiled path templates of one document, in declaration order.
pub struct PathMatcher {
    templates: Vec<CompiledTemplate>,
}

impl PathMatcher {
    /// Compiles every template under the document's `paths` mapping.
    ///
    /// A document without `paths` yields a matcher that matches nothing.
    pub fn new(document: &Document) -> Result<Self> {
        let mut templates = Vec::new();

        if let Some(paths) = document.root.get("paths").and_then(|p| p.as_object()) {
            for (template, item) in paths {
                let pattern = compile_template(template).map_err(|e| Error::ParseError {
                    file: document.path.clone(),
                    message: format!("invalid path template '{}': {}", template, e),
                })?;
                let methods = HttpMethod::ALL
                    .into_iter()
                    .filter(|method| item.get(method.as_str()).is_some())
                    .collect();
                templates.push(CompiledTemplate {
                    template: template.clone(),
                    pattern,
                    methods,
                });
            }
        }

        debug!(
            "Compiled {} path templates from {}",
            templates.len(),
            document.path.display()
        );
        Ok(Self { templates })
    }

    /// Finds the template matching `request_path`, ignoring any query string.
    pub fn match_path(&self, request_path: &str) -> Result<&str> {
        let path = strip_query(request_path);
        self.templates
            .iter()
            .rev()
            .find(|t| t.pattern.is_match(path))
            .map(|t| t.template.as_str())
            .ok_or_else(|| self.not_found())
    }

    /// Finds the operation for `method` at `request_path`.
    ///
    /// Templates that match the path but do not declare the method are skipped, so an
    /// earlier template declaring the method can still be selected.
    pub fn match_endpoint(&self, method: HttpMethod, request_path: &str) -> Result<Endpoint> {
        let path = strip_query(request_path);
        let endpoint = self
            .templates
            .iter()
            .rev()
            .filter(|t| t.pattern.is_match(path))
            .find(|t| t.methods.contains(&method))
            .map(|t| Endpoint {
                path_template: t.template.clone(),
                method,
            })
            .ok_or_else(|| self.not_found())?;

        debug!("Matched {} {} to {}", method, path, endpoint);
        Ok(endpoint)
    }

    /// Every declared operation, in declaration order.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.templates
            .iter()
            .flat_map(|t| {
                t.methods.iter().map(|method| Endpoint {
                    path_template: t.template.clone(),
                    method: *method,
                })
            })
            .collect()
    }

    /// Every declared operation formatted as `METHOD PATH`.
    pub fn available(&self) -> Vec<String> {
        self.endpoints().iter().map(ToString::to_string).collect()
    }

    /// The error reported when a request matches no declared operation.
    pub fn not_found(&self) -> Error {
        Error::EndpointNotFound {
            available: self.available(),
        }
    }
}

/// Removes the query string from a request path.
pub fn strip_query(request_path: &str) -> &str {
    request_path.split('?').next().unwrap_or(request_path)
}

/// Compiles a path template into an anchored, case-insensitive pattern.
pub fn compile_template(template: &str) -> std::result::Result<Regex, regex::Error> {
    let placeholder = Regex::new(r"\{\w+\}")?;
    let mut pattern = String::from("(?i)^");
    let mut last = 0;
    for m in placeholder.find_iter(template) {
        pattern.push_str(&regex::escape(&template[last..m.start()]));
        pattern.push_str(r"[\w{}%]+");
        last = m.end();
    }
    pattern.push_str(&regex::escape(&template[last..]));
    pattern.push('$');
    Regex::new(&pattern)
}
