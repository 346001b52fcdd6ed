//! introspect.rs
//!
//! Reads the target FastAPI application from disk and pulls out the
//! route surface used to seed the generation prompt. Nothing here
//! imports or runs the application.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub method: String,
    pub path: String,
    pub handler: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AppDescription {
    pub source_path: PathBuf,
    pub source: String,
    pub routes: Vec<RouteInfo>,
    pub schema: Option<Value>,
}

impl AppDescription {
    pub fn from_source(source_path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        let source = source.into();
        let routes = extract_routes(&source);

        Self {
            source_path: source_path.into(),
            source,
            routes,
            schema: None,
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.source.trim().is_empty() && self.routes.is_empty() && self.schema.is_none()
    }

    /// Dotted module path, e.g. `api/app.py` -> `api.app`.
    pub fn module_path(&self) -> String {
        let stem = self.source_path.with_extension("");
        stem.components()
            .filter_map(|c| c.as_os_str().to_str())
            .filter(|s| *s != "." && !s.is_empty())
            .collect::<Vec<_>>()
            .join(".")
    }
}

pub fn load_app(source_path: &Path, schema_path: Option<&Path>) -> Result<AppDescription> {
    log::info!("Reading FastAPI app from {}", source_path.display());

    let source = fs::read_to_string(source_path).map_err(|e| Error::Introspection {
        path: source_path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut app = AppDescription::from_source(source_path, source);

    if let Some(path) = schema_path {
        log::info!("Loading OpenAPI schema from {}", path.display());
        let raw = fs::read_to_string(path).map_err(|e| Error::Introspection {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let schema: Value = serde_json::from_str(&raw).map_err(|e| Error::Introspection {
            path: path.to_path_buf(),
            reason: format!("schema is not valid JSON: {e}"),
        })?;
        app = app.with_schema(schema);
    }

    log::info!("Found {} route(s)", app.routes.len());
    Ok(app)
}

fn decorator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^\s*@\w+\.(get|post|put|patch|delete|head|options|trace)\(\s*["']([^"']*)["']"#,
        )
        .expect("route decorator regex")
    })
}

fn def_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(?:async\s+)?def\s+(\w+)").expect("def regex"))
}

/// Routes in source order. Each decorator binds to the next `def`.
pub fn extract_routes(source: &str) -> Vec<RouteInfo> {
    let mut routes: Vec<RouteInfo> = Vec::new();
    let mut pending = 0usize;

    for line in source.lines() {
        if let Some(c) = decorator_re().captures(line) {
            routes.push(RouteInfo {
                method: c[1].to_ascii_uppercase(),
                path: c[2].to_string(),
                handler: None,
            });
            pending += 1;
            continue;
        }

        if pending > 0 {
            if let Some(c) = def_re().captures(line) {
                let start = routes.len() - pending;
                for r in &mut routes[start..] {
                    r.handler = Some(c[1].to_string());
                }
                pending = 0;
            }
        }
    }

    routes
}
