use std::sync::LazyLock;

use regex::Regex;

use super::model::{DeploymentMetadata, Route};

// Marker line emitted by the deploy tool right before its route listing.
const ROUTES_MARKER: &str = "Available Routes:";

static ROUTE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*): (https?://[^\s^(]+)(.*)").unwrap());

/// Best-effort extraction from the deploy tool's stdout. Never fails:
/// missing patterns yield empty fields, unrecognized lines are skipped.
pub fn extract(app_name: &str, logs: &str) -> DeploymentMetadata {
    let version_pattern = format!(r"Uploading {} version (.*)\.\.\.", regex::escape(app_name));
    let version = Regex::new(&version_pattern)
        .ok()
        .and_then(|matcher| matcher.captures(logs))
        .map(|captures| captures[1].to_string())
        .unwrap_or_default();

    // Everything before the marker is preamble noise.
    let mut routes: Vec<Route> = Vec::new();
    let mut in_routes = false;
    for line in logs.lines() {
        if !in_routes {
            in_routes = line.trim() == ROUTES_MARKER;
            continue;
        }
        if let Some(captures) = ROUTE_LINE.captures(line.trim()) {
            routes.push(Route {
                name: captures[1].to_string(),
                url: captures[2].to_string(),
                wildcard: captures[3].trim() == "(wildcard)",
            });
        }
    }

    let base = routes
        .first()
        .map(|route| route.url.clone())
        .unwrap_or_default();

    DeploymentMetadata {
        app_name: app_name.to_string(),
        base,
        version,
        routes,
        raw_logs: logs.to_string(),
    }
}
