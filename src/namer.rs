//! Output file naming
//!
//! Each site is written to a file named after its primary `server_name`.
//! When two sites share a name the `listen` values are tried as suffixes,
//! skipping values an earlier site of that name already listens on; when
//! that fails too, a random identifier is used. Naming never fails.

use crate::serializer::{ARGS_KEY, KWARGS_KEY};
use crate::site::Site;
use crate::value::Value;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

/// Reasons a human-readable name could not be derived
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingIssue {
    #[error("server has no usable server_name")]
    MissingServerName,

    #[error("name '{name}' is taken and no listen value disambiguates it")]
    Exhausted { name: String },
}

/// Assigns unique base names to the sites of one run
#[derive(Debug, Clone, Default)]
pub struct SiteNamer {
    used: HashSet<String>,
    /// Listen values seen so far per primary server name
    listens: HashMap<String, HashSet<String>>,
}

impl SiteNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks a name for the site and marks it as used
    pub fn name(&mut self, site: &Site) -> String {
        let base = primary_server_name(site);
        let listens = site.server.get("listen").map(listen_values).unwrap_or_default();

        let name = match self.derive(base.as_deref(), &listens) {
            Ok(name) => name,
            Err(issue) => {
                let fallback = self.random_name();
                warn!(
                    "{}: {}, using {}",
                    site.display_name(),
                    issue,
                    fallback
                );
                fallback
            }
        };
        self.used.insert(name.clone());
        if let Some(base) = base {
            self.listens.entry(base).or_default().extend(listens);
        }
        name
    }

    /// Returns true if `name` was already handed out
    pub fn is_taken(&self, name: &str) -> bool {
        self.used.contains(name)
    }

    /// Number of names handed out so far
    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    fn derive(&self, base: Option<&str>, listens: &[String]) -> Result<String, NamingIssue> {
        let base = base.ok_or(NamingIssue::MissingServerName)?;
        if !self.is_taken(base) {
            return Ok(base.to_string());
        }

        let claimed = self.listens.get(base);
        for listen in listens {
            if claimed.is_some_and(|seen| seen.contains(listen)) {
                continue;
            }
            let candidate = sanitize(&format!("{base}-{listen}"));
            if !self.is_taken(&candidate) {
                return Ok(candidate);
            }
        }
        Err(NamingIssue::Exhausted {
            name: base.to_string(),
        })
    }

    fn random_name(&self) -> String {
        loop {
            let candidate = Uuid::new_v4().simple().to_string();
            if !self.is_taken(&candidate) {
                return candidate;
            }
        }
    }
}

/// First `server_name`, without a leading dot, made safe for file names
fn primary_server_name(site: &Site) -> Option<String> {
    let name = match site.server_name()? {
        Value::List(names) => names.first()?.scalar_text()?,
        other => other.scalar_text()?,
    };
    let name = name.strip_prefix('.').unwrap_or(&name);
    if name.is_empty() {
        return None;
    }
    Some(sanitize(name))
}

/// Flattens a `listen` value into suffix candidates
///
/// A map is either one directive with keyword arguments, whose
/// positional arguments are the candidates, or repeated directives keyed
/// by their address.
fn listen_values(listen: &Value) -> Vec<String> {
    match listen {
        Value::List(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::List(args) => args.first().and_then(Value::scalar_text),
                other => other.scalar_text(),
            })
            .collect(),
        Value::Map(map) if map.contains_key(KWARGS_KEY) => match map.get(ARGS_KEY) {
            Some(Value::List(args)) => args.iter().filter_map(Value::scalar_text).collect(),
            Some(other) => other.scalar_text().into_iter().collect(),
            None => Vec::new(),
        },
        Value::Map(keyed) => keyed.keys().cloned().collect(),
        other => other.scalar_text().into_iter().collect(),
    }
}

/// Replaces characters that cannot appear in a file name
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}
