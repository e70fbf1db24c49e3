//! Site splitter
//!
//! The serialized `http` root holds every `server` block under `servers`.
//! Each of them becomes an independent site document that also carries
//! whatever settings remain at the `http` level.

use crate::error::StructureError;
use crate::value::{ConfList, ConfMap, Value};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::Arc;
use tracing::info;

/// Key holding the server list in the serialized root
pub const SERVERS_KEY: &str = "servers";
/// Display name for servers without a `server_name`
pub const UNNAMED_SERVER: &str = "<no server name>";

/// One virtual host with the shared `http` settings
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    /// Serialized `server` block
    pub server: Value,
    /// Settings shared by every site of the file; `None` when empty
    pub http: Option<Arc<ConfMap>>,
}

impl Site {
    /// Creates a site document
    pub fn new(server: Value, http: Option<Arc<ConfMap>>) -> Self {
        Self { server, http }
    }

    /// Returns the `server_name` value of the server, if any
    pub fn server_name(&self) -> Option<&Value> {
        self.server.get("server_name")
    }

    /// Name used in logs: the first `server_name` or a sentinel
    pub fn display_name(&self) -> String {
        let name = match self.server_name() {
            Some(Value::List(names)) => names.first(),
            other => other,
        };
        name.and_then(Value::scalar_text)
            .unwrap_or_else(|| UNNAMED_SERVER.to_string())
    }

    /// Converts the document into `{site: {server, http?}}`
    pub fn to_value(&self) -> Value {
        let mut site = ConfMap::new();
        site.insert("server".to_string(), self.server.clone());
        if let Some(http) = &self.http {
            site.insert("http".to_string(), Value::Map(http.as_ref().clone()));
        }
        let mut document = ConfMap::new();
        document.insert("site".to_string(), Value::Map(site));
        Value::Map(document)
    }

    /// Reads a `{site: {server, http?}}` document back
    pub fn from_value(value: Value) -> Result<Self, StructureError> {
        let mut document = match value {
            Value::Map(document) => document,
            other => {
                return Err(StructureError::NotAMapping {
                    found: other.type_name(),
                });
            }
        };
        let site = match document.shift_remove("site") {
            Some(Value::Map(site)) => site,
            Some(other) => {
                return Err(StructureError::NotAMapping {
                    found: other.type_name(),
                });
            }
            None => return Err(StructureError::MissingSite),
        };
        let server = site.get("server").cloned().unwrap_or(Value::Null);
        let http = match site.get("http") {
            Some(Value::Map(http)) if !http.is_empty() => Some(Arc::new(http.clone())),
            _ => None,
        };
        Ok(Self::new(server, http))
    }
}

impl Serialize for Site {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        struct Body<'a>(&'a Site);

        impl Serialize for Body<'_> {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                let len = if self.0.http.is_some() { 2 } else { 1 };
                let mut map = serializer.serialize_map(Some(len))?;
                map.serialize_entry("server", &self.0.server)?;
                if let Some(http) = &self.0.http {
                    map.serialize_entry("http", http.as_ref())?;
                }
                map.end()
            }
        }

        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("site", &Body(self))?;
        map.end()
    }
}

/// Lazy iterator over the sites of one serialized root
#[derive(Debug, Clone)]
pub struct SiteSplitter {
    servers: std::vec::IntoIter<Value>,
    http: Option<Arc<ConfMap>>,
}

impl SiteSplitter {
    /// Detaches `servers` from the root; the remainder becomes the shared `http` part
    pub fn new(mut root: ConfMap) -> Result<Self, StructureError> {
        let servers: ConfList = match root.shift_remove(SERVERS_KEY) {
            Some(Value::List(servers)) => *servers,
            Some(other) => {
                return Err(StructureError::ServersNotList {
                    found: other.type_name(),
                });
            }
            None => return Err(StructureError::MissingServers),
        };
        let http = (!root.is_empty()).then(|| Arc::new(root));
        Ok(Self {
            servers: servers.into_vec().into_iter(),
            http,
        })
    }

    /// Settings shared by every site
    pub fn shared_http(&self) -> Option<&ConfMap> {
        self.http.as_deref()
    }
}

impl Iterator for SiteSplitter {
    type Item = Site;

    fn next(&mut self) -> Option<Site> {
        let server = self.servers.next()?;
        let site = Site::new(server, self.http.clone());
        info!("{}", site.display_name());
        Some(site)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.servers.size_hint()
    }
}

/// Splits a serialized root into its sites
pub fn split_sites(root: ConfMap) -> Result<SiteSplitter, StructureError> {
    SiteSplitter::new(root)
}
