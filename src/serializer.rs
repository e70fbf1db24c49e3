//! Shape-inferring serializer
//!
//! Turns a [`ConfTree`] into nested [`Value`] maps. For every directive
//! name the serializer picks a shape:
//!
//! - a single directive becomes a scalar, a list, or a `kwargs`/`args` map;
//! - repeated directives that all carry more than one positional argument
//!   become a map keyed by their first argument;
//! - any other repeated directive becomes a list of argument values.
//!
//! Child contexts are grouped under their pluralized name (`location` ->
//! `locations`) and tagged with their opening arguments so the reader can
//! tell blocks apart.

use crate::directive::Directive;
use crate::parser::{ConfTree, Context, ContextId};
use crate::value::{ConfMap, Value};

/// Context name whose children carry no identifying key
const SERVER_CONTEXT: &str = "server";
/// Context name whose argument is a parenthesized condition
const IF_CONTEXT: &str = "if";
/// Key of the keyword arguments of a single directive
pub const KWARGS_KEY: &str = "kwargs";
/// Key of the positional arguments next to [`KWARGS_KEY`]
pub const ARGS_KEY: &str = "args";

/// Rules controlling which directive groups may become keyed maps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapePolicy {
    /// Directive name suffixes that never collapse into keyed maps
    ///
    /// Zone directives reuse their first argument across lines, so keying
    /// on it would drop entries.
    pub keyed_map_exempt_suffixes: Vec<String>,
}

impl ShapePolicy {
    /// Creates a policy with the default exemptions
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a name suffix that must never become a keyed map
    pub fn with_exempt_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.keyed_map_exempt_suffixes.push(suffix.into());
        self
    }

    /// Removes all exemptions
    pub fn without_exemptions(mut self) -> Self {
        self.keyed_map_exempt_suffixes.clear();
        self
    }

    /// Returns true if a repeated directive of this name may become a keyed map
    pub fn allows_keyed_map(&self, name: &str) -> bool {
        !self
            .keyed_map_exempt_suffixes
            .iter()
            .any(|suffix| name.ends_with(suffix.as_str()))
    }
}

impl Default for ShapePolicy {
    fn default() -> Self {
        Self {
            keyed_map_exempt_suffixes: vec!["_zone".to_string()],
        }
    }
}

/// Serializer over one parsed tree
#[derive(Debug, Clone, Copy)]
pub struct ShapeSerializer<'t> {
    tree: &'t ConfTree,
    policy: &'t ShapePolicy,
}

impl<'t> ShapeSerializer<'t> {
    pub fn new(tree: &'t ConfTree, policy: &'t ShapePolicy) -> Self {
        Self { tree, policy }
    }

    /// Serializes the root context
    pub fn serialize_root(&self) -> ConfMap {
        self.serialize_context(ContextId::ROOT)
    }

    /// Serializes one context and everything below it
    pub fn serialize_context(&self, id: ContextId) -> ConfMap {
        let context = self.tree.get(id);
        let mut data = ConfMap::new();

        for (name, directives) in &context.directives {
            data.insert(name.clone(), self.directive_group(name, directives));
        }

        for (name, children) in &context.children {
            let entries = children.iter().map(|&child| {
                let mut child_data = self.serialize_context(child);
                if let Some(tag) = context_tag(self.tree.get(child)) {
                    child_data.insert(name.clone(), Value::String(tag));
                }
                Value::Map(child_data)
            });
            data.insert(format!("{name}s"), Value::list(entries));
        }

        data
    }

    fn directive_group(&self, name: &str, directives: &[Directive]) -> Value {
        match directives {
            [single] => single_directive(single),
            _ if self.is_keyed(name, directives) => {
                let mut keyed = ConfMap::new();
                for directive in directives {
                    if let Some((key, rest)) = directive.positional_args.split_first() {
                        keyed.insert(key.to_string(), Value::list(rest.iter().map(Value::from)));
                    }
                }
                Value::Map(keyed)
            }
            _ => Value::list(directives.iter().map(positional_value)),
        }
    }

    fn is_keyed(&self, name: &str, directives: &[Directive]) -> bool {
        self.policy.allows_keyed_map(name)
            && directives.iter().all(|d| d.positional_args.len() > 1)
    }
}

/// Shape of a directive that appears once in its context
fn single_directive(directive: &Directive) -> Value {
    if directive.keyword_args.is_empty() {
        return positional_value(directive);
    }

    let mut data = ConfMap::new();
    let kwargs = directive
        .keyword_args
        .iter()
        .map(|(key, value)| (key.clone(), Value::from(value)))
        .collect();
    data.insert(KWARGS_KEY.to_string(), Value::Map(kwargs));
    if !directive.positional_args.is_empty() {
        data.insert(
            ARGS_KEY.to_string(),
            Value::list(directive.positional_args.iter().map(Value::from)),
        );
    }
    Value::Map(data)
}

/// One positional argument as a scalar, several as a list, none as null
fn positional_value(directive: &Directive) -> Value {
    match directive.positional_args.as_slice() {
        [] => Value::Null,
        [only] => only.into(),
        args => Value::list(args.iter().map(Value::from)),
    }
}

/// Identifying text stored on a serialized child context
fn context_tag(context: &Context) -> Option<String> {
    let joined = context.context_args.join(" ");
    match context.name.as_str() {
        SERVER_CONTEXT => None,
        IF_CONTEXT => Some(
            joined
                .strip_prefix('(')
                .and_then(|rest| rest.strip_suffix(')'))
                .map(str::to_string)
                .unwrap_or(joined),
        ),
        _ => Some(joined),
    }
}

/// Serializes a tree's root context with the default policy
pub fn serialize_tree(tree: &ConfTree) -> ConfMap {
    let policy = ShapePolicy::default();
    ShapeSerializer::new(tree, &policy).serialize_root()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;

    fn serialize(input: &str) -> Value {
        Value::Map(serialize_tree(&parse_str(input).unwrap()))
    }

    fn strings(items: &[&str]) -> Value {
        Value::list(items.iter().map(|s| Value::from(*s)))
    }

    #[test]
    fn test_single_scalar() {
        let data = serialize("sendfile on;\nkeepalive_timeout 65;\nroot /var/www;\n");
        assert_eq!(data.get("sendfile"), Some(&Value::Boolean(true)));
        assert_eq!(data.get("keepalive_timeout"), Some(&Value::Integer(65)));
        assert_eq!(data.get("root"), Some(&Value::from("/var/www")));
    }

    #[test]
    fn test_single_list() {
        let data = serialize("listen 443 ssl http2;\n");
        assert_eq!(
            data.get("listen"),
            Some(&Value::list([Value::Integer(443), "ssl".into(), "http2".into()]))
        );
    }

    #[test]
    fn test_bare_flag() {
        let data = serialize("upstream backend {\nip_hash;\n}\n");
        let upstream = &data.get("upstreams").unwrap().as_list().unwrap()[0];
        assert_eq!(upstream.get("ip_hash"), Some(&Value::Boolean(true)));
    }

    #[test]
    fn test_kwargs_with_args() {
        let data = serialize("proxy_cache_path /data levels=1:2 inactive=60m;\n");
        let entry = data.get("proxy_cache_path").unwrap();
        let kwargs = entry.get("kwargs").unwrap();
        assert_eq!(
            kwargs.get("levels"),
            Some(&Value::list([Value::Integer(1), Value::Integer(2)]))
        );
        assert_eq!(kwargs.get("inactive"), Some(&Value::from("60m")));
        assert_eq!(entry.get("args"), Some(&strings(&["/data"])));
        let keys: Vec<_> = entry.as_map().unwrap().keys().collect();
        assert_eq!(keys, vec!["kwargs", "args"]);
    }

    #[test]
    fn test_kwargs_without_args() {
        let data = serialize("resolver_opts valid=30s;\n");
        let entry = data.get("resolver_opts").unwrap();
        assert!(entry.get("args").is_none());
        assert_eq!(entry.get("kwargs").unwrap().get("valid"), Some(&Value::from("30s")));
    }

    #[test]
    fn test_repeated_multi_arg_becomes_keyed_map() {
        let data = serialize(
            "add_header X-Frame-Options SAMEORIGIN;\nadd_header Cache-Control \"no-cache\" always;\n",
        );
        let headers = data.get("add_header").unwrap().as_map().unwrap();
        let keys: Vec<_> = headers.keys().collect();
        assert_eq!(keys, vec!["X-Frame-Options", "Cache-Control"]);
        assert_eq!(headers["X-Frame-Options"], strings(&["SAMEORIGIN"]));
        assert_eq!(headers["Cache-Control"], strings(&["no-cache", "always"]));
    }

    #[test]
    fn test_zone_directives_never_keyed() {
        // every directive has more than one positional, yet no keyed map
        let input = "limit_req_zone $binary_remote_addr one 10m;\n\
                     limit_req_zone $binary_remote_addr two 10m;\n";
        let data = serialize(input);
        assert_eq!(
            data.get("limit_req_zone"),
            Some(&Value::list([
                strings(&["$binary_remote_addr", "one", "10m"]),
                strings(&["$binary_remote_addr", "two", "10m"]),
            ]))
        );
    }

    #[test]
    fn test_zone_directives_with_kwargs() {
        let input = "limit_req_zone $binary_remote_addr zone=one:10m rate=1r/s;\n\
                     limit_req_zone $server_name zone=two:10m rate=5r/s;\n";
        let data = serialize(input);
        assert_eq!(
            data.get("limit_req_zone"),
            Some(&strings(&["$binary_remote_addr", "$server_name"]))
        );
    }

    #[test]
    fn test_zone_with_multiple_positionals_is_list_of_lists() {
        let input = "proxy_zone shared a b;\nproxy_zone shared c d;\n";
        let data = serialize(input);
        assert_eq!(
            data.get("proxy_zone"),
            Some(&Value::list([
                strings(&["shared", "a", "b"]),
                strings(&["shared", "c", "d"]),
            ]))
        );

        // the same lines under a name without the suffix collapse
        let data = serialize("proxy_zones shared a b;\nproxy_zones shared c d;\n");
        assert!(data.get("proxy_zones").unwrap().is_map());
    }

    #[test]
    fn test_policy_is_configurable() {
        let tree = parse_str("add_header A 1;\nadd_header B 2;\n").unwrap();
        let policy = ShapePolicy::new().with_exempt_suffix("_header");
        let data = ShapeSerializer::new(&tree, &policy).serialize_root();
        assert_eq!(
            data["add_header"],
            Value::list([
                Value::list(["A".into(), Value::Integer(1)]),
                Value::list(["B".into(), Value::Integer(2)]),
            ])
        );

        let tree = parse_str("limit_req_zone $a one 10m;\nlimit_req_zone $a two 10m;\n").unwrap();
        let policy = ShapePolicy::new().without_exemptions();
        let data = ShapeSerializer::new(&tree, &policy).serialize_root();
        let keyed = data["limit_req_zone"].as_map().unwrap();
        assert_eq!(keyed.len(), 1);
        assert_eq!(keyed["$a"], strings(&["two", "10m"]));
    }

    #[test]
    fn test_repeated_mixed_arity_is_list() {
        let data = serialize("server_name example.org;\nserver_name www.example.org alt.example.org;\n");
        assert_eq!(
            data.get("server_name"),
            Some(&Value::list([
                "example.org".into(),
                strings(&["www.example.org", "alt.example.org"]),
            ]))
        );
    }

    #[test]
    fn test_duplicate_keys_keep_last_value() {
        let data = serialize("add_header X a;\nadd_header Y b;\nadd_header X c;\n");
        let headers = data.get("add_header").unwrap().as_map().unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get_index(0).unwrap().0, "X");
        assert_eq!(headers["X"], strings(&["c"]));
    }

    #[test]
    fn test_integer_first_arg_keys() {
        let data = serialize("error_page 404 /404.html;\nerror_page 500 /50x.html;\n");
        let pages = data.get("error_page").unwrap().as_map().unwrap();
        assert_eq!(pages["404"], strings(&["/404.html"]));
        assert_eq!(pages["500"], strings(&["/50x.html"]));
    }

    #[test]
    fn test_location_tagged_with_path() {
        let data = serialize("server {\nlocation /api {\nproxy_pass http://b;\n}\n}\n");
        let server = &data.get("servers").unwrap().as_list().unwrap()[0];
        assert!(server.get("server").is_none());
        let locations = server.get("locations").unwrap().as_list().unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].get("location"), Some(&Value::from("/api")));
        assert_eq!(locations[0].get("proxy_pass"), Some(&Value::from("http://b")));
    }

    #[test]
    fn test_location_modifier_joined() {
        let data = serialize("location ~* \\.(png|jpg)$ {\nexpires 30d;\n}\n");
        let location = &data.get("locations").unwrap().as_list().unwrap()[0];
        assert_eq!(location.get("location"), Some(&Value::from("~* \\.(png|jpg)$")));
    }

    #[test]
    fn test_if_condition_stripped() {
        let data = serialize("if (some $condition) {\nreturn 403;\n}\n");
        let cond = &data.get("ifs").unwrap().as_list().unwrap()[0];
        assert_eq!(cond.get("if"), Some(&Value::from("some $condition")));
        assert_eq!(cond.get("return"), Some(&Value::Integer(403)));
    }

    #[test]
    fn test_if_without_parentheses_kept() {
        let data = serialize("if $flag {\nreturn 403;\n}\n");
        let cond = &data.get("ifs").unwrap().as_list().unwrap()[0];
        assert_eq!(cond.get("if"), Some(&Value::from("$flag")));
    }

    #[test]
    fn test_context_without_args_has_empty_tag() {
        let data = serialize("events {\nworker_connections 1024;\n}\n");
        let events = &data.get("eventss").unwrap().as_list().unwrap()[0];
        assert_eq!(events.get("events"), Some(&Value::from("")));
    }

    #[test]
    fn test_directives_precede_children() {
        let data = serialize("server {\nlisten 80;\n}\nsendfile on;\n");
        let keys: Vec<_> = data.as_map().unwrap().keys().collect();
        assert_eq!(keys, vec!["sendfile", "servers"]);
    }

    #[test]
    fn test_multiple_servers_in_order() {
        let data = serialize("server {\nserver_name a;\n}\nserver {\nserver_name b;\n}\n");
        let servers = data.get("servers").unwrap().as_list().unwrap();
        let names: Vec<_> = servers
            .iter()
            .map(|s| s.get("server_name").unwrap().as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_serialization_is_idempotent() {
        let input = "map $http_upgrade $connection_upgrade {\ndefault upgrade;\n'' close;\n}\n\
                     server {\nlisten 80;\nadd_header A 1;\nadd_header B 2;\n\
                     location / {\nif ($x) {\nreturn 404;\n}\n}\n}\n";
        let tree = parse_str(input).unwrap();
        let first = serde_yaml::to_string(&Value::Map(serialize_tree(&tree))).unwrap();
        let second = serde_yaml::to_string(&Value::Map(serialize_tree(&tree))).unwrap();
        assert_eq!(first, second);
    }
}
