//! # ngx2yml
//!
//! Converts a directory of Nginx `conf.d` files into one YAML document per
//! virtual host.
//!
//! ## Overview
//!
//! Each configuration file goes through four stages:
//!
//! - **Tokenizer** ([`lexer`]): splits a statement line into quoted strings,
//!   parenthesized groups and barewords
//! - **Context tree** ([`parser`]): builds the nested `http`/`server`/`location`
//!   structure line by line
//! - **Shape inference** ([`serializer`]): picks a scalar, list or keyed map
//!   for every directive from how often it appears and how many arguments it has
//! - **Site splitting** ([`site`], [`namer`]): emits every `server` with the
//!   shared `http` settings under a unique file name
//!
//! ## Basic Usage
//!
//! ```rust
//! use ngx2yml::{parse_str, serialize_tree, split_sites, Value};
//!
//! let conf = r#"
//! gzip on;
//! server {
//!     listen 80;
//!     server_name example.org;
//!     location / {
//!         root /var/www;
//!     }
//! }
//! "#;
//!
//! let tree = parse_str(conf)?;
//! let root = serialize_tree(&tree);
//! let sites: Vec<_> = split_sites(root)?.collect();
//!
//! assert_eq!(sites.len(), 1);
//! assert_eq!(sites[0].display_name(), "example.org");
//! assert_eq!(sites[0].server.get("listen"), Some(&Value::Integer(80)));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Batch Conversion
//!
//! ```rust,no_run
//! use ngx2yml::{BatchConfig, DirectorySink, convert_dir};
//! use std::path::Path;
//!
//! let config = BatchConfig::default();
//! let mut sink = DirectorySink::new("sites", &config.output_extension)?;
//! let report = convert_dir(Path::new("/etc/nginx/conf.d"), &config, &mut sink)?;
//! println!("{} sites written", report.sites);
//! # Ok::<(), ngx2yml::NgxError>(())
//! ```

pub mod directive;
pub mod error;
pub mod lexer;
pub mod logging;
pub mod namer;
pub mod output;
pub mod parser;
pub mod serializer;
pub mod site;
pub mod value;


// Re-export main types and functions
pub use directive::{Directive, KeywordValue, Scalar};
pub use error::{LexError, NgxError, ParseError, Position, Result, StructureError};
pub use lexer::{Token, TokenKind, tokenize};
pub use parser::{ConfTree, Context, ContextId, TreeBuilder, parse_str};
pub use serializer::{ShapePolicy, ShapeSerializer, serialize_tree};
pub use site::{Site, SiteSplitter, split_sites};
pub use value::{ConfList, ConfMap, Value};

// Re-export batch driver
pub use namer::SiteNamer;
pub use output::{
    BatchConfig, BatchReport, DirectorySink, SiteSink, StreamSink, convert_dir, convert_file,
    convert_str, split_stream,
};
