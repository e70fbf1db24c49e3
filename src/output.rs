//! Batch conversion and site output
//!
//! Drives whole runs: every `*.conf` file of a directory is parsed,
//! serialized and split into sites, and each site is handed to a
//! [`SiteSink`]. A file that fails is logged and recorded in the
//! [`BatchReport`]; the run carries on with the next one.

use crate::error::{NgxError, Result, StructureError};
use crate::namer::SiteNamer;
use crate::parser::parse_str;
use crate::serializer::{ShapePolicy, ShapeSerializer};
use crate::site::{Site, split_sites};
use crate::value::Value;
use serde::Deserialize;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// YAML document start marker
pub const DOCUMENT_START: &str = "---\n";

/// Options for a conversion run
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Extension of input files, without the dot
    pub input_extension: String,
    /// Extension of written site files, without the dot
    pub output_extension: String,
    /// Shape rules for the serializer
    pub policy: ShapePolicy,
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the extension of input files
    pub fn with_input_extension(mut self, extension: impl Into<String>) -> Self {
        self.input_extension = extension.into();
        self
    }

    /// Sets the extension of written files
    pub fn with_output_extension(mut self, extension: impl Into<String>) -> Self {
        self.output_extension = extension.into();
        self
    }

    /// Sets the serializer policy
    pub fn with_policy(mut self, policy: ShapePolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_extension: "conf".to_string(),
            output_extension: "yml".to_string(),
            policy: ShapePolicy::default(),
        }
    }
}

/// Outcome of a run
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Inputs (files or stream documents) that produced sites
    pub converted: usize,
    /// Sites handed to the sink
    pub sites: usize,
    /// Inputs or sites that failed
    pub failures: Vec<NgxError>,
}

impl BatchReport {
    /// True when nothing failed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record_failure(&mut self, err: NgxError) {
        error!("{}", err);
        self.failures.push(err);
    }
}

/// Destination for site documents
pub trait SiteSink {
    /// Writes one site
    fn accept(&mut self, site: &Site) -> Result<()>;
}

/// Writes each site to its own file in a directory
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    extension: String,
    namer: SiteNamer,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    /// Creates the sink, creating `dir` if needed
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| NgxError::io(&dir, e))?;
        Ok(Self {
            dir,
            extension: extension.into(),
            namer: SiteNamer::new(),
            written: Vec::new(),
        })
    }

    /// Files written so far, in order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// The namer tracking names used by this sink
    pub fn namer(&self) -> &SiteNamer {
        &self.namer
    }
}

impl SiteSink for DirectorySink {
    fn accept(&mut self, site: &Site) -> Result<()> {
        let name = self.namer.name(site);
        let path = self.dir.join(format!("{}.{}", name, self.extension));
        let mut text = String::from(DOCUMENT_START);
        text.push_str(&serde_yaml::to_string(site)?);
        fs::write(&path, text).map_err(|e| NgxError::io(&path, e))?;
        info!("{} -> {}", site.display_name(), path.display());
        self.written.push(path);
        Ok(())
    }
}

/// Writes every site to one multi-document stream
#[derive(Debug)]
pub struct StreamSink<W: Write> {
    writer: W,
}

impl<W: Write> StreamSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SiteSink for StreamSink<W> {
    fn accept(&mut self, site: &Site) -> Result<()> {
        let text = serde_yaml::to_string(site)?;
        let stream = PathBuf::from("<stream>");
        self.writer
            .write_all(DOCUMENT_START.as_bytes())
            .and_then(|()| self.writer.write_all(text.as_bytes()))
            .map_err(|e| NgxError::io(&stream, e))
    }
}

/// Parses, serializes and splits one configuration text
pub fn convert_str(input: &str, path: &Path, policy: &ShapePolicy) -> Result<Vec<Site>> {
    let tree = parse_str(input).map_err(|source| NgxError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let root = ShapeSerializer::new(&tree, policy).serialize_root();
    let sites = split_sites(root).map_err(|source| NgxError::Structure {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(sites.collect())
}

/// Reads and converts one configuration file
pub fn convert_file(path: &Path, policy: &ShapePolicy) -> Result<Vec<Site>> {
    info!("Parsing {}", path.display());
    let input = fs::read_to_string(path).map_err(|e| NgxError::io(path, e))?;
    convert_str(&input, path, policy)
}

/// Lists the files of `dir` with the given extension, sorted by path
pub fn list_config_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| NgxError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| NgxError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Converts every configuration file of `input` into the sink
///
/// Fails only if the directory cannot be listed; per-file problems end
/// up in the report.
pub fn convert_dir(
    input: &Path,
    config: &BatchConfig,
    sink: &mut dyn SiteSink,
) -> Result<BatchReport> {
    let files = list_config_files(input, &config.input_extension)?;
    debug!("{} configuration files in {}", files.len(), input.display());

    let mut report = BatchReport::default();
    for path in files {
        match convert_file(&path, &config.policy) {
            Ok(sites) => {
                report.converted += 1;
                emit(sites, sink, &mut report);
            }
            Err(err) => report.record_failure(err),
        }
    }
    Ok(report)
}

/// Splits a multi-document YAML stream into the sink
///
/// Each document is either a site document, written as is, or a
/// serialized root with `servers`, split like a parsed file. `source`
/// names the stream in diagnostics.
pub fn split_stream(
    mut reader: impl Read,
    source: &Path,
    sink: &mut dyn SiteSink,
) -> Result<BatchReport> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| NgxError::io(source, e))?;

    let mut report = BatchReport::default();
    for (index, document) in serde_yaml::Deserializer::from_str(&text).enumerate() {
        let value = match Value::deserialize(document) {
            Ok(Value::Null) => {
                debug!("Skipping empty document {}", index);
                continue;
            }
            Ok(value) => value,
            Err(err) => {
                // a syntax error leaves the rest of the stream unreadable
                report.record_failure(err.into());
                break;
            }
        };
        match document_sites(value) {
            Ok(sites) => {
                report.converted += 1;
                emit(sites, sink, &mut report);
            }
            Err(source_err) => report.record_failure(NgxError::Structure {
                path: source.to_path_buf(),
                source: source_err,
            }),
        }
    }
    Ok(report)
}

fn document_sites(value: Value) -> std::result::Result<Vec<Site>, StructureError> {
    match value {
        Value::Map(map) if map.contains_key("site") => {
            Site::from_value(Value::Map(map)).map(|site| vec![site])
        }
        Value::Map(map) => split_sites(map).map(Iterator::collect),
        other => Err(StructureError::NotAMapping {
            found: other.type_name(),
        }),
    }
}

fn emit(sites: Vec<Site>, sink: &mut dyn SiteSink, report: &mut BatchReport) {
    for site in sites {
        match sink.accept(&site) {
            Ok(()) => report.sites += 1,
            Err(err) => report.record_failure(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collect(Vec<String>);

    impl SiteSink for Collect {
        fn accept(&mut self, site: &Site) -> Result<()> {
            self.0.push(site.display_name());
            Ok(())
        }
    }

    #[test]
    fn test_convert_str_errors_carry_path() {
        let policy = ShapePolicy::default();
        let err = convert_str("listen 80\n", Path::new("a.conf"), &policy).unwrap_err();
        assert!(matches!(err, NgxError::Parse { ref path, .. } if path == Path::new("a.conf")));
        assert!(err.to_string().starts_with("a.conf: "));

        let err = convert_str("gzip on;\n", Path::new("b.conf"), &policy).unwrap_err();
        assert!(matches!(
            err,
            NgxError::Structure {
                source: StructureError::MissingServers,
                ..
            }
        ));
    }

    #[test]
    fn test_stream_sink_writes_document_markers() {
        let policy = ShapePolicy::default();
        let sites = convert_str(
            "server {\nserver_name a;\n}\nserver {\nserver_name b;\n}\n",
            Path::new("x.conf"),
            &policy,
        )
        .unwrap();

        let mut sink = StreamSink::new(Vec::new());
        for site in &sites {
            sink.accept(site).unwrap();
        }
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text.matches(DOCUMENT_START).count(), 2);
        assert!(text.starts_with("---\nsite:\n"));
    }

    #[test]
    fn test_split_stream_mixed_documents() {
        let stream = "---\nsite:\n  server:\n    server_name: a\n\
                      ---\nservers:\n- server_name: b\n- server_name: c\ngzip: true\n\
                      ---\n- not a mapping\n";
        let mut sink = Collect::default();
        let report = split_stream(stream.as_bytes(), Path::new("s.yml"), &mut sink).unwrap();
        assert_eq!(sink.0, vec!["a", "b", "c"]);
        assert_eq!(report.converted, 2);
        assert_eq!(report.sites, 3);
        assert_eq!(report.failures.len(), 1);
        assert!(!report.is_success());
    }

    #[test]
    fn test_split_stream_root_without_servers() {
        let mut sink = Collect::default();
        let report =
            split_stream("gzip: true\n".as_bytes(), Path::new("s.yml"), &mut sink).unwrap();
        assert!(sink.0.is_empty());
        assert!(matches!(
            report.failures[0],
            NgxError::Structure {
                source: StructureError::MissingServers,
                ..
            }
        ));
    }

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new()
            .with_input_extension("nginx")
            .with_output_extension("yaml")
            .with_policy(ShapePolicy::new().without_exemptions());
        assert_eq!(config.input_extension, "nginx");
        assert_eq!(config.output_extension, "yaml");
        assert!(config.policy.keyed_map_exempt_suffixes.is_empty());
    }
}
