//! Candidate feed
//!
//! Candidates arrive as a stream of JSON objects produced by an upstream
//! search export. Objects may be concatenated, one per line, pretty-printed,
//! or wrapped in a top-level array.

use std::io::Read;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::common::types::{CandidateEndpoint, GeoInfo};
use crate::error::{CensusError, CensusResult};

/// Source of candidate endpoints for one scan
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Produce the candidate list, in feed order
    async fn candidates(&self) -> CensusResult<Vec<CandidateEndpoint>>;
}

/// Candidates read from a JSON feed file
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    default_port: u16,
}

impl JsonFileSource {
    /// Create a source for `path`
    pub fn new(path: impl Into<PathBuf>, default_port: u16) -> Self {
        Self {
            path: path.into(),
            default_port,
        }
    }
}

#[async_trait]
impl CandidateSource for JsonFileSource {
    async fn candidates(&self) -> CensusResult<Vec<CandidateEndpoint>> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| CensusError::io(&self.path, e))?;
        let candidates = parse_candidates(bytes.as_slice(), self.default_port);
        info!(
            path = %self.path.display(),
            candidates = candidates.len(),
            "Read candidate feed"
        );
        Ok(candidates)
    }
}

/// Fixed in-memory candidate list
#[derive(Debug, Clone, Default)]
pub struct StaticSource(pub Vec<CandidateEndpoint>);

#[async_trait]
impl CandidateSource for StaticSource {
    async fn candidates(&self) -> CensusResult<Vec<CandidateEndpoint>> {
        Ok(self.0.clone())
    }
}

/// Parse a candidate feed
///
/// Unusable objects are skipped. A malformed object stops parsing and the
/// candidates read so far are returned.
pub fn parse_candidates<R: Read>(reader: R, default_port: u16) -> Vec<CandidateEndpoint> {
    let mut candidates = Vec::new();
    let stream = serde_json::Deserializer::from_reader(reader).into_iter::<Value>();

    for item in stream {
        match item {
            Ok(Value::Object(entry)) => push_entry(&mut candidates, &entry, default_port),
            Ok(Value::Array(entries)) => {
                for entry in entries {
                    match entry {
                        Value::Object(entry) => push_entry(&mut candidates, &entry, default_port),
                        other => debug!(value = %other, "Skipping non-object feed entry"),
                    }
                }
            }
            Ok(other) => debug!(value = %other, "Skipping non-object feed entry"),
            Err(e) => {
                error!(
                    error = %e,
                    parsed = candidates.len(),
                    "Malformed candidate feed, stopping"
                );
                break;
            }
        }
    }

    candidates
}

fn push_entry(out: &mut Vec<CandidateEndpoint>, entry: &Map<String, Value>, default_port: u16) {
    match extract_candidate(entry, default_port) {
        Some(candidate) => out.push(candidate),
        None => debug!("Skipping feed entry without usable address and port"),
    }
}

/// Build a candidate from one feed object
pub fn extract_candidate(entry: &Map<String, Value>, default_port: u16) -> Option<CandidateEndpoint> {
    let (address, port) = match non_empty_str(entry.get("ip")) {
        Some(ip) => {
            let port = match entry.get("port") {
                None | Some(Value::Null) => Some(default_port),
                Some(value) => parse_port(value),
            };
            (ip.to_string(), port)
        }
        None => {
            let host = non_empty_str(entry.get("host"))?;
            let (ip, port) = host.rsplit_once(':')?;
            if ip.is_empty() {
                return None;
            }
            (ip.to_string(), port.trim().parse::<u16>().ok())
        }
    };
    let port = port.filter(|p| *p != 0)?;

    Some(CandidateEndpoint {
        address,
        port,
        geo: extract_geo(entry),
    })
}

fn parse_port(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
        Value::String(s) => s.trim().parse::<u16>().ok(),
        _ => None,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn extract_geo(entry: &Map<String, Value>) -> GeoInfo {
    let raw = |field: &str| entry.get(field).filter(|v| !v.is_null()).cloned();
    GeoInfo {
        city: raw("city"),
        country: raw("country"),
        country_name: raw("country_name"),
        region: raw("region"),
        latitude: raw("latitude"),
        longitude: raw("longitude"),
    }
}
