use std::io::Read;
use std::sync::Arc;

use indexmap::IndexMap;
use log::debug;
use serde_json::Value;

use crate::error::{Result, TestLensError};

use super::backends::{RawArtifact, TaskBackend};

/// Outcome of an artifact lookup that did not fail outright.
#[derive(Debug, Clone)]
pub enum ArtifactFetch {
    Content(ArtifactContent),
    Absent,
}

/// Decoded artifact body.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactContent {
    Json(Value),
    Xml(XmlElement),
}

/// Owned XML element tree, detached from the source buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: IndexMap<String, String>,
    /// Concatenated direct text content, trimmed
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        let attributes = node
            .attributes()
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect();

        let text: String = node
            .children()
            .filter(roxmltree::Node::is_text)
            .filter_map(|c| c.text())
            .collect();

        let children = node
            .children()
            .filter(roxmltree::Node::is_element)
            .map(Self::from_node)
            .collect();

        Self {
            name: node.tag_name().name().to_string(),
            attributes,
            text: text.trim().to_string(),
            children,
        }
    }

    /// Parses a whole document and returns its root element.
    pub fn parse(source: &str) -> std::result::Result<Self, String> {
        let document = roxmltree::Document::parse(source).map_err(|e| e.to_string())?;
        Ok(Self::from_node(document.root_element()))
    }
}

/// Resolves, downloads and decodes named task artifacts.
pub struct ArtifactResolver {
    backend: Arc<dyn TaskBackend>,
}

impl ArtifactResolver {
    pub fn new(backend: Arc<dyn TaskBackend>) -> Self {
        Self { backend }
    }

    /// Fetches artifact `name` of run `retry_id` of `task_id`.
    ///
    /// # Errors
    ///
    /// `ArtifactUnavailable` on transport failure, `ArtifactMalformed` when the
    /// body cannot be decompressed or decoded, and `UnsupportedArtifactType`
    /// for content types other than JSON and XML.
    pub async fn fetch(&self, task_id: &str, retry_id: u32, name: &str) -> Result<ArtifactFetch> {
        let unavailable = |e: TestLensError| TestLensError::ArtifactUnavailable {
            task_id: task_id.to_string(),
            retry_id,
            name: name.to_string(),
            message: e.to_string(),
        };

        let location = match self
            .backend
            .resolve_artifact_location(task_id, retry_id, name)
            .await
        {
            Ok(Some(location)) => location,
            Ok(None) => {
                debug!(task_id = task_id, retry_id = retry_id, artifact = name; "Artifact not published");
                return Ok(ArtifactFetch::Absent);
            }
            Err(e) => return Err(unavailable(e)),
        };

        let raw = match self.backend.fetch_bytes(&location).await {
            Ok(raw) => raw,
            Err(e) if e.is_not_found() => {
                debug!(task_id = task_id, retry_id = retry_id, artifact = name; "Artifact location not found");
                return Ok(ArtifactFetch::Absent);
            }
            Err(e) => return Err(unavailable(e)),
        };

        decode(name, raw).map(ArtifactFetch::Content)
    }
}

/// Reverses transport compression and decodes by content type.
pub fn decode(name: &str, raw: RawArtifact) -> Result<ArtifactContent> {
    let malformed = |message: String| TestLensError::ArtifactMalformed {
        name: name.to_string(),
        message,
    };

    let gzipped = raw
        .content_encoding
        .as_deref()
        .is_some_and(|e| e.trim().eq_ignore_ascii_case("gzip"));

    let bytes = if gzipped {
        let mut decoder = flate2::read::GzDecoder::new(&raw.bytes[..]);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| malformed(format!("failed to decompress: {e}")))?;
        decompressed
    } else {
        raw.bytes
    };

    let content_type = raw
        .content_type
        .as_deref()
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    match content_type.as_str() {
        "application/json" => serde_json::from_slice(&bytes)
            .map(ArtifactContent::Json)
            .map_err(|e| malformed(format!("invalid JSON: {e}"))),
        "application/xml" | "text/xml" => {
            let text = std::str::from_utf8(&bytes)
                .map_err(|e| malformed(format!("not UTF-8: {e}")))?;
            XmlElement::parse(text)
                .map(ArtifactContent::Xml)
                .map_err(|e| malformed(format!("invalid XML: {e}")))
        }
        _ => Err(TestLensError::UnsupportedArtifactType {
            name: name.to_string(),
            content_type,
        }),
    }
}
