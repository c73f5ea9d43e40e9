//! The request pipeline: document → endpoint → status → resolve → sample → assemble.

use crate::assembler::{assemble, is_empty};
use crate::document::{normalize_path, Document, DocumentLoader, YamlFileLoader};
use crate::error::{Error, Result};
use crate::path_matcher::{strip_query, Endpoint, HttpMethod, PathMatcher};
use crate::resolver::{Resolver, DEFAULT_MAX_DEPTH};
use crate::response_selector::{
    select_example, select_named_example, select_schema, select_status, DEFAULT_STATUS_PREFERENCE,
};
use crate::sampler::{CompositionPolicy, Sampler};
use crate::scanner::DocumentScanner;
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where API documents come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// A directory; the first request path segment names the document inside it
    Root(PathBuf),
    /// One document answering every request
    File(PathBuf),
}

/// Explicit configuration of the pipeline.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub source: DocumentSource,
    /// Status codes tried in order when picking the response to sample
    pub status_preference: Vec<u16>,
    /// Maximum `$ref` chain length
    pub max_depth: usize,
    pub composition: CompositionPolicy,
    /// Keep loaded documents in memory across requests
    pub cache_documents: bool,
}

impl EngineConfig {
    pub fn new(source: DocumentSource) -> Self {
        Self {
            source,
            status_preference: DEFAULT_STATUS_PREFERENCE.to_vec(),
            max_depth: DEFAULT_MAX_DEPTH,
            composition: CompositionPolicy::default(),
            cache_documents: false,
        }
    }
}

/// The outcome of a mocked request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MockResponse {
    pub status: u16,
    pub body: Value,
}

/// Endpoints declared by one document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentEndpoints {
    pub document: PathBuf,
    pub endpoints: Vec<Endpoint>,
}

/// Answers requests with samples synthesized from API documents.
pub struct MockEngine {
    config: EngineConfig,
    loader: Box<dyn DocumentLoader>,
}

impl MockEngine {
    /// Creates an engine reading YAML documents from disk.
    pub fn new(config: EngineConfig) -> Self {
        let loader: Box<dyn DocumentLoader> = if config.cache_documents {
            Box::new(YamlFileLoader::cached())
        } else {
            Box::new(YamlFileLoader::new())
        };
        Self::with_loader(config, loader)
    }

    /// Creates an engine over a custom document loader.
    pub fn with_loader(config: EngineConfig, loader: Box<dyn DocumentLoader>) -> Self {
        debug!("Initializing MockEngine with {:?}", config.source);
        Self { config, loader }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Path of the document answering `request_path`, before extension probing.
    pub fn document_path(&self, request_path: &str) -> Result<PathBuf> {
        match &self.config.source {
            DocumentSource::File(file) => Ok(file.clone()),
            DocumentSource::Root(root) => Ok(root.join(document_name(request_path)?)),
        }
    }

    /// Handles one request: `method` as sent by the client, `raw_path` possibly with a
    /// query string.
    pub fn respond(&self, method: &str, raw_path: &str) -> Result<MockResponse> {
        let document = self.loader.load(&self.document_path(raw_path)?)?;
        let matcher = PathMatcher::new(&document)?;
        let method = method
            .parse::<HttpMethod>()
            .map_err(|_| matcher.not_found())?;
        let endpoint = matcher.match_endpoint(method, raw_path)?;
        self.respond_endpoint(document, &endpoint)
    }

    /// Produces the mocked response of an already matched operation.
    pub fn respond_endpoint(&self, document: Arc<Document>, endpoint: &Endpoint) -> Result<MockResponse> {
        let status = select_status(&document, endpoint, &self.config.status_preference)?;
        // Schema and example must describe the same response as the status line.
        let preference = [status];
        let schema = select_schema(&document, endpoint, &preference);
        let example = select_example(&document, endpoint, &preference);

        let mut resolver = Resolver::new(self.loader.as_ref(), Arc::clone(&document))
            .with_max_depth(self.config.max_depth);
        let schema = resolver.resolve(&schema)?.unwrap_or_default();
        let mut example = resolver.resolve(&example)?.unwrap_or_default();

        if is_empty(&example) {
            if let Some(named) = select_named_example(&document, endpoint, &preference) {
                debug!("Using first named example of {}", endpoint);
                example = resolver
                    .resolve(&named)?
                    .and_then(|named| named.get("value").cloned())
                    .unwrap_or_default();
            }
        }

        let sampled = Sampler::new(self.config.composition).sample(&schema);
        let body = assemble(sampled, example);
        debug!("Responding to {} with status {}", endpoint, status);
        Ok(MockResponse { status, body })
    }

    /// Lists the endpoints of every document the engine can serve.
    ///
    /// Under a document root only documents a request path can reach are listed: a
    /// top-level file whose stem is a document name and that wins extension probing.
    pub fn catalogue(&self) -> Result<Vec<DocumentEndpoints>> {
        let paths = match &self.config.source {
            DocumentSource::File(file) => vec![file.clone()],
            DocumentSource::Root(root) => {
                let scan = DocumentScanner::new(root.clone()).scan()?;
                info!("Found {} documents under {}", scan.documents.len(), root.display());
                if !scan.warnings.is_empty() {
                    warn!(
                        "{} entries under {} could not be read",
                        scan.warnings.len(),
                        root.display()
                    );
                }
                scan.documents
            }
        };

        let mut catalogue = Vec::new();
        for path in paths {
            let document = match self.load_routable(&path) {
                Ok(Some(document)) => document,
                Ok(None) => {
                    debug!("No request path reaches {}", path.display());
                    continue;
                }
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            match PathMatcher::new(&document) {
                // Shared model files declare no paths.
                Ok(matcher) if matcher.endpoints().is_empty() => {
                    debug!("No endpoints in {}", path.display());
                }
                Ok(matcher) => catalogue.push(DocumentEndpoints {
                    document: path,
                    endpoints: matcher.endpoints(),
                }),
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }
        Ok(catalogue)
    }

    /// Every `METHOD PATH` pair declared by the document at `path`.
    pub fn endpoints(&self, path: &Path) -> Result<Vec<Endpoint>> {
        let document = self.loader.load(path)?;
        Ok(PathMatcher::new(&document)?.endpoints())
    }

    /// Loads the document at `path` if `respond` would pick it for some request.
    fn load_routable(&self, path: &Path) -> Result<Option<Arc<Document>>> {
        let DocumentSource::Root(root) = &self.config.source else {
            return self.loader.load(path).map(Some);
        };
        let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
            return Ok(None);
        };
        if !is_document_name(name) {
            return Ok(None);
        }
        match self.loader.load(&root.join(name)) {
            Ok(document) if normalize_path(&document.path) == normalize_path(path) => {
                Ok(Some(document))
            }
            Ok(_) | Err(Error::FileNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// The document named by the first segment of `/<document>/<rest>`.
fn document_name(request_path: &str) -> Result<&str> {
    let path = strip_query(request_path);
    let invalid = || Error::InvalidRequestPath(path.to_string());
    let (name, rest) = path
        .strip_prefix('/')
        .and_then(|p| p.split_once('/'))
        .ok_or_else(invalid)?;
    if !is_document_name(name) || rest.is_empty() {
        return Err(invalid());
    }
    Ok(name)
}

/// One or more ASCII word characters.
fn is_document_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryLoader;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const PETSTORE: &str = r##"
openapi: 3.0.0
paths:
  /petstore/pets:
    get:
      responses:
        200:
          content:
            application/json:
              schema:
                type: array
                items:
                  $ref: '#/components/schemas/Pet'
    post:
      responses:
        201:
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Pet'
              example:
                name: Rex
  /petstore/pets/{petId}:
    get:
      responses:
        200:
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Pet'
              examples:
                dog:
                  $ref: '#/components/examples/Dog'
    delete:
      responses:
        204:
          description: deleted
  /petstore/broken:
    get:
      responses:
        404:
          description: nothing
components:
  examples:
    Dog:
      value:
        name: Fido
        tag: dog
  schemas:
    Pet:
      type: object
      properties:
        id:
          type: integer
          format: int64
        name:
          type: string
        tag:
          type: string
          enum: [cat, dog]
"##;

    fn engine() -> MockEngine {
        let mut loader = MemoryLoader::new();
        loader.insert_yaml("/apidoc/petstore.yaml", PETSTORE).unwrap();
        MockEngine::with_loader(
            EngineConfig::new(DocumentSource::Root(PathBuf::from("/apidoc"))),
            Box::new(loader),
        )
    }

    #[test]
    fn test_document_name() {
        assert_eq!(document_name("/petstore/pets/1?x=1").unwrap(), "petstore");
        assert!(matches!(
            document_name("/petstore"),
            Err(Error::InvalidRequestPath(_))
        ));
        assert!(document_name("/pet-store/pets").is_err());
        assert!(document_name("/pétstore/pets").is_err());
        assert_eq!(document_name("/pet_store2/pets").unwrap(), "pet_store2");
        assert!(document_name("petstore/pets").is_err());
        assert!(document_name("/petstore/").is_err());
    }

    #[test]
    fn test_list_response() {
        let response = engine().respond("GET", "/petstore/pets?limit=5").unwrap();
        assert_eq!(
            response,
            MockResponse {
                status: 200,
                body: json!([{"id": 0, "name": "string", "tag": "cat"}]),
            }
        );
    }

    #[test]
    fn test_example_overrides_schema() {
        let response = engine().respond("post", "/petstore/pets").unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(response.body, json!({"id": 0, "name": "Rex", "tag": "cat"}));
    }

    #[test]
    fn test_named_example_used_when_no_inline_example() {
        let response = engine().respond("get", "/petstore/pets/42").unwrap();
        assert_eq!(response.body, json!({"id": 0, "name": "Fido", "tag": "dog"}));
    }

    #[test]
    fn test_no_content_response() {
        let response = engine().respond("delete", "/petstore/pets/42").unwrap();
        assert_eq!(response, MockResponse { status: 204, body: json!({}) });
    }

    #[test]
    fn test_undeclared_method_is_not_found() {
        let err = engine().respond("put", "/petstore/pets/42").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let text = err.to_string();
        let lines: Vec<&str> = text.lines().collect();
        for expected in [
            "GET /petstore/pets",
            "POST /petstore/pets",
            "GET /petstore/pets/{petId}",
            "DELETE /petstore/pets/{petId}",
            "GET /petstore/broken",
        ] {
            let count = lines.iter().filter(|line| **line == expected).count();
            assert_eq!(count, 1, "{expected}");
        }

        let err = engine().respond("connect", "/petstore/pets").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_missing_status_is_internal() {
        let err = engine().respond("get", "/petstore/broken").unwrap_err();
        assert!(matches!(err, Error::NoStatusDefined { .. }));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_unknown_document() {
        let err = engine().respond("get", "/unknown/pets").unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_single_file_source() {
        let mut loader = MemoryLoader::new();
        loader.insert_yaml("/apidoc/petstore.yaml", PETSTORE).unwrap();
        let engine = MockEngine::with_loader(
            EngineConfig::new(DocumentSource::File(PathBuf::from("/apidoc/petstore.yaml"))),
            Box::new(loader),
        );
        assert_eq!(engine.respond("get", "/petstore/pets").unwrap().status, 200);
        assert_eq!(
            engine.endpoints(Path::new("/apidoc/petstore.yaml")).unwrap().len(),
            5
        );
        let catalogue = engine.catalogue().unwrap();
        assert_eq!(catalogue.len(), 1);
        assert_eq!(catalogue[0].endpoints[0].to_string(), "GET /petstore/pets");
    }
}
