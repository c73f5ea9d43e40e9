//! OpenAPI Mock Server - Plausible HTTP responses synthesized from OpenAPI documents.
//!
//! Given an incoming method and path, the library finds the matching operation in an
//! OpenAPI 3 document, picks the response to mock, resolves every `$ref` (including
//! references into other files), samples a value from the resolved schema and overlays
//! the author's example on it.
//!
//! # Architecture
//!
//! 1. [`document`] - Loads YAML documents into JSON trees
//! 2. [`path_matcher`] - Maps a request onto a declared path template and method
//! 3. [`response_selector`] - Picks the status code, schema and example to mock
//! 4. [`resolver`] - Replaces `$ref`s, across files, with cycle detection
//! 5. [`sampler`] - Synthesizes a value from a resolved schema
//! 6. [`assembler`] - Overlays the example on the sampled value
//! 7. [`engine`] - Runs the steps above for one request
//! 8. [`server`] - Serves the engine over HTTP
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_mock::engine::{DocumentSource, EngineConfig, MockEngine};
//! use std::path::PathBuf;
//!
//! let config = EngineConfig::new(DocumentSource::Root(PathBuf::from("./apidoc")));
//! let engine = MockEngine::new(config);
//!
//! let response = engine.respond("get", "/petstore/pets/1").unwrap();
//! println!("{} {}", response.status, response.body);
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod assembler;
pub mod cli;
pub mod document;
pub mod engine;
pub mod error;
pub mod path_matcher;
pub mod resolver;
pub mod response_selector;
pub mod sampler;
pub mod scanner;
pub mod serializer;
pub mod server;
