//! API description composer
//!
//! Resolves cross-file `$ref` pointers in literate API description documents
//! and composes several resolved documents into one, keeping a source map so
//! any node of the result can be traced back to the file, line and column it
//! was written at.
//!
//! # Example
//!
//! ```
//! use apidoc_compose::{resolve, ArtifactStore, CancellationToken, MemoryInput};
//! use url::Url;
//!
//! let input = MemoryInput::new()
//!     .with_file(
//!         "mem:///a.yaml",
//!         "definitions:\n  Widget:\n    properties:\n      gadget:\n        $ref: b.yaml#/definitions/Gadget\n",
//!     )
//!     .with_file("mem:///b.yaml", "definitions:\n  Gadget:\n    type: object\n");
//!
//! let store = ArtifactStore::new();
//! let uri = Url::parse("mem:///a.yaml").unwrap();
//! let resolved = resolve(&input, &uri, &store.root(), &CancellationToken::new()).unwrap();
//!
//! let document = resolved.object();
//! assert_eq!(
//!     document["definitions"]["Widget"]["properties"]["gadget"]["$ref"],
//!     "#/definitions/Gadget"
//! );
//! assert_eq!(document["definitions"]["Gadget"]["type"], "object");
//! ```
//!
//! # Pointer Syntax
//!
//! | Pointer | Meaning |
//! |---------|---------|
//! | `other.yaml#/definitions/Gadget` | entity in another file, copied in |
//! | `#/definitions/Gadget` | entity in the same file |
//! | `other.yaml` | whole file; left untouched |
//!
//! # Source Positions
//!
//! Positions are 1-based and point at a node's key, or at the item for
//! sequence entries. Nodes reached through a `key: *alias` take the positions
//! of the anchored original. Aliases in other places (sequence items, flow
//! collections) leave their subtree without positions, and a block that cannot
//! be indexed at all contributes none; [`trace`] then reports the location
//! with `position: None`.
//!
//! # Pipeline
//!
//! [`run_pipeline`] reads a configuration document naming the inputs,
//! resolves each and composes the results. Every intermediate document is
//! kept in an append-only [`ArtifactStore`].

mod compose;
mod config;
mod error;
mod loader;
mod merge;
mod pipeline;
mod resolver;
mod source_map;
mod store;
mod types;

pub use compose::{compose, Mutation, Preparation, COMPOSED_INFO_NAME, COMPOSED_NAME};
pub use config::Configuration;
pub use error::{ComposeError, PipelineError, ResolveError, StoreError};
pub use loader::{
    input_uri, is_url, load_literate, parse_literate, resolve_uri, FileSystemInput, InputSource,
    LiterateDocument, MemoryInput,
};
pub use merge::{merge_documents, merge_values, ConflictPolicy, MergedDocument, MERGE_REASON};
pub use pipeline::{
    resolve_inputs, run_pipeline, Outputs, PipelineOutput, COMPONENT_DOCUMENTS, COMPOSED_DOCUMENT,
};
pub use resolver::{resolve, unresolved_references, Entity, ExternalFileTable};
pub use source_map::{assignment_mappings, identity_mappings, trace, IDENTITY};
pub use store::{ArtifactStore, DocumentHandle, NewArtifact, StoreScope};
pub use types::{
    descendants, reference_nodes, JsonPath, Mapping, MappingPoint, PathComponent, Position,
    PositionIndex, ReferenceNode, SourceLocation,
};

pub use tokio_util::sync::CancellationToken;
