//! Pipeline orchestration: configuration, per-input resolution, composition.

use std::collections::BTreeMap;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::compose::compose;
use crate::config::Configuration;
use crate::error::{PipelineError, ResolveError};
use crate::loader::InputSource;
use crate::resolver::resolve;
use crate::store::{ArtifactStore, DocumentHandle, StoreScope};

/// Output name of the resolved input documents, in configuration order.
pub const COMPONENT_DOCUMENTS: &str = "component-documents";

/// Output name of the composed document.
pub const COMPOSED_DOCUMENT: &str = "composed-document";

/// A named pipeline output.
#[derive(Debug, Clone)]
pub enum Outputs {
    Single(DocumentHandle),
    List(Vec<DocumentHandle>),
}

impl Outputs {
    pub fn as_single(&self) -> Option<&DocumentHandle> {
        match self {
            Outputs::Single(handle) => Some(handle),
            Outputs::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[DocumentHandle]> {
        match self {
            Outputs::Single(_) => None,
            Outputs::List(handles) => Some(handles),
        }
    }
}

/// Named artifacts produced by [`run_pipeline`].
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    outputs: BTreeMap<String, Outputs>,
}

impl PipelineOutput {
    pub fn get(&self, name: &str) -> Option<&Outputs> {
        self.outputs.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }

    /// The composed document.
    pub fn composed(&self) -> Option<&DocumentHandle> {
        self.get(COMPOSED_DOCUMENT).and_then(Outputs::as_single)
    }

    /// The resolved input documents.
    pub fn components(&self) -> &[DocumentHandle] {
        self.get(COMPONENT_DOCUMENTS)
            .and_then(Outputs::as_list)
            .unwrap_or(&[])
    }

    fn insert(&mut self, name: &str, outputs: Outputs) {
        self.outputs.insert(name.to_string(), outputs);
    }
}

/// Run the full pipeline for the configuration document at `config_uri`.
///
/// Store layout:
///
/// | Scope | Contents |
/// |-------|----------|
/// | `config/` | the configuration document |
/// | `loader/<i>/` | resolution of input `i` |
/// | `compose/` | prepared and composed documents |
///
/// # Errors
///
/// Any configuration, resolution or composition error; `is_cancelled()`
/// tells a cancelled run apart from a failed one.
pub fn run_pipeline(
    config_uri: &Url,
    input: &dyn InputSource,
    store: &ArtifactStore,
    cancel: &CancellationToken,
) -> Result<PipelineOutput, PipelineError> {
    let root = store.root();
    let config = Configuration::load(input, config_uri, &root.create_scope("config"), cancel)?;
    let uris = config.input_uris(config_uri)?;
    tracing::info!(config = %config_uri, inputs = uris.len(), "running pipeline");

    let components = resolve_inputs(input, &uris, &root.create_scope("loader"), cancel)?;
    let composed = compose(
        &root.create_scope("compose"),
        config.override_info.as_ref(),
        &components,
        config.azure_arm,
        cancel,
    )?;

    let mut output = PipelineOutput::default();
    output.insert(COMPONENT_DOCUMENTS, Outputs::List(components));
    output.insert(COMPOSED_DOCUMENT, Outputs::Single(composed));
    Ok(output)
}

/// Resolve each of `uris` in its own scope `<scope>/<i>`.
///
/// # Errors
///
/// Fails on the first input that cannot be resolved.
pub fn resolve_inputs(
    input: &dyn InputSource,
    uris: &[Url],
    scope: &StoreScope,
    cancel: &CancellationToken,
) -> Result<Vec<DocumentHandle>, ResolveError> {
    uris.iter()
        .enumerate()
        .map(|(index, uri)| resolve(input, uri, &scope.create_scope(&index.to_string()), cancel))
        .collect()
}
