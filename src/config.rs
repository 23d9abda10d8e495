//! Pipeline configuration.
//!
//! A configuration is itself a literate document, typically Markdown with
//! the settings in fenced `yaml` blocks:
//!
//! ````markdown
//! # My API
//!
//! ```yaml
//! input-file:
//!   - storage.json
//!   - compute.json
//! override-info:
//!   title: Cloud
//! ```
//! ````
//!
//! Unknown keys are ignored.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::PipelineError;
use crate::loader::{load_literate, resolve_uri, InputSource};
use crate::store::StoreScope;

/// Settings read from a configuration document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Configuration {
    /// Input documents, relative to the configuration document.
    #[serde(default, deserialize_with = "one_or_many")]
    pub input_file: Vec<String>,

    /// Apply the Azure preparation before merging.
    #[serde(default = "default_azure_arm")]
    pub azure_arm: bool,

    /// Info section merged over the composed document's.
    #[serde(default)]
    pub override_info: Option<Value>,
}

fn default_azure_arm() -> bool {
    true
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(file)) => vec![file],
        Some(OneOrMany::Many(files)) => files,
    })
}

impl Configuration {
    /// Load the configuration document at `uri` into `scope`.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Resolve` if the document cannot be loaded and
    /// `PipelineError::Config` if its settings have the wrong shape.
    pub fn load(
        input: &dyn InputSource,
        uri: &Url,
        scope: &StoreScope,
        cancel: &CancellationToken,
    ) -> Result<Self, PipelineError> {
        let handle = load_literate(input, uri, scope, cancel)?;
        Self::from_document(uri, handle.read_object())
    }

    /// Interpret a parsed configuration document.
    pub fn from_document(uri: &Url, document: Value) -> Result<Self, PipelineError> {
        serde_json::from_value(document).map_err(|e| PipelineError::Config {
            uri: uri.to_string(),
            message: e.to_string(),
        })
    }

    /// Absolute URIs of the input documents.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::NoInputs` when no input file is configured.
    pub fn input_uris(&self, config_uri: &Url) -> Result<Vec<Url>, PipelineError> {
        if self.input_file.is_empty() {
            return Err(PipelineError::NoInputs {
                uri: config_uri.to_string(),
            });
        }
        let uris = self
            .input_file
            .iter()
            .map(|file| resolve_uri(config_uri, file))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(uris)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config_uri() -> Url {
        Url::parse("file:///specs/readme.md").unwrap()
    }

    #[test]
    fn single_input_file() {
        let config =
            Configuration::from_document(&config_uri(), json!({ "input-file": "a.yaml" })).unwrap();
        assert_eq!(config.input_file, vec!["a.yaml"]);
        assert!(config.azure_arm);
        assert_eq!(config.override_info, None);
    }

    #[test]
    fn input_files_resolve_against_config() {
        let config = Configuration::from_document(
            &config_uri(),
            json!({
                "input-file": ["a.yaml", "sub/b.json", "https://example.com/c.yaml"],
                "azure-arm": false,
                "override-info": { "title": "Cloud" },
                "output-folder": "generated"
            }),
        )
        .unwrap();
        assert!(!config.azure_arm);
        assert_eq!(config.override_info, Some(json!({ "title": "Cloud" })));

        let uris: Vec<String> = config
            .input_uris(&config_uri())
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(
            uris,
            vec![
                "file:///specs/a.yaml",
                "file:///specs/sub/b.json",
                "https://example.com/c.yaml"
            ]
        );
    }

    #[test]
    fn no_inputs_is_an_error() {
        let config = Configuration::from_document(&config_uri(), json!({})).unwrap();
        assert!(matches!(
            config.input_uris(&config_uri()),
            Err(PipelineError::NoInputs { .. })
        ));
    }

    #[test]
    fn wrong_shape_is_a_config_error() {
        let err = Configuration::from_document(&config_uri(), json!({ "input-file": 42 }))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config { .. }));
        assert_eq!(err.exit_code(), 2);
    }
}
