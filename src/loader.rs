//! Document loading from files, URLs and memory.
//!
//! Inputs are literate documents: plain YAML/JSON, or Markdown prose with the
//! document spread over fenced `yaml`/`json` code blocks. Loading yields the
//! parsed tree plus the line and column of every node in the original file.

use std::collections::HashMap;
use std::path::Path;

use marked_yaml::Node;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::ResolveError;
use crate::merge::{merge_values, ConflictPolicy};
use crate::store::{DocumentHandle, NewArtifact, StoreScope};
use crate::types::{json_type_name, JsonPath, Position, PositionIndex};

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Code block languages holding document content.
const DOCUMENT_LANGUAGES: &[&str] = &["yaml", "yml", "json"];

/// Reads the raw text behind a URI.
pub trait InputSource {
    /// # Errors
    ///
    /// Returns `ResolveError::FileNotFound` if nothing exists at `uri`.
    fn read(&self, uri: &Url) -> Result<String, ResolveError>;
}

/// Reads `file:` URIs from disk and, with the `remote` feature, `http(s):` URIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemInput;

impl InputSource for FileSystemInput {
    fn read(&self, uri: &Url) -> Result<String, ResolveError> {
        match uri.scheme() {
            "file" => {
                let path = uri.to_file_path().map_err(|()| ResolveError::InvalidUri {
                    uri: uri.to_string(),
                    message: "not a local file path".to_string(),
                })?;
                read_file(&path, uri)
            }
            #[cfg(feature = "remote")]
            "http" | "https" => fetch_url(uri),
            _ => Err(ResolveError::UnsupportedScheme {
                uri: uri.to_string(),
            }),
        }
    }
}

fn read_file(path: &Path, uri: &Url) -> Result<String, ResolveError> {
    if !path.exists() {
        return Err(ResolveError::FileNotFound {
            uri: uri.to_string(),
        });
    }

    std::fs::read_to_string(path).map_err(|source| ResolveError::ReadError {
        uri: uri.to_string(),
        source,
    })
}

/// Fetch a document over HTTP/HTTPS.
///
/// Requires the `remote` feature (enabled by default). A 404 is reported as
/// `ResolveError::FileNotFound`.
#[cfg(feature = "remote")]
fn fetch_url(uri: &Url) -> Result<String, ResolveError> {
    let network_error = |source| ResolveError::NetworkError {
        uri: uri.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network_error)?;

    let response = client.get(uri.as_str()).send().map_err(network_error)?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(ResolveError::FileNotFound {
            uri: uri.to_string(),
        });
    }

    // Check for HTTP errors before reading the body
    let response = response.error_for_status().map_err(network_error)?;
    response.text().map_err(network_error)
}

/// In-memory URI → text table.
#[derive(Debug, Clone, Default)]
pub struct MemoryInput {
    files: HashMap<String, String>,
}

impl MemoryInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file under an absolute URI.
    pub fn with_file(mut self, uri: &str, content: impl Into<String>) -> Self {
        self.insert(uri, content);
        self
    }

    pub fn insert(&mut self, uri: &str, content: impl Into<String>) {
        // normalise so lookups by parsed Url match
        let key = Url::parse(uri)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| uri.to_string());
        self.files.insert(key, content.into());
    }
}

impl InputSource for MemoryInput {
    fn read(&self, uri: &Url) -> Result<String, ResolveError> {
        self.files
            .get(uri.as_str())
            .cloned()
            .ok_or_else(|| ResolveError::FileNotFound {
                uri: uri.to_string(),
            })
    }
}

/// Check if a string looks like a URI rather than a file path.
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with("file://")
}

/// Turn a command-line argument (path or URI) into an absolute URI.
///
/// Relative paths are taken from the current directory.
pub fn input_uri(argument: &str) -> Result<Url, ResolveError> {
    if is_url(argument) {
        return Url::parse(argument).map_err(|e| ResolveError::InvalidUri {
            uri: argument.to_string(),
            message: e.to_string(),
        });
    }

    let path = Path::new(argument);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|source| ResolveError::ReadError {
                uri: argument.to_string(),
                source,
            })?
            .join(path)
    };
    let absolute = absolute.canonicalize().unwrap_or(absolute);

    Url::from_file_path(&absolute).map_err(|()| ResolveError::InvalidUri {
        uri: argument.to_string(),
        message: "cannot express path as a file URI".to_string(),
    })
}

/// Resolve `reference` relative to `base`.
pub fn resolve_uri(base: &Url, reference: &str) -> Result<Url, ResolveError> {
    base.join(reference).map_err(|e| ResolveError::InvalidUri {
        uri: reference.to_string(),
        message: e.to_string(),
    })
}

/// A parsed literate document.
#[derive(Debug, Clone)]
pub struct LiterateDocument {
    pub value: Value,
    pub positions: PositionIndex,
}

/// Parse a literate document.
///
/// Markdown sources (`.md`, `.markdown`) contribute every unconditional
/// ```` ```yaml ````/```` ```json ```` block, merged in order. Anything else is
/// parsed whole as YAML (JSON included).
///
/// # Errors
///
/// Returns `ResolveError::InvalidDocument` on syntax errors and
/// `ResolveError::MalformedDocument` when the root is not a mapping or a
/// Markdown source holds no document blocks.
pub fn parse_literate(uri: &str, text: &str) -> Result<LiterateDocument, ResolveError> {
    let blocks = if is_markdown(uri) {
        let blocks = code_blocks(text);
        if blocks.is_empty() {
            return Err(ResolveError::MalformedDocument {
                uri: uri.to_string(),
                message: "no yaml or json code blocks found".to_string(),
            });
        }
        blocks
    } else {
        vec![CodeBlock {
            first_line: 1,
            content: text.to_string(),
        }]
    };

    let mut value = Value::Object(serde_json::Map::new());
    let mut positions = PositionIndex::new();

    for block in blocks {
        if block.content.trim().is_empty() {
            continue;
        }
        let parsed: Value = serde_yaml::from_str(&block.content).map_err(|source| {
            ResolveError::InvalidDocument {
                uri: uri.to_string(),
                source,
            }
        })?;
        match &parsed {
            Value::Null => continue,
            Value::Object(_) => {}
            other => {
                return Err(ResolveError::MalformedDocument {
                    uri: uri.to_string(),
                    message: format!(
                        "expected a mapping at the root, got {}",
                        json_type_name(other)
                    ),
                })
            }
        }

        merge_values(&mut value, &parsed, ConflictPolicy::Reject).map_err(|path| {
            ResolveError::MalformedDocument {
                uri: uri.to_string(),
                message: format!("code blocks disagree at {}", path),
            }
        })?;

        index_positions(uri, &block, &mut positions);
    }

    Ok(LiterateDocument { value, positions })
}

/// Load a literate document and write it into `scope` as `doc.yaml`.
///
/// # Errors
///
/// Returns `ResolveError::Cancelled` if `cancel` has fired, otherwise any
/// read or parse error for `uri`.
pub fn load_literate(
    input: &dyn InputSource,
    uri: &Url,
    scope: &StoreScope,
    cancel: &CancellationToken,
) -> Result<DocumentHandle, ResolveError> {
    if cancel.is_cancelled() {
        return Err(ResolveError::Cancelled);
    }

    let text = input.read(uri)?;
    let document = parse_literate(uri.as_str(), &text)?;
    tracing::debug!(uri = %uri, nodes = document.positions.len(), "loaded literate document");

    let handle = scope.write(
        "doc.yaml",
        NewArtifact::loaded(document.value, uri.as_str(), document.positions),
    )?;
    Ok(handle)
}

fn is_markdown(uri: &str) -> bool {
    let path = uri
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or(uri)
        .to_ascii_lowercase();
    path.ends_with(".md") || path.ends_with(".markdown")
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CodeBlock {
    /// 1-based line of the first content line.
    first_line: usize,
    content: String,
}

/// Extract fenced document blocks from Markdown.
///
/// Blocks with a condition after the language (```` ```yaml $(flag) ````)
/// are skipped.
fn code_blocks(markdown: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut open: Option<(&str, bool, CodeBlock)> = None;

    for (index, line) in markdown.lines().enumerate() {
        let trimmed = line.trim_start();
        match open.take() {
            None => {
                let fence = if trimmed.starts_with("```") {
                    "```"
                } else if trimmed.starts_with("~~~") {
                    "~~~"
                } else {
                    continue;
                };
                let info = trimmed.trim_start_matches(fence.chars().next().unwrap_or('`'));
                let mut words = info.split_whitespace();
                let language = words.next().unwrap_or("").to_ascii_lowercase();
                let unconditional = words.next().is_none();
                let wanted = DOCUMENT_LANGUAGES.contains(&language.as_str()) && unconditional;
                if DOCUMENT_LANGUAGES.contains(&language.as_str()) && !unconditional {
                    tracing::debug!(line = index + 1, "skipping conditional code block");
                }
                open = Some((
                    fence,
                    wanted,
                    CodeBlock {
                        first_line: index + 2,
                        content: String::new(),
                    },
                ));
            }
            Some((fence, wanted, mut block)) => {
                if trimmed.starts_with(fence)
                    && trimmed
                        .trim_start_matches(|c: char| c == '`' || c == '~')
                        .trim()
                        .is_empty() {
                    if wanted {
                        blocks.push(block);
                    }
                } else {
                    block.content.push_str(line);
                    block.content.push('\n');
                    open = Some((fence, wanted, block));
                }
            }
        }
    }

    blocks
}

/// Record the position of every node of `block` under its document path.
///
/// The positional parser rejects anchors and aliases, so such blocks are
/// indexed a second time with the anchor and alias tokens blanked out; nodes
/// under an alias then take the positions of the anchored original. Indexing
/// is best-effort: a block rejected both times keeps its (already parsed)
/// content but contributes no positions.
fn index_positions(uri: &str, block: &CodeBlock, positions: &mut PositionIndex) {
    let offset = block.first_line - 1;
    let mut block_positions = PositionIndex::new();

    match marked_yaml::parse_yaml(0, &block.content) {
        Ok(root) => index_node(&root, &JsonPath::root(), offset, &mut block_positions),
        Err(e) => {
            let blanked = BlankedAnchors::of(&block.content);
            if blanked.tokens.is_empty() {
                tracing::warn!(uri = %uri, error = %e, "cannot index node positions");
                return;
            }
            match marked_yaml::parse_yaml(0, &blanked.content) {
                Ok(root) => {
                    index_node(&root, &JsonPath::root(), offset, &mut block_positions);
                    blanked.expand_aliases(offset, &mut block_positions);
                }
                Err(_) => {
                    tracing::warn!(uri = %uri, error = %e, "cannot index node positions");
                    return;
                }
            }
        }
    }

    positions
        .entry(JsonPath::root())
        .or_insert(Position { line: 1, column: 1 });
    for (path, position) in block_positions {
        positions.entry(path).or_insert(position);
    }
}

/// An `&anchor` or `*alias` token in YAML text.
#[derive(Debug, PartialEq)]
struct AnchorToken {
    alias: bool,
    name: String,
    line: usize,
    column: usize,
    /// Whether the token directly follows a mapping key (`key: &name`).
    after_key: bool,
}

/// YAML text with its anchor and alias tokens replaced by spaces, so every
/// other node keeps its line and column.
struct BlankedAnchors {
    content: String,
    tokens: Vec<AnchorToken>,
}

impl BlankedAnchors {
    fn of(text: &str) -> Self {
        let mut content = String::with_capacity(text.len());
        let mut tokens = Vec::new();

        for (index, line) in text.split_inclusive('\n').enumerate() {
            let chars: Vec<char> = line.chars().collect();
            let mut quote: Option<char> = None;
            let mut i = 0;
            while i < chars.len() {
                let c = chars[i];
                let previous = if i == 0 { None } else { Some(chars[i - 1]) };
                match quote {
                    Some(q) => {
                        if c == q {
                            quote = None;
                        }
                    }
                    None if c == '#' && previous.map_or(true, char::is_whitespace) => {
                        content.extend(&chars[i..]);
                        break;
                    }
                    None if c == '"' || c == '\'' => {
                        if previous.map_or(true, |p| p.is_whitespace() || "[{,:-".contains(p)) {
                            quote = Some(c);
                        }
                    }
                    None if (c == '&' || c == '*')
                        && previous.map_or(true, |p| p.is_whitespace() || "[{,".contains(p)) =>
                    {
                        let name: String = chars[i + 1..]
                            .iter()
                            .take_while(|n| !n.is_whitespace() && !",[]{}".contains(**n))
                            .collect();
                        if !name.is_empty() {
                            let before = chars[..i].iter().rev().find(|p| !p.is_whitespace());
                            tokens.push(AnchorToken {
                                alias: c == '*',
                                line: index + 1,
                                column: i + 1,
                                after_key: before == Some(&':'),
                                name: name.clone(),
                            });
                            let width = 1 + name.chars().count();
                            content.extend(std::iter::repeat(' ').take(width));
                            i += width;
                            continue;
                        }
                    }
                    None => {}
                }
                content.push(c);
                i += 1;
            }
        }

        Self { content, tokens }
    }

    /// Copy the positions below each anchored node to the matching paths below
    /// its aliases. Only `key: &name` / `key: *name` tokens can be placed.
    fn expand_aliases(&self, offset: usize, positions: &mut PositionIndex) {
        for (index, alias) in self.tokens.iter().enumerate() {
            if !alias.alias || !alias.after_key {
                continue;
            }
            let anchor = self.tokens[..index]
                .iter()
                .rev()
                .find(|t| !t.alias && t.name == alias.name);
            let Some(anchor) = anchor.filter(|t| t.after_key) else {
                continue;
            };
            let (Some(anchored), Some(aliased)) = (
                keyed_node_at(anchor, offset, positions),
                keyed_node_at(alias, offset, positions),
            ) else {
                continue;
            };

            let copies: Vec<(JsonPath, Position)> = positions
                .iter()
                .filter(|(path, _)| path.len() > anchored.len() && path.starts_with(&anchored))
                .map(|(path, position)| {
                    (aliased.join(&path.components()[anchored.len()..]), *position)
                })
                .collect();
            for (path, position) in copies {
                positions.entry(path).or_insert(position);
            }
        }
    }
}

/// The mapping entry whose key precedes `token` on the same line.
fn keyed_node_at(token: &AnchorToken, offset: usize, positions: &PositionIndex) -> Option<JsonPath> {
    positions
        .iter()
        .filter(|(_, p)| p.line == token.line + offset && p.column < token.column)
        .max_by_key(|(path, p)| (p.column, path.len()))
        .map(|(path, _)| path.clone())
}

fn index_node(node: &Node, path: &JsonPath, offset: usize, positions: &mut PositionIndex) {
    match node {
        Node::Mapping(mapping) => {
            for (key, child) in mapping.iter() {
                let child_path = path.child(key.as_str());
                let marker = key.span().start().or_else(|| child.span().start());
                if let Some(marker) = marker {
                    positions.entry(child_path.clone()).or_insert(Position {
                        line: marker.line() + offset,
                        column: marker.column(),
                    });
                }
                index_node(child, &child_path, offset, positions);
            }
        }
        Node::Sequence(items) => {
            for (index, child) in items.iter().enumerate() {
                let child_path = path.child(index);
                if let Some(marker) = child.span().start() {
                    positions.entry(child_path.clone()).or_insert(Position {
                        line: marker.line() + offset,
                        column: marker.column(),
                    });
                }
                index_node(child, &child_path, offset, positions);
            }
        }
        Node::Scalar(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ArtifactStore;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn path(pointer: &str) -> JsonPath {
        JsonPath::from_pointer(pointer)
    }

    #[test]
    fn parse_plain_yaml_with_positions() {
        let doc = parse_literate(
            "file:///specs/a.yaml",
            "swagger: '2.0'\ndefinitions:\n  Widget:\n    type: object\n",
        )
        .unwrap();
        assert_eq!(doc.value["definitions"]["Widget"]["type"], "object");
        assert_eq!(doc.positions[&path("/definitions/Widget")].line, 3);
        assert_eq!(doc.positions[&path("/definitions/Widget/type")].line, 4);
    }

    #[test]
    fn aliased_nodes_take_anchor_positions() {
        let doc = parse_literate(
            "file:///specs/a.yaml",
            "x: &shared\n  k: 1\ny: *shared\nz: 2\n",
        )
        .unwrap();
        assert_eq!(doc.value["y"]["k"], 1);
        assert_eq!(doc.positions[&path("/x")].line, 1);
        assert_eq!(doc.positions[&path("/x/k")].line, 2);
        assert_eq!(doc.positions[&path("/y")].line, 3);
        assert_eq!(doc.positions[&path("/y/k")].line, 2);
        assert_eq!(doc.positions[&path("/z")].line, 4);
    }

    #[test]
    fn blanking_keeps_quoted_and_commented_text() {
        let blanked = BlankedAnchors::of("a: \"x &y\" # see *z\nb: &n 1\n");
        assert_eq!(blanked.content, "a: \"x &y\" # see *z\nb:    1\n");
        assert_eq!(
            blanked.tokens,
            vec![AnchorToken {
                alias: false,
                name: "n".to_string(),
                line: 2,
                column: 4,
                after_key: true,
            }]
        );
    }

    #[test]
    fn parse_json() {
        let doc = parse_literate(
            "file:///specs/a.json",
            r#"{"definitions": {"Widget": {"type": "object"}}}"#,
        )
        .unwrap();
        assert_eq!(doc.value, json!({ "definitions": { "Widget": { "type": "object" } } }));
    }

    #[test]
    fn parse_markdown_blocks_with_line_offsets() {
        let markdown = "# Widgets API\n\nSome prose.\n\n```yaml\ninfo:\n  title: Widgets\n```\n\nMore prose.\n\n``` yaml\ninput-file: a.yaml\n```\n\n```yaml $(csharp)\nnamespace: Skipped\n```\n";
        let doc = parse_literate("file:///specs/readme.md", markdown).unwrap();
        assert_eq!(doc.value, json!({ "info": { "title": "Widgets" }, "input-file": "a.yaml" }));
        assert_eq!(doc.positions[&path("/info")].line, 6);
        assert_eq!(doc.positions[&path("/info/title")].line, 7);
        assert_eq!(doc.positions[&path("/input-file")].line, 13);
    }

    #[test]
    fn markdown_without_blocks_is_malformed() {
        let result = parse_literate("file:///specs/readme.md", "# Nothing here\n");
        assert!(matches!(result, Err(ResolveError::MalformedDocument { .. })));
    }

    #[test]
    fn markdown_blocks_must_agree() {
        let markdown = "```yaml\nx: 1\n```\n```yaml\nx: 2\n```\n";
        let result = parse_literate("file:///specs/readme.md", markdown);
        assert!(matches!(result, Err(ResolveError::MalformedDocument { .. })));
    }

    #[test]
    fn parse_invalid_yaml() {
        let result = parse_literate("file:///specs/a.yaml", "definitions: [unclosed");
        assert!(matches!(result, Err(ResolveError::InvalidDocument { .. })));
    }

    #[test]
    fn parse_non_mapping_root() {
        let result = parse_literate("file:///specs/a.yaml", "- 1\n- 2\n");
        assert!(matches!(result, Err(ResolveError::MalformedDocument { .. })));
    }

    #[test]
    fn file_system_input_reads_files() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "swagger: '2.0'").unwrap();

        let uri = Url::from_file_path(file.path()).unwrap();
        let text = FileSystemInput.read(&uri).unwrap();
        assert!(text.contains("swagger"));
    }

    #[test]
    fn file_system_input_missing_file() {
        let uri = Url::parse("file:///nonexistent/path.yaml").unwrap();
        let result = FileSystemInput.read(&uri);
        assert!(matches!(result, Err(ResolveError::FileNotFound { uri }) if uri == "file:///nonexistent/path.yaml"));
    }

    #[test]
    fn file_system_input_rejects_unknown_scheme() {
        let uri = Url::parse("ftp://example.com/a.yaml").unwrap();
        assert!(matches!(
            FileSystemInput.read(&uri),
            Err(ResolveError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn memory_input_lookup() {
        let input = MemoryInput::new().with_file("file:///specs/a.yaml", "x: 1");
        let uri = Url::parse("file:///specs/a.yaml").unwrap();
        assert_eq!(input.read(&uri).unwrap(), "x: 1");

        let missing = Url::parse("file:///specs/b.yaml").unwrap();
        assert!(matches!(input.read(&missing), Err(ResolveError::FileNotFound { .. })));
    }

    #[test]
    fn resolve_relative_uris() {
        let base = Url::parse("file:///specs/main/a.yaml").unwrap();
        assert_eq!(
            resolve_uri(&base, "b.yaml").unwrap().as_str(),
            "file:///specs/main/b.yaml"
        );
        assert_eq!(
            resolve_uri(&base, "../common/types.yaml").unwrap().as_str(),
            "file:///specs/common/types.yaml"
        );
        assert_eq!(
            resolve_uri(&base, "https://example.com/x.yaml").unwrap().as_str(),
            "https://example.com/x.yaml"
        );
    }

    #[test]
    fn is_url_detection() {
        assert!(is_url("https://example.com/a.yaml"));
        assert!(is_url("file:///specs/a.yaml"));
        assert!(!is_url("./a.yaml"));
        assert!(!is_url("/specs/a.yaml"));
    }

    #[test]
    fn input_uri_from_path() {
        let uri = input_uri("/specs/a.yaml").unwrap();
        assert_eq!(uri.scheme(), "file");
        assert!(uri.path().ends_with("/specs/a.yaml"));
    }

    #[test]
    fn load_literate_writes_origin() {
        let store = ArtifactStore::new();
        let scope = store.root().create_scope("yaml");
        let input = MemoryInput::new().with_file("file:///specs/a.yaml", "swagger: '2.0'\n");
        let uri = Url::parse("file:///specs/a.yaml").unwrap();

        let handle = load_literate(&input, &uri, &scope, &CancellationToken::new()).unwrap();
        assert_eq!(handle.key(), "yaml/doc.yaml");
        assert_eq!(handle.origin(), Some("file:///specs/a.yaml"));
        assert!(handle.mappings().is_empty());
    }

    #[test]
    fn load_literate_honours_cancellation() {
        let store = ArtifactStore::new();
        let input = MemoryInput::new().with_file("file:///specs/a.yaml", "x: 1");
        let uri = Url::parse("file:///specs/a.yaml").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = load_literate(&input, &uri, &store.root(), &cancel);
        assert!(matches!(result, Err(ResolveError::Cancelled)));
        assert!(store.keys().is_empty());
    }

    #[cfg(feature = "remote")]
    mod remote {
        use super::*;

        #[test]
        fn fetches_over_http() {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("GET", "/specs/b.yaml")
                .with_status(200)
                .with_body("definitions:\n  Gadget:\n    type: object\n")
                .create();

            let uri = Url::parse(&format!("{}/specs/b.yaml", server.url())).unwrap();
            let text = FileSystemInput.read(&uri).unwrap();
            assert!(text.contains("Gadget"));
            mock.assert();
        }

        #[test]
        fn http_404_is_not_found() {
            let mut server = mockito::Server::new();
            server.mock("GET", "/missing.yaml").with_status(404).create();

            let uri = Url::parse(&format!("{}/missing.yaml", server.url())).unwrap();
            assert!(matches!(
                FileSystemInput.read(&uri),
                Err(ResolveError::FileNotFound { .. })
            ));
        }

        #[test]
        fn http_500_is_network_error() {
            let mut server = mockito::Server::new();
            server.mock("GET", "/broken.yaml").with_status(500).create();

            let uri = Url::parse(&format!("{}/broken.yaml", server.url())).unwrap();
            assert!(matches!(
                FileSystemInput.read(&uri),
                Err(ResolveError::NetworkError { .. })
            ));
        }
    }
}
