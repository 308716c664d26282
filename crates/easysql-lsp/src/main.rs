use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Mutex;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};

use easysql_parser::{AstCache, Node, DEFAULT_MAX_DEPTH};

mod definition;
mod diagnostics;
mod document;
mod folding;
mod hover;
mod semantic_tokens;
mod symbols;

use document::Document;

/// Parsed trees kept hot for this many open documents.
const AST_CACHE_CAPACITY: usize = 32;

const DEFAULT_MAX_PROBLEMS: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Settings {
    #[serde(default = "default_max_problems")]
    max_number_of_problems: usize,
}

fn default_max_problems() -> usize {
    DEFAULT_MAX_PROBLEMS
}

struct State {
    documents: HashMap<Url, Document>,
    cache: AstCache,
    max_problems: usize,
}

impl State {
    fn new() -> Self {
        Self {
            documents: HashMap::new(),
            cache: AstCache::new(AST_CACHE_CAPACITY),
            max_problems: DEFAULT_MAX_PROBLEMS,
        }
    }

    /// Parse (or fetch the cached tree for) an open document. A panic in the
    /// parser must not take down the server: degrade to an empty tree.
    fn nodes(&mut self, uri: &Url) -> Option<Arc<Vec<Node>>> {
        let doc = self.documents.get(uri)?;
        let cache = &mut self.cache;
        let parsed = std::panic::catch_unwind(AssertUnwindSafe(|| {
            cache.get_or_parse(uri.as_str(), doc.version, &doc.text, DEFAULT_MAX_DEPTH)
        }));
        Some(parsed.unwrap_or_else(|_| Arc::new(Vec::new())))
    }
}

struct Backend {
    client: Client,
    state: Arc<Mutex<State>>,
}

impl Backend {
    fn new(client: Client) -> Self {
        Self {
            client,
            state: Arc::new(Mutex::new(State::new())),
        }
    }

    /// Publish diagnostics for a document
    async fn publish_diagnostics(&self, uri: Url) {
        let mut state = self.state.lock().await;
        let Some(nodes) = state.nodes(&uri) else {
            return;
        };
        let Some(doc) = state.documents.get(&uri) else {
            return;
        };
        let version = doc.version;
        let diagnostics = diagnostics::collect(&nodes, doc, state.max_problems);
        drop(state);

        self.client
            .publish_diagnostics(uri, diagnostics, Some(version))
            .await;
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, _params: InitializeParams) -> Result<InitializeResult> {
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                document_symbol_provider: Some(OneOf::Left(true)),
                folding_range_provider: Some(FoldingRangeProviderCapability::Simple(true)),
                semantic_tokens_provider: Some(
                    SemanticTokensServerCapabilities::SemanticTokensOptions(
                        SemanticTokensOptions {
                            legend: SemanticTokensLegend {
                                token_types: semantic_tokens::TOKEN_TYPES.to_vec(),
                                token_modifiers: semantic_tokens::TOKEN_MODIFIERS.to_vec(),
                            },
                            full: Some(SemanticTokensFullOptions::Bool(true)),
                            ..Default::default()
                        },
                    ),
                ),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "easysql language server initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        // Settings arrive as {"easysql": {...}}; anything unreadable keeps
        // the defaults.
        let easysql = params.settings.get("easysql").cloned();
        if let Some(value) = easysql {
            if let Ok(settings) = serde_json::from_value::<Settings>(value) {
                let mut state = self.state.lock().await;
                state.max_problems = settings.max_number_of_problems;
            }
        }
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri.clone();
        {
            let mut state = self.state.lock().await;
            state.documents.insert(
                uri.clone(),
                Document::new(params.text_document.text, params.text_document.version),
            );
        }
        self.publish_diagnostics(uri).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri.clone();

        // FULL sync: there is only one change carrying the whole text.
        if let Some(change) = params.content_changes.into_iter().next() {
            let mut state = self.state.lock().await;
            match state.documents.get_mut(&uri) {
                Some(doc) => doc.update(change.text, params.text_document.version),
                None => {
                    state.documents.insert(
                        uri.clone(),
                        Document::new(change.text, params.text_document.version),
                    );
                }
            }
            drop(state);

            self.publish_diagnostics(uri).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        {
            let mut state = self.state.lock().await;
            state.documents.remove(&uri);
            state.cache.invalidate(uri.as_str());
        }
        // Clear stale diagnostics for the closed document.
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let mut state = self.state.lock().await;
        let Some(nodes) = state.nodes(&uri) else {
            return Ok(None);
        };
        let Some(doc) = state.documents.get(&uri) else {
            return Ok(None);
        };

        let offset = doc.offset(position);
        Ok(hover::compute(&nodes, doc, offset))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let mut state = self.state.lock().await;
        let Some(nodes) = state.nodes(&uri) else {
            return Ok(None);
        };
        let Some(doc) = state.documents.get(&uri) else {
            return Ok(None);
        };

        let offset = doc.offset(position);
        Ok(definition::compute(&nodes, doc, offset).map(|range| {
            GotoDefinitionResponse::Scalar(Location {
                uri: uri.clone(),
                range,
            })
        }))
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let uri = params.text_document.uri;

        let mut state = self.state.lock().await;
        let Some(nodes) = state.nodes(&uri) else {
            return Ok(None);
        };
        let Some(doc) = state.documents.get(&uri) else {
            return Ok(None);
        };

        let symbols = symbols::compute(&nodes, doc);
        if symbols.is_empty() {
            Ok(None)
        } else {
            Ok(Some(DocumentSymbolResponse::Nested(symbols)))
        }
    }

    async fn folding_range(&self, params: FoldingRangeParams) -> Result<Option<Vec<FoldingRange>>> {
        let uri = params.text_document.uri;

        let mut state = self.state.lock().await;
        let Some(nodes) = state.nodes(&uri) else {
            return Ok(None);
        };
        let Some(doc) = state.documents.get(&uri) else {
            return Ok(None);
        };

        let ranges = folding::compute(&nodes, doc);
        if ranges.is_empty() {
            Ok(None)
        } else {
            Ok(Some(ranges))
        }
    }

    async fn semantic_tokens_full(
        &self,
        params: SemanticTokensParams,
    ) -> Result<Option<SemanticTokensResult>> {
        let uri = params.text_document.uri;

        let mut state = self.state.lock().await;
        let Some(nodes) = state.nodes(&uri) else {
            return Ok(None);
        };
        let Some(doc) = state.documents.get(&uri) else {
            return Ok(None);
        };

        let data = semantic_tokens::compute(&nodes, doc);
        Ok(Some(SemanticTokensResult::Tokens(SemanticTokens {
            result_id: None,
            data,
        })))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}
