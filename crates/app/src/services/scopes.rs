use jevons_core::ScopeNode;
use serde::Serialize;

use crate::error::Result;
use crate::services::SharedContext;

/// Arena listing of the (optionally filtered) scope tree.
#[derive(Debug, Clone, Serialize)]
pub struct ScopeListing {
    pub nodes: Vec<ScopeNode>,
    pub leaf_count: usize,
    pub project_count: usize,
    /// Path of the deepest scope containing the UI's working directory.
    pub initial_scope: Option<String>,
    pub generation: u64,
}

#[derive(Clone)]
pub struct ScopesService {
    ctx: SharedContext,
}

impl ScopesService {
    pub(super) fn new(ctx: SharedContext) -> Self {
        Self { ctx }
    }

    pub fn tree(&self, query: Option<&str>) -> Result<ScopeListing> {
        let snapshot = self.ctx.store.snapshot();
        let initial_scope = snapshot
            .ui_context
            .as_ref()
            .and_then(|ctx| ctx.cwd.as_deref())
            .and_then(|cwd| snapshot.scopes.deepest_prefix(cwd))
            .and_then(|id| snapshot.scopes.get(id))
            .map(|node| node.path.clone());
        let tree = match query {
            Some(query) => snapshot.scopes.filter(query),
            None => snapshot.scopes.clone(),
        };
        Ok(ScopeListing {
            leaf_count: tree.leaf_count(),
            project_count: tree.project_count(),
            nodes: tree.nodes().to_vec(),
            initial_scope,
            generation: snapshot.generation,
        })
    }
}
