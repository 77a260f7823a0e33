//! Tool registry: declared tools indexed by name.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tracing::warn;

use super::decode::decode_arguments;
use super::{ToolDeclaration, ToolFault, ToolHandler};
use crate::chat::{ToolInvocation, ToolResult};
use crate::error::LoopError;

struct Entry<Ctx> {
    declaration: ToolDeclaration,
    handler: Arc<dyn ToolHandler<Ctx>>,
}

impl<Ctx> Clone for Entry<Ctx> {
    fn clone(&self) -> Self {
        Self {
            declaration: self.declaration.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

/// The tools available to a session, indexed by name.
///
/// Generic over the context type `Ctx` handed to every handler (default
/// `()`). Schema-typed and grammar-constrained tools live side by side.
///
/// Tools are declared up front. A session only ever borrows the registry
/// immutably, so the set of tools cannot change once the first inference
/// call has been made, and there is no way to remove a tool.
///
/// ```rust
/// use serde_json::{json, Value};
/// use toolloop::LoopError;
/// use toolloop::tool::{tool_fn, Grammar, ToolDeclaration, ToolRegistry};
///
/// let mut registry: ToolRegistry = ToolRegistry::new();
/// registry.declare(tool_fn(
///     ToolDeclaration::grammar("checkPrice", "Price for a SKU", Grammar::lark("start: /.+/")),
///     |_args: Value| async move { Ok(json!({"priceCents": 1299})) },
/// ))?;
///
/// let again = registry.declare(tool_fn(
///     ToolDeclaration::grammar("checkPrice", "Price for a SKU", Grammar::lark("start: /.+/")),
///     |_args: Value| async move { Ok(json!(null)) },
/// ));
/// assert!(matches!(again, Err(LoopError::DuplicateToolName(_))));
/// # Ok::<(), LoopError>(())
/// ```
pub struct ToolRegistry<Ctx = ()>
where
    Ctx: Send + Sync + 'static,
{
    entries: BTreeMap<String, Entry<Ctx>>,
}

impl<Ctx> Default for ToolRegistry<Ctx>
where
    Ctx: Send + Sync + 'static,
{
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<Ctx> Clone for ToolRegistry<Ctx>
where
    Ctx: Send + Sync + 'static,
{
    /// Cheap: clones `Arc` pointers to handlers, not the handlers.
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<Ctx> std::fmt::Debug for ToolRegistry<Ctx>
where
    Ctx: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<Ctx: Send + Sync + 'static> ToolRegistry<Ctx> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a tool.
    ///
    /// Fails with [`LoopError::DuplicateToolName`] if a tool with the same
    /// name is already declared.
    pub fn declare(&mut self, handler: impl ToolHandler<Ctx> + 'static) -> Result<&mut Self, LoopError> {
        self.declare_shared(Arc::new(handler))
    }

    /// Declares a shared tool handler.
    pub fn declare_shared(&mut self, handler: Arc<dyn ToolHandler<Ctx>>) -> Result<&mut Self, LoopError> {
        let declaration = handler.declaration();
        if self.entries.contains_key(&declaration.name) {
            return Err(LoopError::DuplicateToolName(declaration.name));
        }
        self.entries.insert(
            declaration.name.clone(),
            Entry {
                declaration,
                handler,
            },
        );
        Ok(self)
    }

    /// Returns the handler for `name`, or [`LoopError::UnknownTool`].
    pub fn resolve(&self, name: &str) -> Result<&Arc<dyn ToolHandler<Ctx>>, LoopError> {
        self.get(name)
            .ok_or_else(|| LoopError::UnknownTool(name.to_string()))
    }

    /// Returns the handler for `name`, if declared.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolHandler<Ctx>>> {
        self.entries.get(name).map(|entry| &entry.handler)
    }

    /// Returns the declaration for `name`, if declared.
    pub fn declaration(&self, name: &str) -> Option<&ToolDeclaration> {
        self.entries.get(name).map(|entry| &entry.declaration)
    }

    /// Returns whether a tool with the given name is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All declarations, sorted by name.
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.entries
            .values()
            .map(|entry| entry.declaration.clone())
            .collect()
    }

    /// Returns the number of declared tools.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no tools are declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Executes one invocation.
    ///
    /// 1. Resolves the tool by name
    /// 2. Decodes the arguments under the tool's calling convention
    /// 3. Runs the handler, catching panics
    ///
    /// Always produces a [`ToolResult`] carrying the invocation's
    /// correlation id. Any [`ToolFault`] is rendered into the payload with
    /// `is_error` set.
    pub async fn execute(&self, call: &ToolInvocation, ctx: &Ctx) -> ToolResult {
        match self.try_execute(call, ctx).await {
            Ok(payload) => ToolResult {
                correlation_id: call.correlation_id.clone(),
                tool_name: call.tool_name.clone(),
                kind: call.kind,
                payload,
                is_error: false,
            },
            Err(fault) => {
                warn!(
                    tool = %call.tool_name,
                    correlation_id = %call.correlation_id,
                    kind = fault.kind(),
                    error = %fault,
                    "tool invocation faulted"
                );
                ToolResult {
                    correlation_id: call.correlation_id.clone(),
                    tool_name: call.tool_name.clone(),
                    kind: call.kind,
                    payload: fault.payload(),
                    is_error: true,
                }
            }
        }
    }

    async fn try_execute(&self, call: &ToolInvocation, ctx: &Ctx) -> Result<String, ToolFault> {
        let Some(entry) = self.entries.get(&call.tool_name) else {
            return Err(ToolFault::UnknownTool {
                tool: call.tool_name.clone(),
            });
        };

        let args: Value = decode_arguments(&entry.declaration, call)?;

        let outcome = AssertUnwindSafe(entry.handler.execute(args, ctx))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(output)) => Ok(output.to_payload()),
            Ok(Err(e)) => Err(ToolFault::HandlerFailure {
                tool: call.tool_name.clone(),
                message: e.message,
            }),
            Err(panic) => Err(ToolFault::HandlerFailure {
                tool: call.tool_name.clone(),
                message: format!("handler panicked: {}", panic_message(panic.as_ref())),
            }),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
