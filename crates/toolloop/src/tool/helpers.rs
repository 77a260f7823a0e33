//! Helper functions for creating tool handlers.

use std::future::Future;
use std::marker::PhantomData;

use serde_json::Value;

use super::{FnToolHandler, NoCtxToolHandler, ToolDeclaration, ToolError, ToolOutput};

/// Creates a [`ToolHandler<()>`](super::ToolHandler) from a closure.
///
/// The closure receives the decoded argument object and returns a
/// `Result<impl Into<ToolOutput>, ToolError>`.
///
/// ```rust
/// use serde_json::{json, Value};
/// use toolloop::tool::{tool_fn, JsonSchema, ToolDeclaration, ToolError};
///
/// let handler = tool_fn(
///     ToolDeclaration::schema(
///         "getShipping",
///         "Shipping quote for a SKU",
///         JsonSchema::new(json!({
///             "type": "object",
///             "properties": {
///                 "store": { "type": "string" },
///                 "zip": { "type": "string" }
///             },
///             "required": ["store", "zip"]
///         })),
///     ),
///     |args: Value| async move {
///         let store = args["store"].as_str().ok_or_else(|| ToolError::new("store missing"))?;
///         Ok(json!({ "store": store, "costCents": 599, "etaDays": 5 }))
///     },
/// );
/// ```
pub fn tool_fn<F, Fut, O>(declaration: ToolDeclaration, handler: F) -> NoCtxToolHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, ToolError>> + Send + 'static,
    O: Into<ToolOutput> + Send + 'static,
{
    NoCtxToolHandler {
        declaration,
        handler,
    }
}

/// Creates a [`ToolHandler<Ctx>`](super::ToolHandler) from a closure that
/// also receives the session context.
///
/// The returned future must be `'static`, so copy what it needs out of
/// `ctx` before the `async move` block.
///
/// ```rust
/// use std::path::PathBuf;
/// use serde_json::{json, Value};
/// use toolloop::tool::{tool_fn_with_ctx, JsonSchema, ToolDeclaration};
///
/// struct Store {
///     path: PathBuf,
/// }
///
/// let handler = tool_fn_with_ctx(
///     ToolDeclaration::schema(
///         "add_todo",
///         "Add a todo item",
///         JsonSchema::new(json!({"type": "object"})),
///     ),
///     |args: Value, store: &Store| {
///         let path = store.path.clone();
///         async move { Ok(json!({ "stored_in": path, "title": args["title"] })) }
///     },
/// );
/// ```
pub fn tool_fn_with_ctx<Ctx, F, Fut, O>(
    declaration: ToolDeclaration,
    handler: F,
) -> FnToolHandler<Ctx, F>
where
    Ctx: Send + Sync + 'static,
    F: for<'c> Fn(Value, &'c Ctx) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, ToolError>> + Send + 'static,
    O: Into<ToolOutput> + Send + 'static,
{
    FnToolHandler {
        declaration,
        handler,
        _ctx: PhantomData,
    }
}
