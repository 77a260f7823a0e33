//! Tool handler trait and closure-backed implementations.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

use serde_json::Value;

use super::{ToolDeclaration, ToolError, ToolOutput};

/// Boxed future returned by [`ToolHandler::execute`].
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<ToolOutput, ToolError>> + Send + 'a>>;

/// A locally executed tool.
///
/// The handler receives arguments already decoded under its calling
/// convention: always a JSON object, validated against the parameter
/// schema for schema-typed tools. It should behave as a pure function of
/// its arguments (and `ctx`); the dispatcher may run several handlers of
/// one round concurrently.
///
/// The trait is object-safe so handlers can be stored as
/// `Arc<dyn ToolHandler<Ctx>>`. For most tools [`super::tool_fn`] or
/// [`super::tool_fn_with_ctx`] is enough.
///
/// ```rust
/// use serde_json::{json, Value};
/// use toolloop::tool::{HandlerFuture, JsonSchema, ToolDeclaration, ToolHandler, ToolOutput};
///
/// struct Clock {
///     now: String,
/// }
///
/// impl ToolHandler for Clock {
///     fn declaration(&self) -> ToolDeclaration {
///         ToolDeclaration::schema(
///             "get_current_datetime",
///             "Current local date and time",
///             JsonSchema::new(json!({"type": "object", "properties": {}})),
///         )
///     }
///
///     fn execute<'a>(&'a self, _args: Value, _ctx: &'a ()) -> HandlerFuture<'a> {
///         Box::pin(async move { Ok(ToolOutput::from(self.now.as_str())) })
///     }
/// }
/// ```
pub trait ToolHandler<Ctx = ()>: Send + Sync {
    /// The tool's declaration.
    fn declaration(&self) -> ToolDeclaration;

    /// Runs the tool.
    fn execute<'a>(&'a self, args: Value, ctx: &'a Ctx) -> HandlerFuture<'a>;
}

/// A context-aware handler backed by an async closure.
///
/// Created via [`super::tool_fn_with_ctx`].
pub struct FnToolHandler<Ctx, F> {
    pub(crate) declaration: ToolDeclaration,
    pub(crate) handler: F,
    pub(crate) _ctx: PhantomData<fn(&Ctx)>,
}

impl<Ctx, F> std::fmt::Debug for FnToolHandler<Ctx, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnToolHandler")
            .field("name", &self.declaration.name)
            .finish_non_exhaustive()
    }
}

impl<Ctx, F, Fut, O> ToolHandler<Ctx> for FnToolHandler<Ctx, F>
where
    Ctx: Send + Sync + 'static,
    F: for<'c> Fn(Value, &'c Ctx) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O, ToolError>> + Send + 'static,
    O: Into<ToolOutput> + Send + 'static,
{
    fn declaration(&self) -> ToolDeclaration {
        self.declaration.clone()
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a Ctx) -> HandlerFuture<'a> {
        let fut = (self.handler)(args, ctx);
        Box::pin(async move { fut.await.map(Into::into) })
    }
}

/// A handler without context, created by [`super::tool_fn`].
pub struct NoCtxToolHandler<F> {
    pub(crate) declaration: ToolDeclaration,
    pub(crate) handler: F,
}

impl<F> std::fmt::Debug for NoCtxToolHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoCtxToolHandler")
            .field("name", &self.declaration.name)
            .finish_non_exhaustive()
    }
}

impl<F, Fut, O> ToolHandler<()> for NoCtxToolHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O, ToolError>> + Send + 'static,
    O: Into<ToolOutput> + Send + 'static,
{
    fn declaration(&self) -> ToolDeclaration {
        self.declaration.clone()
    }

    fn execute<'a>(&'a self, args: Value, _ctx: &'a ()) -> HandlerFuture<'a> {
        let fut = (self.handler)(args);
        Box::pin(async move { fut.await.map(Into::into) })
    }
}
