//! Per-round tool dispatch with event collection.

use std::time::Instant;

use futures::{StreamExt, stream};
use tracing::debug;

use super::ToolRegistry;
use super::config::LoopEvent;
use crate::chat::{ToolInvocation, ToolResult};

/// Result of dispatching one round: one result per invocation plus the
/// dispatch events.
#[derive(Debug)]
pub struct DispatchOutcome {
    /// Results in the order the invocations were requested.
    pub results: Vec<ToolResult>,
    /// Start/end events, in execution order.
    pub events: Vec<LoopEvent>,
}

/// Dispatches every invocation of a round.
///
/// Uses streams for unified parallel/sequential execution:
/// - Parallel: `buffer_unordered` launches every handler at once and
///   collects them as they finish, so one slow or failing handler never
///   holds up collection of the others
/// - Sequential: `then` runs them one after another in request order
///
/// Faults never escape: each invocation yields exactly one
/// [`ToolResult`], with the invocation's correlation id. Results are put
/// back into request order after fan-in so identical rounds commit
/// identical conversations.
pub async fn dispatch<Ctx: Send + Sync + 'static>(
    registry: &ToolRegistry<Ctx>,
    calls: Vec<ToolInvocation>,
    parallel: bool,
    ctx: &Ctx,
) -> DispatchOutcome {
    if calls.is_empty() {
        return DispatchOutcome {
            results: Vec::new(),
            events: Vec::new(),
        };
    }

    let call_count = calls.len();

    let execute_one = |(position, call): (usize, ToolInvocation)| async move {
        let start_event = LoopEvent::ToolDispatchStart {
            correlation_id: call.correlation_id.clone(),
            tool_name: call.tool_name.clone(),
        };

        let start = Instant::now();
        let result = registry.execute(&call, ctx).await;
        let duration = start.elapsed();
        debug!(
            tool = %call.tool_name,
            correlation_id = %call.correlation_id,
            is_error = result.is_error,
            ?duration,
            "tool dispatched"
        );

        let end_event = LoopEvent::ToolDispatchEnd {
            correlation_id: call.correlation_id,
            tool_name: call.tool_name,
            result: result.clone(),
            duration,
        };
        (position, result, start_event, end_event)
    };

    let outcomes: Vec<(usize, ToolResult, LoopEvent, LoopEvent)> = if parallel && call_count > 1 {
        stream::iter(calls.into_iter().enumerate())
            .map(execute_one)
            .buffer_unordered(call_count)
            .collect()
            .await
    } else {
        stream::iter(calls.into_iter().enumerate())
            .then(execute_one)
            .collect()
            .await
    };

    let mut events = Vec::with_capacity(call_count * 2);
    let mut ordered = Vec::with_capacity(call_count);
    for (position, result, start_event, end_event) in outcomes {
        events.push(start_event);
        events.push(end_event);
        ordered.push((position, result));
    }

    ordered.sort_by_key(|(position, _)| *position);
    let results = ordered.into_iter().map(|(_, result)| result).collect();

    DispatchOutcome { results, events }
}
