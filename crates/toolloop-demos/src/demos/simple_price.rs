//! Single-tool price lookup.

use rand::Rng;
use serde::Deserialize;
use serde_json::{Value, json};
use toolloop::tool::{ToolError, ToolRegistry, tool_fn};
use toolloop::{LoopError, ReasoningEffort};

use super::{Convention, Demo};

const SYSTEM_PROMPT: &str = "\
You are a simple price checker. Given a product SKU, call the tool `checkPrice` to get a random price in USD cents, \
then summarize the price to the user in dollars (e.g., $12.34).
";

const DEFAULT_PROMPT: &str = "What's the price for SKU 'SKU-001' today?";

const CHECK_PRICE_GRAMMAR: &str = include_str!("../../grammars/check_price.lark");

/// Inclusive range of generated prices, in cents.
pub(crate) const PRICE_RANGE: std::ops::RangeInclusive<u32> = 500..=19_999;

#[derive(Debug, Deserialize)]
struct CheckPriceArgs {
    sku: String,
}

fn check_price(sku: &str, price_cents: u32) -> Value {
    json!({ "sku": sku, "priceCents": price_cents, "currency": "USD" })
}

/// Builds the demo.
pub(crate) fn demo(convention: Convention, prompt: Option<String>) -> Result<Demo, LoopError> {
    let mut registry = ToolRegistry::new();
    registry.declare(tool_fn(
        convention.declare(
            "checkPrice",
            "Return a random price in cents for the given SKU.",
            json!({
                "type": "object",
                "properties": { "sku": { "type": "string" } },
                "required": ["sku"]
            }),
            CHECK_PRICE_GRAMMAR,
        ),
        |args: Value| {
            let price_cents = rand::rng().random_range(PRICE_RANGE);
            async move {
                let args: CheckPriceArgs = serde_json::from_value(args)?;
                Ok::<_, ToolError>(check_price(&args.sku, price_cents))
            }
        },
    ))?;

    Ok(Demo {
        name: "simple-price",
        system: SYSTEM_PROMPT,
        user: prompt.unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
        registry,
        model: "gpt-5",
        reasoning_effort: ReasoningEffort::High,
    })
}
