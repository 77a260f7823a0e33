//! Delivered-price comparison across two mock stores.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use toolloop::tool::{ToolError, ToolOutput, ToolRegistry, tool_fn};
use toolloop::{LoopError, ReasoningEffort};

use super::{Convention, Demo};

const SYSTEM_PROMPT: &str = "\
You are PriceCompare, a shopping assistant. Given a SKU and a ZIP code, fetch both base price and shipping info from all configured stores, then return the cheapest delivered in-stock option. Always check every store. Compute delivered price as item price + shipping. If an item is out of stock at a store, exclude it. Break ties by earlier ETA; if still tied, prefer the cheaper shipping method. Include a short rationale showing each store's totals.

Parallelization guidance:
- For a single SKU and ZIP, call getPrice for all stores in parallel, and getShipping for all stores in parallel. If the runtime requires two phases, fetch all prices first, then all shipping, fanning out across stores. Do not wait for one store before requesting another.

Output requirements:
- Summarize each store: price, shipping, ETA, total, stock status.
- Recommendation: name of the best store with total and ETA.
- Brief rationale describing tie-break rules if applicable.
";

const DEFAULT_PROMPT: &str = "Find the best delivered price for SKU \"N3-KEYBRD\" shipped to ZIP 94507. \
Compare StoreA and StoreB, and show me each store's price, shipping, ETA, and total before recommending the best option.";

const PRICE_GRAMMAR: &str = include_str!("../../grammars/get_price.lark");
const SHIPPING_GRAMMAR: &str = include_str!("../../grammars/get_shipping.lark");

const CURRENCY: &str = "USD";

#[derive(Debug, Deserialize)]
struct PriceArgs {
    store: String,
    sku: String,
}

/// The mock ignores `zip`; every store ships one way.
#[derive(Debug, Deserialize)]
struct ShippingArgs {
    store: String,
    sku: String,
}

/// A `getPrice` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PriceQuote {
    pub store: String,
    pub sku: String,
    pub price_cents: u32,
    pub in_stock: bool,
    pub currency: &'static str,
}

/// A `getShipping` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ShippingQuote {
    pub store: String,
    pub sku: String,
    pub shipping_cents: u32,
    pub eta_days: u32,
    pub method: &'static str,
    pub currency: &'static str,
}

/// Catalog entry: price in cents and stock status.
fn catalog(store: &str, sku: &str) -> Option<(u32, bool)> {
    match (store, sku) {
        ("storeA", "N3-KEYBRD") => Some((4999, true)),
        ("storeA", "OOS-ITEM") => Some((12999, false)),
        ("storeB", "N3-KEYBRD") => Some((4799, true)),
        ("storeB", "OOS-ITEM") => Some((9999, false)),
        _ => None,
    }
}

/// One shipping method per store, regardless of SKU and ZIP.
fn shipping_method(store: &str) -> Option<(&'static str, u32, u32)> {
    match store {
        "storeA" => Some(("standard", 599, 5)),
        "storeB" => Some(("expedited", 1299, 2)),
        _ => None,
    }
}

/// Looks up a price. Unknown SKUs are reported out of stock at price 0.
pub(crate) fn get_price(store: &str, sku: &str) -> PriceQuote {
    let (price_cents, in_stock) = catalog(store, sku).unwrap_or((0, false));
    PriceQuote {
        store: store.to_string(),
        sku: sku.to_string(),
        price_cents,
        in_stock,
        currency: CURRENCY,
    }
}

/// Looks up shipping for a store.
pub(crate) fn get_shipping(store: &str, sku: &str) -> Result<ShippingQuote, ToolError> {
    let (method, shipping_cents, eta_days) =
        shipping_method(store).ok_or_else(|| ToolError::new(format!("unknown store: {store}")))?;
    Ok(ShippingQuote {
        store: store.to_string(),
        sku: sku.to_string(),
        shipping_cents,
        eta_days,
        method,
        currency: CURRENCY,
    })
}

fn store_schema(extra: &[(&str, Value)]) -> Value {
    let mut properties = serde_json::Map::new();
    properties.insert(
        "store".into(),
        json!({ "type": "string", "description": "Store identifier", "enum": ["storeA", "storeB"] }),
    );
    properties.insert("sku".into(), json!({ "type": "string" }));
    let mut required = vec![json!("store"), json!("sku")];
    for (name, schema) in extra {
        properties.insert((*name).to_string(), schema.clone());
        required.push(json!(name));
    }
    json!({ "type": "object", "properties": properties, "required": required })
}

/// Builds the demo.
pub(crate) fn demo(convention: Convention, prompt: Option<String>) -> Result<Demo, LoopError> {
    let mut registry = ToolRegistry::new();
    registry.declare(tool_fn(
        convention.declare(
            "getPrice",
            "Get base price and stock for a given store and SKU.",
            store_schema(&[]),
            PRICE_GRAMMAR,
        ),
        |args: Value| async move {
            let args: PriceArgs = serde_json::from_value(args)?;
            ToolOutput::json(&get_price(&args.store, &args.sku))
        },
    ))?;
    registry.declare(tool_fn(
        convention.declare(
            "getShipping",
            "Get shipping cost and ETA for a given store, SKU, and ZIP.",
            store_schema(&[("zip", json!({ "type": "string" }))]),
            SHIPPING_GRAMMAR,
        ),
        |args: Value| async move {
            let args: ShippingArgs = serde_json::from_value(args)?;
            ToolOutput::json(&get_shipping(&args.store, &args.sku)?)
        },
    ))?;

    Ok(Demo {
        name: "price-compare",
        system: SYSTEM_PROMPT,
        user: prompt.unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
        registry,
        model: "gpt-5",
        reasoning_effort: ReasoningEffort::High,
    })
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;
    use toolloop::test_helpers::{custom_call, function_call, mock_client, text_response, tool_response};
    use toolloop::tool::LoopConfig;

    use super::*;
    use crate::demos::{RunOptions, run};

    #[test]
    fn test_get_price_known_and_unknown() {
        let quote = get_price("storeB", "N3-KEYBRD");
        assert_eq!(quote.price_cents, 4799);
        assert!(quote.in_stock);

        let oos = get_price("storeA", "OOS-ITEM");
        assert!(!oos.in_stock);

        let unknown = get_price("storeA", "NOPE");
        assert_eq!(unknown.price_cents, 0);
        assert!(!unknown.in_stock);
    }

    #[test]
    fn test_get_shipping_tables() {
        let a = get_shipping("storeA", "N3-KEYBRD").unwrap();
        assert_eq!((a.method, a.shipping_cents, a.eta_days), ("standard", 599, 5));
        let b = get_shipping("storeB", "N3-KEYBRD").unwrap();
        assert_eq!((b.method, b.shipping_cents, b.eta_days), ("expedited", 1299, 2));
        assert!(get_shipping("storeC", "N3-KEYBRD").is_err());
    }

    #[test]
    fn test_quote_serializes_camel_case() {
        let json = serde_json::to_value(get_price("storeA", "N3-KEYBRD")).unwrap();
        assert_eq!(json["priceCents"], 4999);
        assert_eq!(json["inStock"], true);
        assert_eq!(json["currency"], "USD");
    }

    #[test]
    fn test_store_schema_requires_extra_fields() {
        let schema = store_schema(&[("zip", json!({ "type": "string" }))]);
        assert_eq!(schema["required"], json!(["store", "sku", "zip"]));
        assert_eq!(schema["properties"]["store"]["enum"], json!(["storeA", "storeB"]));
    }

    #[tokio::test]
    async fn test_fan_out_across_stores() {
        let demo = demo(Convention::Schema, None).unwrap();
        let mock = mock_client(vec![
            tool_response(vec![
                function_call("call_1", "getPrice", r#"{"store":"storeA","sku":"N3-KEYBRD"}"#),
                function_call("call_2", "getPrice", r#"{"store":"storeB","sku":"N3-KEYBRD"}"#),
            ]),
            tool_response(vec![
                function_call("call_3", "getShipping", r#"{"store":"storeA","sku":"N3-KEYBRD","zip":"94507"}"#),
                function_call("call_4", "getShipping", r#"{"store":"storeB","sku":"N3-KEYBRD","zip":"94507"}"#),
            ]),
            text_response("storeA wins at $55.98 delivered."),
        ]);

        let session_run = run(&mock, demo, &(), RunOptions::default(), &CancellationToken::new()).await;

        let outcome = session_run.result.as_ref().unwrap();
        assert_eq!(outcome.rounds(), 3);
        let tool_outputs = session_run.snapshot().tool_outputs;
        assert_eq!(tool_outputs.len(), 4);
        assert_eq!(tool_outputs[1].result["priceCents"], 4799);
        assert_eq!(tool_outputs[3].result["etaDays"], 2);
    }

    #[tokio::test]
    async fn test_grammar_convention_round_limit() {
        let demo = demo(Convention::Grammar, None).unwrap();
        let call = r#"{"store":"storeA","sku":"N3-KEYBRD"}"#;
        let mock = mock_client(vec![
            tool_response(vec![custom_call("call_1", "getPrice", call)]),
            tool_response(vec![custom_call("call_2", "getPrice", call)]),
        ]);
        let options = RunOptions {
            config: LoopConfig {
                max_rounds: Some(1),
                ..Default::default()
            },
            ..Default::default()
        };

        let session_run = run(&mock, demo, &(), options, &CancellationToken::new()).await;

        assert!(matches!(
            session_run.result,
            Err(LoopError::RoundLimitExceeded { limit: 1, .. })
        ));
        assert_eq!(session_run.session.tool_call_count(), 1);
    }
}
