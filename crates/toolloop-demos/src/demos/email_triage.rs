//! Inbox triage: list unread threads, read the calendar, draft replies.

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::Serialize;
use serde_json::{Value, json};
use toolloop::tool::{ToolError, ToolRegistry, tool_fn};
use toolloop::{LoopError, ReasoningEffort};

use super::{Convention, Demo};

/// Timezone reported with calendar slots.
pub(crate) const TIMEZONE: &str = "America/Los_Angeles";

const DEFAULT_LIMIT: usize = 10;

const SYSTEM_PROMPT: &str = "\
You are TriageBot. Your job is to triage unread email threads and draft replies. Steps:
1) Fetch recent unread threads.
2) Identify which threads imply a meeting request (based on subject/snippet).
3) Fetch calendar availability for the next 7 days during business hours.
4) For each meeting-request thread, propose 2-3 specific 30-minute slots that are free, and draft a concise reply with those options, timezone, and a fallback (\"send more times if these don't work\").
5) For non-meeting threads, draft a brief triage note or a one-line acknowledgment if appropriate.
Always run email fetching and calendar availability in parallel. Keep replies short and professional.

Parallelization guidance:
- Immediately call listUnreadThreads and getCalendarAvailability for the next 7 days in parallel; do not wait for one to finish before starting the other.
- Calendar fetching should not depend on knowing which threads need meetings; fetch once for the next 7 days and reuse for all meeting-related threads.
- If multiple meeting-request threads are found, generate proposed slots and draft replies independently for each thread.

Output requirements:
- Summary: count of unread threads scanned and how many need meetings.
- For each meeting thread: sender, subject, 2-3 proposed 30-minute free slots (include dates/times and timezone), and a concise reply draft that proposes those slots and invites alternatives.
- For non-meeting threads: one-line triage suggestion (e.g., archive, quick acknowledgment, or follow-up needed).
- Be explicit about timezone in proposed times and avoid outside-business-hours slots (default 9am-5pm local unless the tool provides a different window).
";

const DEFAULT_PROMPT: &str = "Triage my inbox. Check unread threads and, if any are asking to meet this week, \
propose 2-3 30-minute slots over the next 7 days and draft replies. Keep replies concise and include my timezone.";

const LIST_THREADS_GRAMMAR: &str = include_str!("../../grammars/list_unread_threads.lark");
const CALENDAR_GRAMMAR: &str = include_str!("../../grammars/get_calendar_availability.lark");

/// An unread email thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Thread {
    pub id: &'static str,
    pub from: &'static str,
    pub subject: &'static str,
    pub snippet: &'static str,
    pub needs_meeting: bool,
}

/// A 30-minute calendar slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Slot {
    pub start_iso: String,
    pub end_iso: String,
    pub busy: bool,
}

/// The mock inbox.
pub(crate) fn unread_threads() -> Vec<Thread> {
    vec![
        Thread {
            id: "t1",
            from: "alex@example.com",
            subject: "Quick sync this week?",
            snippet: "Are you free for a 30-min chat to discuss the roadmap?",
            needs_meeting: true,
        },
        Thread {
            id: "t2",
            from: "billing@example.com",
            subject: "Invoice attached",
            snippet: "Please review the attached invoice.",
            needs_meeting: false,
        },
        Thread {
            id: "t3",
            from: "sam@example.com",
            subject: "Meet next week about launch",
            snippet: "Can we find time next week?",
            needs_meeting: true,
        },
    ]
}

/// Business-hour slots (9:00 to 17:00) for the 7 days starting at `now`.
///
/// Every 4th slot, counting from the first, is busy.
pub(crate) fn business_slots(now: NaiveDateTime) -> Vec<Slot> {
    let mut slots = Vec::new();
    for day in 0..7 {
        let midnight = (now.date() + Duration::days(day)).and_time(NaiveTime::MIN);
        let end = midnight + Duration::hours(17);
        let mut start = midnight + Duration::hours(9);
        while start < end {
            let next = start + Duration::minutes(30);
            slots.push(Slot {
                start_iso: iso(start),
                end_iso: iso(next),
                busy: slots.len() % 4 == 0,
            });
            start = next;
        }
    }
    slots
}

fn iso(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn list_threads(args: &Value) -> Value {
    let limit = args["limit"]
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(DEFAULT_LIMIT);
    let threads: Vec<Thread> = unread_threads().into_iter().take(limit).collect();
    json!({ "threads": threads })
}

/// Builds the demo with availability computed from `now`.
pub(crate) fn demo(
    convention: Convention,
    prompt: Option<String>,
    now: NaiveDateTime,
) -> Result<Demo, LoopError> {
    // The calendar is fixed for the session so every call sees the same slots.
    let calendar = Arc::new(json!({ "slots": business_slots(now), "tz": TIMEZONE }));

    let mut registry = ToolRegistry::new();
    registry.declare(tool_fn(
        convention.declare(
            "listUnreadThreads",
            "Get recent unread email threads with lightweight metadata.",
            json!({
                "type": "object",
                "properties": {
                    "limit": { "type": "integer", "minimum": 1, "description": "Optional limit, default 10" }
                },
                "required": []
            }),
            LIST_THREADS_GRAMMAR,
        ),
        |args: Value| async move { Ok::<_, ToolError>(list_threads(&args)) },
    ))?;
    registry.declare(tool_fn(
        convention.declare(
            "getCalendarAvailability",
            "Get free/busy slots for the given time range.",
            json!({
                "type": "object",
                "properties": {
                    "range": {
                        "type": "object",
                        "properties": {
                            "startIso": { "type": "string" },
                            "endIso": { "type": "string" }
                        },
                        "required": ["startIso", "endIso"]
                    }
                },
                "required": ["range"]
            }),
            CALENDAR_GRAMMAR,
        ),
        move |_args: Value| {
            let calendar = Arc::clone(&calendar);
            async move { Ok::<_, ToolError>(Value::clone(&calendar)) }
        },
    ))?;

    Ok(Demo {
        name: "email-triage",
        system: SYSTEM_PROMPT,
        user: prompt.unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
        registry,
        model: "gpt-5-mini",
        reasoning_effort: ReasoningEffort::Minimal,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tokio_util::sync::CancellationToken;
    use toolloop::test_helpers::{custom_call, function_call, mock_client, text_response, tool_response};

    use super::*;
    use crate::demos::{RunOptions, run};

    fn monday_morning() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 3)
            .and_then(|d| d.and_hms_opt(8, 15, 0))
            .unwrap()
    }

    #[test]
    fn test_business_slots_cover_seven_days() {
        let slots = business_slots(monday_morning());
        assert_eq!(slots.len(), 7 * 16);
        assert_eq!(slots[0].start_iso, "2025-03-03T09:00:00");
        assert_eq!(slots[0].end_iso, "2025-03-03T09:30:00");
        assert_eq!(slots[15].end_iso, "2025-03-03T17:00:00");
        assert_eq!(slots[16].start_iso, "2025-03-04T09:00:00");
        assert_eq!(slots.last().unwrap().start_iso, "2025-03-09T16:30:00");
    }

    #[test]
    fn test_every_fourth_slot_busy() {
        let slots = business_slots(monday_morning());
        for (i, slot) in slots.iter().enumerate() {
            assert_eq!(slot.busy, i % 4 == 0, "slot {i}");
        }
    }

    #[test]
    fn test_list_threads_limit() {
        assert_eq!(list_threads(&json!({ "limit": 2 }))["threads"].as_array().unwrap().len(), 2);
        assert_eq!(list_threads(&json!({}))["threads"].as_array().unwrap().len(), 3);
        assert_eq!(list_threads(&json!({ "limit": 1 }))["threads"][0]["needsMeeting"], true);
    }

    #[test]
    fn test_both_conventions_declare_two_tools() {
        for convention in [Convention::Schema, Convention::Grammar] {
            let demo = demo(convention, None, monday_morning()).unwrap();
            assert_eq!(demo.registry.len(), 2);
            assert!(demo.registry.contains("listUnreadThreads"));
            assert!(demo.registry.contains("getCalendarAvailability"));
        }
    }

    #[tokio::test]
    async fn test_grammar_session_fetches_both_in_one_round() {
        let demo = demo(Convention::Grammar, None, monday_morning()).unwrap();
        let mock = mock_client(vec![
            tool_response(vec![
                custom_call("call_1", "listUnreadThreads", "{\"limit\":10}"),
                custom_call(
                    "call_2",
                    "getCalendarAvailability",
                    "{\"range\":{\"startIso\":\"2025-03-03T08:15:00\",\"endIso\":\"2025-03-10T08:15:00\"}}",
                ),
            ]),
            text_response("2 of 3 threads need meetings."),
        ]);

        let session_run = run(&mock, demo, &(), RunOptions::default(), &CancellationToken::new()).await;

        assert_eq!(session_run.result.unwrap().rounds(), 2);
        let round = &session_run.session.rounds()[0];
        assert!(round.results.iter().all(|r| !r.is_error));
        let calendar: Value = serde_json::from_str(&round.results[1].payload).unwrap();
        assert_eq!(calendar["tz"], TIMEZONE);
        assert_eq!(calendar["slots"].as_array().unwrap().len(), 112);
    }

    #[tokio::test]
    async fn test_schema_session_rejects_bad_limit() {
        let demo = demo(Convention::Schema, None, monday_morning()).unwrap();
        let mock = mock_client(vec![
            tool_response(vec![function_call("call_1", "listUnreadThreads", "{\"limit\":0}")]),
            text_response("done"),
        ]);

        let session_run = run(&mock, demo, &(), RunOptions::default(), &CancellationToken::new()).await;

        assert!(session_run.result.is_ok());
        assert!(session_run.session.rounds()[0].results[0].is_error);
    }
}
