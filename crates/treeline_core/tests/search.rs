use serde_json::{json, Value};
use treeline_core::{ActionExecutor, ActionRequest, SessionContext};

fn run(
    engine: &mut ActionExecutor,
    session: &mut SessionContext,
    action: &str,
    params: Value,
) -> Value {
    let result = engine.execute(&ActionRequest::new(action, params), session);
    serde_json::to_value(&result).unwrap()
}

fn setup() -> (ActionExecutor, SessionContext) {
    let mut engine = ActionExecutor::default();
    let mut session = SessionContext::new();
    for params in [
        json!({"title": "Meeting Notes", "data": {"Body": "urgent issue with supplier"}}),
        json!({"title": "Reminder", "data": {"Body": "urgent: renew passport"}}),
        json!({"title": "Weekly meeting", "parent_id": "Meeting Notes"}),
        json!({"title": "Budget review", "data": {"Owner": "Finance team"}}),
    ] {
        let out = run(&mut engine, &mut session, "add_node", params);
        assert_eq!(out["ok"], json!(true), "{out}");
    }
    (engine, session)
}

fn titles(out: &Value) -> Vec<String> {
    out["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|hit| hit["title"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn word_mode_needs_every_token_in_any_order() {
    let (mut engine, mut session) = setup();
    let out = run(
        &mut engine,
        &mut session,
        "search_nodes",
        json!({"search_text": "urgent meeting", "exact_match": false}),
    );
    assert_eq!(out["count"], json!(1));
    assert_eq!(titles(&out), vec!["Meeting Notes"]);
    assert_eq!(out["results"][0]["matched_fields"], json!(["title", "Body"]));
    assert_eq!(out["results"][0]["format_type"], Value::Null);
}

#[test]
fn results_follow_tree_traversal_order() {
    let (mut engine, mut session) = setup();
    let out = run(
        &mut engine,
        &mut session,
        "search_nodes",
        json!({"search_text": "MEETING"}),
    );
    assert_eq!(titles(&out), vec!["Meeting Notes", "Weekly meeting"]);
}

#[test]
fn exact_mode_requires_contiguous_text() {
    let (mut engine, mut session) = setup();
    let out = run(
        &mut engine,
        &mut session,
        "search_nodes",
        json!({"search_text": "urgent issue", "exact_match": true}),
    );
    assert_eq!(titles(&out), vec!["Meeting Notes"]);

    let out = run(
        &mut engine,
        &mut session,
        "search_nodes",
        json!({"search_text": "issue urgent", "exact_match": "true"}),
    );
    assert_eq!(out["count"], json!(0));
}

#[test]
fn title_only_ignores_field_values() {
    let (mut engine, mut session) = setup();
    let out = run(
        &mut engine,
        &mut session,
        "search_nodes",
        json!({"search_text": "finance", "title_only": true}),
    );
    assert_eq!(out["count"], json!(0));

    let out = run(
        &mut engine,
        &mut session,
        "search_nodes",
        json!({"search_text": "finance"}),
    );
    assert_eq!(titles(&out), vec!["Budget review"]);
}

#[test]
fn return_nodes_yields_full_payloads() {
    let (mut engine, mut session) = setup();
    let out = run(
        &mut engine,
        &mut session,
        "search_nodes",
        json!({"search_text": "Meeting Notes", "return_nodes": true}),
    );
    let node = &out["results"][0];
    assert_eq!(node["data"], json!({"Body": "urgent issue with supplier"}));
    assert_eq!(node["child_count"], json!(1));
    assert_eq!(node["children"][0]["title"], json!("Weekly meeting"));
    assert!(node.get("matched_fields").is_none());
}

#[test]
fn blank_or_missing_search_text_is_invalid() {
    let (mut engine, mut session) = setup();
    for params in [json!({"search_text": "  "}), json!({}), json!({"search_text": ["a"]})] {
        let out = run(&mut engine, &mut session, "search_nodes", params);
        assert_eq!(out["error_kind"], json!("InvalidParameter"), "{out}");
    }
}
