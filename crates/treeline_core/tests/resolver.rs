use serde_json::{json, Value};
use treeline_core::{
    ActionExecutor, ActionRequest, NodeDraft, NodeResolver, ResolveError, SessionContext,
    TreeDocument,
};
use uuid::Uuid;

fn run(
    engine: &mut ActionExecutor,
    session: &mut SessionContext,
    action: &str,
    params: Value,
) -> Value {
    let result = engine.execute(&ActionRequest::new(action, params), session);
    serde_json::to_value(&result).unwrap()
}

fn add(engine: &mut ActionExecutor, session: &mut SessionContext, params: Value) -> Uuid {
    let out = run(engine, session, "add_node", params);
    assert_eq!(out["ok"], json!(true), "add_node failed: {out}");
    Uuid::parse_str(out["node_id"].as_str().unwrap()).unwrap()
}

#[test]
fn id_lookup_wins_over_title_collision() {
    let mut tree = TreeDocument::new("Root");
    let root = tree.root_id();
    let (target, _) = tree.insert_child(root, NodeDraft::new("Target"), None).unwrap();
    let (impostor, _) = tree
        .insert_child(root, NodeDraft::new(target.to_string()), None)
        .unwrap();

    let resolver = NodeResolver::new(&tree);
    assert_eq!(resolver.resolve(&target.to_string()), Ok(target));
    assert_eq!(resolver.resolve(&impostor.to_string()), Ok(impostor));
}

#[test]
fn respelled_id_matches_only_as_a_title() {
    let mut tree = TreeDocument::new("Root");
    let root = tree.root_id();
    let (target, _) = tree.insert_child(root, NodeDraft::new("Target"), None).unwrap();
    let upper = target.to_string().to_uppercase();
    let (titled, _) = tree
        .insert_child(root, NodeDraft::new(upper.clone()), None)
        .unwrap();

    let resolver = NodeResolver::new(&tree);
    assert_eq!(resolver.resolve(&upper), Ok(titled));
    assert_eq!(
        resolver.resolve(&target.simple().to_string()),
        Err(ResolveError::NodeNotFound(target.simple().to_string()))
    );
    assert_eq!(resolver.resolve(&target.to_string()), Ok(target));
}

#[test]
fn duplicate_exact_titles_are_ambiguous_with_candidates_in_tree_order() {
    let mut engine = ActionExecutor::default();
    let mut session = SessionContext::new();
    let first = add(&mut engine, &mut session, json!({"title": "Notes"}));
    let folder = add(&mut engine, &mut session, json!({"title": "Folder"}));
    let second = add(
        &mut engine,
        &mut session,
        json!({"title": "Notes", "parent_id": folder.to_string()}),
    );

    let out = run(&mut engine, &mut session, "get_node", json!({"node_id": "Notes"}));
    assert_eq!(out["ok"], json!(false));
    assert_eq!(out["error_kind"], json!("AmbiguousReference"));
    assert_eq!(
        out["candidates"],
        json!([first.to_string(), second.to_string()])
    );
}

#[test]
fn exact_case_match_beats_case_insensitive_collision() {
    let mut tree = TreeDocument::new("Root");
    let root = tree.root_id();
    let (upper, _) = tree.insert_child(root, NodeDraft::new("Notes"), None).unwrap();
    let (lower, _) = tree.insert_child(root, NodeDraft::new("notes"), None).unwrap();
    let (budget, _) = tree.insert_child(root, NodeDraft::new("Budget"), None).unwrap();

    let resolver = NodeResolver::new(&tree);
    assert_eq!(resolver.resolve("Notes"), Ok(upper));
    assert_eq!(resolver.resolve("notes"), Ok(lower));
    assert_eq!(resolver.resolve("budget"), Ok(budget));

    match resolver.resolve("NOTES") {
        Err(ResolveError::AmbiguousReference { candidates, .. }) => {
            assert_eq!(candidates, vec![upper, lower]);
        }
        other => panic!("expected ambiguity, got {other:?}"),
    }
}

#[test]
fn unknown_reference_is_not_found() {
    let mut engine = ActionExecutor::default();
    let mut session = SessionContext::new();
    let out = run(
        &mut engine,
        &mut session,
        "get_node",
        json!({"node_id": Uuid::new_v4().to_string()}),
    );
    assert_eq!(out["error_kind"], json!("NodeNotFound"));

    let out = run(&mut engine, &mut session, "get_node", json!({"node_id": "Nowhere"}));
    assert_eq!(out["error_kind"], json!("NodeNotFound"));
}

#[test]
fn find_node_by_title_matches_titles_only() {
    let mut engine = ActionExecutor::default();
    let mut session = SessionContext::new();
    let intro = add(&mut engine, &mut session, json!({"title": "Introduction"}));

    let out = run(
        &mut engine,
        &mut session,
        "find_node_by_title",
        json!({"title": "introduction"}),
    );
    assert_eq!(out["ok"], json!(true));
    assert_eq!(out["node"]["id"], json!(intro.to_string()));
    assert_eq!(out["node"]["title"], json!("Introduction"));

    let out = run(
        &mut engine,
        &mut session,
        "find_node_by_title",
        json!({"title": intro.to_string()}),
    );
    assert_eq!(out["error_kind"], json!("NodeNotFound"));

    add(&mut engine, &mut session, json!({"title": "Introduction"}));
    let out = run(
        &mut engine,
        &mut session,
        "find_node_by_title",
        json!({"title": "Introduction", "include_data": true}),
    );
    assert_eq!(out["error_kind"], json!("AmbiguousReference"));
    assert_eq!(out["candidates"].as_array().unwrap().len(), 2);
}

#[test]
fn find_node_by_title_with_data_returns_snapshot() {
    let mut engine = ActionExecutor::default();
    let mut session = SessionContext::new();
    let chapter = add(
        &mut engine,
        &mut session,
        json!({"title": "Chapter", "data": {"Summary": "opening"}}),
    );
    add(
        &mut engine,
        &mut session,
        json!({"title": "Section", "parent_id": chapter.to_string()}),
    );

    let out = run(
        &mut engine,
        &mut session,
        "find_node_by_title",
        json!({"title": "Chapter", "include_data": true}),
    );
    assert_eq!(out["node"]["data"], json!({"Summary": "opening"}));
    assert_eq!(out["node"]["children"].as_array().unwrap().len(), 1);
}

#[test]
fn absent_reference_falls_back_to_selection() {
    let mut engine = ActionExecutor::default();
    let mut session = SessionContext::new();
    let inbox = add(&mut engine, &mut session, json!({"title": "Inbox"}));

    let out = run(&mut engine, &mut session, "get_node", json!({}));
    assert_eq!(out["node"]["id"], json!(engine.tree().root_id().to_string()));

    session.select(inbox);
    let out = run(&mut engine, &mut session, "get_node", json!({"node_id": null}));
    assert_eq!(out["node"]["id"], json!(inbox.to_string()));
}
