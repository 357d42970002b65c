use redis_trib::core::prompt::{Prompter, ScriptedPrompter};

#[tokio::test]
async fn test_confirm_only_accepts_literal_yes() {
    let mut p = ScriptedPrompter::new(["yes"]);
    assert!(p.confirm("proceed?"));
    let mut p = ScriptedPrompter::new(["y"]);
    assert!(!p.confirm("proceed?"));
    let mut p = ScriptedPrompter::new(["no"]);
    assert!(!p.confirm("proceed?"));
    // Exhausted input never confirms a destructive action.
    let mut p = ScriptedPrompter::new(Vec::<String>::new());
    assert!(!p.confirm("proceed?"));
}

#[tokio::test]
async fn test_ask_int_enforces_range() {
    let mut p = ScriptedPrompter::new(["0", "20000", "100"]);
    assert_eq!(p.ask_int("slots?", 1, 16384), Some(100));
    let mut p = ScriptedPrompter::new(["nope"]);
    assert_eq!(p.ask_int("slots?", 1, 16384), None);
}

#[tokio::test]
async fn test_ask_ids_terminators() {
    let mut p = ScriptedPrompter::new(["id1", "id2", "done"]);
    assert_eq!(p.ask_ids("sources"), vec!["id1", "id2"]);

    let mut p = ScriptedPrompter::new(["id1", "all"]);
    assert_eq!(p.ask_ids("sources"), vec!["all"]);

    let mut p = ScriptedPrompter::new(["done"]);
    assert!(p.ask_ids("sources").is_empty());
}
