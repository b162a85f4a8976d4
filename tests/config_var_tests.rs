mod common;

use common::instance;
use serde_json::{Map, json};

fn modes(sent: &[serde_json::Value]) -> Vec<String> {
    sent.iter()
        .map(|payload| payload["_mode"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn test_first_set_is_init_then_update() {
    let (mut chat, channel, _) = instance(true);
    chat.set_config("show_time", json!(false)).unwrap();
    chat.set_config("show_time", json!(true)).unwrap();
    chat.set_config("show_time", json!(false)).unwrap();

    let sent = channel.take_sent();
    assert_eq!(modes(&sent), vec!["init", "update", "update"]);
    assert_eq!(sent[0]["key"], "show_time");
    assert_eq!(sent[0]["instance"], "base");
    assert!(!chat.config().as_bool("show_time"));
}

#[test]
fn test_update_after_intervening_load() {
    let (mut chat, channel, _) = instance(true);
    chat.set_config("loading", json!(true)).unwrap();

    let mut config = Map::new();
    config.insert("loading".to_string(), json!(false));
    chat.load_config(&config);
    assert!(!chat.config().as_bool("loading"));

    chat.set_config("loading", json!(true)).unwrap();
    assert_eq!(modes(&channel.take_sent()), vec!["init", "update"]);
}

#[test]
fn test_load_marks_initialized_without_sending() {
    let (mut chat, channel, _) = instance(true);
    let mut config = Map::new();
    config.insert("show_index".to_string(), json!(true));
    chat.load_config(&config);
    assert!(channel.sent().is_empty());
    assert!(chat.config().var("show_index").unwrap().is_initialized());

    chat.set_config("show_index", json!(false)).unwrap();
    assert_eq!(modes(&channel.take_sent()), vec!["update"]);
}

#[test]
fn test_variables_are_independent() {
    let (mut chat, channel, _) = instance(true);
    chat.set_config("show_time", json!(false)).unwrap();
    chat.set_config("show_index", json!(true)).unwrap();
    assert_eq!(modes(&channel.take_sent()), vec!["init", "init"]);
}

#[tokio::test]
async fn test_subscriber_is_notified_of_local_set() {
    let (mut chat, _, _) = instance(true);
    let mut rx = chat.config().subscribe("enable_autocomplete").unwrap();
    assert_eq!(*rx.borrow(), json!(true));

    chat.set_config("enable_autocomplete", json!(false)).unwrap();
    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow(), json!(false));
}
