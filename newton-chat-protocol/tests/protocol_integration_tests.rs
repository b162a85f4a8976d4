//! End-to-end checks across the message model, segment parser and wire types.

use newton_chat_protocol::{
    ChatMessage, ClientRequest, KernelMessage, KernelOperation, MessagePartType, MessageTarget,
    MessageType, OptionListKind, ReuseStamp, extract_options, split_unified_message,
    stamp_reuse_metadata,
};
use serde_json::json;

#[test]
fn test_every_target_survives_the_wire() {
    for target in MessageTarget::ALL {
        let message = ChatMessage::new("hi", MessageType::User, target);
        let request = ClientRequest::message("base", message);
        let payload = serde_json::to_value(&request).unwrap();

        let echoed = json!({"operation": "reply", "instance": "base", "message": payload["message"]});
        match KernelMessage::decode(&echoed).unwrap().operation {
            KernelOperation::Reply(decoded) => assert_eq!(decoded.target(), target),
            other => panic!("Expected Reply, got {:?}", other),
        }
    }
}

#[test]
fn test_bot_reply_with_options_and_code() {
    let text = "Pick a dataset:\n####ol#:\n- iris::bot::Iris flowers\n- Titanic\n####code#:\nimport pandas as pd";
    let parts = split_unified_message(text);
    let kinds: Vec<_> = parts.iter().map(|part| part.part_type).collect();
    assert_eq!(
        kinds,
        vec![MessagePartType::Text, MessagePartType::Ol, MessagePartType::Code]
    );

    let list = &parts[1];
    assert!(list.part_type.is_option_list());
    let options = extract_options(&list.text, OptionListKind::Ordered);
    assert_eq!(options[0].key, "iris");
    assert_eq!(options[0].label, "1. Iris flowers");
    assert_eq!(options[1].label, "2. Titanic");
}

#[test]
fn test_reused_build_message_detects_edits() {
    let message = ChatMessage::new(
        "####code#:\ndf = pd.read_csv('a.csv')",
        MessageType::Bot,
        MessageTarget::Build,
    );
    let stamped = stamp_reuse_metadata(&message, "base");
    let stamp = ReuseStamp::find(&stamped).unwrap();
    assert_eq!(stamp.id, message.id);
    assert_eq!(ReuseStamp::is_current(&stamped), Some(true));

    let edited = stamped.replace("a.csv", "b.csv");
    assert_eq!(ReuseStamp::is_current(&edited), Some(false));
}
