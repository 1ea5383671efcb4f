mod common;

use common::wechat_script;
use relay_engine::{
    AccessibilityHost, EventKind, NodeAction, Script, ScriptError, ScriptedHost, ShareRequest,
};

const SCRIPT: &str = r#"{
    "start": "home",
    "launch": "list",
    "screens": {
        "home": { "package": "com.android.launcher", "root": {} },
        "list": {
            "package": "com.tencent.mm",
            "root": {
                "children": [
                    { "class": "android.widget.TextView", "text": "Alice",
                      "clickable": true, "on_click": { "goto": "home" } },
                    { "class": "android.widget.EditText", "editable": true }
                ]
            },
            "on_back": { "goto": "home" }
        }
    }
}"#;

#[test]
fn json_script_drives_the_host() {
    let host = ScriptedHost::new(Script::from_json(SCRIPT).unwrap()).unwrap();
    assert_eq!(host.active_window().unwrap().package(), "com.android.launcher");

    host.launch(&relay_engine::TargetProfile::default().launch_target());
    let tree = host.active_window().unwrap();
    assert_eq!(tree.package(), "com.tencent.mm");
    assert_eq!(tree.len(), 3);

    let field = tree.preorder()[2];
    assert!(host.perform(tree.node(field).handle, &NodeAction::SetText("hey".into())));
    let retyped = host.active_window().unwrap();
    assert_eq!(retyped.node(field).text.as_deref(), Some("hey"));

    assert!(host.navigate_back());
    assert_eq!(host.current_screen(), "home");
    let kinds: Vec<EventKind> = host.take_events().into_iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::WindowStateChanged,
            EventKind::WindowContentChanged,
            EventKind::WindowStateChanged,
        ]
    );
    assert!(host.take_events().is_empty());
}

#[test]
fn unknown_screen_references_are_rejected() {
    let broken = SCRIPT.replace(r#""on_back": { "goto": "home" }"#, r#""on_back": { "goto": "nowhere" }"#);
    assert!(matches!(
        Script::from_json(&broken),
        Err(ScriptError::UnknownScreen(name)) if name == "nowhere"
    ));
    assert!(matches!(
        Script::from_json("{\"start\": 1}"),
        Err(ScriptError::Parse(_))
    ));
}

#[test]
fn shares_are_refused_without_a_share_screen() {
    let request = ShareRequest {
        target_package: "com.tencent.mm".into(),
        path: "/p.jpg".into(),
        mime_type: "image/*".into(),
    };
    let host = ScriptedHost::new(Script::from_json(SCRIPT).unwrap()).unwrap();
    assert!(!host.share(&request));

    let host = ScriptedHost::new(wechat_script(&["Alice"])).unwrap();
    assert!(host.share(&request));
    assert_eq!(host.current_screen(), "chooser");
    assert!(host.file_exists(std::path::Path::new("/p.jpg")));
}
