#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use relay_core::{Delivery, Failure, MessageKind, TaskEvent, TaskReport};
use relay_engine::{
    AutomationConfig, AutomationService, NodeSpec, Rect, ReportSink, ScreenSpec, Script,
    ScriptedHost, ServiceEvent, Transition,
};

pub const TARGET: &str = "com.tencent.mm";
pub const CHOOSER: &str = "android";

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(relay_logging::initialize_for_tests);
}

#[derive(Clone, Default)]
pub struct TestSink {
    events: Arc<Mutex<Vec<ServiceEvent>>>,
}

impl TestSink {
    pub fn take(&self) -> Vec<ServiceEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }

    pub fn task_events(&self) -> Vec<TaskEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                ServiceEvent::Task(event) => Some(event.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn harvests(&self) -> Vec<Vec<String>> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                ServiceEvent::HarvestCompleted { contacts } => Some(contacts.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn deliveries(&self) -> Vec<(String, usize, MessageKind)> {
        self.task_events()
            .into_iter()
            .filter_map(|e| match e {
                TaskEvent::Delivered(Delivery {
                    recipient,
                    index,
                    kind,
                }) => Some((recipient, index, kind)),
                _ => None,
            })
            .collect()
    }

    pub fn skipped(&self) -> Vec<Failure> {
        self.task_events()
            .into_iter()
            .filter_map(|e| match e {
                TaskEvent::Skipped(failure) => Some(failure),
                _ => None,
            })
            .collect()
    }

    pub fn finished(&self) -> Option<TaskReport> {
        self.task_events().into_iter().find_map(|e| match e {
            TaskEvent::Finished(report) => Some(report),
            _ => None,
        })
    }
}

impl ReportSink for TestSink {
    fn emit(&self, event: ServiceEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn service(host: ScriptedHost) -> (AutomationService<ScriptedHost>, TestSink) {
    init_logging();
    let sink = TestSink::default();
    let service = AutomationService::new(host, AutomationConfig::default(), Box::new(sink.clone()));
    (service, sink)
}

fn label(text: &str) -> NodeSpec {
    NodeSpec::new("android.widget.TextView").text(text)
}

/// Clickable row holding a single label.
fn row(text: &str, target: &str) -> NodeSpec {
    NodeSpec::new("android.widget.LinearLayout")
        .clickable()
        .goto(target)
        .child(label(text))
}

fn contact(name: &str) -> NodeSpec {
    NodeSpec::new("android.widget.TextView")
        .id("com.tencent.mm:id/kbq")
        .text(name)
}

fn contact_page(names: &[&str]) -> NodeSpec {
    let list = names.iter().fold(
        NodeSpec::new("android.widget.ListView")
            .id("com.tencent.mm:id/mg")
            .bounds(Rect::new(0, 200, 720, 1400)),
        |list, name| list.child(contact(name)),
    );
    NodeSpec::new("android.widget.FrameLayout").child(list)
}

fn chat(name: &str) -> ScreenSpec {
    ScreenSpec::new(
        TARGET,
        NodeSpec::new("android.widget.FrameLayout")
            .child(label(name))
            .child(NodeSpec::edit_text())
            .child(
                NodeSpec::new("android.widget.Button")
                    .id("com.tencent.mm:id/bql")
                    .text("发送")
                    .clickable(),
            ),
    )
    .on_back(Transition::Goto("search".into()))
}

/// The target app as the tests see it: a launcher, the main screen, recipient
/// search, one chat per known contact, three contact list pages and the share flow.
///
/// `known` lists the contacts the search screen can find.
pub fn wechat_script(known: &[&str]) -> Script {
    let main = NodeSpec::new("android.widget.FrameLayout")
        .child(
            NodeSpec::new("android.widget.ImageButton")
                .id("com.tencent.mm:id/jha")
                .desc("搜索")
                .clickable()
                .goto("search"),
        )
        .child(row("通讯录", "contacts_1"));

    let search = known.iter().fold(
        NodeSpec::new("android.widget.FrameLayout").child(NodeSpec::edit_text()),
        |root, name| root.child(row(name, &format!("chat_{name}"))),
    );
    let share_pick = known.iter().fold(
        NodeSpec::new("android.widget.FrameLayout").child(NodeSpec::edit_text()),
        |root, name| root.child(row(name, "share_confirm")),
    );

    let mut script = Script::new("launcher")
        .launch_into("main")
        .share_into("chooser")
        .screen(
            "launcher",
            ScreenSpec::new("com.android.launcher", NodeSpec::default()),
        )
        .screen("main", ScreenSpec::new(TARGET, main))
        .screen(
            "search",
            ScreenSpec::new(TARGET, search).on_back(Transition::Goto("main".into())),
        )
        .screen(
            "contacts_1",
            ScreenSpec::new(TARGET, contact_page(&["新的朋友", "群聊", "Alice", "bob"]))
                .on_swipe("contacts_2"),
        )
        .screen(
            "contacts_2",
            ScreenSpec::new(TARGET, contact_page(&["bob", "Carol", "#hash"]))
                .on_swipe("contacts_3"),
        )
        .screen(
            "contacts_3",
            ScreenSpec::new(TARGET, contact_page(&["Carol", "Dave", "张三"])),
        )
        .screen(
            "chooser",
            ScreenSpec::new(
                CHOOSER,
                NodeSpec::default()
                    .child(row("发送给朋友", "share_pick"))
                    .child(label("其他应用")),
            ),
        )
        .screen("share_pick", ScreenSpec::new(TARGET, share_pick))
        .screen(
            "share_confirm",
            ScreenSpec::new(
                TARGET,
                NodeSpec::default().child(label("发送给:")).child(
                    NodeSpec::new("android.widget.Button")
                        .text("发送")
                        .clickable()
                        .on_click(Transition::ReturnFromShare),
                ),
            ),
        );
    for name in known {
        script = script.screen(format!("chat_{name}"), chat(name));
    }
    script
}

pub fn wechat_host(known: &[&str]) -> ScriptedHost {
    ScriptedHost::new(wechat_script(known)).expect("script is consistent")
}
