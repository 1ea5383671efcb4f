use relay_core::{Step, StepOutcome};
use relay_logging::{relay_debug, relay_warn};

use crate::{share, AccessibilityHost, Locator, NodeId, Screen, TargetProfile, UiNode};

/// Runs one orchestrator [`Step`] against a fresh snapshot.
pub struct StepExecutor<'a, H: ?Sized> {
    host: &'a H,
    locator: Locator<'a, H>,
    profile: &'a TargetProfile,
}

impl<'a, H: AccessibilityHost + ?Sized> StepExecutor<'a, H> {
    pub fn new(host: &'a H, profile: &'a TargetProfile) -> Self {
        Self {
            host,
            locator: Locator::new(host),
            profile,
        }
    }

    pub fn execute(&self, step: &Step) -> StepOutcome {
        let outcome = match step {
            Step::AwaitTargetForeground => self.await_foreground(),
            Step::OpenSearch => self.open_search(),
            Step::FocusSearchField => self.with_field(First, |node| self.locator.focus(node)),
            Step::TypeSearchQuery { query } => {
                self.with_field(First, |node| self.locator.replace_text(node, query))
            }
            Step::SelectSearchResult { name } => self.select_by_name(name),
            Step::AwaitChatComposer { name } => self.await_composer(name),
            Step::FocusComposer => self.with_field(Last, |node| self.locator.focus(node)),
            Step::TypeMessage { text } => {
                self.with_field(Last, |node| self.locator.replace_text(node, text))
            }
            Step::PressSend => self.press_send(),
            Step::NavigateBack => dispatched(self.locator.navigate_back()),
            Step::StartShare { .. }
            | Step::PickShareTarget
            | Step::EnterShareRecipient { .. }
            | Step::SelectShareRecipient { .. }
            | Step::ConfirmShare => share::execute(self.host, &self.locator, self.profile, step),
        };
        match outcome {
            StepOutcome::Absent => relay_debug!("{}: target not on screen yet", step.name()),
            StepOutcome::Rejected => relay_warn!("{}: platform refused the dispatch", step.name()),
            _ => relay_debug!("{}: {:?}", step.name(), outcome),
        }
        outcome
    }

    fn target_screen(&self) -> Option<Screen> {
        self.locator
            .screen()
            .filter(|screen| screen.package() == self.profile.package)
    }

    fn await_foreground(&self) -> StepOutcome {
        present(self.target_screen().is_some())
    }

    fn open_search(&self) -> StepOutcome {
        let Some(screen) = self.target_screen() else {
            return StepOutcome::Absent;
        };
        let by_id = screen
            .find_by_identifier(&self.profile.search_button_id)
            .into_iter()
            .find(|id| screen.node(*id).clickable);
        let by_label = || {
            screen
                .find_by_text(&self.profile.search_label)
                .into_iter()
                .find(|id| {
                    let node = screen.node(*id);
                    node.clickable
                        && node.content_description.as_deref()
                            == Some(self.profile.search_label.as_str())
                })
        };
        match by_id.or_else(by_label) {
            Some(id) => dispatched(self.locator.activate(screen.node(id))),
            None => StepOutcome::Absent,
        }
    }

    fn with_field(&self, pick: FieldPick, action: impl Fn(&UiNode) -> bool) -> StepOutcome {
        let Some(screen) = self.target_screen() else {
            return StepOutcome::Absent;
        };
        let fields = screen.editable_fields(&self.profile.edit_text_class);
        let chosen = match pick {
            First => fields.first(),
            // The chat composer sits below any search box.
            Last => fields.last(),
        };
        match chosen {
            Some(id) => dispatched(action(screen.node(*id))),
            None => StepOutcome::Absent,
        }
    }

    fn select_by_name(&self, name: &str) -> StepOutcome {
        let Some(screen) = self.target_screen() else {
            return StepOutcome::Absent;
        };
        activate_named(&self.locator, &screen, name)
    }

    /// The chat is ready once an editable field shows and the search surface is
    /// gone: no field still holds the query and no result row for `name` remains.
    fn await_composer(&self, name: &str) -> StepOutcome {
        let Some(screen) = self.target_screen() else {
            return StepOutcome::Absent;
        };
        let fields = screen.editable_fields(&self.profile.edit_text_class);
        let query_showing = fields
            .iter()
            .any(|id| screen.node(*id).text.as_deref() == Some(name));
        present(!fields.is_empty() && !query_showing && named_row(&screen, name).is_none())
    }

    fn press_send(&self) -> StepOutcome {
        let Some(screen) = self.target_screen() else {
            return StepOutcome::Absent;
        };
        let by_id = screen
            .find_by_identifier(&self.profile.send_button_id)
            .into_iter()
            .find(|id| {
                let node = screen.node(*id);
                node.clickable && node.class_name == self.profile.button_class
            });
        let by_label = || {
            screen
                .find_by_text(&self.profile.send_label)
                .into_iter()
                .find(|id| {
                    let node = screen.node(*id);
                    node.clickable && node.text.as_deref() == Some(self.profile.send_label.as_str())
                })
        };
        match by_id.or_else(by_label) {
            Some(id) => dispatched(self.locator.activate(screen.node(id))),
            None => StepOutcome::Absent,
        }
    }
}

#[derive(Clone, Copy)]
enum FieldPick {
    First,
    Last,
}
use FieldPick::{First, Last};

pub(crate) fn dispatched(accepted: bool) -> StepOutcome {
    if accepted {
        StepOutcome::Done
    } else {
        StepOutcome::Rejected
    }
}

pub(crate) fn present(found: bool) -> StepOutcome {
    if found {
        StepOutcome::Done
    } else {
        StepOutcome::Absent
    }
}

/// Activates the row showing `name`. Editable nodes are skipped so a search box
/// holding the same text never matches itself.
pub(crate) fn activate_named<H: AccessibilityHost + ?Sized>(
    locator: &Locator<'_, H>,
    screen: &Screen,
    name: &str,
) -> StepOutcome {
    match named_row(screen, name) {
        Some(id) => dispatched(locator.activate(screen.node(id))),
        None => StepOutcome::Absent,
    }
}

fn named_row(screen: &Screen, name: &str) -> Option<NodeId> {
    screen
        .find_by_text(name)
        .into_iter()
        .filter(|id| !screen.node(*id).editable)
        .find_map(|id| screen.nearest_activatable_ancestor(id))
        .filter(|id| !screen.node(*id).editable)
}
