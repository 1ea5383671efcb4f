//! Probes of the media hand-off sub-flow.
//!
//! The hand-off leaves the chat surface: the platform's share mechanism opens a
//! chooser (system UI) or the target app's own contact picker. Each probe acts on
//! whatever surface is showing and reports `Absent` while the expected surface has
//! not appeared yet; the orchestrator re-probes on the next surface notification.

use std::path::Path;

use relay_core::{Step, StepOutcome};
use relay_logging::{relay_info, relay_warn};

use crate::steps::{activate_named, dispatched};
use crate::{AccessibilityHost, Locator, ShareRequest, TargetProfile};

pub(crate) fn execute<H: AccessibilityHost + ?Sized>(
    host: &H,
    locator: &Locator<'_, H>,
    profile: &TargetProfile,
    step: &Step,
) -> StepOutcome {
    match step {
        Step::StartShare { path, kind } => {
            if !host.file_exists(Path::new(path)) {
                relay_warn!("media file {path} is missing; skipping hand-off");
                return StepOutcome::FileMissing;
            }
            let request = ShareRequest {
                target_package: profile.package.clone(),
                path: path.clone(),
                mime_type: kind.mime_type().to_string(),
            };
            relay_info!("handing off {path} ({})", request.mime_type);
            dispatched(host.share(&request))
        }
        Step::PickShareTarget => pick_share_target(locator, profile),
        Step::EnterShareRecipient { name } => {
            let Some(screen) = locator
                .screen()
                .filter(|s| s.package() == profile.package)
            else {
                return StepOutcome::Absent;
            };
            match screen.editable_fields(&profile.edit_text_class).first() {
                Some(id) => dispatched(locator.set_text(screen.node(*id), name)),
                None => StepOutcome::Absent,
            }
        }
        Step::SelectShareRecipient { name } => match locator
            .screen()
            .filter(|s| s.package() == profile.package)
        {
            Some(screen) => activate_named(locator, &screen, name),
            None => StepOutcome::Absent,
        },
        Step::ConfirmShare => confirm(locator, profile),
        _ => StepOutcome::Rejected,
    }
}

fn pick_share_target<H: AccessibilityHost + ?Sized>(
    locator: &Locator<'_, H>,
    profile: &TargetProfile,
) -> StepOutcome {
    let Some(screen) = locator.screen() else {
        return StepOutcome::Absent;
    };
    let target = screen
        .find_by_text(&profile.chooser_label)
        .into_iter()
        .find_map(|id| screen.nearest_activatable_ancestor(id));
    if let Some(id) = target {
        return dispatched(locator.activate(screen.node(id)));
    }
    // The platform may route straight into the target app's contact picker.
    let picker_open = screen.package() == profile.package
        && !screen.editable_fields(&profile.edit_text_class).is_empty();
    if picker_open {
        StepOutcome::Skipped
    } else {
        StepOutcome::Absent
    }
}

fn confirm<H: AccessibilityHost + ?Sized>(
    locator: &Locator<'_, H>,
    profile: &TargetProfile,
) -> StepOutcome {
    let Some(screen) = locator
        .screen()
        .filter(|s| s.package() == profile.package)
    else {
        return StepOutcome::Absent;
    };
    let candidates: Vec<_> = screen
        .find_by_text(&profile.share_confirm_label)
        .into_iter()
        .filter_map(|id| screen.nearest_activatable_ancestor(id))
        .filter(|id| !screen.node(*id).editable)
        .collect();
    let preferred = candidates
        .iter()
        .find(|id| screen.node(**id).class_name == profile.button_class)
        .or_else(|| candidates.first());
    match preferred {
        Some(id) => dispatched(locator.activate(screen.node(*id))),
        None => StepOutcome::Absent,
    }
}
