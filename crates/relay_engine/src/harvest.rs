use relay_core::HarvestAccumulator;
use relay_logging::{relay_debug, relay_info, relay_warn};

use crate::{AccessibilityHost, HarvestSettings, Locator, TargetProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestStage {
    /// Waiting for the launched app before clicking the contacts tab.
    OpeningContacts,
    Scanning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestStep {
    /// Call [`HarvestSession::step`] again after the delay.
    Continue { delay_ms: u64 },
    /// Sorted, deduplicated contact names.
    Finished(Vec<String>),
}

/// One contact sync: launch, open the contacts tab, then scroll and accumulate.
#[derive(Debug)]
pub struct HarvestSession {
    settings: HarvestSettings,
    stage: HarvestStage,
    acc: HarvestAccumulator,
    iteration: u32,
}

impl HarvestSession {
    pub fn new(settings: HarvestSettings) -> Self {
        Self {
            settings,
            stage: HarvestStage::OpeningContacts,
            acc: HarvestAccumulator::new(),
            iteration: 0,
        }
    }

    pub fn stage(&self) -> HarvestStage {
        self.stage
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn collected(&self) -> usize {
        self.acc.len()
    }

    /// Launches the target app. Returns the delay before the first [`Self::step`].
    pub fn begin<H: AccessibilityHost + ?Sized>(&mut self, host: &H, profile: &TargetProfile) -> u64 {
        relay_info!("contact sync: launching {}", profile.package);
        host.launch(&profile.launch_target());
        self.settings.tab_open_ms
    }

    pub fn step<H: AccessibilityHost + ?Sized>(
        &mut self,
        locator: &Locator<'_, H>,
        profile: &TargetProfile,
    ) -> HarvestStep {
        match self.stage {
            HarvestStage::OpeningContacts => {
                self.open_contacts_tab(locator, profile);
                self.stage = HarvestStage::Scanning;
                HarvestStep::Continue {
                    delay_ms: self.settings.start_delay_ms,
                }
            }
            HarvestStage::Scanning => self.scan(locator, profile),
        }
    }

    fn open_contacts_tab<H: AccessibilityHost + ?Sized>(
        &self,
        locator: &Locator<'_, H>,
        profile: &TargetProfile,
    ) {
        let Some(screen) = locator.screen() else {
            relay_warn!("contacts tab: no active window");
            return;
        };
        let tab = screen
            .find_by_text(&profile.contacts_tab_label)
            .into_iter()
            .find_map(|id| screen.nearest_activatable_ancestor(id));
        match tab {
            Some(id) => {
                locator.activate(screen.node(id));
            }
            // Scanning still runs; the list may already be showing.
            None => relay_warn!("contacts tab {:?} not found", profile.contacts_tab_label),
        }
    }

    fn scan<H: AccessibilityHost + ?Sized>(
        &mut self,
        locator: &Locator<'_, H>,
        profile: &TargetProfile,
    ) -> HarvestStep {
        let names = locator
            .find_by_identifier(&profile.contact_name_id)
            .into_iter()
            .filter_map(|node| node.text)
            // Stored exactly as shown so the search step can match it again.
            .filter(|name| !name.trim().is_empty() && !profile.is_sentinel(name));
        let added = self.acc.absorb(names);
        relay_debug!(
            "scan {}: +{added} (total {}, no growth {})",
            self.iteration,
            self.acc.len(),
            self.acc.no_growth()
        );

        if self.acc.no_growth() >= self.settings.no_growth_threshold {
            relay_info!("contact list exhausted after {} scans", self.iteration + 1);
            return self.finish();
        }
        if !self.scroll(locator, profile) {
            relay_warn!("scroll gesture rejected; stopping harvest");
            return self.finish();
        }
        self.iteration += 1;
        if self.iteration >= self.settings.iteration_budget {
            relay_warn!("harvest iteration budget {} reached", self.settings.iteration_budget);
            return self.finish();
        }
        HarvestStep::Continue {
            delay_ms: self.settings.scroll_settle_ms,
        }
    }

    fn scroll<H: AccessibilityHost + ?Sized>(
        &self,
        locator: &Locator<'_, H>,
        profile: &TargetProfile,
    ) -> bool {
        let s = &self.settings;
        let container = locator
            .find_by_identifier(&profile.contact_list_id)
            .into_iter()
            .map(|node| node.bounds)
            .find(|bounds| !bounds.is_empty());
        match container {
            Some(bounds) => {
                let x = bounds.center_x();
                let at = |fraction: f32| bounds.top + (bounds.height() as f32 * fraction) as i32;
                locator.swipe(x, at(s.swipe_from), x, at(s.swipe_to), s.swipe_duration_ms)
            }
            None => {
                relay_debug!("list container not found; using fallback swipe");
                let [x1, y1, x2, y2] = s.fallback_swipe;
                locator.swipe(x1, y1, x2, y2, s.swipe_duration_ms)
            }
        }
    }

    fn finish(&mut self) -> HarvestStep {
        let acc = std::mem::take(&mut self.acc);
        HarvestStep::Finished(acc.into_sorted())
    }
}
