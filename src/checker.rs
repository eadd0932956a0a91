use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{
    AppConfig, AvailabilityMode, ChangeNotifyPolicy, NavErrorPolicy, SelectorConfig,
};
use crate::driver::PageDriver;
use crate::models::{Observation, WatchItem};
use crate::notifiers::Notifier;
use crate::utils::error::AppError;

/// Everything the sweep needs to know from the config, copied out so the
/// checker holds no borrow on the item tables it mutates.
#[derive(Debug, Clone)]
pub struct CheckPolicy {
    pub notification_level: u8,
    pub nav_error: NavErrorPolicy,
    pub change_notify: ChangeNotifyPolicy,
    pub interval: Duration,
    pub selectors: SelectorConfig,
}

impl CheckPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        CheckPolicy {
            notification_level: config.general.notification_level,
            nav_error: config.general.nav_error_policy,
            change_notify: config.general.change_notify_policy,
            interval: Duration::from_secs(config.general.interval),
            selectors: config.selectors.clone(),
        }
    }

    fn error_notifications_enabled(&self) -> bool {
        self.notification_level >= 1
    }

    fn change_notifications_enabled(&self) -> bool {
        match self.change_notify {
            ChangeNotifyPolicy::WhenEnabled => self.notification_level >= 1,
            ChangeNotifyPolicy::VerboseOnly => self.notification_level >= 3,
        }
    }

    fn dump_page_source(&self) -> bool {
        self.notification_level >= 3
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Unchanged,
    Updated { notified: bool },
    Skipped { reason: SkipReason, notified: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Navigation,
    PriceLookup,
    AvailabilityLookup,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub checked: usize,
    pub updated: Vec<String>,
    pub skipped: usize,
    pub notifications_sent: usize,
}

/// Sweeps the configured items through an already-open browser session.
pub struct ItemChecker<'a> {
    driver: &'a dyn PageDriver,
    notifier: Option<&'a dyn Notifier>,
    policy: CheckPolicy,
}

impl<'a> ItemChecker<'a> {
    pub fn new(
        driver: &'a dyn PageDriver,
        notifier: Option<&'a dyn Notifier>,
        policy: CheckPolicy,
    ) -> Self {
        ItemChecker {
            driver,
            notifier,
            policy,
        }
    }

    /// Check every item once, mutating items in place as tracked fields
    /// change. Per-item failures skip that item; notification send failures
    /// and navigation failures under the abort policy end the sweep.
    pub async fn run<'i, I>(&self, items: I) -> Result<RunReport, AppError>
    where
        I: IntoIterator<Item = (&'i String, &'i mut WatchItem)>,
    {
        let mut report = RunReport::default();
        let mut first = true;

        for (id, item) in items {
            if !first && !self.policy.interval.is_zero() {
                debug!(
                    "Waiting {}s before the next item",
                    self.policy.interval.as_secs()
                );
                tokio::time::sleep(self.policy.interval).await;
            }
            first = false;

            info!("Checking \"{}\": {}", item.name, item.url);
            report.checked += 1;

            match self.check_item(item).await? {
                ItemOutcome::Unchanged => {}
                ItemOutcome::Updated { notified } => {
                    report.updated.push(id.clone());
                    if notified {
                        report.notifications_sent += 1;
                    }
                }
                ItemOutcome::Skipped { reason, notified } => {
                    debug!("Skipping \"{}\" ({:?})", item.name, reason);
                    report.skipped += 1;
                    if notified {
                        report.notifications_sent += 1;
                    }
                }
            }
        }

        Ok(report)
    }

    async fn check_item(&self, item: &mut WatchItem) -> Result<ItemOutcome, AppError> {
        if let Err(e) = self.driver.navigate(&item.url).await {
            warn!("Navigation to {} failed: {}", item.url, e);
            let notified = self.notify_error("page doesn't exist", item).await?;
            return match self.policy.nav_error {
                NavErrorPolicy::Continue => Ok(ItemOutcome::Skipped {
                    reason: SkipReason::Navigation,
                    notified,
                }),
                NavErrorPolicy::Abort => Err(AppError::Driver(e)),
            };
        }

        let price = match self.driver.find_text(&self.policy.selectors.price).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Price lookup failed for \"{}\": {}", item.name, e);
                if self.policy.dump_page_source() {
                    match self.driver.page_source().await {
                        Ok(source) => info!("Page source for {}:\n{}", item.url, source),
                        Err(e) => warn!("Could not fetch the page source: {}", e),
                    }
                }
                let notified = self.notify_error("unable to get the price", item).await?;
                return Ok(ItemOutcome::Skipped {
                    reason: SkipReason::PriceLookup,
                    notified,
                });
            }
        };

        let availability = match self.find_availability().await {
            Ok(text) => text,
            Err(e) => {
                warn!("Availability lookup failed for \"{}\": {}", item.name, e);
                let notified = self
                    .notify_error("unable to get the availability", item)
                    .await?;
                return Ok(ItemOutcome::Skipped {
                    reason: SkipReason::AvailabilityLookup,
                    notified,
                });
            }
        };

        let observed = Observation {
            price,
            availability,
        };
        if !item.apply(&observed) {
            debug!("No tracked change for \"{}\"", item.name);
            return Ok(ItemOutcome::Unchanged);
        }

        info!(
            "\"{}\" changed: price {}, availability {}",
            item.name, observed.price, observed.availability
        );
        let mut notified = false;
        if let Some(notifier) = self.notifier {
            if self.policy.change_notifications_enabled() {
                notifier
                    .notify(
                        &observed.availability,
                        &format!("[gpw] {}: CHF {}", item.name, observed.price),
                        &item.url,
                    )
                    .await?;
                notified = true;
            }
        }

        Ok(ItemOutcome::Updated { notified })
    }

    async fn find_availability(&self) -> Result<String, crate::driver::DriverError> {
        match self.policy.selectors.availability_mode {
            AvailabilityMode::Single => {
                self.driver
                    .find_text(&self.policy.selectors.availability)
                    .await
            }
            AvailabilityMode::Collection => {
                self.driver
                    .find_all_text(&self.policy.selectors.availability)
                    .await
            }
        }
    }

    async fn notify_error(&self, message: &str, item: &WatchItem) -> Result<bool, AppError> {
        if let Some(notifier) = self.notifier {
            if self.policy.error_notifications_enabled() {
                notifier
                    .notify(message, &format!("[gpw] {}", item.name), &item.url)
                    .await?;
                return Ok(true);
            }
        }
        Ok(false)
    }
}
