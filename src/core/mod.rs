pub mod config;
pub mod feed;
pub mod logging;
pub mod migration;
pub mod notifications;
pub mod platform;
pub mod storage;

use std::collections::BTreeMap;

use feed::FeedService;
use migration::MigrationService;
use notifications::NotificationService;
use storage::StorageService;

#[derive(Debug, Clone, Default)]
pub struct AppServices {
    feed: FeedService,
    notifications: NotificationService,
    migration: MigrationService,
    storage: StorageService,
}

impl AppServices {
    pub fn health_report(&self) -> BTreeMap<String, String> {
        let mut report = BTreeMap::new();
        report.insert(self.feed.name().to_string(), self.feed.status().to_string());
        report.insert(
            self.notifications.name().to_string(),
            self.notifications.status().to_string(),
        );
        report.insert(
            self.migration.name().to_string(),
            self.migration.status().to_string(),
        );
        report.insert(
            self.storage.name().to_string(),
            self.storage.status().to_string(),
        );
        report
    }
}
