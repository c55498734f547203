//! Test doubles that record every platform call.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::notifications::sink::{
    BadgeIcon, BadgeSink, LinkOpener, NotificationOptions, NotificationSink, PlatformError,
};
use crate::core::storage::Article;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    Cleared(String),
    Created(String, NotificationOptions),
}

#[derive(Debug, Default)]
pub struct RecordingNotificationSink {
    events: Mutex<Vec<NotificationEvent>>,
    fail: bool,
}

impl RecordingNotificationSink {
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().expect("events lock").clone()
    }

    pub fn created(&self) -> Vec<NotificationOptions> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                NotificationEvent::Created(_, options) => Some(options),
                NotificationEvent::Cleared(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotificationSink {
    async fn clear(&self, id: &str) -> Result<(), PlatformError> {
        if self.fail {
            return Err(PlatformError::Notification("clear refused".to_string()));
        }
        self.events
            .lock()
            .expect("events lock")
            .push(NotificationEvent::Cleared(id.to_string()));
        Ok(())
    }

    async fn create(&self, id: &str, options: &NotificationOptions) -> Result<(), PlatformError> {
        if self.fail {
            return Err(PlatformError::Notification("create refused".to_string()));
        }
        self.events
            .lock()
            .expect("events lock")
            .push(NotificationEvent::Created(id.to_string(), options.clone()));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingBadgeSink {
    texts: Mutex<Vec<String>>,
    icons: Mutex<Vec<BadgeIcon>>,
}

impl RecordingBadgeSink {
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().expect("texts lock").clone()
    }

    pub fn icons(&self) -> Vec<BadgeIcon> {
        self.icons.lock().expect("icons lock").clone()
    }
}

#[async_trait]
impl BadgeSink for RecordingBadgeSink {
    async fn set_text(&self, text: &str) -> Result<(), PlatformError> {
        self.texts.lock().expect("texts lock").push(text.to_string());
        Ok(())
    }

    async fn set_icon(&self, icon: BadgeIcon) -> Result<(), PlatformError> {
        self.icons.lock().expect("icons lock").push(icon);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingLinkOpener {
    opened: Mutex<Vec<String>>,
}

impl RecordingLinkOpener {
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().expect("opened lock").clone()
    }
}

#[async_trait]
impl LinkOpener for RecordingLinkOpener {
    async fn open(&self, url: &str) -> Result<(), PlatformError> {
        self.opened.lock().expect("opened lock").push(url.to_string());
        Ok(())
    }
}

/// Eleven unread articles, newest first.
pub fn mock_articles() -> Vec<Article> {
    let titles = [
        "New App Makes Converting Text Documents on Ubuntu Easier",
        "Microsoft Announce WSL Updates, Including New Settings App",
        "Firefox 126 Released for Linux &amp; Windows",
        "IBM&#8217;s Iconic ThinkPad Turns 30",
        "Ubuntu 24.10 Daily Builds Now Available",
        "GNOME&#8217;s New Wallpapers Are Here",
        "Linux Mint 22 Beta Is Coming Soon",
        "How to Install the Latest Mesa Drivers",
        "Thunderbird Gets a Native Exchange Sync",
        "KDE Plasma 6.1 &#8211; What&#8217;s New",
        "Ubuntu Pro Is Now Free for 5 Machines",
    ];
    titles
        .iter()
        .enumerate()
        .map(|(index, title)| {
            let id = 148_400 - index as i64 * 7;
            Article {
                id,
                date: format!("2024-05-{:02}T{:02}:00:00", 25 - index / 3, 20 - index % 3),
                title: title.to_string(),
                link: format!("https://example.com/2024/05/article-{id}"),
                thumbnail: (index == 1).then(|| {
                    "https://example.com/wp-content/uploads/2024/05/windows-tux-thumbnail-350x200.jpg"
                        .to_string()
                }),
                unread: true,
            }
        })
        .collect()
}
