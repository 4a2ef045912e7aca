//! Spoken announcements.
//!
//! The session never talks to a speaker. It attaches [`Announcement`]s to
//! each update and the caller hands them to a [`VoiceChannel`].

use serde::Serialize;

use super::update::NavigationUpdate;

/// How an announcement is queued by the voice channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnouncementPriority {
    /// Interrupt whatever is playing.
    FlushNow,
    /// Play after anything already queued.
    Enqueue,
}

/// A piece of text to speak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Announcement {
    pub text: String,
    pub priority: AnnouncementPriority,
}

impl Announcement {
    pub fn flush_now(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            priority: AnnouncementPriority::FlushNow,
        }
    }

    pub fn enqueue(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            priority: AnnouncementPriority::Enqueue,
        }
    }
}

/// Text-to-speech output.
pub trait VoiceChannel: Send + Sync {
    fn announce(&self, text: &str, priority: AnnouncementPriority);
}

/// Speak every announcement attached to `update`, in order.
pub fn dispatch_announcements(update: &NavigationUpdate, channel: &dyn VoiceChannel) {
    for announcement in &update.announcements {
        channel.announce(&announcement.text, announcement.priority);
    }
}
