use std::fmt;

/// Upstream item id. Assigned in increasing order as stories are submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A resolved story. `time` is when resolution was attempted, in Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryRecord {
    pub id: ItemId,
    pub title: Option<String>,
    pub url: Option<String>,
    pub time: i64,
}

/// Which source answered for an id, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Structured(StoryRecord),
    Scraped(StoryRecord),
    Exhausted,
}

impl Resolution {
    pub fn into_story(self) -> Option<StoryRecord> {
        match self {
            Resolution::Structured(story) | Resolution::Scraped(story) => Some(story),
            Resolution::Exhausted => None,
        }
    }
}

/// Output of the feed: a story to display or an id that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    Story(StoryRecord),
    Invalid(ItemId),
}
