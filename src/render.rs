use std::io::{self, Write};

use chrono::{Local, TimeZone};
use console::style;

use crate::story::{FeedEvent, ItemId, StoryRecord};

const PLACEHOLDER: &str = "-";

/// Writes feed events to a terminal (or any writer).
pub struct Renderer<W> {
    out: W,
    color: bool,
}

impl Renderer<io::Stdout> {
    /// Stdout, colored when it is a terminal.
    pub fn stdout(color: bool) -> Self {
        let color = color && console::Term::stdout().features().colors_supported();
        Self::new(io::stdout(), color)
    }
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn render(&mut self, event: &FeedEvent) -> io::Result<()> {
        match event {
            FeedEvent::Story(story) => self.story(story),
            FeedEvent::Invalid(id) => self.invalid(*id),
        }
    }

    /// `HH:MM:SS title id` then the url on its own line.
    pub fn story(&mut self, story: &StoryRecord) -> io::Result<()> {
        let posted_at = Local
            .timestamp_opt(story.time, 0)
            .single()
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| PLACEHOLDER.to_string());
        let title = story.title.as_deref().unwrap_or(PLACEHOLDER);
        let url = story.url.as_deref().unwrap_or(PLACEHOLDER);

        writeln!(
            self.out,
            "{} {} {}",
            style(posted_at).blue().bright().bold().force_styling(self.color),
            style(title).cyan().force_styling(self.color),
            style(story.id).green().bright().bold().force_styling(self.color),
        )?;
        writeln!(self.out, "{url}")?;
        self.out.flush()
    }

    pub fn invalid(&mut self, id: ItemId) -> io::Result<()> {
        write!(
            self.out,
            "\n\n{}\n\n\n",
            style(id).red().force_styling(self.color)
        )?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
