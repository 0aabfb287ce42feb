use ratatui::style::{Color, Modifier, Style};

/// Theme configuration for the review view
#[derive(Clone, Debug)]
pub struct Theme {
    /// Background color for the editor
    pub background: Color,

    /// Foreground (text) color for the status bar
    pub status_bar_fg: Color,

    /// Background color for the status bar
    pub status_bar_bg: Color,

    /// Color for the review file name in the status bar
    pub filename_color: Color,

    /// Foreground color for suggested insertions
    pub insert_fg: Color,

    /// Foreground color for suggested deletions
    pub delete_fg: Color,

    /// Foreground color for the edits the caret currently touches
    pub highlight_fg: Color,

    /// Background color for the edits the caret currently touches
    pub highlight_bg: Color,

    /// Color for the glyph standing in for a deleted line break
    pub placeholder_color: Color,

    /// Color for signature blocks
    pub signature_color: Color,

    /// Color for quoted replies
    pub quote_color: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::Reset,
            status_bar_fg: Color::White,
            status_bar_bg: Color::Blue,
            filename_color: Color::LightYellow,
            insert_fg: Color::Green,
            delete_fg: Color::Red,
            highlight_fg: Color::Black,
            highlight_bg: Color::LightYellow,
            placeholder_color: Color::DarkGray,
            signature_color: Color::Gray,
            quote_color: Color::DarkGray,
        }
    }
}

impl Theme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_bar_style(&self) -> Style {
        Style::default()
            .fg(self.status_bar_fg)
            .bg(self.status_bar_bg)
    }

    pub fn filename_style(&self) -> Style {
        Style::default().fg(self.filename_color)
    }

    /// Inserted text is underlined so it stays distinguishable without color.
    pub fn insert_style(&self) -> Style {
        Style::default()
            .fg(self.insert_fg)
            .add_modifier(Modifier::UNDERLINED)
    }

    pub fn delete_style(&self) -> Style {
        Style::default()
            .fg(self.delete_fg)
            .add_modifier(Modifier::CROSSED_OUT)
    }

    pub fn highlight_style(&self) -> Style {
        Style::default().fg(self.highlight_fg).bg(self.highlight_bg)
    }

    pub fn placeholder_style(&self) -> Style {
        Style::default().fg(self.placeholder_color)
    }

    pub fn signature_style(&self) -> Style {
        Style::default()
            .fg(self.signature_color)
            .add_modifier(Modifier::DIM)
    }

    pub fn quote_style(&self) -> Style {
        Style::default().fg(self.quote_color)
    }
}
