//! Terminal front-end for the presentation contract.

use std::io;

use ratatui::backend::Backend;
use ratatui::Terminal;
use relstrength_core::{ChartFrame, PresentationAdapter, Toggle, ToggleCallback, ViewOptions};

use crate::app::Status;
use crate::theme::Theme;
use crate::ui;

/// Draws frames into a ratatui terminal and forwards toggles to its callbacks.
pub struct TerminalAdapter<B: Backend> {
    terminal: Terminal<B>,
    theme: Theme,
    status: Option<Status>,
    callbacks: Vec<ToggleCallback>,
}

impl<B: Backend> TerminalAdapter<B> {
    pub fn new(terminal: Terminal<B>) -> Self {
        Self {
            terminal,
            theme: Theme::default(),
            status: None,
            callbacks: Vec::new(),
        }
    }

    /// Footer message drawn with the next render.
    pub fn set_status(&mut self, status: Option<Status>) {
        self.status = status;
    }

    /// Report a user toggle to every registered callback.
    pub fn dispatch(&mut self, toggle: Toggle) {
        for cb in &mut self.callbacks {
            cb(toggle);
        }
    }

    /// Draw a message in place of the chart.
    pub fn render_message(&mut self, message: &str) -> io::Result<()> {
        let theme = self.theme;
        let status = self.status.as_ref();
        self.terminal
            .draw(|f| ui::draw_message(f, message, status, &theme))?;
        Ok(())
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal<B> {
        &mut self.terminal
    }
}

impl<B: Backend> PresentationAdapter for TerminalAdapter<B> {
    type Error = io::Error;

    fn render(&mut self, frame: &ChartFrame<'_>, options: &ViewOptions) -> io::Result<()> {
        let theme = self.theme;
        let status = self.status.as_ref();
        self.terminal
            .draw(|f| ui::draw(f, frame, options, status, &theme))?;
        Ok(())
    }

    fn on_toggle(&mut self, callback: ToggleCallback) {
        self.callbacks.push(callback);
    }
}
