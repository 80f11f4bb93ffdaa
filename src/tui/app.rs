//! TUI application main module
//!
//! Owns the terminal and the event loop. Key presses become workflow events
//! for the current batch; every tick pumps the batch's driver so streamed
//! results show up while the user keeps working.

use crate::backend::{LocalBackend, LocalOptions};
use crate::config::Config;
use crate::driver::Driver;
use crate::tui::event::{EventPoll, TuiEvent, disable_bracketed_paste, enable_bracketed_paste};
use crate::tui::screens::workflow::rows;
use crate::tui::state::{AppState, Screen};
use crate::tui::ui::render;
use crate::workflow::{Session, ViewFilter, WorkflowEvent};
use ratatui::DefaultTerminal;
use rust_i18n::t;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// TUI application
pub struct TuiApp {
    /// Terminal
    pub terminal: DefaultTerminal,
    /// Event poller
    pub event_poll: EventPoll,
    /// Application state
    pub state: AppState,
}

impl TuiApp {
    /// Create new TUI application and take over the terminal
    pub fn new(config: Config, log_path: Option<PathBuf>) -> std::io::Result<Self> {
        let terminal = ratatui::init();
        if let Err(e) = enable_bracketed_paste() {
            warn!(error = %e, "Bracketed paste unavailable");
        }

        Ok(Self {
            terminal,
            event_poll: EventPoll::default(),
            state: AppState::new(config, log_path),
        })
    }

    /// Run application until the user quits, then restore the terminal
    pub fn run(&mut self) -> std::io::Result<()> {
        let result = self.event_loop();

        let _ = disable_bracketed_paste();
        ratatui::restore();
        result
    }

    fn event_loop(&mut self) -> std::io::Result<()> {
        render(&mut self.terminal, &mut self.state)?;

        loop {
            match self.event_poll.next() {
                TuiEvent::CtrlC => break,
                TuiEvent::None | TuiEvent::Resize(_, _) => {}
                event => self.handle_event(event),
            }
            if self.state.should_exit {
                break;
            }

            self.tick();
            render(&mut self.terminal, &mut self.state)?;
        }

        info!("Interactive session closed");
        Ok(())
    }

    /// Pump the batch and expire old notices
    fn tick(&mut self) {
        let now = Instant::now();

        if let Some(driver) = self.state.driver.as_mut() {
            driver.pump(Duration::ZERO);
            for notice in driver.take_notices() {
                self.state.toasts.push(notice, now);
            }
            if driver.restart_requested() {
                info!("New batch requested");
                self.state.reset_to_intro();
            }
        }
        self.state.toasts.prune(now);
        self.clamp_cursor();
    }

    /// Keep the list cursor on an existing row; rows disappear when disposed
    fn clamp_cursor(&mut self) {
        let Some(session) = self.state.session() else {
            return;
        };
        let len = rows(session).len();
        let selected = match self.state.list.selected() {
            _ if len == 0 => None,
            Some(index) => Some(index.min(len - 1)),
            None => Some(0),
        };
        self.state.list.select(selected);
    }

    fn handle_event(&mut self, event: TuiEvent) {
        match self.state.screen {
            Screen::Intro => self.handle_intro(event),
            Screen::Workflow => self.handle_workflow(event),
        }
    }

    fn handle_intro(&mut self, event: TuiEvent) {
        let input = &mut self.state.input;
        match event {
            TuiEvent::Char(c) => input.insert_char(c),
            TuiEvent::Paste(text) => input.insert_str(&text),
            TuiEvent::Backspace => input.delete_before_cursor(),
            TuiEvent::Delete => input.delete_after_cursor(),
            TuiEvent::Left => input.move_cursor_left(),
            TuiEvent::Right => input.move_cursor_right(),
            TuiEvent::Home => input.move_cursor_to_start(),
            TuiEvent::End => input.move_cursor_to_end(),
            TuiEvent::Enter => self.start_batch(),
            TuiEvent::Escape => self.state.should_exit = true,
            _ => {}
        }
    }

    /// Validate the typed source and start a batch on it
    fn start_batch(&mut self) {
        let Some(source) = self.state.input.as_path() else {
            self.state.intro_error = Some(t!("source_empty").to_string());
            return;
        };
        if !source.exists() {
            self.state.intro_error =
                Some(t!("source_not_found", path = source.display()).to_string());
            return;
        }

        let mut config = self.state.config.clone();
        config.source = Some(source.clone());

        let backend = LocalBackend::new(LocalOptions::from_config(&config));
        let session = Session::new(source.clone(), config.done_display_delay());
        let mut driver = Driver::new(session, backend);

        info!(source = %source.display(), dry_run = config.dry_run, "Interactive batch started");
        driver.start();

        self.state.config = config;
        self.state.driver = Some(driver);
        self.state.intro_error = None;
        self.state.screen = Screen::Workflow;
        self.state.list.select(Some(0));
    }

    fn handle_workflow(&mut self, event: TuiEvent) {
        let workflow_event = match event {
            TuiEvent::Up => {
                self.state.list.select_previous();
                None
            }
            TuiEvent::Down => {
                self.state.list.select_next();
                None
            }
            TuiEvent::Char(' ') => self.toggle_current(),
            TuiEvent::Char('a') => Some(WorkflowEvent::ToggleSelectAll),
            TuiEvent::Enter => Some(WorkflowEvent::CommitRequested),
            TuiEvent::Char('r') => Some(WorkflowEvent::Retry),
            TuiEvent::Char('n') => Some(WorkflowEvent::RestartRequested),
            TuiEvent::Tab => self.shift_view(1),
            TuiEvent::BackTab => self.shift_view(ViewFilter::ALL.len() - 1),
            TuiEvent::Char(c @ '1'..='4') => {
                let index = c as usize - '1' as usize;
                Some(WorkflowEvent::ShowView(ViewFilter::ALL[index]))
            }
            TuiEvent::Char('q') | TuiEvent::Escape => {
                self.state.should_exit = true;
                None
            }
            _ => None,
        };

        let Some(workflow_event) = workflow_event else {
            return;
        };
        let changes_view = matches!(workflow_event, WorkflowEvent::ShowView(_));
        if let Some(driver) = self.state.driver.as_mut() {
            driver.dispatch(workflow_event);
        }
        if changes_view {
            self.state.list.select(Some(0));
        }
    }

    /// Select or deselect the row under the cursor
    fn toggle_current(&self) -> Option<WorkflowEvent> {
        let session = self.state.session()?;
        let index = self.state.list.selected()?;
        let row = rows(session).into_iter().nth(index)?;
        if !row.is_selectable() {
            return None;
        }

        Some(if row.selected {
            WorkflowEvent::Deselect(row.key)
        } else {
            WorkflowEvent::Select(row.key)
        })
    }

    fn shift_view(&self, offset: usize) -> Option<WorkflowEvent> {
        let current = self.state.session()?.view();
        let next = (current.index() + offset) % ViewFilter::ALL.len();
        Some(WorkflowEvent::ShowView(ViewFilter::ALL[next]))
    }
}
