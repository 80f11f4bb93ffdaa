//! 源目录输入屏幕

use crate::tui::components::{render_hint, render_title_block, three_panel_layout};
use crate::tui::state::AppState;
use crate::tui::theme::theme;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Margin, Position, Rect},
    text::Line,
    widgets::{Block, BorderType, Paragraph},
};
use rust_i18n::t;

pub fn draw(frame: &mut Frame, area: Rect, state: &mut AppState) {
    let [header, body, footer] = three_panel_layout(area);

    render_title_block(&t!("app_title"), frame, header);

    let [prompt_area, input_area, error_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(body.inner(Margin::new(2, 1)));

    frame.render_widget(
        Line::from(t!("intro_prompt")).style(theme().hint()),
        prompt_area,
    );

    let input_block = Block::bordered()
        .title(t!("intro_title"))
        .border_type(BorderType::Rounded)
        .border_style(theme().border());
    frame.render_widget(
        Paragraph::new(state.input.value())
            .block(input_block)
            .style(theme().normal()),
        input_area,
    );

    // 光标超出输入框时不显示
    let cursor_x = input_area.x + 1 + state.input.visual_cursor_position() as u16;
    if cursor_x < input_area.x + input_area.width.saturating_sub(1) {
        frame.set_cursor_position(Position {
            x: cursor_x,
            y: input_area.y + 1,
        });
    }

    if let Some(ref error) = state.intro_error {
        frame.render_widget(Line::from(error.as_str()).style(theme().error()), error_area);
    }

    render_hint(&t!("intro_hint"), frame, footer);
}
