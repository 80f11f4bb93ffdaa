//! 通用界面组件
//!
//! 各屏幕共用的布局与小部件。

use crate::tui::state::Toast;
use crate::tui::theme::theme;
use crate::workflow::NoticeLevel;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    text::Line,
    widgets::{Block, BorderType, Clear, Paragraph, Wrap},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// 三段布局：标题、主体、底部提示
pub fn three_panel_layout(area: Rect) -> [Rect; 3] {
    Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(1),
        Constraint::Length(2),
    ])
    .areas(area)
}

/// 带边框的居中标题
pub fn render_title_block(title: &str, frame: &mut Frame, area: Rect) {
    let title_line = Line::from(format!(" {} ", title))
        .centered()
        .style(theme().title());

    let block = Block::bordered()
        .title(title_line)
        .border_type(BorderType::Rounded)
        .border_style(theme().border())
        .style(theme().normal());

    frame.render_widget(block, area);
}

/// 底部提示文字
pub fn render_hint(hint: &str, frame: &mut Frame, area: Rect) {
    let hint_widget = Paragraph::new(hint)
        .style(theme().hint())
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(hint_widget, area);
}

/// 右上角的提示消息，最新的在最上面
pub fn render_toasts<'a>(toasts: impl Iterator<Item = &'a Toast>, frame: &mut Frame, area: Rect) {
    let width = (area.width / 2).max(30).min(area.width);
    let mut y = area.y + 1;

    for toast in toasts {
        let inner_width = width.saturating_sub(4) as usize;
        let text = truncate_value(&toast.notice.message, inner_width);
        let style = match toast.notice.level {
            NoticeLevel::Success => theme().success(),
            NoticeLevel::Error => theme().error(),
        };

        if y + 3 > area.y + area.height {
            break;
        }
        let [slot] = Layout::horizontal([Constraint::Length(width)])
            .flex(Flex::End)
            .areas(Rect::new(area.x, y, area.width, 3));

        frame.render_widget(Clear, slot);
        frame.render_widget(
            Paragraph::new(text).style(style).block(
                Block::bordered()
                    .border_type(BorderType::Rounded)
                    .border_style(style),
            ),
            slot,
        );
        y += 3;
    }
}

/// 按显示宽度截断文本，避免 UTF-8 边界问题
pub fn truncate_value(value: &str, max_width: usize) -> String {
    if value.width() <= max_width {
        return value.to_string();
    }

    let target_width = max_width.saturating_sub(3);
    let mut current_width = 0;
    let mut output = String::new();

    for ch in value.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if current_width + ch_width > target_width {
            break;
        }
        output.push(ch);
        current_width += ch_width;
    }

    output.push_str("...");
    output
}
