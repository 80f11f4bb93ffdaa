//! 工作流屏幕
//!
//! 顶部显示源目录、阶段和选中数量，中间是当前视图的条目列表，
//! 完成后在列表下方显示重命名统计。

use crate::group::{FileGroup, GroupKey};
use crate::tui::components::{render_hint, render_toasts, truncate_value};
use crate::tui::state::AppState;
use crate::tui::theme::theme;
use crate::workflow::{ItemState, Phase, Session, ViewFilter};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, List, ListItem, Paragraph, Tabs},
};
use rust_i18n::t;

/// 列表行的显示类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// 等待拍摄时间
    Pending,
    Ready,
    Renaming,
    Renamed,
    Uncertain,
    Unsupported,
}

/// 条目列表中的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRow {
    pub key: GroupKey,
    pub kind: RowKind,
    pub selected: bool,
    pub file_count: usize,
    pub next_stem: Option<String>,
}

impl ItemRow {
    /// 是否可以切换选中
    pub fn is_selectable(&self) -> bool {
        matches!(self.kind, RowKind::Pending | RowKind::Ready)
    }

    fn from_group(group: &FileGroup, kind: RowKind) -> Self {
        Self {
            key: group.key().clone(),
            kind,
            selected: false,
            file_count: group.file_count(),
            next_stem: None,
        }
    }
}

/// 当前视图要显示的行，按批次顺序
pub fn rows(session: &Session) -> Vec<ItemRow> {
    let registry = session.registry();

    let renameable = || {
        registry.items().map(|item| ItemRow {
            key: item.key().clone(),
            kind: match item.state() {
                ItemState::Enriching => RowKind::Pending,
                ItemState::Ready => RowKind::Ready,
                ItemState::Committing => RowKind::Renaming,
                ItemState::Done => RowKind::Renamed,
            },
            selected: item.is_selected(),
            file_count: item.group().file_count(),
            next_stem: item.next_stem().map(str::to_string),
        })
    };
    let uncertain = || {
        registry
            .uncertain()
            .iter()
            .map(|group| ItemRow::from_group(group, RowKind::Uncertain))
    };
    let unsupported = || {
        registry
            .unsupported()
            .iter()
            .map(|group| ItemRow::from_group(group, RowKind::Unsupported))
    };

    match session.view() {
        ViewFilter::ToRename => renameable().collect(),
        ViewFilter::Uncertain => uncertain().collect(),
        ViewFilter::Unsupported => unsupported().collect(),
        ViewFilter::All => renameable().chain(uncertain()).chain(unsupported()).collect(),
    }
}

pub fn draw(frame: &mut Frame, area: Rect, state: &mut AppState) {
    let Some(session) = state.driver.as_ref().map(|driver| driver.session()) else {
        return;
    };
    let phase = session.phase();

    let [header, tabs_area, body, footer] = Layout::vertical([
        Constraint::Length(4),
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(2),
    ])
    .areas(area);

    draw_header(frame, header, session, state.config.dry_run);
    draw_tabs(frame, tabs_area, session.view());

    let list_area = if phase == Phase::Done {
        let [list_area, summary_area] =
            Layout::vertical([Constraint::Min(3), Constraint::Length(7)]).areas(body);
        draw_summary(frame, summary_area, state);
        list_area
    } else {
        body
    };

    let rows = rows(session);
    if rows.is_empty() {
        frame.render_widget(
            Paragraph::new(t!("empty_view"))
                .style(theme().hint())
                .centered()
                .block(list_block()),
            list_area,
        );
    } else {
        let width = list_area.width.saturating_sub(4) as usize;
        let items: Vec<ListItem> = rows.iter().map(|row| row_item(row, width)).collect();
        let list = List::new(items)
            .block(list_block())
            .highlight_style(theme().selected())
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, list_area, &mut state.list);
    }

    let hint = if phase.has_failed() {
        t!("hint_failed")
    } else {
        match phase {
            Phase::Ready => t!("hint_ready"),
            Phase::Done => t!("hint_done"),
            _ => t!("hint_busy"),
        }
    };
    render_hint(&hint, frame, footer);

    render_toasts(state.toasts.iter(), frame, area);
}

fn list_block() -> Block<'static> {
    Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(theme().border())
}

fn draw_header(frame: &mut Frame, area: Rect, session: &Session, dry_run: bool) {
    let phase = session.phase();
    let summary = session.summary();

    let mut phase_spans = vec![Span::from(phase_label(phase)).style(
        if phase.has_failed() {
            theme().error()
        } else {
            theme().accent()
        },
    )];
    if phase.has_failed() {
        phase_spans.push(Span::from(format!(" ({})", t!("step_failed"))).style(theme().error()));
    }
    if dry_run {
        phase_spans.push(Span::raw("  "));
        phase_spans.push(
            Span::from(format!("[{}]", t!("dry_run_badge")))
                .style(theme().warning().add_modifier(Modifier::BOLD)),
        );
    }

    let source = truncate_value(
        &summary.source.display().to_string(),
        area.width.saturating_sub(16) as usize,
    );
    let lines = vec![
        Line::from(vec![
            Span::from(format!("{}: ", t!("header_source"))).style(theme().hint()),
            Span::from(source),
        ]),
        Line::from(phase_spans).patch_style(Style::new().bg(theme().bg)),
        Line::from(vec![
            Span::from(format!("{}: {}", t!("header_files"), summary.total_file_count)),
            Span::raw("   "),
            Span::from(t!(
                "header_selected",
                count = summary.selection.selected_count,
                total = session.registry().len()
            ))
            .style(theme().accent()),
        ]),
    ];

    frame.render_widget(
        Paragraph::new(lines).block(
            Block::bordered()
                .title(Line::from(format!(" {} ", t!("app_title"))).style(theme().title()))
                .border_type(BorderType::Rounded)
                .border_style(theme().border()),
        ),
        area,
    );
}

fn phase_label(phase: Phase) -> String {
    match phase {
        Phase::Collecting(_) => t!("phase_collecting"),
        Phase::Enriching(_) => t!("phase_enriching"),
        Phase::Ready => t!("phase_ready"),
        Phase::Committing(_) => t!("phase_committing"),
        Phase::Done => t!("phase_done"),
    }
    .to_string()
}

fn view_label(filter: ViewFilter) -> String {
    match filter {
        ViewFilter::ToRename => t!("view_to_rename"),
        ViewFilter::Uncertain => t!("view_uncertain"),
        ViewFilter::Unsupported => t!("view_unsupported"),
        ViewFilter::All => t!("view_all"),
    }
    .to_string()
}

fn draw_tabs(frame: &mut Frame, area: Rect, current: ViewFilter) {
    let titles = ViewFilter::ALL
        .iter()
        .map(|filter| format!("{} {}", filter.index() + 1, view_label(*filter)));
    let tabs = Tabs::new(titles)
        .select(current.index())
        .style(theme().hint())
        .highlight_style(theme().title().add_modifier(Modifier::UNDERLINED))
        .divider("|");
    frame.render_widget(tabs, area);
}

fn row_item(row: &ItemRow, width: usize) -> ListItem<'static> {
    let checkbox = match row.kind {
        RowKind::Uncertain | RowKind::Unsupported => "   ",
        _ if row.selected => "[x]",
        _ => "[ ]",
    };

    let (detail, style) = match row.kind {
        RowKind::Pending => (t!("item_pending").to_string(), theme().pending()),
        RowKind::Ready => (
            format!("→ {}", row.next_stem.as_deref().unwrap_or_default()),
            theme().normal(),
        ),
        RowKind::Renaming => (t!("item_renaming").to_string(), theme().warning()),
        RowKind::Renamed => (
            format!("{} → {}", t!("item_renamed"), row.next_stem.as_deref().unwrap_or_default()),
            theme().done(),
        ),
        RowKind::Uncertain => (t!("item_uncertain").to_string(), theme().warning()),
        RowKind::Unsupported => (t!("item_unsupported").to_string(), theme().hint()),
    };

    let text = format!("{} {} ({})  {}", checkbox, row.key, row.file_count, detail);
    ListItem::new(truncate_value(&text, width)).style(style)
}

fn draw_summary(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(session) = state.session() else {
        return;
    };
    let summary = session.summary();

    let mut lines = vec![
        Line::from(vec![
            Span::from(format!("{}: ", t!("summary_files"))),
            Span::from(summary.renamed_file_count.to_string()).style(theme().success()),
        ]),
        Line::from(vec![
            Span::from(format!("{}: ", t!("summary_groups"))),
            Span::from(summary.renamed_group_count.to_string()).style(theme().success()),
        ]),
    ];

    if state.config.dry_run {
        lines.push(
            Line::from(t!("dry_run_notice")).style(theme().warning().add_modifier(Modifier::BOLD)),
        );
    }

    if let Some(ref log_path) = state.log_path {
        lines.push(Line::from(vec![
            Span::from(format!("{} ", t!("log_saved_to"))).style(theme().hint()),
            Span::from(log_path.display().to_string()).style(theme().accent()),
        ]));
    }

    frame.render_widget(
        Paragraph::new(lines).style(theme().normal()).block(
            Block::bordered()
                .title(Line::from(format!(" {} ", t!("summary_title"))).style(theme().title()))
                .border_type(BorderType::Rounded)
                .border_style(theme().success()),
        ),
        area,
    );
}
