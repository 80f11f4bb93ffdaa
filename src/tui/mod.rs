//! Ratatui 终端 UI 模块
//!
//! 交互式界面：输入源目录，查看各条目的新名称，选择后执行重命名。

pub mod app;
pub mod components;
pub mod event;
pub mod screens;
pub mod state;
pub mod theme;
pub mod ui;

pub use app::TuiApp;
pub use event::{EventPoll, TuiEvent};
pub use state::{AppState, InputState, Screen};
pub use theme::{Theme, theme};
pub use ui::render;
