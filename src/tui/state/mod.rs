//! TUI 状态模块

pub mod input;
pub mod toast;

pub use input::InputState;
pub use toast::{TOAST_DURATION, Toast, Toasts};

use crate::backend::LocalBackend;
use crate::config::Config;
use crate::driver::Driver;
use crate::workflow::Session;
use ratatui::widgets::ListState;
use std::path::PathBuf;

/// 屏幕枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    /// 选择源目录
    #[default]
    Intro,
    /// 扫描、读取时间、重命名
    Workflow,
}

/// 应用程序状态
pub struct AppState {
    pub screen: Screen,
    /// 源目录输入框
    pub input: InputState,
    /// 输入校验失败的提示
    pub intro_error: Option<String>,
    /// 当前批次，仅在 [`Screen::Workflow`] 中存在
    pub driver: Option<Driver<LocalBackend>>,
    /// 条目列表的光标
    pub list: ListState,
    pub toasts: Toasts,
    pub config: Config,
    pub log_path: Option<PathBuf>,
    pub should_exit: bool,
}

impl AppState {
    pub fn new(config: Config, log_path: Option<PathBuf>) -> Self {
        let input = config
            .source
            .as_ref()
            .map(|source| InputState::with_value(&source.display().to_string()))
            .unwrap_or_default();

        Self {
            screen: Screen::Intro,
            input,
            intro_error: None,
            driver: None,
            list: ListState::default(),
            toasts: Toasts::default(),
            config,
            log_path,
            should_exit: false,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.driver.as_ref().map(Driver::session)
    }

    /// 丢弃当前批次，回到源目录输入
    pub fn reset_to_intro(&mut self) {
        self.driver = None;
        self.screen = Screen::Intro;
        self.intro_error = None;
        self.list = ListState::default();
        self.toasts.clear();
    }
}
