//! 各屏幕的渲染

pub mod intro;
pub mod workflow;
