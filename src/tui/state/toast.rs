//! 提示消息队列

use crate::workflow::Notice;
use std::time::{Duration, Instant};

/// 提示消息显示时长
pub const TOAST_DURATION: Duration = Duration::from_secs(4);

/// 同时显示的最大数量
const MAX_TOASTS: usize = 4;

#[derive(Debug, Clone)]
pub struct Toast {
    pub notice: Notice,
    pub expires_at: Instant,
}

#[derive(Debug, Default)]
pub struct Toasts {
    items: Vec<Toast>,
}

impl Toasts {
    pub fn push(&mut self, notice: Notice, now: Instant) {
        self.items.push(Toast {
            notice,
            expires_at: now + TOAST_DURATION,
        });
        if self.items.len() > MAX_TOASTS {
            self.items.remove(0);
        }
    }

    /// 移除过期消息，返回是否有变化
    pub fn prune(&mut self, now: Instant) -> bool {
        let before = self.items.len();
        self.items.retain(|toast| toast.expires_at > now);
        before != self.items.len()
    }

    /// 最新的在前
    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.items.iter().rev()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toasts_expire_and_cap() {
        let start = Instant::now();
        let mut toasts = Toasts::default();
        for i in 0..6 {
            toasts.push(Notice::error(format!("error {}", i)), start);
        }
        assert_eq!(toasts.iter().count(), MAX_TOASTS);
        assert_eq!(toasts.iter().next().map(|t| t.notice.message.as_str()), Some("error 5"));

        assert!(!toasts.prune(start + Duration::from_secs(1)));
        assert!(toasts.prune(start + TOAST_DURATION));
        assert!(toasts.is_empty());
    }
}
