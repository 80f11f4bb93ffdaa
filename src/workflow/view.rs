//! Display subset selector, held in parallel with the workflow phase

/// Which subset of the batch is listed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewFilter {
    #[default]
    ToRename,
    Uncertain,
    Unsupported,
    All,
}

impl ViewFilter {
    pub const ALL: [ViewFilter; 4] = [
        ViewFilter::ToRename,
        ViewFilter::Uncertain,
        ViewFilter::Unsupported,
        ViewFilter::All,
    ];

    pub fn index(self) -> usize {
        match self {
            ViewFilter::ToRename => 0,
            ViewFilter::Uncertain => 1,
            ViewFilter::Unsupported => 2,
            ViewFilter::All => 3,
        }
    }
}

/// The view-selector region. Entered states change only by explicit navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewRegion {
    current: ViewFilter,
}

impl ViewRegion {
    pub fn current(&self) -> ViewFilter {
        self.current
    }

    pub fn navigate(&mut self, filter: ViewFilter) {
        self.current = filter;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_on_to_rename() {
        assert_eq!(ViewRegion::default().current(), ViewFilter::ToRename);
    }

    #[test]
    fn test_navigate_to_each_view() {
        let mut region = ViewRegion::default();
        for filter in ViewFilter::ALL {
            region.navigate(filter);
            assert_eq!(region.current(), filter);
            assert_eq!(ViewFilter::ALL[filter.index()], filter);
        }
    }
}
