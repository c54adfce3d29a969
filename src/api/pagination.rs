use serde::Serialize;

pub(crate) const MAX_PAGE_SIZE: i64 = 500;

pub(crate) const fn default_limit() -> i64 {
    100
}

/// Offset pagination window: `skip` is floored at zero and `limit` kept in `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PageWindow {
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}

impl PageWindow {
    pub(crate) fn new(skip: i64, limit: i64) -> Self {
        Self { skip: skip.max(0), limit: limit.clamp(1, MAX_PAGE_SIZE) }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PaginatedResponse<T> {
    pub(crate) items: Vec<T>,
    pub(crate) total_count: i64,
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}

impl<T> PaginatedResponse<T> {
    pub(crate) fn new(items: Vec<T>, total_count: i64, window: PageWindow) -> Self {
        Self { items, total_count, skip: window.skip, limit: window.limit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_clamps_out_of_range_values() {
        assert_eq!(PageWindow::new(-5, 0), PageWindow { skip: 0, limit: 1 });
        assert_eq!(PageWindow::new(20, 10_000), PageWindow { skip: 20, limit: MAX_PAGE_SIZE });
        assert_eq!(PageWindow::new(0, default_limit()).limit, 100);
    }
}
