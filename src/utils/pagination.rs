use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One page of a list screen.
#[derive(Debug, Serialize, ToSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: u32, page_size: u32, total: i64) -> Self {
        Page {
            items,
            page,
            page_size,
            total,
            total_pages: total_pages(total, page_size),
        }
    }
}

/// Query parameters shared by the paginated list screens. Pages are 1-based;
/// anything below 1 is treated as page 1.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

impl PageQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }
}

pub fn total_pages(total: i64, page_size: u32) -> u32 {
    if total <= 0 {
        return 0;
    }
    ((total as u64).div_ceil(page_size as u64)) as u32
}

pub fn offset(page: u32, page_size: u32) -> i64 {
    (page.max(1) as i64 - 1) * page_size as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 5), 0);
        assert_eq!(total_pages(5, 5), 1);
        assert_eq!(total_pages(6, 5), 2);
        assert_eq!(total_pages(11, 10), 2);
    }

    #[test]
    fn offset_is_zero_based() {
        assert_eq!(offset(1, 5), 0);
        assert_eq!(offset(3, 5), 10);
        // page 0 is clamped to page 1
        assert_eq!(offset(0, 5), 0);
    }
}
