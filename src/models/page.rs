use serde::{Deserialize, Serialize};

/// Zero-indexed page request with a fixed page size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        // A zero-size page would make every query return nothing and
        // total_pages meaningless.
        Self { page, size: size.max(1) }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 0, size: 20 }
    }
}

/// One slice of a result set plus enough metadata to page through the rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_items: i64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_items: i64) -> Self {
        let size = i64::from(request.size.max(1));
        let total_pages = ((total_items + size - 1) / size).max(0) as u32;
        Self {
            items,
            page: request.page,
            size: request.size,
            total_items,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_is_page_times_size() {
        let req = PageRequest::new(3, 25);
        assert_eq!(req.offset(), 75);
        assert_eq!(req.limit(), 25);
    }

    #[test]
    fn zero_size_clamped_to_one() {
        let req = PageRequest::new(0, 0);
        assert_eq!(req.size, 1);
    }

    #[test]
    fn total_pages_rounds_up() {
        let page: Page<u8> = Page::new(vec![], PageRequest::new(0, 10), 31);
        assert_eq!(page.total_pages, 4);

        let exact: Page<u8> = Page::new(vec![], PageRequest::new(0, 10), 30);
        assert_eq!(exact.total_pages, 3);

        let empty: Page<u8> = Page::new(vec![], PageRequest::new(0, 10), 0);
        assert_eq!(empty.total_pages, 0);
    }
}
