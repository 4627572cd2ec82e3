//! Page-number pagination shared by the list endpoints.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Query params accepted by paged listings (`?size=&page=`).
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct PageQuery {
    pub size: Option<u32>,
    pub page: Option<u32>,
}

impl PageQuery {
    /// Clamp to sane bounds and return `(page, per_page)`, page being 1-based.
    pub fn normalize(self) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self
            .size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        (page, per_page)
    }
}

/// One page of results plus the metadata clients need to walk the rest.
#[derive(Serialize, Debug)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub current_page: u32,
    pub per_page: u32,
    pub total: i64,
    pub last_page: i64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, current_page: u32, per_page: u32, total: i64) -> Self {
        let per = i64::from(per_page);
        let last_page = ((total + per - 1) / per).max(1);
        Self {
            data,
            current_page,
            per_page,
            total,
            last_page,
        }
    }
}

/// Success envelope shared by every endpoint: `{ message, data }`.
#[derive(Serialize, Debug)]
pub struct ApiResponse<T: Serialize> {
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_page_of_ten() {
        assert_eq!(PageQuery::default().normalize(), (1, 10));
    }

    #[test]
    fn clamps_size_and_page() {
        let q = PageQuery {
            size: Some(0),
            page: Some(0),
        };
        assert_eq!(q.normalize(), (1, 1));

        let q = PageQuery {
            size: Some(5000),
            page: Some(3),
        };
        assert_eq!(q.normalize(), (3, MAX_PAGE_SIZE));
    }

    #[test]
    fn last_page_rounds_up_and_never_drops_below_one() {
        assert_eq!(Page::<u8>::new(vec![], 1, 10, 0).last_page, 1);
        assert_eq!(Page::<u8>::new(vec![], 1, 10, 10).last_page, 1);
        assert_eq!(Page::<u8>::new(vec![], 1, 10, 11).last_page, 2);
    }

    #[test]
    fn message_only_response_serializes_null_data() {
        let value = serde_json::to_value(ApiResponse::message("Spot deleted")).unwrap();
        assert_eq!(value["message"], "Spot deleted");
        assert!(value["data"].is_null());
    }
}
