use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default page size when none (or a non-positive one) is requested
const DEFAULT_PAGE_SIZE: i64 = 10;

/// Largest page size the server accepts
const MAX_PAGE_SIZE: i64 = 100;

/// Paginated listing as returned by list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub page: i64,
    #[serde(rename = "pageSize", default)]
    pub page_size: i64,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            list: Vec::new(),
            total: 0,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl<T: DeserializeOwned> Page<T> {
    /// Parse a listing payload. Older revisions answer with a bare array
    /// instead of a page object, so both shapes are accepted.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        if value.is_array() {
            let list: Vec<T> = serde_json::from_value(value)?;
            let total = list.len() as i64;
            return Ok(Self {
                page_size: total.max(1),
                list,
                total,
                page: 1,
            });
        }
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value)
    }
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> i64 {
        if self.page_size <= 0 {
            return 0;
        }
        (self.total + self.page_size - 1) / self.page_size
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }
}

/// Pagination request. Normalized the same way the server does before
/// being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub page: i64,
    pub page_size: i64,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageQuery {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self { page, page_size }.normalized()
    }

    pub fn normalized(self) -> Self {
        let page = if self.page <= 0 { 1 } else { self.page };
        let page_size = if self.page_size <= 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.page_size.min(MAX_PAGE_SIZE)
        };
        Self { page, page_size }
    }

    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let query = self.normalized();
        vec![
            ("page".to_string(), query.page.to_string()),
            ("pageSize".to_string(), query.page_size.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_query_normalization() {
        assert_eq!(PageQuery::new(0, 0), PageQuery { page: 1, page_size: 10 });
        assert_eq!(PageQuery::new(-3, 500), PageQuery { page: 1, page_size: 100 });
        assert_eq!(PageQuery::new(4, 25), PageQuery { page: 4, page_size: 25 });
    }

    #[test]
    fn test_page_object_and_bare_array_both_parse() {
        let page: Page<u32> = Page::from_value(json!({
            "list": [1, 2, 3], "total": 23, "page": 2, "pageSize": 3
        }))
        .unwrap();
        assert_eq!(page.list, vec![1, 2, 3]);
        assert_eq!(page.total_pages(), 8);
        assert!(page.has_next());

        let bare: Page<u32> = Page::from_value(json!([5, 6])).unwrap();
        assert_eq!(bare.total, 2);
        assert!(!bare.has_next());

        let empty: Page<u32> = Page::from_value(Value::Null).unwrap();
        assert!(empty.list.is_empty());
    }
}
