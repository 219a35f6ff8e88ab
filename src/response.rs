use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Success envelope: `{ "succeeded": true, "message": "...", "data": ... }`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessResult<T> {
    pub succeeded: bool,
    pub message: String,
    pub data: T,
}

impl<T> SuccessResult<T> {
    pub fn new(data: T) -> Self {
        Self {
            succeeded: true,
            message: String::new(),
            data,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            message: message.into(),
            data,
        }
    }
}

/// Error envelope mirroring the success shape, with per-field messages.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResult {
    pub succeeded: bool,
    pub message: String,
    pub errors: HashMap<String, Vec<String>>,
}

impl ErrorResult {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            message: message.into(),
            errors: HashMap::new(),
        }
    }

    pub fn with_errors(message: impl Into<String>, errors: HashMap<String, Vec<String>>) -> Self {
        Self {
            succeeded: false,
            message: message.into(),
            errors,
        }
    }
}

/// Default used by the per-resource pagination query structs.
pub fn default_page_size() -> i64 {
    10
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginationRequest {
    pub page_index: i64,
    pub page_size: i64,
}

impl Default for PaginationRequest {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: 10,
        }
    }
}

impl PaginationRequest {
    pub fn limit(&self) -> i64 {
        self.page_size.max(1)
    }

    pub fn offset(&self) -> i64 {
        self.page_index.max(0) * self.limit()
    }
}

/// Page wrapper; `page_index` starts from 0.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResponse<T> {
    pub total_records: i64,
    pub page_size: i64,
    pub pages_count: i64,
    pub page_index: i64,
    pub next: bool,
    pub previous: bool,
    pub items: Vec<T>,
}

impl<T> PaginationResponse<T> {
    pub fn new(items: Vec<T>, total_records: i64, request: &PaginationRequest) -> Self {
        let page_size = request.limit();
        let page_index = request.page_index.max(0);
        let pages_count = (total_records + page_size - 1) / page_size;

        Self {
            total_records,
            page_size,
            pages_count,
            page_index,
            next: page_index + 1 < pages_count,
            previous: page_index > 0,
            items,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_math() {
        let request = PaginationRequest {
            page_index: 0,
            page_size: 10,
        };
        let page = PaginationResponse::new(vec![1, 2, 3], 25, &request);

        assert_eq!(page.pages_count, 3);
        assert!(page.next);
        assert!(!page.previous);
    }

    #[test]
    fn pagination_last_page() {
        let request = PaginationRequest {
            page_index: 2,
            page_size: 10,
        };
        let page = PaginationResponse::new(vec![1], 21, &request);

        assert_eq!(page.pages_count, 3);
        assert!(!page.next);
        assert!(page.previous);
        assert_eq!(request.offset(), 20);
    }

    #[test]
    fn success_envelope_shape() {
        let body = serde_json::to_value(SuccessResult::new(42)).unwrap();

        assert_eq!(body["succeeded"], true);
        assert_eq!(body["data"], 42);
        assert_eq!(body["message"], "");
    }

    #[test]
    fn error_envelope_shape() {
        let mut errors = HashMap::new();
        errors.insert("email".to_string(), vec!["required".to_string()]);
        let body = serde_json::to_value(ErrorResult::with_errors("invalid", errors)).unwrap();

        assert_eq!(body["succeeded"], false);
        assert_eq!(body["errors"]["email"][0], "required");
    }
}
