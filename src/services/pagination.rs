use crate::error::{AppError, FieldError};

pub const MAX_PAGE_SIZE: u64 = 100;

/// Raw `page`/`limit` query values; defaults depend on the listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl PageParams {
    pub fn new(page: Option<u64>, limit: Option<u64>) -> Self {
        Self { page, limit }
    }

    /// Returns `(page, page_size)`, or a validation error naming the bad field.
    pub fn resolve(&self, default_limit: u64) -> Result<(u64, u64), AppError> {
        let page = self.page.unwrap_or(1);
        let limit = self.limit.unwrap_or(default_limit);

        let mut errors = Vec::new();
        if page == 0 {
            errors.push(FieldError::new("page", "Page must be a positive integer"));
        }
        if limit == 0 || limit > MAX_PAGE_SIZE {
            errors.push(FieldError::new(
                "limit",
                format!("Limit must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }

        if errors.is_empty() {
            Ok((page, limit))
        } else {
            Err(AppError::validation(errors))
        }
    }
}
