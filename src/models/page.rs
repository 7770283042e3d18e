//! Page resolution for listings

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, AppResult};

/// `?page=` query parameter: a 1-based number or `last`
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// Resolved page of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PageMeta {
    pub number: i64,
    pub per_page: i64,
    /// Total number of rows across all pages
    pub count: i64,
    pub num_pages: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl PageMeta {
    /// Resolve the requested page against `count` rows.
    ///
    /// An empty listing still has a first page. Anything that is not a page
    /// number in range is `NotFound`.
    pub fn resolve(requested: Option<&str>, count: i64, per_page: i64) -> AppResult<Self> {
        let num_pages = if count == 0 {
            1
        } else {
            (count + per_page - 1) / per_page
        };

        let number = match requested.map(str::trim) {
            None | Some("") => 1,
            Some("last") => num_pages,
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| AppError::NotFound("Page is not 'last', nor can it be converted to an int".to_string()))?,
        };

        if number < 1 || number > num_pages {
            return Err(AppError::NotFound(format!("Invalid page ({})", number)));
        }

        Ok(Self {
            number,
            per_page,
            count,
            num_pages,
            has_next: number < num_pages,
            has_previous: number > 1,
        })
    }

    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn is_paginated(&self) -> bool {
        self.num_pages > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_listing_has_one_page() {
        let page = PageMeta::resolve(None, 0, 2).unwrap();
        assert_eq!(page.number, 1);
        assert_eq!(page.num_pages, 1);
        assert!(!page.has_next && !page.has_previous);
        assert!(!page.is_paginated());
    }

    #[test]
    fn last_resolves_to_final_page() {
        let page = PageMeta::resolve(Some("last"), 7, 3).unwrap();
        assert_eq!(page.number, 3);
        assert_eq!(page.offset(), 6);
        assert!(page.has_previous);
        assert!(!page.has_next);
    }

    #[test]
    fn out_of_range_and_garbage_are_not_found() {
        for requested in ["0", "4", "-1", "abc"] {
            assert!(matches!(
                PageMeta::resolve(Some(requested), 7, 3),
                Err(AppError::NotFound(_))
            ));
        }
    }
}
