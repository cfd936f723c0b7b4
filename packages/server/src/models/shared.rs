use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::utils::paginator::PageWindow;

/// `?page=` query parameter. Kept as a string so malformed values fall back
/// to the first page instead of rejecting the request.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct PageQuery {
    /// 1-based page number.
    pub page: Option<String>,
}

/// One page of a listing plus metadata about its position.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct Page<T> {
    /// Current page number (1-based).
    #[schema(example = 1)]
    pub number: u64,
    /// Total number of pages (at least 1).
    #[schema(example = 2)]
    pub num_pages: u64,
    /// Total number of items across all pages.
    #[schema(example = 14)]
    pub count: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page_number: Option<u64>,
    pub next_page_number: Option<u64>,
    pub object_list: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(window: PageWindow, object_list: Vec<T>) -> Self {
        Self {
            number: window.number,
            num_pages: window.num_pages,
            count: window.count,
            per_page: window.per_page,
            has_previous: window.has_previous(),
            has_next: window.has_next(),
            previous_page_number: window.previous_page_number(),
            next_page_number: window.next_page_number(),
            object_list,
        }
    }

    pub fn len(&self) -> usize {
        self.object_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_list.is_empty()
    }
}

/// Validation messages keyed by form field. Errors that do not belong to a
/// single field are stored under [`FormErrors::NON_FIELD`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub const NON_FIELD: &'static str = "__all__";

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }
}

/// Trim a submitted text field and reject it when blank.
pub fn clean_required(
    errors: &mut FormErrors,
    field: &str,
    value: &str,
) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, "This field is required.");
        None
    } else {
        Some(trimmed.to_string())
    }
}
