//! Listing parameters for certificates: filters, sort and pagination.

use crate::domain::certificate::CertificateStatus;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Deserialize, Serialize, Debug, ToSchema, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    CertificateName,
    Subject,
}

impl SortField {
    /// Column name in the certificates table.
    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::CertificateName => "certificate_name",
            SortField::Subject => "subject",
        }
    }
}

#[derive(Deserialize, Serialize, Debug, ToSchema, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Raw listing query as received from callers. Missing values fall back to defaults.
#[derive(Deserialize, Debug, Clone, Default, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CertificateQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub company_id: Option<String>,
    #[param(value_type = Option<String>)]
    pub status: Option<CertificateStatus>,
    pub requested_by_user_id: Option<String>,
    /// Case-insensitive substring match on certificate name or subject.
    pub search: Option<String>,
    #[param(value_type = Option<String>)]
    pub sort_by: Option<SortField>,
    #[param(value_type = Option<String>)]
    pub sort_order: Option<SortOrder>,
}

/// Filter handed to the store, with blank strings dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateFilter {
    pub company_id: Option<String>,
    pub status: Option<CertificateStatus>,
    pub requested_by_user_id: Option<String>,
    pub search: Option<String>,
}

/// A resolved page request: 1-based page, clamped limit and derived offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.limit.max(1)))
    }
}

fn non_blank(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl CertificateQuery {
    pub fn filter(&self) -> CertificateFilter {
        CertificateFilter {
            company_id: non_blank(&self.company_id),
            status: self.status,
            requested_by_user_id: non_blank(&self.requested_by_user_id),
            search: non_blank(&self.search),
        }
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest {
            page: self.page.unwrap_or(1).max(1),
            limit: self
                .limit
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
            sort_by: self.sort_by.unwrap_or_default(),
            sort_order: self.sort_order.unwrap_or_default(),
        }
    }
}
