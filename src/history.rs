//! Filter, sort and paginate a subject's transaction history.
//!
//! Everything here is pure post-processing over the records collected from
//! sealed blocks; nothing touches ledger state.

use crate::error::ChainError;
use crate::transaction::TransactionRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const DEFAULT_PER_PAGE: usize = 10;

/// Largest page size served, whatever the caller asks for.
pub const MAX_PER_PAGE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    SubjectId,
    TransactionType,
    #[default]
    #[serde(alias = "timestamp")]
    RecordedAt,
    VerificationStatus,
}

impl SortField {
    fn compare(&self, a: &TransactionRecord, b: &TransactionRecord) -> Ordering {
        match self {
            SortField::SubjectId => a.subject_id.cmp(&b.subject_id),
            SortField::TransactionType => a.transaction_type.cmp(&b.transaction_type),
            SortField::RecordedAt => a.recorded_at.cmp(&b.recorded_at),
            SortField::VerificationStatus => a
                .verification_status
                .as_str()
                .cmp(b.verification_status.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryQuery {
    pub page: usize,
    pub per_page: usize,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub filter_type: Option<String>,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
            filter_type: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub transactions: Vec<TransactionRecord>,
    pub total_pages: usize,
    pub current_page: usize,
    pub total_items: usize,
}

impl HistoryQuery {
    /// Apply filter, sort and pagination to records given in ledger order.
    ///
    /// Sorting is stable, so records that compare equal keep ledger order.
    pub fn apply(&self, mut records: Vec<TransactionRecord>) -> Result<HistoryPage, ChainError> {
        if self.page == 0 {
            return Err(ChainError::InvalidQuery("page must be at least 1".to_string()));
        }
        if self.per_page == 0 {
            return Err(ChainError::InvalidQuery("per_page must be at least 1".to_string()));
        }
        let per_page = self.per_page.min(MAX_PER_PAGE);

        // An empty filter means "all types".
        if let Some(filter) = self.filter_type.as_deref().filter(|f| !f.is_empty()) {
            records.retain(|r| r.transaction_type == filter);
        }

        records.sort_by(|a, b| match self.sort_order {
            SortOrder::Asc => self.sort_by.compare(a, b),
            SortOrder::Desc => self.sort_by.compare(b, a),
        });

        let total_items = records.len();
        let total_pages = total_items.div_ceil(per_page);
        let start = (self.page - 1).saturating_mul(per_page);

        let transactions = records.into_iter().skip(start).take(per_page).collect();

        Ok(HistoryPage {
            transactions,
            total_pages,
            current_page: self.page,
            total_items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::VerificationStatus;
    use chrono::{Duration, TimeZone, Utc};

    fn records(count: usize) -> Vec<TransactionRecord> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..count)
            .map(|i| TransactionRecord {
                subject_id: "123456789012".to_string(),
                transaction_type: if i % 2 == 0 { "UPDATE" } else { "AUTH" }.to_string(),
                recorded_at: base + Duration::seconds(i as i64),
                verification_status: VerificationStatus::Verified,
            })
            .collect()
    }

    #[test]
    fn test_pagination_of_twenty_five() {
        let query = HistoryQuery {
            page: 3,
            ..HistoryQuery::default()
        };
        let page = query.apply(records(25)).unwrap();
        assert_eq!(page.total_items, 25);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.current_page, 3);
        assert_eq!(page.transactions.len(), 5);
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        let page = HistoryQuery::default().apply(records(3)).unwrap();
        let times: Vec<_> = page.transactions.iter().map(|r| r.recorded_at).collect();
        assert!(times[0] > times[1] && times[1] > times[2]);
    }

    #[test]
    fn test_ascending_sort_by_type_is_stable() {
        let query = HistoryQuery {
            sort_by: SortField::TransactionType,
            sort_order: SortOrder::Asc,
            ..HistoryQuery::default()
        };
        let input = records(4);
        let page = query.apply(input.clone()).unwrap();
        // AUTH records (1, 3) first, then UPDATE records (0, 2), each in ledger order.
        assert_eq!(page.transactions, vec![
            input[1].clone(),
            input[3].clone(),
            input[0].clone(),
            input[2].clone(),
        ]);
    }

    #[test]
    fn test_filter_by_type() {
        let query = HistoryQuery {
            filter_type: Some("AUTH".to_string()),
            ..HistoryQuery::default()
        };
        let page = query.apply(records(10)).unwrap();
        assert_eq!(page.total_items, 5);
        assert!(page.transactions.iter().all(|r| r.transaction_type == "AUTH"));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let query = HistoryQuery {
            filter_type: Some(String::new()),
            ..HistoryQuery::default()
        };
        assert_eq!(query.apply(records(4)).unwrap().total_items, 4);
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let query = HistoryQuery {
            page: 9,
            ..HistoryQuery::default()
        };
        let page = query.apply(records(5)).unwrap();
        assert!(page.transactions.is_empty());
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_zero_page_or_size_rejected() {
        let zero_page = HistoryQuery {
            page: 0,
            ..HistoryQuery::default()
        };
        let zero_size = HistoryQuery {
            per_page: 0,
            ..HistoryQuery::default()
        };
        assert!(matches!(zero_page.apply(vec![]), Err(ChainError::InvalidQuery(_))));
        assert!(matches!(zero_size.apply(vec![]), Err(ChainError::InvalidQuery(_))));
    }

    #[test]
    fn test_per_page_is_capped() {
        let query = HistoryQuery {
            per_page: 1_000,
            ..HistoryQuery::default()
        };
        let page = query.apply(records(150)).unwrap();
        assert_eq!(page.transactions.len(), MAX_PER_PAGE);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn test_timestamp_alias_deserializes() {
        let field: SortField = serde_json::from_str("\"timestamp\"").unwrap();
        assert_eq!(field, SortField::RecordedAt);
        let query: HistoryQuery = serde_json::from_str("{\"page\": 2}").unwrap();
        assert_eq!(query.per_page, DEFAULT_PER_PAGE);
        assert_eq!(query.sort_order, SortOrder::Desc);
    }
}
