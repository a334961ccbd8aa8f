use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::error::QueryError;
use crate::models::MessageStatus;

/// Status restriction for a list query. `All` goes over the wire as `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(MessageStatus),
}

impl StatusFilter {
    pub fn code(self) -> i32 {
        match self {
            StatusFilter::All => -1,
            StatusFilter::Only(status) => status.code(),
        }
    }
}

impl TryFrom<i32> for StatusFilter {
    type Error = QueryError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        match raw {
            -1 => Ok(StatusFilter::All),
            0..=2 => Ok(StatusFilter::Only(MessageStatus::from(raw))),
            other => Err(QueryError::InvalidStatus(other)),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "initialized" | "init" => Ok(StatusFilter::Only(MessageStatus::Initialized)),
            "success" => Ok(StatusFilter::Only(MessageStatus::Success)),
            "failure" | "failed" => Ok(StatusFilter::Only(MessageStatus::Failure)),
            other => other
                .parse::<i32>()
                .map_err(|_| QueryError::UnknownStatusName(s.to_string()))
                .and_then(StatusFilter::try_from),
        }
    }
}

/// Creation-time window, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    pub fn new<Tz: TimeZone>(start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        Self {
            start: start.with_timezone(&Utc),
            end: end.with_timezone(&Utc),
        }
    }

    pub fn start_ms(&self) -> i64 {
        self.start.timestamp_millis()
    }

    pub fn end_ms(&self) -> i64 {
        self.end.timestamp_millis()
    }
}

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    number: u32,
    size: u32,
}

impl Page {
    pub fn new(number: u32, size: u32) -> Result<Self, QueryError> {
        if number == 0 {
            return Err(QueryError::InvalidPageNumber(number));
        }
        if size == 0 {
            return Err(QueryError::InvalidPageSize(size));
        }
        Ok(Self { number, size })
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }
}

/// Operator-facing filter state, before paging is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub table: Option<String>,
    /// Exact match on the message key.
    pub key: Option<String>,
    pub status: StatusFilter,
    pub date_range: Option<DateRange>,
}

/// The `query` object of a list request, exactly as the backend reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    pub offset: u64,
    pub limit: u32,
    pub status: i32,
}

impl ListQuery {
    pub fn build(filter: &ListFilter, page: Page) -> Self {
        Self {
            table: non_empty(filter.table.as_deref()),
            key: non_empty(filter.key.as_deref()),
            start_time: filter.date_range.map(|range| range.start_ms()),
            end_time: filter.date_range.map(|range| range.end_ms()),
            offset: page.offset(),
            limit: page.size(),
            status: filter.status.code(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Serialize)]
pub struct ListRequest<'a> {
    pub biz: &'a str,
    pub db: &'a str,
    pub query: ListQuery,
}

#[derive(Debug, Serialize)]
pub struct RetryRequest<'a> {
    pub biz: &'a str,
    pub db: &'a str,
    pub table: &'a str,
    pub id: i64,
}
