use tracing::{error, info, instrument, warn};

use crate::models::{MessageStatus, OutboxMessage};
use crate::notify::Notice;
use crate::outbox::{MessagePage, OutboxGateway, RequestAccepted};
use crate::query::{ListFilter, Page};

/// Result of loading a page: the page to show and, on failure, what to tell the operator.
#[derive(Debug, Clone, PartialEq)]
pub struct PageOutcome {
    pub page: MessagePage,
    pub notice: Option<Notice>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryOutcome {
    pub accepted: Option<RequestAccepted>,
    pub notice: Notice,
}

/// A re-read row showed the message as delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverySucceeded {
    pub id: i64,
    pub send_times: u32,
    pub utime: i64,
}

impl DeliverySucceeded {
    pub fn observe(row: &OutboxMessage) -> Option<Self> {
        row.status.is_terminal().then(|| Self {
            id: row.id,
            send_times: row.send_times,
            utime: row.utime,
        })
    }
}

/// What a re-fetched page says about a retried message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recheck {
    Delivered(DeliverySucceeded),
    NotYet(MessageStatus),
    NotOnPage,
}

/// Loads one page. Transport failures are logged here and turned into an
/// empty, unsuccessful page plus an error notice.
#[instrument(skip_all, fields(%biz, %db, page = page.number()))]
pub async fn load_page(
    gateway: &OutboxGateway,
    biz: &str,
    db: &str,
    filter: &ListFilter,
    page: Page,
) -> PageOutcome {
    match gateway.list_messages(biz, db, filter, page).await {
        Ok(loaded) => PageOutcome {
            page: loaded,
            notice: None,
        },
        Err(e) => {
            error!(%biz, status = ?e.status(), "Failed to list outbox messages: {}", e);
            PageOutcome {
                page: MessagePage::failed(),
                notice: Some(Notice::system_error(e.display_status())),
            }
        }
    }
}

/// Requests a retry for one row.
///
/// The success notice goes out on acceptance alone, before anything is known
/// about delivery.
#[instrument(skip_all, fields(%biz, %db, %table, id = id))]
pub async fn retry(
    gateway: &OutboxGateway,
    biz: &str,
    db: &str,
    table: &str,
    id: i64,
) -> RetryOutcome {
    match gateway.retry_message(biz, db, table, id).await {
        Ok(accepted) => {
            info!(id, "Retry requested; re-list to observe delivery.");
            RetryOutcome {
                accepted: Some(accepted),
                notice: Notice::retry_accepted(),
            }
        }
        Err(e) => {
            error!(id, "Failed to request retry: {}. The message was NOT retried.", e);
            RetryOutcome {
                accepted: None,
                notice: Notice::system_error(e.display_status()),
            }
        }
    }
}

/// Looks for a retried row on a freshly loaded page.
///
/// `previous` is the status the operator saw before retrying, when known.
pub fn recheck(id: i64, previous: Option<MessageStatus>, page: &MessagePage) -> Recheck {
    let Some(row) = page.rows.iter().find(|row| row.id == id) else {
        return Recheck::NotOnPage;
    };

    if let Some(previous) = previous {
        if !previous.can_transition_to(row.status) {
            warn!(
                id,
                from = previous.label(),
                to = row.status.label(),
                "Unexpected status transition after retry."
            );
        }
    }

    match DeliverySucceeded::observe(row) {
        Some(delivered) => Recheck::Delivered(delivered),
        None => Recheck::NotYet(row.status),
    }
}
