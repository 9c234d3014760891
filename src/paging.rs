//! Cursor pagination for list requests.
//!
//! A page token records the scan position after the last row a page
//! consumed. Rows the filter rejected count towards the position too, so the
//! next page resumes exactly where the previous scan stopped. Tokens are only
//! meaningful for the query that produced them.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::storage::{Query, RowIter};

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 1000;

pub type PagingResult<T> = Result<T, PageTokenError>;

#[derive(Debug, Error)]
pub enum PageTokenError {
    #[error("page size must not be negative, got {0}")]
    NegativePageSize(i32),

    #[error("malformed page token {token:?}: {reason}")]
    Malformed { token: String, reason: String },
}

/// the page size to use for a request
///
/// zero selects `default`; anything above `max` is clamped, and a page
/// always holds at least one row
pub fn bound_page_size(requested: i32, default: usize, max: usize) -> PagingResult<usize> {
    let size = match requested {
        n if n < 0 => return Err(PageTokenError::NegativePageSize(n)),
        0 => default,
        n => n as usize,
    };
    Ok(size.min(max).max(1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageToken {
    pub offset: usize,
}

impl PageToken {
    pub fn encode(&self) -> String {
        // serializing a struct of one integer cannot fail
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(token: &str) -> PagingResult<Self> {
        let malformed = |reason: String| PageTokenError::Malformed {
            token: token.to_string(),
            reason,
        };
        let bytes = URL_SAFE_NO_PAD.decode(token).map_err(|e| malformed(e.to_string()))?;
        match serde_json::from_slice(&bytes).map_err(|e| malformed(e.to_string()))? {
            value @ Value::Object(_) => serde_json::from_value(value).map_err(|e| malformed(e.to_string())),
            _ => Err(malformed("not a JSON object".to_string())),
        }
    }
}

/// position `query` at the scan offset recorded in `token`
///
/// an empty token starts from the beginning
pub fn apply_cursor(query: Query, token: &str) -> PagingResult<Query> {
    if token.is_empty() {
        return Ok(query.offset(0));
    }
    Ok(query.offset(PageToken::decode(token)?.offset))
}

/// the token for the page after the one just read from `rows`
///
/// empty when the page came back short or the scan has nothing left
pub fn next_page_token(rows: &RowIter, returned: usize, page_size: usize) -> String {
    if returned < page_size || rows.is_exhausted() {
        return String::new();
    }
    PageToken {
        offset: rows.position(),
    }
    .encode()
}
