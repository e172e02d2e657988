//! Cursor pagination
//!
//! List endpoints return one page of records plus a `cursor` to pass back for
//! the next page. [`Client::fetch_all`] follows the cursor until the server
//! stops returning one, a page limit is hit, or a record matches the stop
//! predicate.

use crate::client::Client;
use crate::request::{HttpMethod, QueryValue, XrpcRequest};
use crate::{Error, Result};
use config_store::ConfigStore;
use serde_json::{Map, Value};

/// Query parameter and response field carrying the cursor
pub const CURSOR: &str = "cursor";

type RecordPredicate = Box<dyn Fn(&Value) -> bool + Send + Sync>;

/// Progress marker printed before each page request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Progress {
    /// Use the client's `default_progress`
    #[default]
    Default,
    /// Print nothing
    Off,
    /// Print this marker
    Show(String),
}

impl From<&str> for Progress {
    fn from(marker: &str) -> Self {
        Progress::Show(marker.to_string())
    }
}

impl From<String> for Progress {
    fn from(marker: String) -> Self {
        Progress::Show(marker)
    }
}

/// Options for [`Client::fetch_all`]
///
/// # Examples
/// ```
/// use minisky_client::{FetchAllOptions, Progress};
///
/// let options = FetchAllOptions::new()
///     .field("feed")
///     .break_when(|item| item["post"]["indexedAt"].as_str() < Some("2024-01-01"))
///     .max_pages(10)
///     .progress(Progress::Off);
/// # let _ = options;
/// ```
#[derive(Default)]
pub struct FetchAllOptions {
    field: Option<String>,
    break_when: Option<RecordPredicate>,
    max_pages: Option<usize>,
    progress: Progress,
}

impl FetchAllOptions {
    /// Options with nothing set
    pub fn new() -> Self {
        Self::default()
    }

    /// Response field holding the array of records
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Stop after the first page containing a matching record
    ///
    /// Matching records are left out of the result, whichever page they
    /// came from.
    pub fn break_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.break_when = Some(Box::new(predicate));
        self
    }

    /// Request at most this many pages
    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Progress marker for this call
    pub fn progress(mut self, progress: impl Into<Progress>) -> Self {
        self.progress = progress.into();
        self
    }

    fn matches(&self, record: &Value) -> bool {
        self.break_when.as_ref().is_some_and(|predicate| predicate(record))
    }
}

impl std::fmt::Debug for FetchAllOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchAllOptions")
            .field("field", &self.field)
            .field("break_when", &self.break_when.is_some())
            .field("max_pages", &self.max_pages)
            .field("progress", &self.progress)
            .finish()
    }
}

/// Names of the array-valued fields of a page
fn array_fields(page: &Map<String, Value>) -> Vec<String> {
    page.iter()
        .filter(|(_, value)| value.is_array())
        .map(|(key, _)| key.clone())
        .collect()
}

impl<S: ConfigStore> Client<S> {
    /// Fetch every page of a list endpoint and return all records in order
    ///
    /// The request's `cursor` parameter is managed here. Any error aborts the
    /// whole call; records collected so far are dropped.
    pub async fn fetch_all(
        &self,
        request: XrpcRequest,
        options: FetchAllOptions,
    ) -> Result<Vec<Value>> {
        if request.method != HttpMethod::Get {
            return Err(Error::InvalidArgument(
                "fetch_all requires a GET request".to_string(),
            ));
        }

        let progress = match &options.progress {
            Progress::Default => self.config.default_progress.clone(),
            Progress::Off => None,
            Progress::Show(marker) => Some(marker.clone()),
        };

        let mut request = request;
        let mut records = Vec::new();
        let mut pages = 0;

        loop {
            if let Some(marker) = &progress {
                self.write_progress(marker);
            }

            let mut page = match self.execute(&request).await? {
                Value::Object(page) => page,
                other => {
                    return Err(Error::InvalidResponse(format!(
                        "Expected a JSON object page, got: {}",
                        other
                    )))
                }
            };

            let Some(field) = options.field.as_deref() else {
                return Err(Error::FieldNotSet { fields: array_fields(&page) });
            };

            let page_records = match page.remove(field) {
                Some(Value::Array(items)) => items,
                Some(_) => {
                    return Err(Error::InvalidResponse(format!("Field {:?} is not an array", field)))
                }
                None => return Err(Error::InvalidResponse(format!("Missing field {:?}", field))),
            };
            let cursor = page.remove(CURSOR).filter(|cursor| !cursor.is_null());

            let stop = page_records.iter().any(|record| options.matches(record));
            records.extend(page_records);
            pages += 1;

            tracing::debug!("Fetched page {} of {}, {} records so far", pages, request.target, records.len());

            let Some(cursor) = cursor else {
                break;
            };
            request.params.set(CURSOR, QueryValue::from(&cursor));

            if stop || options.max_pages.is_some_and(|max| pages >= max) {
                break;
            }
        }

        if options.break_when.is_some() {
            records.retain(|record| !options.matches(record));
        }

        Ok(records)
    }
}
