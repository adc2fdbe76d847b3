//! Addressing contract between the coordinator and the side panel's connect
//! screen. The coordinator builds the path; the screen parses it back.
//!
//! Parse failures are hard errors: these parameters are always written by the
//! coordinator, so a malformed value means broken wiring, not hostile input.

use thiserror::Error;
use url::form_urlencoded;

use crate::events::RequestId;
use crate::lock::CONNECT_ROUTE_PREFIX;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("{0} query param is required for connect")]
    Missing(&'static str),
    #[error("{field} query param should be a number, got {value}")]
    NotANumber { field: &'static str, value: String },
    #[error("forOrigin query param must not be empty")]
    EmptyOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequestParams {
    pub tab_id: u64,
    pub request_id: RequestId,
    pub for_origin: String,
}

impl ConnectRequestParams {
    /// `<base_path>?connect=1&tabId=..&requestId=..&forOrigin=..` with the
    /// origin URL-encoded.
    pub fn to_path(&self, base_path: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("connect", "1")
            .append_pair("tabId", &self.tab_id.to_string())
            .append_pair("requestId", &self.request_id.to_string())
            .append_pair("forOrigin", &self.for_origin)
            .finish();
        format!("{base_path}?{query}")
    }

    /// Parses a path or URL carrying the connect query string.
    pub fn from_path(path: &str) -> Result<Self, QueryError> {
        let query = path.split_once('?').map(|(_, q)| q).unwrap_or("");
        Self::from_query(query)
    }

    pub fn from_query(query: &str) -> Result<Self, QueryError> {
        let mut tab_id = None;
        let mut request_id = None;
        let mut for_origin = None;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "tabId" => tab_id = Some(value.into_owned()),
                "requestId" => request_id = Some(value.into_owned()),
                "forOrigin" => for_origin = Some(value.into_owned()),
                _ => {}
            }
        }

        let tab_id = parse_number("tabId", tab_id)?;
        let request_id = parse_number("requestId", request_id)?;
        let for_origin = for_origin.ok_or(QueryError::Missing("forOrigin"))?;
        if for_origin.trim().is_empty() {
            return Err(QueryError::EmptyOrigin);
        }
        Ok(Self {
            tab_id,
            request_id,
            for_origin,
        })
    }
}

/// Route the side panel serves for an entry path. The connect entry
/// (`?connect=1`) lands on [`CONNECT_ROUTE_PREFIX`] with its query kept;
/// anything else is served as-is.
pub fn side_panel_route(path: &str) -> String {
    match path.split_once('?') {
        Some((_, query)) if is_connect_query(query) => format!("{CONNECT_ROUTE_PREFIX}?{query}"),
        _ => path.to_owned(),
    }
}

fn is_connect_query(query: &str) -> bool {
    form_urlencoded::parse(query.as_bytes()).any(|(key, value)| key == "connect" && value == "1")
}

fn parse_number(field: &'static str, raw: Option<String>) -> Result<u64, QueryError> {
    let raw = raw
        .filter(|v| !v.is_empty())
        .ok_or(QueryError::Missing(field))?;
    raw.parse()
        .map_err(|_| QueryError::NotANumber { field, value: raw })
}
