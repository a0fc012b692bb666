//! Auto-submitting POST redirect. Webpay expects the buyer's browser to post
//! `token_ws` as a form field, which a plain 30x cannot do.

use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use html_escape::encode_quoted_attribute;

const FORM_NAME: &str = "webpayForm";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectForm {
    url: String,
    params: Vec<(String, String)>,
}

impl RedirectForm {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn render(&self) -> String {
        let mut html = format!(
            "<form action='{}' method='POST' name='{}'>",
            encode_quoted_attribute(&self.url),
            FORM_NAME
        );
        for (name, value) in &self.params {
            html.push_str(&format!(
                "<input type='hidden' name='{}' value='{}'>",
                encode_quoted_attribute(name),
                encode_quoted_attribute(value)
            ));
        }
        html.push_str(&format!(
            "</form><script>document.{}.submit();</script>",
            FORM_NAME
        ));
        html
    }
}

/// Emitting the form ends the request.
impl IntoResponse for RedirectForm {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [(header::CACHE_CONTROL, "no-store")],
            Html(self.render()),
        )
            .into_response()
    }
}
