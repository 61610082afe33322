use std::collections::HashMap;

use html_minifier::HTMLMinifier;
use percent_encoding::percent_decode_str;
use tera::Context;
use thiserror::Error;
use tide::log::error;
use tide::{http::StatusCode, Response};

use crate::State;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("failed to render template {template}")]
    Tera {
        template: &'static str,
        #[source]
        source: tera::Error,
    },
}

/// Renders a template and minifies the result, falling back to the unminified HTML if the
/// minifier chokes on it.
pub(super) fn render(
    state: &State,
    template: &'static str,
    context: &Context,
) -> Result<String, TemplateError> {
    let rendered = state
        .tera
        .render(template, context)
        .map_err(|source| TemplateError::Tera { template, source })?;

    let mut html_minifier = HTMLMinifier::new();
    if let Err(err) = html_minifier.digest(&rendered) {
        error!("Failed to minify {}: {}", template, err);
        return Ok(rendered);
    };

    match std::str::from_utf8(html_minifier.get_html()) {
        Ok(minified) => Ok(minified.to_string()),
        Err(err) => {
            error!("Minified {} is not valid UTF-8: {}", template, err);
            Ok(rendered)
        },
    }
}

pub(super) fn html_response(body: String) -> Response {
    Response::builder(StatusCode::Ok)
        .content_type(tide::http::mime::HTML)
        .body(body)
        .build()
}

/// Decodes a query string into a name to value map. A repeated name keeps its last value.
///
/// Names are taken literally, so `a[b]=c` is stored under `a[b]`.
pub(super) fn query_params(query: Option<&str>) -> tide::Result<HashMap<String, String>> {
    let mut params = HashMap::new();

    for pair in query.unwrap_or("").split('&').filter(|pair| !pair.is_empty()) {
        let (name, value) = match pair.find('=') {
            Some(idx) => (&pair[..idx], &pair[idx + 1..]),
            None => (pair, ""),
        };
        params.insert(decode_query_component(name)?, decode_query_component(value)?);
    }

    Ok(params)
}

fn decode_query_component(raw: &str) -> tide::Result<String> {
    let raw = raw.replace('+', " ");
    match percent_decode_str(&raw).decode_utf8() {
        Ok(decoded) => Ok(decoded.into_owned()),
        Err(err) => Err(tide::Error::from_str(
            StatusCode::BadRequest,
            format!("query string is not valid UTF-8: {}", err),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_state, MemoryPhotos};

    #[test]
    fn query_params_decode_and_keep_last_value() {
        let params =
            query_params(Some("the_caption=a&the_caption=b&the_source=50%25+off&flag&&x=a=b"))
                .unwrap();

        assert_eq!(params["the_caption"], "b");
        assert_eq!(params["the_source"], "50% off");
        assert_eq!(params["flag"], "");
        assert_eq!(params["x"], "a=b");
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn query_params_take_bracketed_names_literally() {
        let params = query_params(Some("the_source%5Bk%5D=x&the_caption[]=y")).unwrap();

        assert_eq!(params["the_source[k]"], "x");
        assert_eq!(params["the_caption[]"], "y");
        assert!(!params.contains_key("the_source"));
    }

    #[test]
    fn query_params_without_query_are_empty() {
        assert!(query_params(None).unwrap().is_empty());
        assert!(query_params(Some("")).unwrap().is_empty());
    }

    #[test]
    fn query_params_reject_invalid_utf8() {
        let err = query_params(Some("the_caption=%FF")).unwrap_err();
        assert_eq!(err.status(), StatusCode::BadRequest);
    }

    #[test]
    fn render_error_names_the_template() {
        let state = test_state(MemoryPhotos::new());

        let err = render(&state, "photos/missing.html", &Context::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to render template photos/missing.html"
        );
    }
}
