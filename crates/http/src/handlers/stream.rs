use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Uri};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use nbsim_core::constants::STREAM_ROUTE_PREFIX;
use nbsim_service::stream_notebook_html;

use crate::api_error::ApiError;
use crate::AppState;

/// `GET /_stream/{*path}`: chunked HTML of the notebook for `/path`, one
/// completed cell at a time.
///
/// The path is taken undecoded from the URI so that it hashes to the same
/// artifact key as the viewer page that linked here.
///
/// Fails with 404 only when generation never starts; later errors end the
/// document early.
pub async fn stream_notebook(
    State(state): State<Arc<AppState>>,
    uri: Uri,
) -> Result<Response, ApiError> {
    let path = uri.path().strip_prefix(STREAM_ROUTE_PREFIX).unwrap_or("/").to_owned();
    let mut fragments = Box::pin(stream_notebook_html(
        Arc::clone(&state.service),
        path.clone(),
        state.stream_settings.clone(),
    ));

    let first = match fragments.next().await {
        Some(first) => first?,
        None => String::new(),
    };

    let body = async_stream::stream! {
        yield Ok::<String, Infallible>(first);
        while let Some(fragment) = fragments.next().await {
            match fragment {
                Ok(html) => yield Ok(html),
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "streamed notebook ended early");
                    break;
                },
            }
        }
    };

    Ok(([(header::CONTENT_TYPE, "text/html; charset=utf-8")], Body::from_stream(body)).into_response())
}
