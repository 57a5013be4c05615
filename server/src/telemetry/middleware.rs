use std::{borrow::Cow, sync::Arc, time::Duration};

use axum::{
    extract::MatchedPath,
    http::{header, Method, Request, Response, Version},
};
use tower_http::{
    classify::{ServerErrorsAsFailures, ServerErrorsFailureClass, SharedClassifier},
    trace::{MakeSpan, OnFailure, OnRequest, OnResponse, TraceLayer},
};
use tracing::{field::Empty, Span};

use crate::error::Error;

pub fn new() -> TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    RequestMakeSpan,
    RequestOnRequest,
    RequestOnResponse,
    tower_http::trace::DefaultOnBodyChunk,
    tower_http::trace::DefaultOnEos,
    RequestOnFailure,
> {
    TraceLayer::new_for_http()
        .make_span_with(RequestMakeSpan)
        .on_request(RequestOnRequest)
        .on_response(RequestOnResponse)
        .on_failure(RequestOnFailure)
}

#[derive(Clone)]
pub struct RequestMakeSpan;

impl<B> MakeSpan<B> for RequestMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let user_agent = request
            .headers()
            .get(header::USER_AGENT)
            .map_or("", |v| v.to_str().unwrap_or(""));
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map_or("", |path| path.as_str());
        let target = request
            .uri()
            .path_and_query()
            .map_or("", |target| target.as_str());
        let method = http_method(request.method());
        let flavor = http_flavor(request.version());
        tracing::info_span!(
            "Http Request",
            http.method = %method,
            http.flavor = %flavor,
            http.target = target,
            http.route = route,
            http.status_code = Empty,
            http.user_agent = user_agent,
            error.message = Empty,
            error.trace = Empty,
        )
    }
}

fn http_flavor(version: Version) -> Cow<'static, str> {
    match version {
        Version::HTTP_09 => "0.9".into(),
        Version::HTTP_10 => "1.0".into(),
        Version::HTTP_11 => "1.1".into(),
        Version::HTTP_2 => "2.0".into(),
        Version::HTTP_3 => "3.0".into(),
        other => format!("{other:?}").into(),
    }
}

fn http_method(method: &Method) -> Cow<'static, str> {
    match *method {
        Method::GET => "GET".into(),
        Method::HEAD => "HEAD".into(),
        Method::POST => "POST".into(),
        Method::PUT => "PUT".into(),
        Method::DELETE => "DELETE".into(),
        Method::OPTIONS => "OPTIONS".into(),
        Method::PATCH => "PATCH".into(),
        ref other => other.to_string().into(),
    }
}

#[derive(Clone)]
pub struct RequestOnRequest;

impl<B> OnRequest<B> for RequestOnRequest {
    fn on_request(&mut self, _request: &Request<B>, _span: &Span) {
        tracing::debug!("started processing request");
    }
}

#[derive(Clone)]
pub struct RequestOnResponse;

impl<B> OnResponse<B> for RequestOnResponse {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        let status = response.status();
        span.record("http.status_code", status.as_u16());
        let latency = latency.as_millis() as u64;
        let Some(error) = response.extensions().get::<Arc<Error>>() else {
            tracing::debug!(latency, "finished processing request");
            return;
        };
        span.record("error.message", tracing::field::display(error.kind()));
        if let Some(trace) = error.format_trace() {
            span.record("error.trace", trace.as_str());
        }
        if status.is_server_error() {
            tracing::error!(latency, error = %error.kind(), "request failed");
        } else {
            tracing::debug!(latency, error = %error.kind(), "request rejected");
        }
    }
}

#[derive(Clone)]
pub struct RequestOnFailure;

impl OnFailure<ServerErrorsFailureClass> for RequestOnFailure {
    fn on_failure(
        &mut self,
        classification: ServerErrorsFailureClass,
        _latency: Duration,
        _span: &Span,
    ) {
        if let ServerErrorsFailureClass::Error(message) = classification {
            tracing::error!(failure = %message, "response failed");
        }
    }
}
