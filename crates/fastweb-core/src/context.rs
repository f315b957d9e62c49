//! Per-request context passed to every handler

use crate::{Method, Request, Response, StatusCode};
use bytes::Bytes;
use fastweb_router::Params;

/// Request being served plus the response under construction.
#[derive(Debug)]
pub struct Context {
    request: Request,
    response: Response,
    recovered: Option<String>,
}

impl Context {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: Response::default(),
            recovered: None,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn method(&self) -> Method {
        self.request.method
    }

    pub fn path(&self) -> &str {
        &self.request.path
    }

    pub fn query(&self) -> Option<&str> {
        self.request.query.as_deref()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.header(name)
    }

    pub fn body(&self) -> &Bytes {
        &self.request.body
    }

    /// Value captured for the wildcard `name` of the matched route
    pub fn param(&self, name: &str) -> Option<&str> {
        self.request.params.get(name)
    }

    pub fn params(&self) -> &Params {
        &self.request.params
    }

    pub(crate) fn set_params(&mut self, params: Params) {
        self.request.params = params;
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.response.status = status;
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.response.set_header(name, value);
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.response.body = body.into();
    }

    /// Responds with a `text/plain` body
    pub fn text(&mut self, status: StatusCode, body: impl Into<Bytes>) {
        self.write(status, "text/plain; charset=utf-8", body);
    }

    /// Responds with a `text/html` body
    pub fn html(&mut self, status: StatusCode, body: impl Into<Bytes>) {
        self.write(status, "text/html; charset=utf-8", body);
    }

    /// Responds with an already serialised JSON body
    pub fn json(&mut self, status: StatusCode, body: impl Into<Bytes>) {
        self.write(status, "application/json", body);
    }

    pub fn redirect(&mut self, location: &str, status: StatusCode) {
        self.set_status(status);
        self.set_header("location", location);
    }

    pub fn error(&mut self, message: &str, status: StatusCode) {
        self.text(status, message.to_string());
    }

    pub fn not_found(&mut self) {
        self.error("Not Found", StatusCode::NOT_FOUND);
    }

    /// Panic message caught while serving this request, if any
    pub fn recovered(&self) -> Option<&str> {
        self.recovered.as_deref()
    }

    /// Discards whatever a failed handler wrote and records the panic message.
    pub(crate) fn recover(&mut self, message: String) {
        self.response = Response::default();
        self.recovered = Some(message);
    }

    pub fn into_response(self) -> Response {
        self.response
    }

    fn write(&mut self, status: StatusCode, content_type: &str, body: impl Into<Bytes>) {
        self.set_status(status);
        self.set_header("content-type", content_type);
        self.set_body(body);
    }
}
