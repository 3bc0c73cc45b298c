use uuid::Uuid;

/// Per-request context, inserted into the request extensions by
/// [`request_context`](crate::middleware::request_context). Its id is the one
/// echoed in `x-request-id`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RequestContext {
    request_id: Uuid,
}

impl RequestContext {
    /// Fresh context with a time-ordered (v7) request id.
    pub fn new() -> Self {
        Self {
            request_id: Uuid::now_v7(),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
