//! Seams between the data-access layer and the outside world.

use async_trait::async_trait;

use crate::error::FeedResult;
use crate::request::ApiRequest;
use crate::resource::Resource;
use crate::Payload;

/// Opaque request primitive: turns an [`ApiRequest`] into JSON or a failure.
///
/// Any transport works as long as it honours this contract. Timeouts belong
/// here: the data-access layer never cancels an operation itself.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, request: &ApiRequest) -> FeedResult<Payload>;
}

/// Callback invoked with freshly loaded data for a resource.
///
/// Called for cache hits as well as network loads, so a widget always
/// reflects what its loader returned.
pub trait Renderer: Send + Sync {
    fn render(&self, resource: Resource, data: &Payload);
}

/// Renderer for callers that only want the data.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRenderer;

impl Renderer for NoopRenderer {
    fn render(&self, _resource: Resource, _data: &Payload) {}
}
