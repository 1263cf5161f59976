//! Shared application state for the HTTP layer.

use std::sync::Arc;

use crate::queue::QuoteConsumer;
use crate::render::QuoteRenderer;

/// State handed to every HTTP handler. The renderer is the same instance the
/// queue consumer uses, so both paths produce identical documents.
#[derive(Clone)]
pub struct AppState {
    pub renderer: Arc<dyn QuoteRenderer + Send + Sync>,
    pub consumer: QuoteConsumer,
}
