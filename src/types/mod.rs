// Relay wire types
pub mod chat_request;
pub mod chat_turn;
pub mod health_status;
pub mod page_context;
pub mod stream_event;

// Provider wire types
pub mod api_error;
pub mod content_block_delta;
pub mod message_create_params;
pub mod message_param;
pub mod message_stream_event;
pub mod model;
pub mod stop_reason;
pub mod text_delta;
pub mod usage;

// Re-exports
pub use api_error::{ApiErrorDetail, ApiErrorResponse};
pub use chat_request::{ChatRequest, SessionState};
pub use chat_turn::{ChatTurn, TurnRole};
pub use content_block_delta::{ContentBlockDelta, ContentBlockDeltaEvent};
pub use health_status::{ErrorBody, HealthStatus};
pub use message_create_params::MessageCreateParams;
pub use message_param::{MessageParam, MessageRole};
pub use message_stream_event::{
    ContentBlockStartEvent, ContentBlockStopEvent, MessageDelta, MessageDeltaEvent,
    MessageStartEvent, MessageStreamEvent, StreamMessage,
};
pub use model::{KnownModel, Model};
pub use page_context::PageContext;
pub use stop_reason::StopReason;
pub use stream_event::{DONE_SENTINEL, StreamEvent};
pub use text_delta::TextDelta;
pub use usage::Usage;
