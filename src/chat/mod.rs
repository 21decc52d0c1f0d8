//! Streaming chat exchanges with tool calls.

mod driver;
mod resolver;
mod session;

#[cfg(test)]
mod testing;

pub use driver::{
    decode_event, CallStyle, ChatBackend, Delta, DeltaStream, OpenAIChat, ToolCallFragment,
};
pub use resolver::{
    Resolution, Resolver, ResolverState, ToolCallRecord, DEFAULT_MAX_TOOL_ROUNDS,
};
pub use session::{ExchangeSink, Session};
