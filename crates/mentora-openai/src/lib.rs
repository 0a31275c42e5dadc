// OpenAI LLM client
//
// Production LlmClient implementation speaking the OpenAI Chat Completions
// protocol. Calls are non-streaming: Mentora agents stream step events to
// their callers, not model tokens.

mod client;

pub use client::OpenAiClient;

#[cfg(test)]
mod tests;
