pub mod chat_client;
pub mod translator;

pub use chat_client::{ChatCompletion, OpenAiChatClient};
pub use translator::Translator;
