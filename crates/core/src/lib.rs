pub mod callbacks;
pub mod executor;
pub mod knowledge;
pub mod llm_client;
pub mod prompts;
pub mod streamer;
pub mod tools;
pub mod turn;
