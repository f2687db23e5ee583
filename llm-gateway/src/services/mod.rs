pub mod chat_service;
pub mod embeddings_service;
