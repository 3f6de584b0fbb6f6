pub mod chat_llm;
pub mod db;

pub use chat_llm::OpenAiTutorAdapter;
pub use db::DbAdapter;
