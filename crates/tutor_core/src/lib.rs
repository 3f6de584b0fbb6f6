pub mod domain;
pub mod ports;
pub mod prompt;
pub mod quota;

pub use domain::{Book, BookChunk, Feedback, Message, MessageRole, TutorReply, UserCredentials};
pub use ports::{DatabaseService, PortError, PortResult, TutorModelService};
