pub mod dead_letter;
pub mod error;
pub mod message;

pub use dead_letter::{DeadLetterRecorder, DeadLetterRepository};
pub use error::{RecordError, SaveError, StorageError};
pub use message::{MessageGateway, MessageRepository};
