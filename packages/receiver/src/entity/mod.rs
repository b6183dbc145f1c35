pub mod dead_letter_message;
pub mod message;
