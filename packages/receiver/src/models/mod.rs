pub mod dead_letter;
pub mod message;
