//! Small shared utilities: id generation and collection helpers.

pub mod collections;
pub mod id_generator;
