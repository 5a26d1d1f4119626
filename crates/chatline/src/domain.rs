pub mod chat_item;
pub mod command;
pub mod document;
pub mod key;
pub mod prompt;
pub mod quick_pick;
