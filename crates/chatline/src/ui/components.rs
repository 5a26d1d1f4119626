//! Reusable terminal widgets composed by the frame renderer.

pub mod chat_list;
pub mod footer_bar;
pub mod prompt_input;
pub mod quick_pick;
pub mod tab_bar;
pub mod top_bar;
