pub mod overlay;
pub mod prompt;
pub mod quick_pick;
