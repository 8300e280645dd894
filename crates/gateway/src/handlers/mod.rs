pub mod chat;
pub mod conflicts;
pub mod consent;
pub mod deal_parse;
pub mod summarize;
