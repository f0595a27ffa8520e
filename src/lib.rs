pub mod cli;
pub mod config;
pub mod extract;
pub mod field_key;
pub mod ledger;
pub mod pipeline;
pub mod record;
pub mod render;
pub mod report;
pub mod sanitize;
pub mod scheme;
pub mod script;
pub mod summary;
pub mod util;
pub mod validation;
