pub mod analytics;
pub mod args;
mod backup;
pub mod commands;
mod config;
mod db;
mod error;
pub mod export;
pub mod model;
mod utils;


pub use backup::Backup;
pub use config::Config;
pub use db::{
    CategoryStatistics, Db, Page, ReceiptQuery, ReceiptStatistics, SortDirection, SortField,
    DEFAULT_PAGE_SIZE,
};
pub use error::{Error, ErrorType, Result};
