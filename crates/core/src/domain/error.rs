// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid frequency: {0}")]
    InvalidFrequency(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Invalid maintenance type: {0}")]
    InvalidScheduleType(String),

    #[error("Invalid priority: {0}")]
    InvalidPriority(String),

    #[error("Checklist index {index} out of range (checklist has {len} items)")]
    ChecklistIndexOutOfRange { index: i64, len: usize },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Date out of range: {0}")]
    DateOutOfRange(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
