use thiserror::Error;

pub mod email;

pub use email::SummaryMailer;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("invalid notification configuration: {0}")]
    InvalidConfiguration(String),
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
    #[error("notification task aborted: {0}")]
    TaskAborted(String),
}
