use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio unavailable: {0}")]
    Unavailable(String),
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("pwm error: {0}")]
    Pwm(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
