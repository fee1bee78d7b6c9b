use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    UnknownPin,
    QueueFull,
    PinDriver,
    Storage,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownPin => write!(f, "Pin is not part of the switch map"),
            Error::QueueFull => write!(f, "Command queue is full"),
            Error::PinDriver => write!(f, "Pin driver error"),
            Error::Storage => write!(f, "Config store error"),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
