use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    Validation(String),
    StorageRead(String),
    StorageWrite(String),
    StorageDelete(String),
    Io(String),
}

impl AppError {
    pub fn validation<M: Into<String>>(message: M) -> Self {
        Self::Validation(message.into())
    }

    pub fn storage_read<M: Into<String>>(message: M) -> Self {
        Self::StorageRead(message.into())
    }

    pub fn storage_write<M: Into<String>>(message: M) -> Self {
        Self::StorageWrite(message.into())
    }

    pub fn storage_delete<M: Into<String>>(message: M) -> Self {
        Self::StorageDelete(message.into())
    }

    pub fn io<M: Into<String>>(message: M) -> Self {
        Self::Io(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::StorageRead(_) => "storage_read",
            Self::StorageWrite(_) => "storage_write",
            Self::StorageDelete(_) => "storage_delete",
            Self::Io(_) => "io_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Validation(message) => message,
            Self::StorageRead(message) => message,
            Self::StorageWrite(message) => message,
            Self::StorageDelete(message) => message,
            Self::Io(message) => message,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.code(), self.message())
    }
}

impl std::error::Error for AppError {}
