//! Persistent storage

mod archive;

pub use archive::{ArchiveError, ArchivedForecast, ForecastArchive};
