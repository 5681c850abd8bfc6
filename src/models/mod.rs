mod entry;
mod track;

pub use entry::{Entry, FeedItem};
pub use track::{CatalogTrack, TrackId};
