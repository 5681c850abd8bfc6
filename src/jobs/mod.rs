mod feed_to_playlist;
mod feed_to_store;

pub use feed_to_playlist::{FeedToPlaylistJob, PlaylistSettings};
pub use feed_to_store::FeedToStoreJob;
