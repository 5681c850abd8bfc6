mod client;

pub use client::{FeedSource, FeedlyClient, StreamPage, StreamQuery};
