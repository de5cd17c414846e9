pub mod assets;
pub mod content;
pub mod feed;
pub mod legacy;

pub use assets::{AssetError, AssetService, ImageResizer, PassthroughResizer, ProfilePhotoSize};
pub use content::{ContentError, ContentService};
pub use feed::{FeedCache, FeedError, FeedSource, HttpFeedClient};
pub use legacy::LegacyService;
