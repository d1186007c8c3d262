pub mod error;
pub mod extract;
pub mod fetch;
pub mod normalize;

pub use error::ScraperError;
pub use extract::FavoriteExtractor;
pub use fetch::{
    ChromiumRenderer, FetchSettings, PageFetcher, RenderSession, Renderer, FAVOURITES_SELECTOR,
};
pub use normalize::ImageNormalizer;
