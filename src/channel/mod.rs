pub mod filter;
pub mod lister;
pub mod resolver;

pub use filter::{apply_date_filter, DateFilter};
pub use lister::collect_channel_videos;
pub use resolver::resolve_channel_reference;
