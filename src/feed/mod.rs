mod detect;
mod extract;
mod fetch;
mod normalize;
mod source;
mod text;

pub use detect::{Format, FormatHint, FormatKind, detect, detect_with_hint};
pub use extract::{JsonAsset, JsonItem, RawFields, extract_from_json_item, extract_from_xml_item};
pub use fetch::{DEFAULT_TIMEOUT, FetchOptions, FetchedFeed, fetch_source, proxied_url};
pub use normalize::{Enclosure, Episode, TitleStyle, UNTITLED, normalize, normalize_with_hint};
pub use source::FeedSource;
pub use text::{clean_text, parse_duration_ms, parse_pub_date};
