//! Media references: turning pasted links into video ids and looking up
//! display metadata for them.

mod id;
mod metadata;

pub use id::{MediaId, MEDIA_ID_LEN};
pub use metadata::{MediaMetadata, MetadataClient, DEFAULT_OEMBED_ENDPOINT};
