//! Post content: storage format, draft validation and the publish pipeline.
pub mod format;
pub mod publish;
pub mod validate;

pub use format::{
    FormatError, ImageUpload, METADATA_VERSION, PackedImage, PostImage, PostMetadata, pack_images,
    unpack_images,
};
pub use publish::{PostDraft, PublishError, PublishProgress, PublishStep, Publisher};
pub use validate::{ValidationError, validate_post};
