//! Schema-driven codec engine for versioned block-structured binary files.

/// Schema loading, record/array/link codecs, and whole-file decode and encode.
pub mod codec;
