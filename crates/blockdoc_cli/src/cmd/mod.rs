/// Decode/re-encode validation command.
pub mod check;
/// Full decode rendering command.
pub mod dump;
/// Block table information command.
pub mod info;
/// Decode-then-encode rewrite command.
pub mod rewrite;
/// Schema listing command.
pub mod schema;
/// Shared schema loading and JSON helpers.
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;
