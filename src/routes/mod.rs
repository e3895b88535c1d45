/// Router Module Index
///
/// Splits the host application by how the route guard treats it.

/// Pages anyone may visit, plus API routes the guard never runs on.
pub mod public;

/// Account pages: the guard demands a session.
pub mod authenticated;

/// Admin pages: the guard demands a session.
pub mod admin;
