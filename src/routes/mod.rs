/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules.
/// The access tier of every endpoint is visible from which module registers it
/// and from the extractors in its handler signature.

/// Routes accessible to all visitors: reading posts and comments, the account
/// forms, and the informational pages.
pub mod public;

/// Routes requiring a validated session cookie, enforced by the `AuthUser`
/// extractor in each handler signature.
pub mod authenticated;

/// Routes restricted to the site owner (the 'admin' role).
/// The privilege check itself runs inside each handler.
pub mod admin;
