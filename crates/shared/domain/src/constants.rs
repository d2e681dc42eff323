//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.
//! Upper bounds mirror the column widths of the `users` table.

// =============================================================================
// Username
// =============================================================================

/// Minimum username length in characters
pub const MIN_USERNAME_LENGTH: usize = 3;

/// Maximum username length in characters (`VARCHAR(100)`)
pub const MAX_USERNAME_LENGTH: usize = 100;

// =============================================================================
// Email
// =============================================================================

/// Maximum email length in characters (`VARCHAR(255)`)
pub const MAX_EMAIL_LENGTH: usize = 255;

// =============================================================================
// Full name
// =============================================================================

/// Maximum full name length in characters (`VARCHAR(255)`)
pub const MAX_FULL_NAME_LENGTH: usize = 255;
