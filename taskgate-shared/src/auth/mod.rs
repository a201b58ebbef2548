//! Authentication and authorization
//!
//! - [`password`]: Argon2id hashing and password rules
//! - [`jwt`]: access, refresh and session tokens
//! - [`principal`]: the authenticated caller and their groups
//! - [`policy`]: capability checks, task visibility and guard rules
//!
//! # Example
//!
//! ```no_run
//! use taskgate_shared::auth::jwt::{create_token, Claims, TokenType};
//! use taskgate_shared::auth::password::{hash_password, verify_password};
//! use uuid::Uuid;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let hash = hash_password("user_password")?;
//! assert!(verify_password("user_password", &hash)?);
//!
//! let token = create_token(&Claims::new(Uuid::new_v4(), TokenType::Access), "secret-key")?;
//! # Ok(())
//! # }
//! ```

pub mod jwt;
pub mod password;
pub mod policy;
pub mod principal;
