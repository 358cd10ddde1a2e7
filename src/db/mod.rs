// SPDX-License-Identifier: MIT

//! Database layer (Firestore).

pub mod firestore;

pub use firestore::UserStore;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
}
