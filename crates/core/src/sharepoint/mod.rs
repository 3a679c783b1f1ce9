//! SharePoint target store: Azure AD token acquisition, Graph API list
//! operations, and the REST attachment endpoint.

pub mod auth;
pub mod client;

pub use auth::TokenClient;
pub use client::SharePointClient;
