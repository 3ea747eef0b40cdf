//! Typed wrappers over `ApiClient`, one per backend area

mod auth;
mod records;
mod users;

pub use auth::AuthApi;
pub use records::MedicalRecordsApi;
pub use users::UsersApi;
