pub mod store;
pub mod tester;

pub use store::{Credential, CredentialStore};
pub use tester::CredentialTester;
