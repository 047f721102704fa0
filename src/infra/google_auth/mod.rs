// =============================================================================
// GOOGLE AUTH MODULE
// =============================================================================
//
// Every flow here ends in the same place: a bearer token for the Docs API
// with the `documents` scope. The Docs client only sees the
// `AccessTokenProvider` trait, so the flow is picked at startup.
//
// **Flows:**
// 1. **Installed app** (desktop): browser consent with a loopback redirect.
// 2. **Service account**: signed JWT exchanged for a token. The document
//    owner must share the folder with the service account email.
// 3. **Application default credentials**: whatever identity the host
//    already has (gcloud login, GOOGLE_APPLICATION_CREDENTIALS, or the
//    metadata server on GCE / hosted notebooks).
// 4. **Static token**: a token minted elsewhere, e.g. `gcloud auth
//    print-access-token`.

pub mod access_token;
pub mod application_default;
pub mod installed_app;
pub mod service_account;

pub use access_token::{AccessTokenProvider, StaticTokenProvider};
pub use application_default::ApplicationDefaultCredentials;
pub use installed_app::InstalledAppFlow;
pub use service_account::ServiceAccountAuth;

/// Read/write access to Google Docs.
pub const DOCUMENTS_SCOPE: &str = "https://www.googleapis.com/auth/documents";

/// Google's OAuth2 token endpoint, used when a credentials file omits one.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
