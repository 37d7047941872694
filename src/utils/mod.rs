pub mod clock;
pub use clock::{Clock, ManualClock, SystemClock};
pub mod credentials;
pub use credentials::{mask_credential, normalize_credentials};
pub mod url_validation;
pub use url_validation::{UrlValidationError, validate_provider_base_url};
