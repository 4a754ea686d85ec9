mod functions;
mod mailer;

pub use functions::FunctionsClient;
pub use mailer::{Mailer, DEFAULT_EMAIL_API_URL};
