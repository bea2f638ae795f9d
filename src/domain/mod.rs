mod application_base_url;
mod subscriber_email;
mod subscriber_token;

pub use application_base_url::ApplicationBaseUrl;
pub use subscriber_email::SubscriberEmail;
pub use subscriber_token::SubscriberToken;
