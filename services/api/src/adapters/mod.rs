pub mod exchange_rates;
pub mod gotify;
pub mod insight_llm;
pub mod json_store;
pub mod smtp;

pub use exchange_rates::ErApiRatesAdapter;
pub use gotify::GotifyAdapter;
pub use insight_llm::OpenAiInsightAdapter;
pub use json_store::JsonFileStore;
pub use smtp::SmtpAdapter;
