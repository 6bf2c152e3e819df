pub mod invoker;
pub mod retry;
pub mod session;

pub use invoker::{TranslationInvoker, TranslationOutcome};
pub use retry::{PollPolicy, RetryDecision, RetryPolicy};
pub use session::{language_url, RunController};
