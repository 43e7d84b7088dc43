pub mod output;
pub mod progress;
pub mod prompts;
pub mod signals;

pub use output::{OutputFormatter, OutputMode};
pub use progress::{finish_progress_with_summary, ProgressManager};
pub use prompts::MenuChoice;
pub use signals::GracefulShutdown;
