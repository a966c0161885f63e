pub mod error;
pub mod processor;
pub mod scanner;
pub mod types;
pub mod validator;
pub mod writer;

pub use error::{CoreError, Result};
pub use processor::FileProcessor;
pub use scanner::MarkerScanner;
pub use types::{CacheFile, ExtractedImage, ScanStats, Segment};
pub use writer::{clear_dir, AtomicWriter, RetryPolicy};
