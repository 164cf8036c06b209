pub mod batch;
pub mod url;

pub use batch::BatchRunner;
pub use url::RetryPolicy;
