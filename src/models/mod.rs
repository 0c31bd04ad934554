pub mod review;

pub use review::{PullRequest, Repository, ReviewComment, Severity};
