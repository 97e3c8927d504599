pub mod comment;
pub mod topic;
pub mod vote;
