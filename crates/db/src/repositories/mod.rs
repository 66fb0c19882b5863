//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods. Methods
//! that participate in a caller's transaction accept `&mut PgConnection`;
//! standalone reads and writes accept `&PgPool`.

pub mod activity_repo;
pub mod badge_repo;
pub mod event_repo;
pub mod like_job_repo;
pub mod like_repo;
pub mod subject_repo;
pub mod user_level_repo;

pub use activity_repo::ActivityRepo;
pub use badge_repo::BadgeRepo;
pub use event_repo::EventRepo;
pub use like_job_repo::LikeJobRepo;
pub use like_repo::LikeRepo;
pub use subject_repo::SubjectRepo;
pub use user_level_repo::UserLevelRepo;
