pub use super::assignment::Entity as Assignment;
pub use super::attendance::Entity as Attendance;
pub use super::batch::Entity as Batch;
pub use super::college_settings::Entity as CollegeSettings;
pub use super::complaint::Entity as Complaint;
pub use super::department::Entity as Department;
pub use super::enrollment::Entity as Enrollment;
pub use super::fee::Entity as Fee;
pub use super::grade::Entity as Grade;
pub use super::notice::Entity as Notice;
pub use super::subject::Entity as Subject;
pub use super::submission::Entity as Submission;
pub use super::user::Entity as User;
