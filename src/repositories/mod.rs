pub mod assignment_repository;
pub mod attendance_repository;
pub mod batch_repository;
pub mod complaint_repository;
pub mod department_repository;
pub mod enrollment_repository;
pub mod fee_repository;
pub mod grade_repository;
pub mod notice_repository;
pub mod scoping;
pub mod settings_repository;
pub mod subject_repository;
pub mod user_directory;
pub mod user_repository;

pub use assignment_repository::{AssignmentRepository, AssignmentUpdate, NewAssignment};
pub use attendance_repository::{AttendanceFilter, AttendanceRepository};
pub use batch_repository::{BatchFilter, BatchRepository, BatchUpdate, NewBatch};
pub use complaint_repository::ComplaintRepository;
pub use department_repository::{DepartmentRepository, DepartmentUpdate};
pub use enrollment_repository::{EnrollmentFilter, EnrollmentRepository};
pub use fee_repository::{FeeFilter, FeeRepository, FeeTotals, FeeUpdate};
pub use grade_repository::{GradeEntry, GradeFilter, GradeRepository};
pub use notice_repository::{NewNotice, NoticeRepository, NoticeUpdate};
pub use settings_repository::{SettingsRepository, SettingsUpdate};
pub use subject_repository::{NewSubject, SubjectFilter, SubjectRepository, SubjectUpdate};
pub use user_directory::DatabaseDirectory;
pub use user_repository::{UserFilter, UserRepository, UserUpdate};
