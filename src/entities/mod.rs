pub mod prelude;

pub mod assignment;
pub mod attendance;
pub mod batch;
pub mod college_settings;
pub mod complaint;
pub mod department;
pub mod enrollment;
pub mod fee;
pub mod grade;
pub mod notice;
pub mod sea_orm_active_enums;
pub mod subject;
pub mod submission;
pub mod user;
