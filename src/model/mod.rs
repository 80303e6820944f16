pub mod admin;
pub mod attendance;
pub mod homework;
pub mod marks;
pub mod role;
pub mod school;
pub mod sclass;
pub mod student;
pub mod subject;
pub mod teacher;
pub mod timetable;
