//! Domain operations. Every function takes the store as `&dyn SchoolStore`
//! and, where time matters, the current instant as an argument.

pub mod attendance;
pub mod cascade;
pub mod homework;
pub mod marks;
pub mod roster;
pub mod timetable;
