pub mod academic_calendar;
pub mod program_tree;
