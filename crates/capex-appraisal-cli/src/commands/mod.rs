pub mod appraise;
pub mod schedules;
