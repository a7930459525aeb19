pub mod obstacles;
pub mod economy;
pub mod powerups;
pub mod collision;
pub mod ai;
pub mod chaos;
