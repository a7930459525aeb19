pub mod constants;
pub mod lanes;
pub mod skins;
pub mod modes;
pub mod state;
pub mod systems;
pub mod game_loop;
pub mod match_result;
pub mod performance;
