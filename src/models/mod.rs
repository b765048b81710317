pub mod food;
pub mod restaurant;
pub mod user;

pub use food::Food;
pub use restaurant::{NewRestaurant, Restaurant};
pub use user::{ChallengeState, User};
