pub mod food;
pub mod restaurant;
pub mod user;

pub use food::FoodRepository;
pub use restaurant::RestaurantRepository;
pub use user::UserRepository;
